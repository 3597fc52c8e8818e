//! Per-trigger client caching.
//!
//! Clients are expensive to construct (credential loading, connection
//! setup), so each one is built once per trigger name and shared by every
//! later dispatch of that trigger.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

/// Caches one client per trigger name.
///
/// Concurrent callers asking for the same name wait on a single
/// construction. A failed construction leaves the entry empty so the next
/// caller tries again. Entries are never evicted.
pub struct ClientCache<C> {
  slots: Arc<Mutex<HashMap<String, Arc<OnceCell<Arc<C>>>>>>,
}

impl<C> ClientCache<C> {
  pub fn new() -> Self {
    Self {
      slots: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Return the client for `name`, constructing it with `factory` if this
  /// is the first request.
  pub async fn get_or_create<F, Fut, E>(&self, name: &str, factory: F) -> Result<Arc<C>, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<C, E>>,
  {
    let slot = {
      let mut slots = self.slots.lock().await;
      slots.entry(name.to_string()).or_default().clone()
    };

    let client = slot
      .get_or_try_init(|| async { factory().await.map(Arc::new) })
      .await?;
    Ok(client.clone())
  }

  /// Whether a constructed client exists for `name`.
  pub async fn contains(&self, name: &str) -> bool {
    let slots = self.slots.lock().await;
    slots.get(name).is_some_and(|slot| slot.initialized())
  }
}

impl<C> Clone for ClientCache<C> {
  fn clone(&self) -> Self {
    Self {
      slots: self.slots.clone(),
    }
  }
}

impl<C> Default for ClientCache<C> {
  fn default() -> Self {
    Self::new()
  }
}
