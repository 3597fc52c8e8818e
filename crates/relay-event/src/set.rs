use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// The correlated events for one trigger invocation, keyed by dependency
/// name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSet {
  events: BTreeMap<String, Event>,
}

impl EventSet {
  pub fn builder() -> EventSetBuilder {
    EventSetBuilder::default()
  }

  pub fn get(&self, name: &str) -> Option<&Event> {
    self.events.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.events.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.events.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Event)> {
    self.events.iter().map(|(k, v)| (k.as_str(), v))
  }
}

impl FromIterator<(String, Event)> for EventSet {
  fn from_iter<I: IntoIterator<Item = (String, Event)>>(iter: I) -> Self {
    Self {
      events: iter.into_iter().collect(),
    }
  }
}

/// Builds an [`EventSet`]. A later event for the same name replaces the
/// earlier one.
#[derive(Debug, Default)]
pub struct EventSetBuilder {
  events: BTreeMap<String, Event>,
}

impl EventSetBuilder {
  pub fn event(mut self, name: impl Into<String>, event: Event) -> Self {
    self.events.insert(name.into(), event);
    self
  }

  pub fn build(self) -> EventSet {
    EventSet {
      events: self.events,
    }
  }
}
