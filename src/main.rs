use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_config::{DispatchConfig, Format, TriggerDef, parse_document};
use relay_dispatch::Dispatcher;
use relay_event::EventSet;
use relay_policy::Outcome;
use relay_trigger::TriggerFactory;

/// Relay - dispatch event-driven triggers
#[derive(Parser)]
#[command(name = "relay")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the dispatch config (default: ~/.relay/config.yaml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Dispatch triggers against an event set
  Dispatch {
    /// Trigger definition files (JSON or YAML, one definition or a list)
    #[arg(long = "trigger", required = true)]
    triggers: Vec<PathBuf>,

    /// Event set file; read from stdin when omitted
    #[arg(long)]
    events: Option<PathBuf>,
  },

  /// Parse trigger definitions and print them normalized
  Validate {
    /// Trigger definition files (JSON or YAML)
    triggers: Vec<PathBuf>,
  },
}

/// One definition or a list of them.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum TriggerFile {
  One(Box<TriggerDef>),
  Many(Vec<TriggerDef>),
}

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Dispatch { triggers, events }) => {
      let rt = tokio::runtime::Runtime::new()?;
      let failed = rt.block_on(dispatch(cli.config, triggers, events))?;
      if failed > 0 {
        bail!("{} trigger(s) failed", failed);
      }
    }
    Some(Commands::Validate { triggers }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(validate(triggers))?;
    }
    None => {
      println!("relay - use --help to see available commands");
    }
  }

  Ok(())
}

/// Run every trigger concurrently and print the results. Returns the number
/// of failed dispatches.
async fn dispatch(
  config_path: Option<PathBuf>,
  trigger_files: Vec<PathBuf>,
  events_file: Option<PathBuf>,
) -> Result<usize> {
  let config = load_config(config_path).await?;
  let defs = load_triggers(&trigger_files).await?;
  let events: EventSet = match &events_file {
    Some(path) => load_document(path).await?,
    None => read_events_from_stdin()?,
  };
  eprintln!(
    "Loaded {} trigger(s) and {} event(s)",
    defs.len(),
    events.len()
  );

  let dispatcher = Dispatcher::new(TriggerFactory::new(config));
  let cancel = CancellationToken::new();
  let shutdown = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling dispatches");
      shutdown.cancel();
    }
  });

  let results = dispatcher
    .dispatch_all(defs, Arc::new(events), &cancel)
    .await;

  println!("{}", serde_json::to_string_pretty(&results)?);

  Ok(
    results
      .iter()
      .filter(|r| r.outcome != Outcome::Success)
      .count(),
  )
}

async fn validate(trigger_files: Vec<PathBuf>) -> Result<()> {
  let defs = load_triggers(&trigger_files).await?;
  for def in &defs {
    eprintln!("{}: {} trigger ok", def.name, def.kind());
  }
  println!("{}", serde_json::to_string_pretty(&defs)?);
  Ok(())
}

async fn load_config(path: Option<PathBuf>) -> Result<DispatchConfig> {
  match path {
    Some(path) => load_document(&path).await,
    None => {
      let Some(home) = dirs::home_dir() else {
        return Ok(DispatchConfig::default());
      };
      let path = home.join(".relay").join("config.yaml");
      if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        load_document(&path).await
      } else {
        Ok(DispatchConfig::default())
      }
    }
  }
}

async fn load_triggers(files: &[PathBuf]) -> Result<Vec<TriggerDef>> {
  let mut defs = Vec::new();
  for file in files {
    match load_document::<TriggerFile>(file).await? {
      TriggerFile::One(def) => defs.push(*def),
      TriggerFile::Many(many) => defs.extend(many),
    }
  }
  Ok(defs)
}

async fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read file: {}", path.display()))?;
  parse_document(&content, Format::from_path(path))
    .with_context(|| format!("failed to parse file: {}", path.display()))
}

fn read_events_from_stdin() -> Result<EventSet> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, dispatch with no events
    Ok(EventSet::default())
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read events from stdin")?;

    if input.trim().is_empty() {
      Ok(EventSet::default())
    } else {
      serde_json::from_str(&input).context("failed to parse events JSON from stdin")
    }
  }
}
