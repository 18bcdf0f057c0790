use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pulp_smash_api::{Client, PollPolicy, TaskRef, poll_task};
use pulp_smash_config::{DEFAULT_SECTION, SettingsFile, Version};
use pulp_smash_diff::{Labels, RequiredFields, diff, normalize, xml};
use pulp_smash_selectors::{BugTable, bug_is_fixed};

/// Pulp Smash - functional test toolkit for the Pulp server
#[derive(Parser)]
#[command(name = "pulp-smash")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Log at debug level (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Inspect the settings file
  Settings {
    #[command(subcommand)]
    action: SettingsAction,
  },

  /// Wait for a task and every task it spawns, printing each terminal state
  Poll {
    /// Task href, e.g. /pulp/api/v2/tasks/<id>/
    href: String,

    #[arg(long, default_value = DEFAULT_SECTION)]
    section: String,

    /// Fetches allowed per task
    #[arg(long, default_value_t = PollPolicy::DEFAULT_LIMIT)]
    limit: u32,

    /// Seconds between fetches of the same task
    #[arg(long, default_value_t = PollPolicy::DEFAULT_INTERVAL.as_secs())]
    interval: u64,
  },

  /// Compare two metadata documents (.json, .xml or .xml.gz)
  Diff {
    a: PathBuf,
    b: PathBuf,

    #[arg(long, default_value = "")]
    label_a: String,

    #[arg(long, default_value = "")]
    label_b: String,

    /// Field to report next to any difference at a path, as PATH=FIELD
    #[arg(long = "require", value_parser = parse_pair)]
    required: Vec<(String, String)>,

    /// Sort the records at a path by a field before comparing, as PATH=KEY
    #[arg(long = "sort", value_parser = parse_pair)]
    sort: Vec<(String, String)>,
  },

  /// Tell whether a known bug is fixed in the Pulp version under test
  Bug {
    /// JSON bug table
    table: PathBuf,

    id: u64,

    /// Version under test; defaults to the section's version
    #[arg(long)]
    pulp_version: Option<Version>,

    #[arg(long, default_value = DEFAULT_SECTION)]
    section: String,
  },
}

#[derive(Subcommand)]
enum SettingsAction {
  /// Print the settings file in use, or where one would be saved
  Path,

  /// Print a section as JSON
  Show {
    #[arg(long, default_value = DEFAULT_SECTION)]
    section: String,
  },

  /// List section names
  Sections,

  /// Check a section for values that cannot work
  Validate {
    #[arg(long, default_value = DEFAULT_SECTION)]
    section: String,
  },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
  raw
    .split_once('=')
    .map(|(path, field)| (path.to_string(), field.to_string()))
    .ok_or_else(|| format!("expected PATH=FIELD, got '{}'", raw))
}

fn main() -> Result<ExitCode> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(filter)
    .init();

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run(cli.command).await })
}

async fn run(command: Commands) -> Result<ExitCode> {
  match command {
    Commands::Settings { action } => settings(action).await?,
    Commands::Poll {
      href,
      section,
      limit,
      interval,
    } => {
      let policy = PollPolicy::new(limit, Duration::from_secs(interval));
      poll(href, &section, policy).await?
    }
    Commands::Diff {
      a,
      b,
      label_a,
      label_b,
      required,
      sort,
    } => {
      let required: RequiredFields = required.into_iter().collect();
      let same = compare(&a, &b, Labels::new(label_a, label_b), required, &sort).await?;
      if !same {
        return Ok(ExitCode::FAILURE);
      }
    }
    Commands::Bug {
      table,
      id,
      pulp_version,
      section,
    } => bug(&table, id, pulp_version, &section).await?,
  }
  Ok(ExitCode::SUCCESS)
}

async fn settings(action: SettingsAction) -> Result<()> {
  match action {
    SettingsAction::Path => {
      let path = match SettingsFile::locate() {
        Ok(file) => file.path().to_path_buf(),
        Err(_) => SettingsFile::save_path()?,
      };
      println!("{}", path.display());
    }
    SettingsAction::Show { section } => {
      let config = SettingsFile::locate()?.read(&section).await?;
      println!("{}", serde_json::to_string_pretty(&config)?);
    }
    SettingsAction::Sections => {
      for name in SettingsFile::locate()?.sections().await? {
        println!("{}", name);
      }
    }
    SettingsAction::Validate { section } => {
      let file = SettingsFile::locate()?;
      file
        .read(&section)
        .await?
        .validate()
        .with_context(|| format!("section '{}' of {}", section, file.path().display()))?;
      println!("section '{}' is valid", section);
    }
  }
  Ok(())
}

async fn poll(href: String, section: &str, policy: PollPolicy) -> Result<()> {
  let config = SettingsFile::locate()?.read(section).await?;
  let client = Client::new(config)?.with_poll_policy(policy);

  info!(href = %href, limit = policy.limit, interval_secs = policy.interval.as_secs(), "poll_started");

  let mut states = std::pin::pin!(poll_task(&client, TaskRef::new(href), policy));
  let mut count = 0usize;
  while let Some(state) = states.next().await {
    let state = state?;
    println!("{}", serde_json::to_string(&state)?);
    count += 1;
  }

  info!(tasks = count, "poll_completed");
  Ok(())
}

/// Compare two documents and print the diff. True when they match.
async fn compare(
  a: &Path,
  b: &Path,
  labels: Labels,
  required: RequiredFields,
  sort: &[(String, String)],
) -> Result<bool> {
  let left = load_document(a, sort).await?;
  let right = load_document(b, sort).await?;

  let tree =
    tokio::task::spawn_blocking(move || diff(&left, &right, &labels, &required)).await?;
  println!("{}", serde_json::to_string_pretty(&tree)?);

  Ok(tree.as_object().is_some_and(|m| m.is_empty()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
  Json,
  Xml,
}

impl DocumentKind {
  fn of(path: &Path) -> Result<Self> {
    let name = path.to_string_lossy();
    if name.ends_with(".json") {
      Ok(Self::Json)
    } else if name.ends_with(".xml") || name.ends_with(".xml.gz") {
      Ok(Self::Xml)
    } else {
      bail!("don't know how to load {}: expected .json, .xml or .xml.gz", path.display())
    }
  }
}

async fn load_document(path: &Path, sort: &[(String, String)]) -> Result<Value> {
  let mut value = match DocumentKind::of(path)? {
    DocumentKind::Json => {
      let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
      serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?
    }
    DocumentKind::Xml => {
      let owned = path.to_path_buf();
      let mut doc = tokio::task::spawn_blocking(move || xml::parse_file(&owned))
        .await?
        .with_context(|| format!("failed to parse {}", path.display()))?;
      normalize::collapse_text(&mut doc);
      doc
    }
  };

  for (records, key) in sort {
    if !normalize::sort_by_key(&mut value, records, key) {
      debug!(path = %path.display(), records = %records, "sort_path_not_found");
    }
  }
  Ok(value)
}

async fn bug(table: &Path, id: u64, pulp_version: Option<Version>, section: &str) -> Result<()> {
  let bugs = BugTable::load(table)
    .await
    .with_context(|| format!("failed to load bug table {}", table.display()))?;

  let version = match pulp_version {
    Some(version) => version,
    None => SettingsFile::locate()?
      .read(section)
      .await?
      .version
      .with_context(|| format!("section '{}' has no version; pass --pulp-version", section))?,
  };

  let fixed = bug_is_fixed(&bugs, id, &version);
  let output = serde_json::json!({
    "bug": id,
    "status": bugs.get(id).map(|b| b.status.as_str()),
    "pulp_version": version.to_string(),
    "fixed": fixed,
  });
  println!("{}", output);
  Ok(())
}
