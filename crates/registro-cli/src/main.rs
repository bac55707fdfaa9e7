//! `registro`, the command-line front end for the Registro enrollment engine.
//!
//! Reads `registro.toml` (or the path given with `--config`) and `REGISTRO_*`
//! environment variables, opens the SQLite store, runs one command and
//! prints the result as JSON.
//!
//! # Usage
//!
//! ```
//! registro course add CS101 "Intro to Programming" 4
//! registro course add CS201 "Data Structures" 4 --requires <CS101 id>
//! registro student add "Ada Lovelace"
//! registro enroll <student id> <course id>
//! ```

mod commands;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use registro_core::cache::CachedRegistry;
use registro_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::Command;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "registro", version, about = "Course catalog and enrollment registry")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "registro.toml")]
  config: PathBuf,

  /// SQLite store to open; overrides `store_path` from the config.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  /// Name recorded as the actor on enrollment and student changes;
  /// overrides `actor` from the config.
  #[arg(long)]
  actor: Option<String>,

  #[command(subcommand)]
  command: Command,
}

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CliConfig {
  #[serde(default = "default_store_path")]
  store_path:    PathBuf,
  /// Serve repeated course reads from memory within one run.
  #[serde(default)]
  cache_courses: bool,
  #[serde(default = "default_actor")]
  actor:         String,
}

fn default_store_path() -> PathBuf { PathBuf::from("registro.db") }

fn default_actor() -> String { "registro".to_owned() }

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("REGISTRO"))
    .build()
    .context("failed to read config file")?;

  let cfg: CliConfig = settings
    .try_deserialize()
    .context("failed to deserialise CliConfig")?;

  // CLI flags override the config file and environment.
  let store_path = expand_tilde(cli.store.as_deref().unwrap_or(&cfg.store_path));
  let actor = cli.actor.unwrap_or(cfg.actor);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::debug!(?store_path, cache = cfg.cache_courses, "store opened");

  if cfg.cache_courses {
    commands::run(&CachedRegistry::new(store), cli.command, actor).await
  } else {
    commands::run(&store, cli.command, actor).await
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
