//! `marginalia` — inspect, migrate, and reconcile annotation files.
//!
//! # Usage
//!
//! ```
//! marginalia migrate notes.md.annotations.json --doc notes.md --out upgraded.json
//! marginalia anchor notes.md.annotations.json --doc notes.md
//! marginalia check notes.md.annotations.json --doc notes.md --write
//! marginalia watch notes.md.annotations.json --doc notes.md
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marginalia_cli::{commands, config};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Marginalia annotation anchoring tools")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "marginalia.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print (or write) the file in the current format, upgrading it if legacy.
  Migrate {
    annotations: PathBuf,
    /// Current text of the annotated document, used to relocate selections.
    #[arg(long)]
    doc:         Option<PathBuf>,
    /// Write here instead of stdout.
    #[arg(long)]
    out:         Option<PathBuf>,
  },
  /// Show where each annotation anchors in the document.
  Anchor {
    annotations: PathBuf,
    #[arg(long)]
    doc:         PathBuf,
  },
  /// Run one orphan reconciliation pass.
  Check {
    annotations: PathBuf,
    #[arg(long)]
    doc:         PathBuf,
    /// Write status changes back to the annotation file.
    #[arg(long)]
    write:       bool,
  },
  /// Reconcile continuously as the document changes.
  Watch {
    annotations: PathBuf,
    #[arg(long)]
    doc:         PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = config::load(&cli.config)?;

  match cli.command {
    Command::Migrate {
      annotations,
      doc,
      out,
    } => commands::migrate(&annotations, doc.as_deref(), out.as_deref()),
    Command::Anchor { annotations, doc } => commands::anchor(&annotations, &doc),
    Command::Check {
      annotations,
      doc,
      write,
    } => commands::check(&annotations, &doc, write),
    Command::Watch { annotations, doc } => {
      commands::watch_document(annotations, doc, &cfg).await
    }
  }
}
