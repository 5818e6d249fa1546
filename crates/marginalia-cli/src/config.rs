//! Runtime configuration, layered from an optional TOML file and
//! `MARGINALIA_*` environment variables.

use std::{path::Path, time::Duration};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
  /// Quiet period after the last document change before a reconciliation
  /// pass runs.
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 { 500 }

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      debounce_ms: default_debounce_ms(),
    }
  }
}

impl CliConfig {
  pub fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }
}

/// Read `path` (if it exists) and the environment into a [`CliConfig`].
pub fn load(path: &Path) -> anyhow::Result<CliConfig> {
  config::Config::builder()
    .add_source(config::File::from(path.to_path_buf()).required(false))
    .add_source(config::Environment::with_prefix("MARGINALIA"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise CliConfig")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = load(Path::new("/nonexistent/marginalia.toml")).unwrap();
    assert_eq!(cfg, CliConfig::default());
    assert_eq!(cfg.debounce(), Duration::from_millis(500));
  }
}
