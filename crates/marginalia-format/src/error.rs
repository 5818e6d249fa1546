//! Error types for the annotation file codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("not a marginalia annotation file (tool {tool:?}, version {version:?})")]
  UnknownFormat {
    tool:    Option<String>,
    version: Option<String>,
  },

  #[error("malformed {version} annotation file: {source}")]
  InvalidShape {
    version: &'static str,
    #[source]
    source:  serde_json::Error,
  },

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
