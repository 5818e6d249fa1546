//! Error types for `marginalia-core`.
//!
//! Anchoring and reconciliation never fail; an unresolvable anchor is a
//! `None`, not an error. Errors here cover caller mistakes only.

use thiserror::Error;

use crate::annotation::{AnnotationStatus, LifecycleAction};

#[derive(Debug, Error)]
pub enum Error {
  #[error("range {start}..{end} is not a valid slice of a {len}-byte document")]
  InvalidRange { start: usize, end: usize, len: usize },

  #[error("cannot {action} an annotation that is {from}")]
  InvalidTransition {
    from:   AnnotationStatus,
    action: LifecycleAction,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
