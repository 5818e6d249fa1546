//! Core types and algorithms for Marginalia text annotations.
//!
//! Annotations point into a markdown document through several redundant
//! selectors. This crate builds those selectors, re-locates them after the
//! document has been edited, and reconciles annotation status (orphaned or
//! active) against the current text.
//!
//! It is pure and synchronous: no file I/O, no async, no clocks beyond
//! stamping new records. Everything else in the workspace depends on it.

pub mod anchor;
pub mod annotation;
pub mod error;
pub mod position;
pub mod quote;
pub mod reconcile;
pub mod selector;

pub use anchor::{AnchorOutcome, anchor, anchor_annotation, anchor_with_strategy};
pub use annotation::{Annotation, AnnotationKind, AnnotationReply, AnnotationStatus};
pub use error::{Error, Result};
pub use position::TextRange;
pub use reconcile::{StatusUpdate, apply_updates, reconcile};
pub use selector::{AnnotationTarget, Selector, construct_selectors};
