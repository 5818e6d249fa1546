//! Command-line surface for Marginalia annotation files.
//!
//! Wires the pure core and codec crates to the filesystem and to a
//! debounced reconciliation loop.

pub mod commands;
pub mod config;
pub mod debounce;

pub use config::CliConfig;
