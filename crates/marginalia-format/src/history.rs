//! Per-file annotation history (2.0.0 shape).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to an annotation.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HistoryAction {
  Created,
  Edited,
  Replied,
  Resolved,
  Reopened,
  Archived,
  Kept,
  Deleted,
  /// The file was upgraded from the legacy format.
  Migrated,
  /// An action name this version does not recognise.
  Other,
}

impl HistoryAction {
  /// Parse a legacy action name, mapping anything unknown to `Other`.
  pub fn from_legacy(name: &str) -> Self {
    name.parse().unwrap_or(Self::Other)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
  pub id:            Uuid,
  pub action:        HistoryAction,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub annotation_id: Option<Uuid>,
  pub timestamp:     DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub summary:       Option<String>,
}

impl HistoryEntry {
  pub fn new(action: HistoryAction, annotation_id: Option<Uuid>) -> Self {
    Self {
      id: Uuid::new_v4(),
      action,
      annotation_id,
      timestamp: Utc::now(),
      summary: None,
    }
  }

  pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
    self.summary = Some(summary.into());
    self
  }
}
