//! Annotation types and their user-driven lifecycle.
//!
//! Status changes come from two places: explicit user actions (the methods
//! on [`Annotation`] below) and the automatic reconciliation pass in
//! [`crate::reconcile`], which only ever moves between `active` and
//! `orphaned`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  position::TextRange,
  selector::{AnnotationTarget, construct_selectors},
};

// ─── Enums ───────────────────────────────────────────────────────────────────

/// What kind of note an annotation is.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnnotationKind {
  #[default]
  Comment,
  Review,
  Pending,
  Discussion,
}

/// Lifecycle status of an annotation.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnnotationStatus {
  #[default]
  Active,
  Resolved,
  Archived,
  /// The anchor could not be found in the current document.
  Orphaned,
  /// Exempt from orphan detection; a free-floating note.
  Kept,
}

impl AnnotationStatus {
  /// Whether the reconciliation pass inspects annotations in this status.
  pub fn is_reconcilable(self) -> bool {
    matches!(self, Self::Active | Self::Orphaned)
  }
}

/// A user-initiated status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleAction {
  Resolve,
  Archive,
  Reopen,
  Keep,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A reply in an annotation's thread. Replies are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationReply {
  pub id:         Uuid,
  pub content:    String,
  pub author:     String,
  pub created_at: DateTime<Utc>,
}

/// Provenance left on an annotation upgraded from the legacy format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigratedFrom {
  /// Format version the annotation was read from.
  pub version:         String,
  pub migrated_at:     DateTime<Utc>,
  /// The legacy record exactly as it was read.
  pub original_fields: serde_json::Value,
}

/// A text annotation in the current (2.0.0) format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
  pub id:            Uuid,
  #[serde(rename = "type")]
  pub kind:          AnnotationKind,
  pub target:        AnnotationTarget,
  pub content:       String,
  pub author:        String,
  pub created_at:    DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resolved_at:   Option<DateTime<Utc>>,
  #[serde(default)]
  pub status:        AnnotationStatus,
  #[serde(default)]
  pub replies:       Vec<AnnotationReply>,
  /// Block-level anchor (e.g. a math block). Bypasses selectors entirely.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub block_id:      Option<String>,
  #[serde(
    rename = "_migratedFrom",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub migrated_from: Option<MigratedFrom>,
}

impl Annotation {
  /// A fresh, active annotation on `target`.
  pub fn new(
    kind: AnnotationKind,
    target: AnnotationTarget,
    content: impl Into<String>,
    author: impl Into<String>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      kind,
      target,
      content: content.into(),
      author: author.into(),
      created_at: Utc::now(),
      resolved_at: None,
      status: AnnotationStatus::Active,
      replies: Vec::new(),
      block_id: None,
      migrated_from: None,
    }
  }

  /// Create an annotation from a live selection, capturing all selectors.
  pub fn from_selection(
    doc: &str,
    range: TextRange,
    source: impl Into<String>,
    kind: AnnotationKind,
    content: impl Into<String>,
    author: impl Into<String>,
  ) -> Result<Self> {
    let target = AnnotationTarget::new(source, construct_selectors(doc, range)?);
    Ok(Self::new(kind, target, content, author))
  }

  pub fn is_block_anchored(&self) -> bool { self.block_id.is_some() }

  // ── User actions ─────────────────────────────────────────────────────────

  pub fn resolve(&mut self, at: DateTime<Utc>) -> Result<()> {
    self.transition(LifecycleAction::Resolve, AnnotationStatus::Resolved)?;
    self.resolved_at = Some(at);
    Ok(())
  }

  pub fn archive(&mut self) -> Result<()> {
    self.transition(LifecycleAction::Archive, AnnotationStatus::Archived)
  }

  /// Return a resolved or archived annotation to `active`. If its text has
  /// gone, the next reconciliation pass will orphan it.
  pub fn reopen(&mut self) -> Result<()> {
    self.transition(LifecycleAction::Reopen, AnnotationStatus::Active)?;
    self.resolved_at = None;
    Ok(())
  }

  /// Exempt the annotation from orphan detection permanently.
  pub fn keep(&mut self) -> Result<()> {
    self.transition(LifecycleAction::Keep, AnnotationStatus::Kept)
  }

  /// Append a reply and return a reference to it.
  pub fn add_reply(
    &mut self,
    content: impl Into<String>,
    author: impl Into<String>,
  ) -> &AnnotationReply {
    self.replies.push(AnnotationReply {
      id:         Uuid::new_v4(),
      content:    content.into(),
      author:     author.into(),
      created_at: Utc::now(),
    });
    &self.replies[self.replies.len() - 1]
  }

  fn transition(
    &mut self,
    action: LifecycleAction,
    to: AnnotationStatus,
  ) -> Result<()> {
    use AnnotationStatus::*;
    let allowed = match action {
      LifecycleAction::Resolve => matches!(self.status, Active | Orphaned),
      LifecycleAction::Archive => matches!(self.status, Active | Orphaned | Resolved),
      LifecycleAction::Reopen => matches!(self.status, Resolved | Archived),
      LifecycleAction::Keep => matches!(self.status, Active | Orphaned),
    };
    if !allowed {
      return Err(Error::InvalidTransition {
        from: self.status,
        action,
      });
    }
    self.status = to;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::selector::Selector;

  fn annotation() -> Annotation {
    let target = AnnotationTarget::new("notes.md", vec![Selector::TextQuote {
      exact:  "fox".into(),
      prefix: None,
      suffix: None,
    }]);
    Annotation::new(AnnotationKind::Comment, target, "why a fox?", "ada")
  }

  #[test]
  fn new_annotation_is_active() {
    let a = annotation();
    assert_eq!(a.status, AnnotationStatus::Active);
    assert!(a.replies.is_empty());
    assert!(!a.is_block_anchored());
  }

  #[test]
  fn resolve_then_reopen() {
    let mut a = annotation();
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    a.resolve(at).unwrap();
    assert_eq!(a.status, AnnotationStatus::Resolved);
    assert_eq!(a.resolved_at, Some(at));

    a.reopen().unwrap();
    assert_eq!(a.status, AnnotationStatus::Active);
    assert_eq!(a.resolved_at, None);
  }

  #[test]
  fn kept_is_terminal() {
    let mut a = annotation();
    a.status = AnnotationStatus::Orphaned;
    a.keep().unwrap();
    assert_eq!(a.status, AnnotationStatus::Kept);

    let err = a.resolve(Utc::now()).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition {
      from:   AnnotationStatus::Kept,
      action: LifecycleAction::Resolve,
    }));
    assert!(a.reopen().is_err());
    assert_eq!(a.status, AnnotationStatus::Kept);
  }

  #[test]
  fn cannot_reopen_an_active_annotation() {
    let mut a = annotation();
    let err = a.reopen().unwrap_err();
    assert_eq!(err.to_string(), "cannot reopen an annotation that is active");
  }

  #[test]
  fn replies_keep_insertion_order() {
    let mut a = annotation();
    a.add_reply("first", "ada");
    a.add_reply("second", "bob");
    let contents: Vec<_> = a.replies.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, ["first", "second"]);
  }

  #[test]
  fn wire_format_is_camel_case() {
    let mut a = annotation();
    a.block_id = Some("math-1".into());
    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["type"], "comment");
    assert_eq!(json["status"], "active");
    assert_eq!(json["blockId"], "math-1");
    assert!(json.get("createdAt").is_some());
    assert!(json.get("resolvedAt").is_none());
    assert!(json.get("_migratedFrom").is_none());

    let back: Annotation = serde_json::from_value(json).unwrap();
    assert_eq!(back, a);
  }
}
