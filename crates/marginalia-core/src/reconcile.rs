//! Orphan reconciliation.
//!
//! A pass is a pure function of one document snapshot and one annotation
//! array. It yields a batch of status updates; applying the batch produces a
//! new array rather than mutating the old one. Scheduling (debounce, re-runs
//! after further edits) belongs to the caller.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  anchor::anchor_annotation,
  annotation::{Annotation, AnnotationStatus},
};

/// One automatic status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
  pub id:   Uuid,
  pub from: AnnotationStatus,
  pub to:   AnnotationStatus,
}

/// Whether the pass looks at `annotation` at all.
pub fn is_subject_to_reconciliation(annotation: &Annotation) -> bool {
  annotation.status.is_reconcilable() && !annotation.is_block_anchored()
}

/// Compute the status changes `doc` implies for `annotations`.
///
/// An unanchorable annotation that is not yet orphaned becomes orphaned; an
/// orphaned one that anchors again becomes active. Nothing else changes, so
/// running the pass on its own output yields no updates.
pub fn reconcile(doc: &str, annotations: &[Annotation]) -> Vec<StatusUpdate> {
  let updates: Vec<StatusUpdate> = annotations
    .iter()
    .filter(|a| is_subject_to_reconciliation(a))
    .filter_map(|a| {
      let anchored = anchor_annotation(doc, a).is_some();
      let to = match (anchored, a.status) {
        (false, status) if status != AnnotationStatus::Orphaned => {
          AnnotationStatus::Orphaned
        }
        (true, AnnotationStatus::Orphaned) => AnnotationStatus::Active,
        _ => return None,
      };
      Some(StatusUpdate {
        id: a.id,
        from: a.status,
        to,
      })
    })
    .collect();

  tracing::debug!(
    annotations = annotations.len(),
    updates = updates.len(),
    "reconciliation pass complete"
  );
  updates
}

/// Return a new annotation array with `updates` applied.
///
/// An update whose `from` no longer matches the annotation's current status
/// is stale (a user action landed in between) and is skipped.
pub fn apply_updates(
  annotations: &[Annotation],
  updates: &[StatusUpdate],
) -> Vec<Annotation> {
  annotations
    .iter()
    .map(|a| {
      let mut next = a.clone();
      if let Some(update) = updates.iter().find(|u| u.id == a.id) {
        if update.from == a.status {
          next.status = update.to;
        } else {
          tracing::debug!(id = %a.id, "skipping stale status update");
        }
      }
      next
    })
    .collect()
}
