//! 1.0.0 → 2.0.0 migration.
//!
//! Pipeline per legacy annotation:
//!   raw record
//!     └─ lenient decode             (odd fields read as absent)
//!     └─ editor position selector   (from startLine/endLine, when present)
//!     └─ locate selected text       (occurrenceIndex-th match in the snapshot)
//!          ├─ found   → fresh quote (context from the snapshot) + text position
//!          └─ missing → quote with the legacy context strings
//!     └─ status mapping, replies, `_migratedFrom` provenance (the raw record)
//!
//! Migration never fails. A record with nothing usable still comes out with
//! a bare quote selector; whether it anchors is decided later.

use chrono::{DateTime, Utc};
use marginalia_core::{
  Annotation, AnnotationReply, AnnotationStatus, AnnotationTarget, Selector,
  TextRange,
  annotation::MigratedFrom,
  quote::occurrences,
  selector::quote_selector,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  LEGACY_VERSION,
  history::{HistoryAction, HistoryEntry},
  legacy::{LegacyAnnotation, LegacyHistoryItem, LegacyReply},
};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Map a legacy identifier onto a UUID.
///
/// Identifiers that already are UUIDs are kept; anything else gets a stable
/// name-based UUID, so annotation ids and the history entries referring to
/// them stay consistent across runs.
pub fn derive_id(legacy_id: &str) -> Uuid {
  Uuid::parse_str(legacy_id)
    .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, legacy_id.as_bytes()))
}

/// Id for the `index`-th child of `parent` that carried no id of its own.
fn positional_id(parent: &Uuid, index: usize) -> Uuid {
  Uuid::new_v5(parent, index.to_string().as_bytes())
}

// ─── Migrator ────────────────────────────────────────────────────────────────

/// Migration settings shared by every annotation of one file.
#[derive(Debug, Clone)]
pub struct Migrator<'a> {
  file_path:   &'a str,
  document:    Option<&'a str>,
  migrated_at: DateTime<Utc>,
}

impl<'a> Migrator<'a> {
  pub fn new(file_path: &'a str) -> Self {
    Self {
      file_path,
      document: None,
      migrated_at: Utc::now(),
    }
  }

  /// Use `document` as the live snapshot for relocating selected text.
  pub fn with_document(mut self, document: Option<&'a str>) -> Self {
    self.document = document;
    self
  }

  /// Stamp provenance and defaulted timestamps with `at` instead of now.
  pub fn at(mut self, at: DateTime<Utc>) -> Self {
    self.migrated_at = at;
    self
  }

  pub fn migrated_at(&self) -> DateTime<Utc> { self.migrated_at }

  /// Namespace for ids of records that carried none.
  fn file_namespace(&self) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, self.file_path.as_bytes())
  }

  /// Upgrade the `index`-th raw legacy record of the file.
  ///
  /// `raw` is stored untouched as the provenance record.
  pub fn migrate(&self, index: usize, raw: &Value) -> Annotation {
    let legacy = LegacyAnnotation::from_value(raw);
    let id = match &legacy.id {
      Some(id) => derive_id(id),
      None => positional_id(&self.file_namespace(), index),
    };

    Annotation {
      id,
      kind: legacy.kind.unwrap_or_default(),
      target: AnnotationTarget::new(self.file_path, self.selectors(&legacy)),
      content: legacy.content.clone(),
      author: legacy.author.clone(),
      created_at: legacy.created_at.unwrap_or(self.migrated_at),
      resolved_at: legacy.resolved_at,
      status: map_status(&legacy),
      replies: legacy
        .replies
        .iter()
        .enumerate()
        .map(|(i, r)| self.migrate_reply(&id, i, r))
        .collect(),
      block_id: legacy.block_id.clone(),
      migrated_from: Some(MigratedFrom {
        version: LEGACY_VERSION.to_string(),
        migrated_at: self.migrated_at,
        original_fields: raw.clone(),
      }),
    }
  }

  fn selectors(&self, legacy: &LegacyAnnotation) -> Vec<Selector> {
    let mut selectors = Vec::with_capacity(3);

    if let (Some(start_line), Some(end_line)) = (legacy.start_line, legacy.end_line) {
      selectors.push(Selector::EditorPosition {
        start_line,
        end_line,
        start_char: legacy.start_char.unwrap_or(0),
        end_char: legacy.end_char.unwrap_or(0),
      });
    }

    let occurrence = legacy.occurrence_index.unwrap_or(0);
    let located = self.document.and_then(|doc| {
      locate(doc, &legacy.selected_text, occurrence)
        .and_then(|range| quote_selector(doc, range).ok().map(|q| (range, q)))
    });

    match located {
      Some((range, quote)) => {
        selectors.push(quote);
        selectors.push(Selector::TextPosition {
          start: range.start,
          end:   range.end,
        });
      }
      None => {
        if self.document.is_some() {
          tracing::debug!(
            file = self.file_path,
            occurrence,
            "selected text not found in snapshot; keeping legacy context"
          );
        }
        selectors.push(legacy_quote(legacy));
      }
    }
    selectors
  }

  fn migrate_reply(&self, parent: &Uuid, index: usize, reply: &LegacyReply) -> AnnotationReply {
    AnnotationReply {
      id:         reply
        .id
        .as_deref()
        .map_or_else(|| positional_id(parent, index), derive_id),
      content:    reply.content.clone(),
      author:     reply.author.clone(),
      created_at: reply.created_at.unwrap_or(self.migrated_at),
    }
  }

  /// Upgrade the `index`-th legacy history item.
  pub fn migrate_history(&self, index: usize, item: &LegacyHistoryItem) -> HistoryEntry {
    let id = match &item.id {
      Some(id) => derive_id(id),
      None => Uuid::new_v5(
        &self.file_namespace(),
        format!("history/{index}").as_bytes(),
      ),
    };
    HistoryEntry {
      id,
      action: item
        .action
        .as_deref()
        .map_or(HistoryAction::Other, HistoryAction::from_legacy),
      annotation_id: item.annotation_id.as_deref().map(derive_id),
      timestamp: item.timestamp.unwrap_or(self.migrated_at),
      summary: item.summary.clone(),
    }
  }
}

/// Upgrade a raw legacy record, relocating it in `document` when supplied.
pub fn migrate_annotation(raw: &Value, file_path: &str, document: Option<&str>) -> Annotation {
  Migrator::new(file_path).with_document(document).migrate(0, raw)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// The `occurrence`-th (0-based) match of `text` in `doc`.
fn locate(doc: &str, text: &str, occurrence: usize) -> Option<TextRange> {
  let start = occurrences(doc, text).nth(occurrence)?;
  Some(TextRange::new(start, start + text.len()))
}

/// A quote built from what the legacy record itself stored.
fn legacy_quote(legacy: &LegacyAnnotation) -> Selector {
  let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());
  Selector::TextQuote {
    exact:  legacy.selected_text.clone(),
    prefix: non_empty(&legacy.context_before),
    suffix: non_empty(&legacy.context_after),
  }
}

fn map_status(legacy: &LegacyAnnotation) -> AnnotationStatus {
  match legacy.status.as_deref() {
    Some("orphaned") => AnnotationStatus::Orphaned,
    Some("kept") => AnnotationStatus::Kept,
    _ if legacy.resolved => AnnotationStatus::Resolved,
    _ => AnnotationStatus::Active,
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use marginalia_core::selector::SelectorKind;
  use serde_json::json;

  use super::*;

  const DOC: &str = "line one\nfoo bar\nbaz foo qux\n";

  fn legacy() -> Value {
    json!({
      "id": "a1",
      "startLine": 3, "endLine": 3, "startChar": 4, "endChar": 7,
      "selectedText": "foo",
      "contextBefore": "baz ", "contextAfter": " qux",
      "occurrenceIndex": 1,
      "content": "check this",
      "author": "ada"
    })
  }

  fn with(mut raw: Value, key: &str, value: Value) -> Value {
    raw[key] = value;
    raw
  }

  fn kinds(a: &Annotation) -> Vec<SelectorKind> {
    a.target.selectors.iter().map(Selector::kind).collect()
  }

  #[test]
  fn without_snapshot_uses_legacy_context() {
    let a = migrate_annotation(&legacy(), "notes.md", None);
    assert_eq!(kinds(&a), vec![
      SelectorKind::EditorPosition,
      SelectorKind::TextQuote
    ]);
    let quote = a.target.quote().unwrap();
    assert_eq!(quote.exact, "foo");
    assert_eq!(quote.prefix, Some("baz "));
    assert_eq!(a.target.editor_position().unwrap().start_line, 3);
    assert_eq!(a.target.source, "notes.md");
  }

  #[test]
  fn with_snapshot_finds_the_recorded_occurrence() {
    let a = migrate_annotation(&legacy(), "notes.md", Some(DOC));
    assert_eq!(kinds(&a), vec![
      SelectorKind::EditorPosition,
      SelectorKind::TextQuote,
      SelectorKind::TextPosition,
    ]);
    let second = DOC.rfind("foo").unwrap();
    assert_eq!(
      a.target.text_position(),
      Some(TextRange::new(second, second + 3))
    );
    // Context comes from the snapshot, not the stored strings.
    let quote = a.target.quote().unwrap();
    assert_eq!(quote.prefix, Some("line one\nfoo bar\nbaz "));
    assert_eq!(quote.suffix, Some(" qux\n"));
  }

  #[test]
  fn missing_occurrence_falls_back_to_legacy_context() {
    let raw = with(legacy(), "occurrenceIndex", json!(5));
    let a = migrate_annotation(&raw, "notes.md", Some(DOC));
    assert_eq!(a.target.text_position(), None);
    assert_eq!(a.target.quote().unwrap().suffix, Some(" qux"));
  }

  #[test]
  fn empty_record_still_gets_a_selector() {
    let a = migrate_annotation(&json!({}), "notes.md", Some(DOC));
    assert_eq!(a.target.selectors, vec![Selector::TextQuote {
      exact:  String::new(),
      prefix: None,
      suffix: None,
    }]);
    assert_eq!(a.status, AnnotationStatus::Active);
  }

  #[test]
  fn status_mapping() {
    let cases = [
      (json!("orphaned"), true, AnnotationStatus::Orphaned),
      (json!("kept"), true, AnnotationStatus::Kept),
      (Value::Null, true, AnnotationStatus::Resolved),
      (json!("whatever"), true, AnnotationStatus::Resolved),
      (Value::Null, false, AnnotationStatus::Active),
    ];
    for (status, resolved, expected) in cases {
      let raw = with(with(legacy(), "status", status.clone()), "resolved", json!(resolved));
      let a = migrate_annotation(&raw, "notes.md", None);
      assert_eq!(a.status, expected, "{status}/{resolved}");
    }
  }

  #[test]
  fn provenance_is_the_raw_record() {
    let raw = json!({
      "id": "a1",
      "selectedText": "foo",
      "contextBefore": null,
      "createdAt": "2024-03-01T10:00:00.000Z",
      "color": "yellow"
    });
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let a = Migrator::new("notes.md").at(at).migrate(0, &raw);

    let from = a.migrated_from.unwrap();
    assert_eq!(from.version, "1.0.0");
    assert_eq!(from.migrated_at, at);
    assert_eq!(from.original_fields, raw);
    assert_eq!(
      a.created_at,
      Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    );
  }

  #[test]
  fn odd_fields_do_not_stop_migration() {
    let raw = with(
      with(legacy(), "type", json!("highlight")),
      "createdAt",
      json!("last tuesday"),
    );
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let a = Migrator::new("notes.md").at(at).migrate(0, &raw);
    assert_eq!(a.kind, Default::default());
    assert_eq!(a.created_at, at);
    assert_eq!(a.content, "check this");
    assert_eq!(a.migrated_from.unwrap().original_fields, raw);
  }

  #[test]
  fn ids_are_stable() {
    let a = migrate_annotation(&legacy(), "notes.md", None);
    let b = migrate_annotation(&legacy(), "notes.md", Some(DOC));
    assert_eq!(a.id, b.id);
    assert_eq!(a.id, derive_id("a1"));

    let uuid = Uuid::new_v4();
    assert_eq!(derive_id(&uuid.to_string()), uuid);
  }

  #[test]
  fn records_without_ids_get_distinct_ids() {
    let migrator = Migrator::new("notes.md");
    let record = json!({"selectedText": "foo"});
    let first = migrator.migrate(0, &record);
    let second = migrator.migrate(1, &record);
    assert_ne!(first.id, second.id);
    assert_eq!(first.id, migrator.migrate(0, &record).id);

    let other_file = Migrator::new("other.md").migrate(0, &record);
    assert_ne!(first.id, other_file.id);
  }

  #[test]
  fn replies_are_copied() {
    let raw = with(
      legacy(),
      "replies",
      json!([
        {"id": "r1", "content": "agreed", "author": "bob"},
        {"content": "me too", "author": "cy"},
        {"content": "and me", "author": "di"}
      ]),
    );
    let a = migrate_annotation(&raw, "notes.md", None);
    assert_eq!(a.replies.len(), 3);
    assert_eq!(a.replies[0].id, derive_id("r1"));
    assert_eq!(a.replies[0].content, "agreed");
    assert_eq!(a.replies[0].author, "bob");
    assert_ne!(a.replies[1].id, a.replies[2].id);
  }

  #[test]
  fn history_items_without_ids_are_distinct_and_stable() {
    let migrator = Migrator::new("notes.md");
    let item = LegacyHistoryItem {
      action: Some("edited".into()),
      ..Default::default()
    };
    let first = migrator.migrate_history(0, &item);
    let second = migrator.migrate_history(1, &item);
    assert_ne!(first.id, second.id);
    assert_eq!(first.id, migrator.migrate_history(0, &item).id);
    assert_eq!(first.action, HistoryAction::Edited);
  }
}
