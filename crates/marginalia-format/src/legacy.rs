//! The 1.0.0 annotation file shape.
//!
//! Version 1 stored a flat line/column range plus the selected text and raw
//! context strings. Annotation records are kept as raw JSON in the file and
//! decoded one at a time: a field with an unexpected value reads as absent,
//! so an incomplete or odd record still reaches the migration pipeline
//! instead of failing the whole file, and the raw record survives untouched
//! as provenance.

use chrono::{DateTime, Utc};
use marginalia_core::AnnotationKind;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

/// Decode a field, reading any value of the wrong shape as `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let raw = Value::deserialize(deserializer)?;
  Ok(serde_json::from_value(raw).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned + Default,
{
  Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Decode an array element by element, dropping elements that do not fit.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let Value::Array(items) = Value::deserialize(deserializer)? else {
    return Ok(Vec::new());
  };
  Ok(
    items
      .into_iter()
      .filter_map(|item| serde_json::from_value(item).ok())
      .collect(),
  )
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReply {
  #[serde(default, deserialize_with = "lenient")]
  pub id:         Option<String>,
  #[serde(default, deserialize_with = "lenient_or_default")]
  pub content:    String,
  #[serde(default, deserialize_with = "lenient_or_default")]
  pub author:     String,
  #[serde(default, deserialize_with = "lenient")]
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAnnotation {
  #[serde(default, deserialize_with = "lenient")]
  pub id:               Option<String>,
  /// Kinds this build does not know read as absent.
  #[serde(rename = "type", default, deserialize_with = "lenient")]
  pub kind:             Option<AnnotationKind>,

  #[serde(default, deserialize_with = "lenient")]
  pub start_line:       Option<usize>,
  #[serde(default, deserialize_with = "lenient")]
  pub end_line:         Option<usize>,
  #[serde(default, deserialize_with = "lenient")]
  pub start_char:       Option<usize>,
  #[serde(default, deserialize_with = "lenient")]
  pub end_char:         Option<usize>,

  #[serde(default, deserialize_with = "lenient_or_default")]
  pub selected_text:    String,
  #[serde(default, deserialize_with = "lenient")]
  pub context_before:   Option<String>,
  #[serde(default, deserialize_with = "lenient")]
  pub context_after:    Option<String>,
  /// Which occurrence of `selected_text` (0-based) was selected.
  #[serde(default, deserialize_with = "lenient")]
  pub occurrence_index: Option<usize>,

  #[serde(default, deserialize_with = "lenient_or_default")]
  pub content:          String,
  #[serde(default, deserialize_with = "lenient_or_default")]
  pub author:           String,
  #[serde(default, deserialize_with = "lenient")]
  pub created_at:       Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "lenient")]
  pub resolved_at:      Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "lenient_or_default")]
  pub resolved:         bool,
  /// Free-form in 1.0.0; only `orphaned` and `kept` carry meaning.
  #[serde(default, deserialize_with = "lenient")]
  pub status:           Option<String>,
  #[serde(default, deserialize_with = "lenient_seq")]
  pub replies:          Vec<LegacyReply>,
  #[serde(default, deserialize_with = "lenient")]
  pub block_id:         Option<String>,
}

impl LegacyAnnotation {
  /// Decode a raw record. Never fails: a record that is not even an object
  /// decodes as an empty one.
  pub fn from_value(raw: &Value) -> Self {
    Self::deserialize(raw).unwrap_or_default()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyHistoryItem {
  #[serde(default, deserialize_with = "lenient")]
  pub id:            Option<String>,
  #[serde(default, deserialize_with = "lenient")]
  pub action:        Option<String>,
  #[serde(default, deserialize_with = "lenient")]
  pub annotation_id: Option<String>,
  #[serde(default, deserialize_with = "lenient")]
  pub timestamp:     Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "lenient")]
  pub summary:       Option<String>,
}

/// A whole 1.0.0 file (or an unversioned one, which predates the tag).
///
/// Only the envelope is strict. Annotation records stay raw until
/// migration, see [`LegacyAnnotation::from_value`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAnnotationFile {
  #[serde(rename = "_tool")]
  pub tool:        String,
  #[serde(rename = "_version", default)]
  pub version:     Option<String>,
  pub file_path:   String,
  #[serde(default, deserialize_with = "lenient")]
  pub file_name:   Option<String>,
  #[serde(default)]
  pub annotations: Vec<Value>,
  #[serde(default, deserialize_with = "lenient_seq")]
  pub history:     Vec<LegacyHistoryItem>,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn odd_values_read_as_absent() {
    let raw = json!({
      "id": 42,
      "type": "highlight",
      "startLine": -1,
      "selectedText": "foo",
      "createdAt": "last tuesday",
      "resolved": "yes",
      "replies": [{"content": "ok"}, "not a reply"],
    });
    let legacy = LegacyAnnotation::from_value(&raw);
    assert_eq!(legacy.id, None);
    assert_eq!(legacy.kind, None);
    assert_eq!(legacy.start_line, None);
    assert_eq!(legacy.selected_text, "foo");
    assert_eq!(legacy.created_at, None);
    assert!(!legacy.resolved);
    assert_eq!(legacy.replies.len(), 1);
    assert_eq!(legacy.replies[0].content, "ok");
  }

  #[test]
  fn non_object_record_decodes_empty() {
    assert_eq!(
      LegacyAnnotation::from_value(&json!("stray")),
      LegacyAnnotation::default()
    );
  }
}
