//! Annotation files: version detection, loading, and the 2.0.0 shape.

use std::path::Path;

use chrono::{DateTime, Utc};
use marginalia_core::Annotation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  CURRENT_VERSION, LEGACY_VERSION, TOOL_NAME,
  error::{Error, Result},
  history::{HistoryAction, HistoryEntry},
  legacy::LegacyAnnotationFile,
  migrate::Migrator,
};

// ─── Version detection ───────────────────────────────────────────────────────

/// Which shape a raw annotation file has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVersion {
  /// 2.0.0; usable as-is.
  Current,
  /// 1.0.0 or untagged; must be migrated before use.
  Legacy,
  /// Not written by this tool, or a version this build cannot read.
  Unknown,
}

/// Classify a parsed JSON document by its `_tool` and `_version` tags.
pub fn detect_version(raw: &Value) -> FileVersion {
  if raw.get("_tool").and_then(Value::as_str) != Some(TOOL_NAME) {
    return FileVersion::Unknown;
  }
  match raw.get("_version") {
    None | Some(Value::Null) => FileVersion::Legacy,
    Some(Value::String(v)) if v == LEGACY_VERSION => FileVersion::Legacy,
    Some(Value::String(v)) if v == CURRENT_VERSION => FileVersion::Current,
    Some(_) => FileVersion::Unknown,
  }
}

// ─── Current file ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationFile {
  #[serde(rename = "_tool")]
  pub tool:          String,
  #[serde(rename = "_version")]
  pub version:       String,
  pub file_path:     String,
  pub file_name:     String,
  pub last_modified: DateTime<Utc>,
  #[serde(default)]
  pub annotations:   Vec<Annotation>,
  #[serde(default)]
  pub history:       Vec<HistoryEntry>,
}

impl AnnotationFile {
  /// An empty file for the document at `file_path`.
  pub fn new(file_path: impl Into<String>) -> Self {
    let file_path = file_path.into();
    Self {
      tool: TOOL_NAME.to_string(),
      version: CURRENT_VERSION.to_string(),
      file_name: file_name_of(&file_path),
      file_path,
      last_modified: Utc::now(),
      annotations: Vec::new(),
      history: Vec::new(),
    }
  }

  /// Replace the annotation array wholesale and bump `lastModified`.
  pub fn replace_annotations(&mut self, annotations: Vec<Annotation>) {
    self.annotations = annotations;
    self.last_modified = Utc::now();
  }

  /// Append `annotation` and record its creation in the history.
  pub fn add_annotation(&mut self, annotation: Annotation) {
    self
      .history
      .push(HistoryEntry::new(HistoryAction::Created, Some(annotation.id)));
    let mut next = self.annotations.clone();
    next.push(annotation);
    self.replace_annotations(next);
  }

  /// Remove the annotation with `id`, returning it. Annotations are only
  /// ever removed this way; orphaned ones are kept.
  pub fn remove_annotation(&mut self, id: Uuid) -> Option<Annotation> {
    let position = self.annotations.iter().position(|a| a.id == id)?;
    let mut next = self.annotations.clone();
    let removed = next.remove(position);
    self.replace_annotations(next);
    self
      .history
      .push(HistoryEntry::new(HistoryAction::Deleted, Some(id)));
    Some(removed)
  }

  pub fn to_json_pretty(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}

fn file_name_of(file_path: &str) -> String {
  Path::new(file_path)
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| file_path.to_string())
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// A loaded file and whether it was upgraded on the way in.
#[derive(Debug, Clone)]
pub struct Loaded {
  pub file:     AnnotationFile,
  pub migrated: bool,
}

/// Parse an annotation file, migrating it once if it is legacy.
///
/// `document` is the current text of the annotated file; legacy annotations
/// are relocated in it when supplied. A file that is not ours, or a file
/// whose envelope is broken, is rejected whole: nothing is partially
/// migrated. Inside a legacy envelope every record is migrated, however odd
/// its fields.
pub fn load(json: &str, document: Option<&str>) -> Result<Loaded> {
  let raw: Value = serde_json::from_str(json)?;
  match detect_version(&raw) {
    FileVersion::Current => {
      let file = serde_json::from_value(raw).map_err(|source| Error::InvalidShape {
        version: CURRENT_VERSION,
        source,
      })?;
      Ok(Loaded {
        file,
        migrated: false,
      })
    }
    FileVersion::Legacy => {
      let legacy: LegacyAnnotationFile =
        serde_json::from_value(raw).map_err(|source| Error::InvalidShape {
          version: LEGACY_VERSION,
          source,
        })?;
      let migrator = Migrator::new(&legacy.file_path).with_document(document);
      Ok(Loaded {
        file:     migrate_file(&legacy, &migrator),
        migrated: true,
      })
    }
    FileVersion::Unknown => Err(Error::UnknownFormat {
      tool:    raw.get("_tool").and_then(Value::as_str).map(str::to_string),
      version: raw.get("_version").and_then(Value::as_str).map(str::to_string),
    }),
  }
}

/// Upgrade a whole legacy file, appending a `migrated` history entry.
pub fn migrate_file(
  legacy: &LegacyAnnotationFile,
  migrator: &Migrator<'_>,
) -> AnnotationFile {
  let annotations: Vec<Annotation> = legacy
    .annotations
    .iter()
    .enumerate()
    .map(|(i, raw)| migrator.migrate(i, raw))
    .collect();

  let mut history: Vec<HistoryEntry> = legacy
    .history
    .iter()
    .enumerate()
    .map(|(i, h)| migrator.migrate_history(i, h))
    .collect();
  let mut entry = HistoryEntry::new(HistoryAction::Migrated, None).with_summary(
    format!(
      "migrated {} annotation(s) from {LEGACY_VERSION} to {CURRENT_VERSION}",
      annotations.len()
    ),
  );
  entry.timestamp = migrator.migrated_at();
  history.push(entry);

  tracing::info!(
    file = %legacy.file_path,
    annotations = annotations.len(),
    "migrated legacy annotation file"
  );

  AnnotationFile {
    tool: TOOL_NAME.to_string(),
    version: CURRENT_VERSION.to_string(),
    file_path: legacy.file_path.clone(),
    file_name: legacy
      .file_name
      .clone()
      .unwrap_or_else(|| file_name_of(&legacy.file_path)),
    last_modified: migrator.migrated_at(),
    annotations,
    history,
  }
}
