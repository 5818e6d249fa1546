//! Subcommand implementations.
//!
//! Each command reads the annotation file (migrating it in memory if it is
//! legacy) and the annotated document, then hands them to the core. Report
//! building is kept separate from I/O so it can be tested directly.

use std::{
  fmt::Write as _,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use marginalia_core::{
  Annotation, StatusUpdate, anchor_with_strategy, apply_updates, reconcile,
  reconcile::is_subject_to_reconciliation,
};
use marginalia_format::{AnnotationFile, Loaded, load};
use notify::{
  Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher as _,
};
use tokio::sync::watch;

use crate::{config::CliConfig, debounce::debounce};

// ─── I/O helpers ─────────────────────────────────────────────────────────────

fn read_document(path: &Path) -> anyhow::Result<String> {
  std::fs::read_to_string(path)
    .with_context(|| format!("reading document {}", path.display()))
}

fn read_annotations(path: &Path, document: Option<&str>) -> anyhow::Result<Loaded> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading annotation file {}", path.display()))?;
  let loaded = load(&raw, document)
    .with_context(|| format!("loading annotation file {}", path.display()))?;
  if loaded.migrated {
    tracing::info!(path = %path.display(), "upgraded legacy annotation file");
  }
  Ok(loaded)
}

fn write_annotations(path: &Path, file: &AnnotationFile) -> anyhow::Result<()> {
  let json = file.to_json_pretty()?;
  std::fs::write(path, json)
    .with_context(|| format!("writing annotation file {}", path.display()))
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// One line per annotation: where it anchors and which selector found it.
pub fn anchor_report(doc: &str, annotations: &[Annotation]) -> String {
  let mut out = String::new();
  for a in annotations {
    let location = if a.is_block_anchored() {
      "block-anchored".to_string()
    } else {
      match anchor_with_strategy(doc, &a.target) {
        Some(o) => format!("{}..{} via {}", o.range.start, o.range.end, o.strategy),
        None => "unresolved".to_string(),
      }
    };
    let _ = writeln!(out, "{}  {:<8}  {location}", a.id, a.status);
  }
  out
}

/// One line per status transition.
pub fn updates_report(updates: &[StatusUpdate]) -> String {
  let mut out = String::new();
  for u in updates {
    let _ = writeln!(out, "{}  {} -> {}", u.id, u.from, u.to);
  }
  out
}

/// Run one reconciliation pass and return the updated file with its batch.
pub fn check_pass(
  doc: &str,
  mut file: AnnotationFile,
) -> (AnnotationFile, Vec<StatusUpdate>) {
  let updates = reconcile(doc, &file.annotations);
  if !updates.is_empty() {
    let next = apply_updates(&file.annotations, &updates);
    file.replace_annotations(next);
  }
  (file, updates)
}

// ─── Commands ────────────────────────────────────────────────────────────────

pub fn migrate(
  annotations: &Path,
  doc: Option<&Path>,
  out: Option<&Path>,
) -> anyhow::Result<()> {
  let document = doc.map(read_document).transpose()?;
  let loaded = read_annotations(annotations, document.as_deref())?;
  if !loaded.migrated {
    tracing::info!("file is already current; writing it unchanged");
  }
  match out {
    Some(path) => write_annotations(path, &loaded.file)?,
    None => println!("{}", loaded.file.to_json_pretty()?),
  }
  Ok(())
}

pub fn anchor(annotations: &Path, doc: &Path) -> anyhow::Result<()> {
  let document = read_document(doc)?;
  let loaded = read_annotations(annotations, Some(&document))?;
  print!("{}", anchor_report(&document, &loaded.file.annotations));
  Ok(())
}

pub fn check(annotations: &Path, doc: &Path, write: bool) -> anyhow::Result<()> {
  let document = read_document(doc)?;
  let loaded = read_annotations(annotations, Some(&document))?;
  let (file, updates) = check_pass(&document, loaded.file);

  let inspected = file
    .annotations
    .iter()
    .filter(|a| is_subject_to_reconciliation(a))
    .count();
  tracing::info!(inspected, transitions = updates.len(), "check complete");
  print!("{}", updates_report(&updates));

  if write && (loaded.migrated || !updates.is_empty()) {
    write_annotations(annotations, &file)?;
  }
  Ok(())
}

/// Whether `event` may have changed the contents of `doc` (an absolute path).
pub fn touches_document(event: &Event, doc: &Path) -> bool {
  !event.kind.is_access() && event.paths.iter().any(|p| p == doc)
}

/// Watch the directory holding `doc` and publish its text whenever it
/// changes. Editors often save by renaming over the file, so the parent is
/// watched rather than the file itself.
fn watch_file(
  doc: &Path,
  snapshots: watch::Sender<Arc<str>>,
) -> anyhow::Result<RecommendedWatcher> {
  let dir = doc
    .parent()
    .with_context(|| format!("{} has no parent directory", doc.display()))?
    .to_path_buf();
  let target = doc.to_path_buf();

  let mut watcher = RecommendedWatcher::new(
    move |res: notify::Result<Event>| match res {
      Ok(event) if touches_document(&event, &target) => {
        match std::fs::read_to_string(&target) {
          Ok(text) => {
            snapshots.send_if_modified(|current| {
              if **current == *text {
                false
              } else {
                *current = Arc::from(text);
                true
              }
            });
          }
          Err(e) => tracing::warn!(path = %target.display(), "cannot read document: {e}"),
        }
      }
      Ok(_) => {}
      Err(e) => tracing::warn!("watcher error: {e}"),
    },
    NotifyConfig::default(),
  )
  .context("initialising file watcher")?;
  watcher
    .watch(&dir, RecursiveMode::NonRecursive)
    .with_context(|| format!("watching {}", dir.display()))?;
  Ok(watcher)
}

/// Reconcile after each burst of edits to `doc`, until interrupted.
pub async fn watch_document(
  annotations: PathBuf,
  doc: PathBuf,
  config: &CliConfig,
) -> anyhow::Result<()> {
  let doc = doc
    .canonicalize()
    .with_context(|| format!("resolving document {}", doc.display()))?;
  let initial = read_document(&doc)?;
  let loaded = read_annotations(&annotations, Some(&initial))?;
  let mut file = loaded.file;

  let (snapshots, source) = watch::channel(Arc::<str>::from(initial));
  // Mark the initial snapshot as changed so the first pass runs promptly.
  snapshots.send_modify(|_| {});
  let mut settled = debounce(config.debounce(), source);
  let watcher = watch_file(&doc, snapshots)?;

  tracing::info!(document = %doc.display(), "watching for changes");
  loop {
    tokio::select! {
      snapshot = settled.recv() => {
        let Some(snapshot) = snapshot else { break };
        let (next, updates) = check_pass(&snapshot, file);
        file = next;
        for u in &updates {
          tracing::info!(id = %u.id, from = %u.from, to = %u.to, "status changed");
        }
        if !updates.is_empty() {
          write_annotations(&annotations, &file)?;
        }
      }
      _ = tokio::signal::ctrl_c() => {
        tracing::info!("interrupted");
        break;
      }
    }
  }

  drop(watcher);
  Ok(())
}
