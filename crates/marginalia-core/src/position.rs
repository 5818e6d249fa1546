//! Offsets, line/column coordinates, and context slicing over document text.
//!
//! Every offset in this crate is a UTF-8 byte offset into the document
//! `&str`. Functions here never panic on a stale or hostile offset: anything
//! that falls outside the document or inside a multi-byte character yields
//! `None`.

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
  pub start: usize,
  pub end:   usize,
}

impl TextRange {
  pub fn new(start: usize, end: usize) -> Self { Self { start, end } }

  pub fn len(&self) -> usize { self.end.saturating_sub(self.start) }

  pub fn is_empty(&self) -> bool { self.end <= self.start }

  /// The text this range covers in `doc`, if it denotes a valid slice.
  pub fn slice<'a>(&self, doc: &'a str) -> Option<&'a str> {
    if self.start > self.end {
      return None;
    }
    doc.get(self.start..self.end)
  }
}

/// Number of `\n`-separated lines. An empty document has one empty line.
pub fn total_lines(doc: &str) -> usize { doc.split('\n').count() }

/// Convert a 1-based line and 0-based column into a byte offset.
///
/// The offset is the summed length of every preceding line plus one per
/// newline, plus `col`. The column is not clamped to its line, so the result
/// may run past the end of the line (or the document); callers validate.
pub fn line_col_to_offset(doc: &str, line: usize, col: usize) -> Option<usize> {
  if line == 0 || line > total_lines(doc) {
    return None;
  }
  let preceding: usize =
    doc.split('\n').take(line - 1).map(|l| l.len() + 1).sum();
  preceding.checked_add(col)
}

/// Convert a byte offset into a 1-based line and 0-based column.
pub fn offset_to_line_col(doc: &str, offset: usize) -> Option<(usize, usize)> {
  let head = doc.get(..offset)?;
  let line = 1 + head.bytes().filter(|&b| b == b'\n').count();
  let col = match head.rfind('\n') {
    Some(nl) => offset - (nl + 1),
    None => offset,
  };
  Some((line, col))
}

/// Up to `max_chars` characters immediately before `start`.
///
/// `None` when `start` is the start of the document (there is no context,
/// as opposed to an empty one) or not a character boundary.
pub fn context_before(doc: &str, start: usize, max_chars: usize) -> Option<&str> {
  let head = doc.get(..start)?;
  if head.is_empty() {
    return None;
  }
  if max_chars == 0 {
    return Some("");
  }
  let from = head
    .char_indices()
    .rev()
    .nth(max_chars - 1)
    .map_or(0, |(i, _)| i);
  Some(&head[from..])
}

/// Up to `max_chars` characters immediately after `end`.
///
/// `None` when `end` is the end of the document or not a character boundary.
pub fn context_after(doc: &str, end: usize, max_chars: usize) -> Option<&str> {
  let tail = doc.get(end..)?;
  if tail.is_empty() {
    return None;
  }
  let to = tail
    .char_indices()
    .nth(max_chars)
    .map_or(tail.len(), |(i, _)| i);
  Some(&tail[..to])
}
