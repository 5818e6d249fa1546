//! The anchoring engine: selector set + current document → character range.
//!
//! Selectors are tried in a fixed order, stopping at the first success:
//!
//! 1. editor position (line/column), verified against the quote's text;
//! 2. quote, disambiguated by context when it recurs;
//! 3. text position (absolute offsets), verified against the quote's text.
//!
//! A corrupt selector is indistinguishable from a stale one: both simply
//! fall through to the next strategy. Nothing here returns an error.

use crate::{
  annotation::Annotation,
  position::{TextRange, line_col_to_offset, total_lines},
  quote::match_quote,
  selector::{AnnotationTarget, EditorPosition, QuoteRef, SelectorKind},
};

/// A resolved anchor and the selector kind that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorOutcome {
  pub range:    TextRange,
  pub strategy: SelectorKind,
}

/// Resolve `target` against `doc`, reporting which strategy succeeded.
pub fn anchor_with_strategy(
  doc: &str,
  target: &AnnotationTarget,
) -> Option<AnchorOutcome> {
  let quote = target.quote();
  let exact = quote.map(|q| q.exact);

  let editor = target
    .editor_position()
    .and_then(|pos| resolve_editor_position(doc, &pos, exact))
    .map(|range| (range, SelectorKind::EditorPosition));

  let outcome = editor
    .or_else(|| {
      quote
        .as_ref()
        .and_then(|q| resolve_quote(doc, q))
        .map(|range| (range, SelectorKind::TextQuote))
    })
    .or_else(|| {
      target
        .text_position()
        .and_then(|range| verify(doc, range, exact))
        .map(|range| (range, SelectorKind::TextPosition))
    })
    .map(|(range, strategy)| AnchorOutcome { range, strategy });

  match &outcome {
    Some(o) => tracing::trace!(
      source = %target.source,
      strategy = %o.strategy,
      start = o.range.start,
      end = o.range.end,
      "anchored"
    ),
    None => tracing::debug!(source = %target.source, "no selector could be anchored"),
  }
  outcome
}

/// Resolve `target` against `doc`. `None` means the annotation is orphaned.
pub fn anchor(doc: &str, target: &AnnotationTarget) -> Option<TextRange> {
  anchor_with_strategy(doc, target).map(|o| o.range)
}

/// Resolve an annotation's target.
pub fn anchor_annotation(doc: &str, annotation: &Annotation) -> Option<TextRange> {
  anchor(doc, &annotation.target)
}

// ─── Strategies ──────────────────────────────────────────────────────────────

fn resolve_editor_position(
  doc: &str,
  pos: &EditorPosition,
  exact: Option<&str>,
) -> Option<TextRange> {
  let lines = total_lines(doc);
  let in_range = |line: usize| (1..=lines).contains(&line);
  if !in_range(pos.start_line) || !in_range(pos.end_line) {
    return None;
  }
  let start = line_col_to_offset(doc, pos.start_line, pos.start_char)?;
  let end = line_col_to_offset(doc, pos.end_line, pos.end_char)?;
  verify(doc, TextRange::new(start, end), exact)
}

fn resolve_quote(doc: &str, quote: &QuoteRef<'_>) -> Option<TextRange> {
  match_quote(doc, quote)
}

/// Accept `range` only if it is a non-empty slice of `doc` and, when a
/// checksum text is known, covers exactly that text.
fn verify(doc: &str, range: TextRange, exact: Option<&str>) -> Option<TextRange> {
  if range.start >= range.end || range.end > doc.len() {
    return None;
  }
  let text = range.slice(doc)?;
  match exact {
    Some(exact) if exact != text => None,
    _ => Some(range),
  }
}
