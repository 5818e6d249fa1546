//! Selector types — the redundant position strategies stored on a target.
//!
//! A target normally carries one selector of each kind, built together by
//! [`construct_selectors`]. Each kind trades precision for resilience
//! differently, so the anchoring engine tries them in a fixed order and uses
//! the quote's exact text as a checksum for the positional kinds.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  position::{TextRange, context_after, context_before, offset_to_line_col},
};

/// Maximum number of characters of context captured on each side of a quote.
pub const CONTEXT_LENGTH: usize = 50;

// ─── Selector ────────────────────────────────────────────────────────────────

/// One strategy for relocating a text range after the document is edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selector {
  /// The literal text plus surrounding context at creation time.
  #[serde(rename = "TextQuoteSelector")]
  TextQuote {
    exact:  String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suffix: Option<String>,
  },

  /// Absolute byte offsets at creation time.
  #[serde(rename = "TextPositionSelector")]
  TextPosition { start: usize, end: usize },

  /// 1-based lines and 0-based columns at creation time.
  #[serde(rename = "EditorPositionSelector", rename_all = "camelCase")]
  EditorPosition {
    start_line: usize,
    end_line:   usize,
    start_char: usize,
    end_char:   usize,
  },
}

impl Selector {
  /// The payload-free kind of this selector.
  pub fn kind(&self) -> SelectorKind {
    match self {
      Self::TextQuote { .. } => SelectorKind::TextQuote,
      Self::TextPosition { .. } => SelectorKind::TextPosition,
      Self::EditorPosition { .. } => SelectorKind::EditorPosition,
    }
  }
}

/// Payload-free discriminant of [`Selector`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr,
)]
pub enum SelectorKind {
  #[strum(serialize = "TextQuoteSelector")]
  TextQuote,
  #[strum(serialize = "TextPositionSelector")]
  TextPosition,
  #[strum(serialize = "EditorPositionSelector")]
  EditorPosition,
}

// ─── Borrowed views ──────────────────────────────────────────────────────────

/// Borrowed fields of a [`Selector::TextQuote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRef<'a> {
  pub exact:  &'a str,
  pub prefix: Option<&'a str>,
  pub suffix: Option<&'a str>,
}

/// Fields of a [`Selector::EditorPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorPosition {
  pub start_line: usize,
  pub end_line:   usize,
  pub start_char: usize,
  pub end_char:   usize,
}

// ─── Target ──────────────────────────────────────────────────────────────────

/// What an annotation points at: a source file and its selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationTarget {
  pub source:    String,
  #[serde(default)]
  pub selectors: Vec<Selector>,
}

impl AnnotationTarget {
  pub fn new(source: impl Into<String>, selectors: Vec<Selector>) -> Self {
    Self {
      source: source.into(),
      selectors,
    }
  }

  /// The first quote selector, if any.
  pub fn quote(&self) -> Option<QuoteRef<'_>> {
    self.selectors.iter().find_map(|s| match s {
      Selector::TextQuote {
        exact,
        prefix,
        suffix,
      } => Some(QuoteRef {
        exact:  exact.as_str(),
        prefix: prefix.as_deref(),
        suffix: suffix.as_deref(),
      }),
      _ => None,
    })
  }

  /// The first text-position selector, as a range.
  pub fn text_position(&self) -> Option<TextRange> {
    self.selectors.iter().find_map(|s| match s {
      Selector::TextPosition { start, end } => Some(TextRange::new(*start, *end)),
      _ => None,
    })
  }

  /// The first editor-position selector.
  pub fn editor_position(&self) -> Option<EditorPosition> {
    self.selectors.iter().find_map(|s| match *s {
      Selector::EditorPosition {
        start_line,
        end_line,
        start_char,
        end_char,
      } => Some(EditorPosition {
        start_line,
        end_line,
        start_char,
        end_char,
      }),
      _ => None,
    })
  }
}

// ─── Construction ────────────────────────────────────────────────────────────

/// Build a quote selector for `range`, taking fresh context from `doc`.
pub fn quote_selector(doc: &str, range: TextRange) -> Result<Selector> {
  let exact = range.slice(doc).ok_or(Error::InvalidRange {
    start: range.start,
    end:   range.end,
    len:   doc.len(),
  })?;
  Ok(Selector::TextQuote {
    exact:  exact.to_string(),
    prefix: context_before(doc, range.start, CONTEXT_LENGTH).map(str::to_string),
    suffix: context_after(doc, range.end, CONTEXT_LENGTH).map(str::to_string),
  })
}

/// Build all three selector kinds for `range` in `doc`.
///
/// The returned order is editor position, quote, text position, which is
/// also the order the anchoring engine consults them in.
pub fn construct_selectors(doc: &str, range: TextRange) -> Result<Vec<Selector>> {
  let quote = quote_selector(doc, range)?;
  let invalid = || Error::InvalidRange {
    start: range.start,
    end:   range.end,
    len:   doc.len(),
  };
  let (start_line, start_char) =
    offset_to_line_col(doc, range.start).ok_or_else(invalid)?;
  let (end_line, end_char) =
    offset_to_line_col(doc, range.end).ok_or_else(invalid)?;

  Ok(vec![
    Selector::EditorPosition {
      start_line,
      end_line,
      start_char,
      end_char,
    },
    quote,
    Selector::TextPosition {
      start: range.start,
      end:   range.end,
    },
  ])
}

#[cfg(test)]
mod tests {
  use super::*;

  const DOC: &str = "intro\n\nThe quick fox jumps.\n\nend";

  fn range_of(doc: &str, needle: &str) -> TextRange {
    let start = doc.find(needle).unwrap();
    TextRange::new(start, start + needle.len())
  }

  #[test]
  fn builds_all_three_kinds() {
    let selectors = construct_selectors(DOC, range_of(DOC, "quick fox")).unwrap();
    let kinds: Vec<_> = selectors.iter().map(Selector::kind).collect();
    assert_eq!(kinds, vec![
      SelectorKind::EditorPosition,
      SelectorKind::TextQuote,
      SelectorKind::TextPosition,
    ]);

    let target = AnnotationTarget::new("notes.md", selectors);
    let quote = target.quote().unwrap();
    assert_eq!(quote.exact, "quick fox");
    assert_eq!(quote.prefix, Some("intro\n\nThe "));
    assert_eq!(quote.suffix, Some(" jumps.\n\nend"));
    assert_eq!(target.editor_position(), Some(EditorPosition {
      start_line: 3,
      end_line:   3,
      start_char: 4,
      end_char:   13,
    }));
    assert_eq!(target.text_position(), Some(range_of(DOC, "quick fox")));
  }

  #[test]
  fn context_is_capped_and_absent_at_boundaries() {
    let doc = format!("{}target{}", "a".repeat(80), "b".repeat(80));
    let selectors = construct_selectors(&doc, range_of(&doc, "target")).unwrap();
    let target = AnnotationTarget::new("x.md", selectors);
    let quote = target.quote().unwrap();
    assert_eq!(quote.prefix.map(str::len), Some(CONTEXT_LENGTH));
    assert_eq!(quote.suffix.map(str::len), Some(CONTEXT_LENGTH));

    let whole = TextRange::new(0, DOC.len());
    let target = AnnotationTarget::new("x.md", construct_selectors(DOC, whole).unwrap());
    let quote = target.quote().unwrap();
    assert_eq!(quote.prefix, None);
    assert_eq!(quote.suffix, None);
  }

  #[test]
  fn invalid_range_is_an_error() {
    let err = construct_selectors(DOC, TextRange::new(10, 400)).unwrap_err();
    assert!(matches!(err, Error::InvalidRange { end: 400, .. }));
  }

  #[test]
  fn wire_format_uses_type_discriminant() {
    let json = serde_json::to_value(Selector::EditorPosition {
      start_line: 1,
      end_line:   2,
      start_char: 3,
      end_char:   4,
    })
    .unwrap();
    assert_eq!(json, serde_json::json!({
      "type": "EditorPositionSelector",
      "startLine": 1, "endLine": 2, "startChar": 3, "endChar": 4,
    }));

    let quote: Selector = serde_json::from_value(serde_json::json!({
      "type": "TextQuoteSelector", "exact": "fox",
    }))
    .unwrap();
    assert_eq!(quote, Selector::TextQuote {
      exact:  "fox".into(),
      prefix: None,
      suffix: None,
    });
  }
}
