//! Quote matching with context scoring.
//!
//! A quote's exact text may occur more than once. Each candidate is scored
//! by how well the text around it agrees with the stored prefix and suffix;
//! the best score wins and ties go to the earliest candidate.

use crate::{
  position::{TextRange, context_after, context_before},
  selector::QuoteRef,
};

// ─── Occurrences ─────────────────────────────────────────────────────────────

/// Iterator over the byte offsets of every occurrence of a needle,
/// including overlapping ones, in ascending order.
pub struct Occurrences<'a> {
  haystack: &'a str,
  needle:   &'a str,
  from:     usize,
}

impl Iterator for Occurrences<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    if self.needle.is_empty() {
      return None;
    }
    let rest = self.haystack.get(self.from..)?;
    let at = self.from + rest.find(self.needle)?;
    // Step one character past the match start so overlaps are found.
    let step = self.haystack[at..].chars().next().map_or(1, char::len_utf8);
    self.from = at + step;
    Some(at)
  }
}

/// Every occurrence of `exact` in `doc`. An empty needle matches nowhere.
pub fn occurrences<'a>(doc: &'a str, exact: &'a str) -> Occurrences<'a> {
  Occurrences {
    haystack: doc,
    needle:   exact,
    from:     0,
  }
}

/// Collected form of [`occurrences`].
pub fn find_occurrences(doc: &str, exact: &str) -> Vec<usize> {
  occurrences(doc, exact).collect()
}

// ─── Scoring ─────────────────────────────────────────────────────────────────

/// Positional character agreement: the number of aligned positions where
/// the characters match, over the expected length (at least one).
fn ratio<A, E>(actual: A, expected: E, expected_len: usize) -> f64
where
  A: Iterator<Item = char>,
  E: Iterator<Item = char>,
{
  let matches = actual.zip(expected).filter(|(a, e)| a == e).count();
  matches as f64 / expected_len.max(1) as f64
}

/// Similarity of `actual` to `expected`, aligned at their first characters.
pub fn similarity(actual: &str, expected: &str) -> f64 {
  ratio(actual.chars(), expected.chars(), expected.chars().count())
}

/// Similarity aligned at their last characters. Used for prefixes, where
/// the characters adjacent to the quote are the ones that should line up.
pub fn similarity_from_end(actual: &str, expected: &str) -> f64 {
  ratio(
    actual.chars().rev(),
    expected.chars().rev(),
    expected.chars().count(),
  )
}

/// Combined context score of the occurrence of `quote.exact` at `at`.
///
/// An absent or empty stored context contributes nothing.
pub fn context_score(doc: &str, at: usize, quote: &QuoteRef<'_>) -> f64 {
  let prefix_score = match quote.prefix {
    Some(expected) if !expected.is_empty() => {
      let width = expected.chars().count();
      let actual = context_before(doc, at, width).unwrap_or_default();
      similarity_from_end(actual, expected)
    }
    _ => 0.0,
  };
  let suffix_score = match quote.suffix {
    Some(expected) if !expected.is_empty() => {
      let width = expected.chars().count();
      let actual =
        context_after(doc, at + quote.exact.len(), width).unwrap_or_default();
      similarity(actual, expected)
    }
    _ => 0.0,
  };
  prefix_score + suffix_score
}

// ─── Matching ────────────────────────────────────────────────────────────────

/// Locate `quote` in `doc`.
///
/// No occurrence → `None`. One occurrence → that one, unscored. Several →
/// the highest context score, earliest on ties.
pub fn match_quote(doc: &str, quote: &QuoteRef<'_>) -> Option<TextRange> {
  let mut found = occurrences(doc, quote.exact);
  let first = found.next()?;
  let Some(second) = found.next() else {
    return Some(TextRange::new(first, first + quote.exact.len()));
  };

  let mut best = first;
  let mut best_score = context_score(doc, first, quote);
  for at in std::iter::once(second).chain(found) {
    let score = context_score(doc, at, quote);
    tracing::trace!(at, score, "scored quote candidate");
    if score > best_score {
      best = at;
      best_score = score;
    }
  }
  Some(TextRange::new(best, best + quote.exact.len()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn quote<'a>(
    exact: &'a str,
    prefix: Option<&'a str>,
    suffix: Option<&'a str>,
  ) -> QuoteRef<'a> {
    QuoteRef {
      exact,
      prefix,
      suffix,
    }
  }

  #[test]
  fn finds_overlapping_occurrences() {
    assert_eq!(find_occurrences("aaaa", "aa"), vec![0, 1, 2]);
    assert_eq!(find_occurrences("x é x é", "é"), vec![2, 7]);
    assert!(find_occurrences("abc", "").is_empty());
    assert!(find_occurrences("abc", "zz").is_empty());
  }

  #[test]
  fn similarity_is_positional() {
    assert_eq!(similarity("abc", "abc"), 1.0);
    assert_eq!(similarity("abx", "abc"), 2.0 / 3.0);
    assert_eq!(similarity("", "abcd"), 0.0);
    assert_eq!(similarity("", ""), 0.0);
    assert_eq!(similarity_from_end("bc", "abc"), 2.0 / 3.0);
  }

  #[test]
  fn unique_occurrence_ignores_context() {
    let doc = "one fox here";
    let q = quote("fox", Some("nothing alike"), Some("at all"));
    assert_eq!(match_quote(doc, &q), Some(TextRange::new(4, 7)));
  }

  #[test]
  fn context_disambiguates_repeated_text() {
    let doc = "red fox runs. blue fox sleeps.";
    let q = quote("fox", Some("blue "), Some(" sleeps"));
    assert_eq!(match_quote(doc, &q), Some(TextRange::new(19, 22)));

    let q = quote("fox", Some("red "), None);
    assert_eq!(match_quote(doc, &q), Some(TextRange::new(4, 7)));
  }

  #[test]
  fn short_prefix_at_document_start_lines_up_with_the_quote() {
    // Only three characters precede the first fox; they match the tail of
    // the stored prefix, not its head.
    let doc = "ab fox, then cd fox";
    let q = quote("fox", Some("zzab "), None);
    assert_eq!(context_score(doc, 3, &q), 3.0 / 5.0);
    assert_eq!(context_score(doc, 16, &q), 1.0 / 5.0);
    assert_eq!(match_quote(doc, &q), Some(TextRange::new(3, 6)));
  }

  #[test]
  fn ties_resolve_to_first_occurrence() {
    let doc = "fox and fox";
    assert_eq!(
      match_quote(doc, &quote("fox", None, None)),
      Some(TextRange::new(0, 3))
    );
    // Empty context is treated as no context.
    assert_eq!(
      match_quote(doc, &quote("fox", Some(""), Some(""))),
      Some(TextRange::new(0, 3))
    );
  }

  #[test]
  fn missing_quote_is_none() {
    assert_eq!(match_quote("abc", &quote("fox", None, None)), None);
  }
}
