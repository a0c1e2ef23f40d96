//! Immutable rich-text strings.
//!
//! A [`TsString`] is text plus a partition of its characters into runs, each carrying
//! [`TextProps`] overrides. All offsets are in Unicode scalar values (`char`), never bytes.

use crate::props::TextProps;
use std::ops::Range;
use std::sync::Arc;

/// The object replacement character, standing in for an embedded object or hot link.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// One internal run of a [`TsString`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsRun {
    /// Exclusive end character offset within the string.
    pub lim: usize,
    /// Formatting overrides for the run.
    pub props: TextProps,
}

#[derive(Debug, PartialEq, Eq)]
struct TsStringInner {
    text: String,
    char_len: usize,
    runs: Vec<TsRun>,
}

/// An immutable string with character-level formatting runs.
///
/// Cloning is cheap: the text and runs are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsString {
    inner: Arc<TsStringInner>,
}

impl TsString {
    /// A string with a single run and no overrides.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::with_props(text, TextProps::default())
    }

    /// A string with a single run carrying `props`.
    pub fn with_props(text: impl Into<String>, props: TextProps) -> Self {
        let text: String = text.into();
        let mut builder = TsStringBuilder::new();
        builder.push(&text, props);
        builder.build()
    }

    /// Start building a multi-run string.
    pub fn builder() -> TsStringBuilder {
        TsStringBuilder::new()
    }

    /// The full text.
    pub fn text(&self) -> &str {
        &self.inner.text
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.inner.char_len
    }

    /// Returns `true` if the string has no characters.
    pub fn is_empty(&self) -> bool {
        self.inner.char_len == 0
    }

    /// The internal runs. An empty string has no runs.
    pub fn runs(&self) -> &[TsRun] {
        &self.inner.runs
    }

    /// The run containing character offset `ich` and its character range.
    ///
    /// Returns `None` if `ich >= len()`.
    pub fn run_at(&self, ich: usize) -> Option<(Range<usize>, &TextProps)> {
        let runs = &self.inner.runs;
        let idx = runs.partition_point(|run| run.lim <= ich);
        let run = runs.get(idx)?;
        let start = if idx == 0 { 0 } else { runs[idx - 1].lim };
        Some((start..run.lim, &run.props))
    }

    /// Substring by character range.
    pub fn slice(&self, range: Range<usize>) -> &str {
        slice_chars(&self.inner.text, range)
    }

    /// Character offsets of every [`OBJECT_REPLACEMENT`] character.
    pub fn placeholder_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.inner
            .text
            .chars()
            .enumerate()
            .filter(|(_, ch)| *ch == OBJECT_REPLACEMENT)
            .map(|(i, _)| i)
    }

    /// Character at offset `ich`.
    pub fn char_at(&self, ich: usize) -> Option<char> {
        self.inner.text.chars().nth(ich)
    }
}

impl From<&str> for TsString {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

/// Incremental builder for [`TsString`].
#[derive(Debug, Default)]
pub struct TsStringBuilder {
    text: String,
    char_len: usize,
    runs: Vec<TsRun>,
}

impl TsStringBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` formatted with `props`.
    ///
    /// Appending empty text is a no-op; appending text with the same props as the previous
    /// run extends that run.
    pub fn push(&mut self, text: &str, props: TextProps) -> &mut Self {
        let count = text.chars().count();
        if count == 0 {
            return self;
        }
        self.text.push_str(text);
        self.char_len += count;
        match self.runs.last_mut() {
            Some(last) if last.props == props => last.lim = self.char_len,
            _ => self.runs.push(TsRun {
                lim: self.char_len,
                props,
            }),
        }
        self
    }

    /// Finish the string.
    pub fn build(&mut self) -> TsString {
        TsString {
            inner: Arc::new(TsStringInner {
                text: std::mem::take(&mut self.text),
                char_len: std::mem::take(&mut self.char_len),
                runs: std::mem::take(&mut self.runs),
            }),
        }
    }
}

/// Slice `text` by a character range. Out-of-range ends are clamped to the text.
pub(crate) fn slice_chars(text: &str, range: Range<usize>) -> &str {
    let mut indices = text.char_indices().map(|(b, _)| b).chain(Some(text.len()));
    let start = indices.nth(range.start).unwrap_or(text.len());
    let end = if range.end <= range.start {
        start
    } else {
        indices
            .nth(range.end - range.start - 1)
            .unwrap_or(text.len())
    };
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_merges_equal_runs() {
        let bold = TextProps::new().with_bold(true);
        let s = TsString::builder()
            .push("ab", TextProps::new())
            .push("c", TextProps::new())
            .push("d👋", bold.clone())
            .build();

        assert_eq!(s.len(), 5);
        assert_eq!(s.runs().len(), 2);
        assert_eq!(s.run_at(2).map(|(r, _)| r), Some(0..3));
        assert_eq!(s.run_at(4), Some((3..5, &bold)));
        assert_eq!(s.run_at(5), None);
    }

    #[test]
    fn test_slice_chars_multibyte() {
        let s = TsString::plain("a👋b你");
        assert_eq!(s.slice(1..3), "👋b");
        assert_eq!(s.slice(3..4), "你");
        assert_eq!(s.slice(2..2), "");
        assert_eq!(s.slice(0..4), "a👋b你");
    }

    #[test]
    fn test_placeholder_offsets() {
        let s = TsString::plain("x\u{FFFC}y\u{FFFC}");
        assert_eq!(s.placeholder_offsets().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(s.char_at(1), Some(OBJECT_REPLACEMENT));
    }
}
