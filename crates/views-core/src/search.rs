//! Text search over a text source.
//!
//! Searching runs over the source's *search* coordinate space, where embedded objects and
//! hot-link placeholders are omitted, so a query can match text on both sides of a
//! picture. Matches are reported back in **logical** offsets (characters, half-open).
//!
//! It supports:
//!
//! - plain substring search (escaped and compiled into a regex)
//! - regex search
//! - optional whole-word matching

use crate::mapping::Association;
use crate::source::TextSource;
use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words (alphanumeric and `_`).
    pub whole_word: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// A match, as a half-open logical character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl SearchMatch {
    /// Returns the length of the match in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the match is empty.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The provided regex pattern failed to compile.
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

#[derive(Debug)]
struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        let clamped = char_offset.min(self.char_count());
        self.char_to_byte
            .get(clamped)
            .cloned()
            .unwrap_or(self.text_len)
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }

    fn char_at(&self, text: &str, char_offset: usize) -> Option<char> {
        if char_offset >= self.char_count() {
            return None;
        }
        let start = self.char_to_byte[char_offset];
        let end = self.char_to_byte[char_offset + 1];
        text.get(start..end)?.chars().next()
    }
}

fn compile_search_regex(query: &str, options: SearchOptions) -> Result<Regex, SearchError> {
    let pattern = if options.regex {
        query.to_string()
    } else {
        regex::escape(query)
    };

    Ok(RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .multi_line(true)
        .build()?)
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn is_whole_word(text: &str, index: &CharIndex, m: SearchMatch) -> bool {
    if m.is_empty() {
        return false;
    }

    let before = if m.start == 0 {
        None
    } else {
        index.char_at(text, m.start - 1)
    };
    let after = index.char_at(text, m.end);

    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Search text of a source plus the regex compiled for one query.
struct Searcher<'a> {
    source: &'a dyn TextSource,
    text: String,
    index: CharIndex,
    re: Regex,
    options: SearchOptions,
}

impl<'a> Searcher<'a> {
    fn new(
        source: &'a dyn TextSource,
        query: &str,
        options: SearchOptions,
    ) -> Result<Self, SearchError> {
        let re = compile_search_regex(query, options)?;
        let text = source.fetch_search(0..source.search_len());
        let index = CharIndex::new(&text);
        Ok(Self {
            source,
            text,
            index,
            re,
            options,
        })
    }

    /// Non-empty, whole-word-filtered matches in search offsets.
    fn matches(&self, limit_byte: usize) -> impl Iterator<Item = SearchMatch> + '_ {
        self.re
            .find_iter(&self.text[..limit_byte])
            .map(move |m| SearchMatch {
                start: self.index.byte_to_char(m.start()),
                end: self.index.byte_to_char(m.end()),
            })
            .filter(|m| !m.is_empty())
            .filter(move |m| !self.options.whole_word || is_whole_word(&self.text, &self.index, *m))
    }

    fn to_logical(&self, m: SearchMatch) -> SearchMatch {
        SearchMatch {
            start: self.source.search_to_log(m.start, Association::Next),
            end: self.source.search_to_log(m.end, Association::Prev),
        }
    }
}

/// Find the next occurrence of `query` in `source`, searching forward from logical offset
/// `from_log`.
///
/// Returns `Ok(None)` if no match is found (or if `query` is empty).
pub fn find_next(
    source: &dyn TextSource,
    query: &str,
    options: SearchOptions,
    from_log: usize,
) -> Result<Option<SearchMatch>, SearchError> {
    if query.is_empty() {
        return Ok(None);
    }

    let searcher = Searcher::new(source, query, options)?;
    let from = source.log_to_search(from_log.min(source.len()));

    let mut start_char = from;
    loop {
        let start_byte = searcher.index.char_to_byte(start_char);
        let Some(m) = searcher.re.find_at(&searcher.text, start_byte) else {
            return Ok(None);
        };

        let candidate = SearchMatch {
            start: searcher.index.byte_to_char(m.start()),
            end: searcher.index.byte_to_char(m.end()),
        };

        if candidate.is_empty() {
            if candidate.end >= searcher.index.char_count() {
                return Ok(None);
            }
            start_char = candidate.end + 1;
            continue;
        }

        if options.whole_word && !is_whole_word(&searcher.text, &searcher.index, candidate) {
            start_char = candidate.end;
            continue;
        }

        return Ok(Some(searcher.to_logical(candidate)));
    }
}

/// Find the last occurrence of `query` ending at or before logical offset `from_log`.
///
/// Returns `Ok(None)` if no match is found (or if `query` is empty).
pub fn find_prev(
    source: &dyn TextSource,
    query: &str,
    options: SearchOptions,
    from_log: usize,
) -> Result<Option<SearchMatch>, SearchError> {
    if query.is_empty() {
        return Ok(None);
    }

    let searcher = Searcher::new(source, query, options)?;
    let limit = source.log_to_search(from_log.min(source.len()));
    let limit_byte = searcher.index.char_to_byte(limit);
    let last = searcher.matches(limit_byte).last();
    Ok(last.map(|m| searcher.to_logical(m)))
}

/// Find all occurrences of `query` in `source`.
///
/// Returns an empty list if `query` is empty.
pub fn find_all(
    source: &dyn TextSource,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<SearchMatch>, SearchError> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let searcher = Searcher::new(source, query, options)?;
    let matches = searcher
        .matches(searcher.text.len())
        .map(|m| searcher.to_logical(m))
        .collect::<Vec<_>>();
    tracing::trace!(query, count = matches.len(), "search finished");
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::CharProps;
    use crate::source::{BaseTextSource, Run};
    use crate::writing_system::WsRegistry;
    use std::sync::Arc;

    #[test]
    fn test_char_index_round_trip() {
        let index = CharIndex::new("aé你b");
        assert_eq!(index.char_count(), 4);
        assert_eq!(index.char_to_byte(2), 3);
        assert_eq!(index.byte_to_char(6), 3);
        assert_eq!(index.char_at("aé你b", 2), Some('你'));
    }

    #[test]
    fn test_match_spans_object() {
        let style = Arc::new(CharProps::default());
        let src = BaseTextSource::from_runs(
            Arc::new(WsRegistry::new()),
            vec![
                Run::new("ab", style.clone()),
                Run::object(style.clone()),
                Run::new("cd", style),
            ],
        );
        let matches = find_all(&src, "bc", SearchOptions::default()).unwrap();
        assert_eq!(matches, vec![SearchMatch { start: 1, end: 4 }]);
    }

    #[test]
    fn test_invalid_regex() {
        let src = BaseTextSource::new(Arc::new(WsRegistry::new()));
        let options = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        assert!(matches!(
            find_all(&src, "(", options),
            Err(SearchError::InvalidRegex(_))
        ));
    }
}
