//! Text sources: the paragraph text model consumed by layout.
//!
//! A text source owns an ordered sequence of [`Run`]s. The concatenation of the run texts
//! is the paragraph's logical text; logical offset 0 is the start of run 0. A run without
//! text stands for an embedded object (a picture, a nested box) and occupies exactly one
//! logical character, [`OBJECT_REPLACEMENT`].
//!
//! [`TextSource`] is the query contract. The rendering engine only ever uses the rendered
//! coordinate space (`fetch`, `char_props_at`, `rendered_len`); everything else converts
//! between spaces. [`BaseTextSource`] is the unmapped implementation: rendered space is
//! identical to logical space, and search space omits the placeholder characters.
//!
//! All offsets are `char` counts. Offsets outside `[0, length]` are contract violations and
//! panic.

use crate::delta::{ChangeSpan, ContentChange};
use crate::error::TextSourceError;
use crate::mapping::{Association, SearchOmissions};
use crate::props::{CharProps, DEFAULT_FONT, Underline};
use crate::ts_string::{OBJECT_REPLACEMENT, TsString};
use crate::writing_system::WritingSystemFactory;
use ropey::Rope;
use std::ops::Range;
use std::sync::Arc;

/// Query contract shared by every text source.
pub trait TextSource {
    /// Logical length.
    fn len(&self) -> usize;

    /// Returns `true` if the logical text is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rendered length.
    fn rendered_len(&self) -> usize;

    /// Search length.
    fn search_len(&self) -> usize;

    /// Rendered text in `range` (rendered offsets).
    ///
    /// # Panics
    ///
    /// Panics unless `range.start <= range.end <= rendered_len()`.
    fn fetch(&self, range: Range<usize>) -> String;

    /// Search text in `range` (search offsets).
    ///
    /// # Panics
    ///
    /// Panics unless `range.start <= range.end <= search_len()`.
    fn fetch_search(&self, range: Range<usize>) -> String;

    /// Properties at rendered offset `ich_ren`, and the contiguous rendered range sharing
    /// them. The range always contains `ich_ren`.
    ///
    /// # Panics
    ///
    /// Panics unless `ich_ren < rendered_len()`.
    fn char_props_at(&self, ich_ren: usize) -> (CharProps, Range<usize>);

    /// Underline decoration at rendered offset `ich_ren`.
    fn underline_at(&self, ich_ren: usize) -> (Underline, Range<usize>) {
        let (props, range) = self.char_props_at(ich_ren);
        (props.underline(), range)
    }

    /// Logical to rendered offset.
    fn log_to_ren(&self, ich_log: usize) -> usize;

    /// Rendered to logical offset.
    fn ren_to_log(&self, ich_ren: usize) -> usize;

    /// Logical to search offset.
    fn log_to_search(&self, ich_log: usize) -> usize;

    /// Search to logical offset; `assoc` picks the side of omitted characters.
    fn search_to_log(&self, ich_search: usize, assoc: Association) -> usize;
}

/// One contiguous span of text sharing a style, or one embedded object.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    text: Option<TsString>,
    style: Arc<CharProps>,
}

impl Run {
    /// A text run.
    pub fn new(text: impl Into<TsString>, style: Arc<CharProps>) -> Self {
        Self {
            text: Some(text.into()),
            style,
        }
    }

    /// An embedded object placeholder.
    pub fn object(style: Arc<CharProps>) -> Self {
        Self { text: None, style }
    }

    /// The run's string; `None` for an embedded object.
    pub fn text(&self) -> Option<&TsString> {
        self.text.as_ref()
    }

    /// The run's base style.
    pub fn style(&self) -> &Arc<CharProps> {
        &self.style
    }

    /// Returns `true` for an embedded object.
    pub fn is_object(&self) -> bool {
        self.text.is_none()
    }

    /// Logical length (1 for an embedded object).
    pub fn len(&self) -> usize {
        self.text.as_ref().map_or(1, TsString::len)
    }

    /// Returns `true` for an empty text run.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Character at run-relative offset `ich`.
    pub fn char_at(&self, ich: usize) -> Option<char> {
        match &self.text {
            None => (ich == 0).then_some(OBJECT_REPLACEMENT),
            Some(text) => text.char_at(ich),
        }
    }

    fn push_logical_text(&self, out: &mut String) {
        match &self.text {
            None => out.push(OBJECT_REPLACEMENT),
            Some(text) => out.push_str(text.text()),
        }
    }

    fn placeholder_offsets(&self) -> Vec<usize> {
        match &self.text {
            None => vec![0],
            Some(text) => text.placeholder_offsets().collect(),
        }
    }
}

/// Unmapped text source.
#[derive(Clone)]
pub struct BaseTextSource {
    runs: Vec<Run>,
    /// `starts[i]` is the logical start of run `i`; `starts[runs.len()]` is the length.
    starts: Vec<usize>,
    text: Rope,
    omissions: SearchOmissions,
    ws_factory: Arc<dyn WritingSystemFactory>,
}

impl std::fmt::Debug for BaseTextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseTextSource")
            .field("runs", &self.runs)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl BaseTextSource {
    /// An empty source resolving writing systems through `ws_factory`.
    pub fn new(ws_factory: Arc<dyn WritingSystemFactory>) -> Self {
        Self {
            runs: Vec::new(),
            starts: vec![0],
            text: Rope::new(),
            omissions: SearchOmissions::new(),
            ws_factory,
        }
    }

    /// A source holding `runs`.
    pub fn from_runs(ws_factory: Arc<dyn WritingSystemFactory>, runs: Vec<Run>) -> Self {
        let mut source = Self::new(ws_factory);
        source.splice_runs(0..0, runs);
        source
    }

    /// The writing-system factory.
    pub fn ws_factory(&self) -> &Arc<dyn WritingSystemFactory> {
        &self.ws_factory
    }

    /// The runs in display order.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Number of runs.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Run `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= run_count()`.
    pub fn run_at(&self, index: usize) -> &Run {
        assert!(
            index < self.runs.len(),
            "run index {index} out of range (run count {})",
            self.runs.len()
        );
        &self.runs[index]
    }

    /// Logical start of run `index`; `run_start(run_count())` is the length.
    ///
    /// # Panics
    ///
    /// Panics if `index > run_count()`.
    pub fn run_start(&self, index: usize) -> usize {
        assert!(
            index <= self.runs.len(),
            "run index {index} out of range (run count {})",
            self.runs.len()
        );
        self.starts[index]
    }

    /// The run containing logical offset `ich_log` and the offset within it.
    ///
    /// A boundary between runs belongs to the following run; the end of the text belongs
    /// to the last run. Returns `None` when there are no runs.
    ///
    /// # Panics
    ///
    /// Panics if `ich_log > len()`.
    pub fn run_containing(&self, ich_log: usize) -> Option<(usize, usize)> {
        self.assert_log(ich_log);
        if self.runs.is_empty() {
            return None;
        }
        let idx = self.run_index_at(ich_log).min(self.runs.len() - 1);
        Some((idx, ich_log - self.starts[idx]))
    }

    /// Logical character at `ich_log`.
    ///
    /// # Panics
    ///
    /// Panics if `ich_log >= len()`.
    pub fn char_at(&self, ich_log: usize) -> char {
        assert!(
            ich_log < self.len(),
            "logical offset {ich_log} out of range (length {})",
            self.len()
        );
        self.text.char(ich_log)
    }

    /// Logical text in `range`.
    ///
    /// # Panics
    ///
    /// Panics unless `range.start <= range.end <= len()`.
    pub fn fetch_logical(&self, range: Range<usize>) -> String {
        self.assert_range(&range, self.len(), "logical");
        self.text.slice(range).to_string()
    }

    /// Placeholder positions omitted from search space.
    pub fn omissions(&self) -> &SearchOmissions {
        &self.omissions
    }

    /// Replace runs `runs` with `new_runs`.
    ///
    /// Offsets at or after the start of the replaced runs are invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`TextSourceError::InvalidRunRange`] if `runs` is reversed or past the end.
    pub fn replace_contents(
        &mut self,
        runs: Range<usize>,
        new_runs: Vec<Run>,
    ) -> Result<ContentChange, TextSourceError> {
        self.check_run_range(&runs)?;
        let inserted_runs = new_runs.len();
        let logical = self.splice_runs(runs.clone(), new_runs);
        Ok(ContentChange {
            runs,
            inserted_runs,
            logical,
            rendered: logical,
        })
    }

    /// Append one run.
    pub fn append_run(&mut self, run: Run) -> ContentChange {
        let n = self.runs.len();
        let logical = self.splice_runs(n..n, vec![run]);
        ContentChange {
            runs: n..n,
            inserted_runs: 1,
            logical,
            rendered: logical,
        }
    }

    pub(crate) fn check_run_range(&self, runs: &Range<usize>) -> Result<(), TextSourceError> {
        if runs.start > runs.end || runs.end > self.runs.len() {
            return Err(TextSourceError::InvalidRunRange {
                start: runs.start,
                end: runs.end,
                count: self.runs.len(),
            });
        }
        Ok(())
    }

    /// Splice without validation; `runs` must be in range.
    pub(crate) fn splice_runs(&mut self, runs: Range<usize>, new_runs: Vec<Run>) -> ChangeSpan {
        let ich_min = self.starts[runs.start];
        let old_lim = self.starts[runs.end];

        let mut text = String::new();
        let mut omitted = Vec::new();
        let mut pos = ich_min;
        for run in &new_runs {
            run.push_logical_text(&mut text);
            omitted.extend(run.placeholder_offsets().into_iter().map(|o| pos + o));
            pos += run.len();
        }

        let change = ChangeSpan {
            start: ich_min,
            deleted_len: old_lim - ich_min,
            inserted_len: pos - ich_min,
        };

        self.text.remove(ich_min..old_lim);
        self.text.insert(ich_min, &text);
        self.omissions.splice(change, omitted);

        let first = runs.start;
        self.runs.splice(runs, new_runs);
        self.starts.truncate(first + 1);
        let mut acc = self.starts[first];
        for run in &self.runs[first..] {
            acc += run.len();
            self.starts.push(acc);
        }

        debug_assert_eq!(self.text.len_chars(), self.len());
        change
    }

    /// Index of the first run whose end is after `ich_log` (`runs.len()` at the end).
    fn run_index_at(&self, ich_log: usize) -> usize {
        self.starts[1..].partition_point(|&end| end <= ich_log)
    }

    fn is_object_at(&self, ich_log: usize) -> bool {
        self.runs
            .get(self.run_index_at(ich_log))
            .is_some_and(Run::is_object)
    }

    /// Properties of the formatting segment containing `ich_log`, without merging neighbors.
    fn segment_at(&self, ich_log: usize) -> (CharProps, Range<usize>) {
        let idx = self.run_index_at(ich_log);
        let run = &self.runs[idx];
        let start = self.starts[idx];
        let mut props = CharProps::clone(&run.style);
        let range = match run.text().and_then(|text| text.run_at(ich_log - start)) {
            Some((inner, overrides)) => {
                props.apply(overrides);
                start + inner.start..start + inner.end
            }
            None => start..start + run.len(),
        };
        self.resolve_ws(&mut props);
        (props, range)
    }

    fn resolve_ws(&self, props: &mut CharProps) {
        match self.ws_factory.get(props.ws) {
            Some(ws) => {
                props.right_to_left = ws.right_to_left;
                if props.font_family == DEFAULT_FONT {
                    props.font_family.clone_from(&ws.default_font);
                }
            }
            None => {
                tracing::trace!(ws = props.ws.0, "unknown writing system, props left unresolved");
            }
        }
    }

    fn assert_log(&self, ich_log: usize) {
        assert!(
            ich_log <= self.len(),
            "logical offset {ich_log} out of range (length {})",
            self.len()
        );
    }

    fn assert_range(&self, range: &Range<usize>, len: usize, space: &str) {
        assert!(
            range.start <= range.end && range.end <= len,
            "{space} range {range:?} out of range (length {len})"
        );
    }
}

impl TextSource for BaseTextSource {
    fn len(&self) -> usize {
        self.starts[self.runs.len()]
    }

    fn rendered_len(&self) -> usize {
        self.len()
    }

    fn search_len(&self) -> usize {
        self.omissions.search_len(self.len())
    }

    fn fetch(&self, range: Range<usize>) -> String {
        self.assert_range(&range, self.len(), "rendered");
        self.text.slice(range).to_string()
    }

    fn fetch_search(&self, range: Range<usize>) -> String {
        self.assert_range(&range, self.search_len(), "search");
        if range.is_empty() {
            return String::new();
        }
        let start = self.omissions.search_to_log(range.start, Association::Next);
        let end = self.omissions.search_to_log(range.end, Association::Prev);
        self.text
            .slice(start..end)
            .chars()
            .filter(|&ch| ch != OBJECT_REPLACEMENT)
            .collect()
    }

    fn char_props_at(&self, ich_ren: usize) -> (CharProps, Range<usize>) {
        assert!(
            ich_ren < self.len(),
            "rendered offset {ich_ren} out of range (length {})",
            self.len()
        );
        let (props, mut range) = self.segment_at(ich_ren);
        if self.is_object_at(ich_ren) {
            return (props, range);
        }
        while range.start > 0 && !self.is_object_at(range.start - 1) {
            let (prev, prev_range) = self.segment_at(range.start - 1);
            if prev != props {
                break;
            }
            range.start = prev_range.start;
        }
        while range.end < self.len() && !self.is_object_at(range.end) {
            let (next, next_range) = self.segment_at(range.end);
            if next != props {
                break;
            }
            range.end = next_range.end;
        }
        (props, range)
    }

    fn log_to_ren(&self, ich_log: usize) -> usize {
        self.assert_log(ich_log);
        ich_log
    }

    fn ren_to_log(&self, ich_ren: usize) -> usize {
        self.assert_log(ich_ren);
        ich_ren
    }

    fn log_to_search(&self, ich_log: usize) -> usize {
        self.assert_log(ich_log);
        self.omissions.log_to_search(ich_log)
    }

    fn search_to_log(&self, ich_search: usize, assoc: Association) -> usize {
        assert!(
            ich_search <= self.search_len(),
            "search offset {ich_search} out of range (length {})",
            self.search_len()
        );
        self.omissions.search_to_log(ich_search, assoc)
    }
}
