//! Line breaking over a text source.
//!
//! The rendering engine sees a paragraph only through the rendered-space part of
//! [`TextSource`]: `fetch`, `char_props_at` and `rendered_len`. Layout proceeds one
//! [`Segment`] at a time: a stretch of rendered text with uniform properties that fits the
//! remaining width of the current line. A line is a sequence of segments.
//!
//! Segments never cross a `char_props_at` range. Breaking inside a range happens at a hard
//! break (`'\n'`, U+2028), at a word boundary ([`WrapMode::Word`]), or at a grapheme
//! boundary ([`WrapMode::Char`], and as a fallback when a single word is wider than a whole
//! line). Widths are measured by a [`RenderEngine`].
//!
//! Measuring is the expensive part of layout, so [`lay_out_lines`] goes through a
//! [`SegmentCache`], which is invalidated from the [`ContentChange`] of every edit.

use crate::delta::ContentChange;
use crate::props::{CharProps, WsId};
use crate::source::TextSource;
use crate::ts_string::slice_chars;
use std::collections::HashMap;
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Default tab width (in cells).
pub const DEFAULT_TAB_WIDTH: u32 = 4;

/// Line separator; ends a line like `'\n'`.
pub const LINE_SEPARATOR: char = '\u{2028}';

/// Measures rendered text.
pub trait RenderEngine {
    /// Advance width of `text`, drawn entirely with `props`.
    fn advance(&self, text: &str, props: &CharProps) -> u32;
}

/// Fixed-pitch engine: every character advances by its UAX #11 cell count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEngine {
    /// Width of one cell in layout units.
    pub cell_width: u32,
    /// Cells advanced by `'\t'`.
    pub tab_width: u32,
}

impl CellEngine {
    /// An engine with `cell_width` units per cell.
    pub fn new(cell_width: u32) -> Self {
        Self {
            cell_width,
            tab_width: DEFAULT_TAB_WIDTH,
        }
    }

    /// Cells occupied by `ch`.
    ///
    /// - 1: narrow characters (ASCII, placeholders, control characters)
    /// - 2: wide characters (CJK, fullwidth)
    /// - 0: combining marks and hard breaks
    pub fn cells(&self, ch: char) -> u32 {
        match ch {
            '\t' => self.tab_width,
            '\n' | '\r' | LINE_SEPARATOR => 0,
            _ => UnicodeWidthChar::width(ch).unwrap_or(1) as u32,
        }
    }
}

impl Default for CellEngine {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RenderEngine for CellEngine {
    fn advance(&self, text: &str, _props: &CharProps) -> u32 {
        text.chars().map(|ch| self.cells(ch)).sum::<u32>() * self.cell_width
    }
}

/// Soft wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// No soft wrapping; only hard breaks end a line.
    None,
    /// Wrap at grapheme boundaries.
    Char,
    /// Prefer wrapping at word boundaries, falling back to grapheme wrap for words wider
    /// than a line.
    #[default]
    Word,
}

/// Line-breaking configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakOptions {
    /// Available line width in layout units.
    pub max_width: u32,
    /// Wrapping mode.
    pub wrap: WrapMode,
}

impl Default for BreakOptions {
    fn default() -> Self {
        Self {
            max_width: 80,
            wrap: WrapMode::Word,
        }
    }
}

/// Why a segment ends where it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEnd {
    /// Properties change; the line may continue with another segment.
    RunBoundary,
    /// Soft break at a word boundary.
    WordBreak,
    /// Soft break at a grapheme boundary.
    CharBreak,
    /// After a `'\n'` or U+2028 (included in the segment).
    HardBreak,
    /// At the requested limit.
    EndOfText,
}

impl SegmentEnd {
    /// Returns `true` if the line must end after this segment.
    pub fn ends_line(self) -> bool {
        !matches!(self, SegmentEnd::RunBoundary)
    }
}

/// A measured stretch of rendered text with uniform properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Rendered range.
    pub range: Range<usize>,
    /// Advance width.
    pub width: u32,
    /// Writing system.
    pub ws: WsId,
    /// Direction.
    pub right_to_left: bool,
    /// Reason the segment ends.
    pub end: SegmentEnd,
}

/// One laid-out line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    /// Segments, in order.
    pub segments: Vec<Segment>,
    /// Rendered range covered.
    pub range: Range<usize>,
    /// Sum of segment widths.
    pub width: u32,
}

impl Line {
    fn starting_at(ich_ren: usize) -> Self {
        Self {
            segments: Vec::new(),
            range: ich_ren..ich_ren,
            width: 0,
        }
    }

    fn push(&mut self, segment: Segment) {
        self.range.end = segment.range.end;
        self.width += segment.width;
        self.segments.push(segment);
    }
}

fn is_hard_break(ch: char) -> bool {
    ch == '\n' || ch == LINE_SEPARATOR
}

/// Find the next segment starting at rendered offset `start`.
///
/// `avail` is the width left on the current line and `line_start` tells whether the segment
/// would be the first of its line. Returns `None` when `start >= lim`, or when nothing fits
/// and the segment is not the first of its line (the line should end before `start`). The
/// first segment of a line always holds at least one grapheme.
pub fn find_break_point(
    source: &dyn TextSource,
    engine: &dyn RenderEngine,
    start: usize,
    lim: usize,
    avail: u32,
    wrap: WrapMode,
    line_start: bool,
) -> Option<Segment> {
    if start >= lim {
        return None;
    }
    let (props, run) = source.char_props_at(start);
    let mut seg_lim = run.end.min(lim);
    let fetched = source.fetch(start..seg_lim);

    let hard = fetched
        .chars()
        .position(is_hard_break)
        .map(|ich| start + ich + 1);
    if let Some(hard_lim) = hard {
        seg_lim = hard_lim;
    }
    let text = slice_chars(&fetched, 0..seg_lim - start);

    // (chars from start, width) at every grapheme boundary.
    let mut stops = vec![(0usize, 0u32)];
    let (mut chars, mut width) = (0usize, 0u32);
    for grapheme in text.graphemes(true) {
        chars += grapheme.chars().count();
        width += engine.advance(grapheme, &props);
        stops.push((chars, width));
    }

    let make = |len: usize, width: u32, end: SegmentEnd| Segment {
        range: start..start + len,
        width,
        ws: props.ws,
        right_to_left: props.right_to_left,
        end,
    };

    if wrap == WrapMode::None || width <= avail {
        let end = if hard.is_some() {
            SegmentEnd::HardBreak
        } else if seg_lim == lim {
            SegmentEnd::EndOfText
        } else {
            SegmentEnd::RunBoundary
        };
        return Some(make(chars, width, end));
    }

    if wrap == WrapMode::Word {
        let mut best = None;
        let mut char_pos = 0;
        let mut byte_pos = 0;
        for (idx, _) in text.split_word_bound_indices() {
            char_pos += text[byte_pos..idx].chars().count();
            byte_pos = idx;
            if char_pos == 0 {
                continue;
            }
            match stops.binary_search_by_key(&char_pos, |s| s.0) {
                Ok(i) if stops[i].1 <= avail => best = Some(stops[i]),
                Ok(_) => break,
                Err(_) => {}
            }
        }
        if let Some((len, w)) = best {
            return Some(make(len, w, SegmentEnd::WordBreak));
        }
        if !line_start {
            return None;
        }
    }

    let fit = stops
        .iter()
        .rev()
        .find(|(len, w)| *len > 0 && *w <= avail)
        .copied();
    match fit {
        Some((len, w)) => Some(make(len, w, SegmentEnd::CharBreak)),
        None if line_start => stops
            .get(1)
            .map(|&(len, w)| make(len, w, SegmentEnd::CharBreak)),
        None => None,
    }
}

/// A cached lookup and the rendered offset up to which its text was examined.
#[derive(Debug, Clone)]
struct CacheEntry {
    segment: Option<Segment>,
    depends_to: usize,
}

/// Cache of measured segments keyed by `(start, avail, line_start)`.
///
/// Entries are valid for one source and one set of [`BreakOptions`]; changing the options
/// clears the cache.
#[derive(Debug, Clone, Default)]
pub struct SegmentCache {
    options: Option<BreakOptions>,
    entries: HashMap<(usize, u32, bool), CacheEntry>,
    hits: u64,
    misses: u64,
}

impl SegmentCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached lookups.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to measure.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry whose measured text reaches the changed region.
    ///
    /// A segment depends on the whole property range it starts in, not just on its own
    /// characters: a soft break is chosen by looking at what follows it.
    pub fn invalidate(&mut self, change: &ContentChange) {
        let edit = change.rendered.start;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.depends_to < edit);
        tracing::trace!(
            edit,
            dropped = before - self.entries.len(),
            "segment cache invalidated"
        );
    }

    fn prepare(&mut self, options: BreakOptions) {
        if self.options != Some(options) {
            self.entries.clear();
            self.options = Some(options);
        }
    }

    fn get_or_measure(
        &mut self,
        key: (usize, u32, bool),
        measure: impl FnOnce() -> (Option<Segment>, usize),
    ) -> Option<Segment> {
        if let Some(entry) = self.entries.get(&key) {
            self.hits += 1;
            return entry.segment.clone();
        }
        self.misses += 1;
        let (segment, depends_to) = measure();
        self.entries.insert(
            key,
            CacheEntry {
                segment: segment.clone(),
                depends_to,
            },
        );
        segment
    }
}

/// Break the whole of `source` into lines.
///
/// An empty source yields one empty line.
pub fn lay_out_lines(
    source: &dyn TextSource,
    engine: &dyn RenderEngine,
    options: BreakOptions,
    cache: &mut SegmentCache,
) -> Vec<Line> {
    cache.prepare(options);
    let len = source.rendered_len();
    let max_width = match options.wrap {
        WrapMode::None => u32::MAX,
        _ => options.max_width,
    };

    let mut lines = Vec::new();
    let mut pos = 0;
    while pos < len {
        let mut line = Line::starting_at(pos);
        let mut avail = max_width;
        while pos < len {
            let line_start = line.segments.is_empty();
            let key = (pos, avail, line_start);
            let segment = cache.get_or_measure(key, || {
                let depends_to = source.char_props_at(pos).1.end.min(len);
                let segment =
                    find_break_point(source, engine, pos, len, avail, options.wrap, line_start);
                (segment, depends_to)
            });
            let Some(segment) = segment else {
                break;
            };
            pos = segment.range.end;
            avail = avail.saturating_sub(segment.width);
            let ends_line = segment.end.ends_line();
            line.push(segment);
            if ends_line {
                break;
            }
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(Line::starting_at(0));
    }
    lines
}
