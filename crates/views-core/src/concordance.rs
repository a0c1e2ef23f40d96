//! Concordance windows.
//!
//! A concordance line shows one search hit (the *target*) with a little context on each
//! side, on a single line. A [`ConcordanceWindow`] describes which part of a paragraph stays
//! visible: `discard_initial` logical characters are hidden before the window and
//! `discard_final` after it, so that
//! `discard_initial + simulated_len + discard_final == paragraph length`.
//!
//! The window is a pure function of the target range, the paragraph text and
//! [`ConcordanceOptions`]; it is re-derived after every content change.

use crate::delta::ChangeSpan;
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

/// Windowing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcordanceOptions {
    /// Logical characters of context kept on each side of the target.
    pub context_chars: usize,
    /// Widen each edge of the window outward to the nearest word boundary.
    pub snap_to_words: bool,
}

impl Default for ConcordanceOptions {
    fn default() -> Self {
        Self {
            context_chars: 40,
            snap_to_words: true,
        }
    }
}

/// The visible window of a concordance paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcordanceWindow {
    target: Range<usize>,
    bold_target: bool,
    options: ConcordanceOptions,
    discard_initial: usize,
    discard_final: usize,
}

impl ConcordanceWindow {
    /// A window around `target` over `text` (the paragraph's logical text).
    pub fn new(
        target: Range<usize>,
        bold_target: bool,
        options: ConcordanceOptions,
        text: &str,
    ) -> Self {
        let mut window = Self {
            target,
            bold_target,
            options,
            discard_initial: 0,
            discard_final: 0,
        };
        window.adjust_discards(text);
        window
    }

    /// Target range in full-paragraph logical offsets.
    pub fn target(&self) -> Range<usize> {
        self.target.clone()
    }

    /// Whether the target is drawn bold.
    pub fn bold_target(&self) -> bool {
        self.bold_target
    }

    /// The windowing policy.
    pub fn options(&self) -> ConcordanceOptions {
        self.options
    }

    /// Logical characters hidden before the window.
    pub fn discard_initial(&self) -> usize {
        self.discard_initial
    }

    /// Logical characters hidden after the window.
    pub fn discard_final(&self) -> usize {
        self.discard_final
    }

    /// Visible logical range in full-paragraph offsets.
    pub fn visible(&self, full_len: usize) -> Range<usize> {
        self.discard_initial..full_len - self.discard_final
    }

    /// Re-derive the discards for `text`.
    pub fn adjust_discards(&mut self, text: &str) {
        let len = text.chars().count();
        self.target.end = self.target.end.min(len);
        self.target.start = self.target.start.min(self.target.end);

        let mut start = self.target.start.saturating_sub(self.options.context_chars);
        let mut end = self.target.end.saturating_add(self.options.context_chars).min(len);

        if self.options.snap_to_words {
            let bounds = word_boundaries(text);
            start = bounds
                .iter()
                .rev()
                .find(|&&b| b <= start)
                .copied()
                .unwrap_or(0);
            end = bounds.iter().find(|&&b| b >= end).copied().unwrap_or(len);
        }

        self.discard_initial = start;
        self.discard_final = len - end;
        tracing::trace!(
            target_start = self.target.start,
            target_end = self.target.end,
            discard_initial = self.discard_initial,
            discard_final = self.discard_final,
            "concordance window adjusted"
        );
    }

    /// Move the target through a content change. Call [`Self::adjust_discards`] afterwards.
    pub(crate) fn apply_edit(&mut self, change: ChangeSpan) {
        let start = if self.target.start < change.start {
            self.target.start
        } else if self.target.start < change.old_end() {
            change.start
        } else {
            self.target.start - change.deleted_len + change.inserted_len
        };
        let end = change.map_offset(self.target.end).max(start);
        self.target = start..end;
    }
}

/// Character offsets of word boundaries, including 0 and the length.
fn word_boundaries(text: &str) -> Vec<usize> {
    let mut bounds = Vec::new();
    let mut chars = 0;
    let mut byte = 0;
    for (idx, _) in text.split_word_bound_indices() {
        chars += text[byte..idx].chars().count();
        byte = idx;
        bounds.push(chars);
    }
    bounds.push(text.chars().count());
    if bounds.first() != Some(&0) {
        bounds.insert(0, 0);
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_identity_and_containment() {
        let text = "x".repeat(1000);
        let window = ConcordanceWindow::new(
            100..120,
            true,
            ConcordanceOptions {
                context_chars: 30,
                snap_to_words: false,
            },
            &text,
        );
        let visible = window.visible(1000);
        assert_eq!(window.discard_initial(), 70);
        assert_eq!(window.discard_final(), 850);
        assert_eq!(
            window.discard_initial() + visible.len() + window.discard_final(),
            1000
        );
        assert!(visible.start <= 100 && visible.end >= 120);
    }

    #[test]
    fn test_snaps_outward_to_words() {
        let text = "alpha beta gamma delta epsilon";
        //          0     6    11    17    23
        let window = ConcordanceWindow::new(
            11..16,
            false,
            ConcordanceOptions {
                context_chars: 3,
                snap_to_words: true,
            },
            text,
        );
        // Raw window 8..19 widens to the word starts/ends around it.
        assert_eq!(window.visible(text.len()), 6..22);
    }

    #[test]
    fn test_unbounded_context_shows_everything() {
        let text = "alpha beta gamma delta";
        for snap_to_words in [false, true] {
            let options = ConcordanceOptions {
                context_chars: usize::MAX,
                snap_to_words,
            };
            let window = ConcordanceWindow::new(6..10, true, options, text);
            assert_eq!(window.visible(text.len()), 0..text.len());
            assert_eq!(window.discard_initial(), 0);
            assert_eq!(window.discard_final(), 0);
        }
    }

    #[test]
    fn test_edit_before_target_shifts_it() {
        let mut window = ConcordanceWindow::new(
            10..15,
            false,
            ConcordanceOptions::default(),
            &"y".repeat(30),
        );
        window.apply_edit(ChangeSpan {
            start: 2,
            deleted_len: 1,
            inserted_len: 4,
        });
        assert_eq!(window.target(), 13..18);
    }

    #[test]
    fn test_word_boundaries() {
        assert_eq!(word_boundaries("ab cd"), vec![0, 2, 3, 5]);
        assert_eq!(word_boundaries(""), vec![0]);
    }
}
