//! Temporary property override layers.
//!
//! An override layer changes how characters are drawn (color, underline, ...) without
//! touching the text or any offset. Spell checking paints squiggles through a
//! [`OverrideKind::Spelling`] layer; an input method paints composition attributes through
//! an [`OverrideKind::InputMethod`] layer. Both behave the same; the kind only identifies
//! the layer when several are stacked on one paragraph.
//!
//! Ranges are logical offsets into the full paragraph.

use crate::delta::ChangeSpan;
use crate::intervals::IntervalTree;
use crate::props::{CharProps, TextProps};
use std::ops::Range;

/// Identity of an override layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideKind {
    /// Spelling-error decorations.
    Spelling,
    /// Input-method composition attributes.
    InputMethod,
}

/// Overrides for one logical range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropOverride {
    /// Logical range (half-open).
    pub range: Range<usize>,
    /// Properties to apply.
    pub props: TextProps,
}

impl PropOverride {
    /// Create an override.
    pub fn new(range: Range<usize>, props: TextProps) -> Self {
        Self { range, props }
    }
}

/// One stacked override table. Where entries overlap, later entries win.
#[derive(Debug, Clone)]
pub struct OverrideLayer {
    kind: OverrideKind,
    entries: IntervalTree<TextProps>,
}

impl OverrideLayer {
    /// Build a layer from `entries`. Empty ranges are dropped.
    pub fn new(kind: OverrideKind, entries: Vec<PropOverride>) -> Self {
        let mut tree = IntervalTree::new();
        for entry in entries {
            tree.insert(entry.range, entry.props);
        }
        Self {
            kind,
            entries: tree,
        }
    }

    /// Layer identity.
    pub fn kind(&self) -> OverrideKind {
        self.kind
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the layer has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries in start order.
    pub fn entries(&self) -> Vec<PropOverride> {
        self.entries
            .iter()
            .map(|i| PropOverride::new(i.range(), i.value.clone()))
            .collect()
    }

    /// The smallest range covering every entry.
    pub fn extent(&self) -> Option<Range<usize>> {
        let mut ranges = self.entries.iter().map(|i| i.range());
        let first = ranges.next()?;
        Some(ranges.fold(first, |acc, r| acc.start.min(r.start)..acc.end.max(r.end)))
    }

    /// Apply every entry covering `ich_log`, oldest first.
    pub fn apply_at(&self, ich_log: usize, props: &mut CharProps) {
        let mut hits = self.entries.query_point(ich_log);
        hits.sort_by_key(|i| i.seq);
        for hit in hits {
            props.apply(&hit.value);
        }
    }

    /// Narrow `bounds` (which must contain `ich_log`) so that no entry boundary falls
    /// strictly inside it.
    pub fn clip(&self, ich_log: usize, bounds: Range<usize>) -> Range<usize> {
        let mut out = bounds.clone();
        for entry in self.entries.query_range(bounds.start, bounds.end) {
            if entry.contains(ich_log) {
                out.start = out.start.max(entry.start);
                out.end = out.end.min(entry.end);
            } else if entry.start > ich_log {
                out.end = out.end.min(entry.start);
            } else {
                out.start = out.start.max(entry.end);
            }
        }
        out
    }

    pub(crate) fn apply_edit(&mut self, change: ChangeSpan) {
        self.entries
            .apply_edit(change.start, change.deleted_len, change.inserted_len);
    }
}
