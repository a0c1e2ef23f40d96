//! Coordinate mapping between logical, rendered and search offsets.
//!
//! Three coordinate spaces describe one paragraph:
//!
//! - **logical**: the stored text, where every hot link or embedded object is a single
//!   [`OBJECT_REPLACEMENT`](crate::OBJECT_REPLACEMENT) placeholder character;
//! - **rendered**: what the rendering engine sees, after placeholders with a substitute
//!   string are replaced by that string;
//! - **search**: logical text with every placeholder omitted.
//!
//! [`MappingTable`] converts between logical and rendered space, [`SearchOmissions`]
//! between logical and search space. Both are pure lookup structures; the text sources own
//! and update them.

use crate::delta::ChangeSpan;
use crate::ts_string::TsString;

/// Which side of an ambiguous boundary a reverse mapping resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Association {
    /// Resolve to the offset before the omitted characters.
    Prev,
    /// Resolve to the offset after the omitted characters.
    #[default]
    Next,
}

/// One substitution: a logical placeholder rendered as `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    /// Logical offset of the placeholder character.
    pub ich_log: usize,
    /// Rendered offset immediately after the substitute text.
    pub ich_ren_lim: usize,
    /// The substitute text (never empty).
    pub text: TsString,
}

impl MapEntry {
    /// Rendered offset where the substitute text starts.
    pub fn ich_ren_min(&self) -> usize {
        self.ich_ren_lim - self.text.len()
    }
}

/// Sorted substitutions of one paragraph.
///
/// Invariant: entries are strictly ascending by `ich_log` and by `ich_ren_lim`, and
/// `ich_ren_lim` of every entry equals
/// `ich_log + text.len() + Σ(previous text.len() - 1)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<MapEntry>,
}

impl MappingTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The entries, ascending.
    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// Number of substitutions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no substitutions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map a logical offset to rendered space.
    ///
    /// Every placeholder strictly before `ich_log` contributes `text.len() - 1`, so the
    /// offset of a placeholder maps to the start of its substitute and the offset just after
    /// it maps to the end of the substitute.
    pub fn log_to_ren(&self, ich_log: usize) -> usize {
        let k = self.entries.partition_point(|e| e.ich_log < ich_log);
        match k.checked_sub(1).map(|i| &self.entries[i]) {
            None => ich_log,
            Some(e) => e.ich_ren_lim + (ich_log - e.ich_log - 1),
        }
    }

    /// Map a rendered offset to logical space.
    ///
    /// Offsets strictly inside a substitute (or at its start) map to the placeholder's
    /// logical offset; information about the position inside the substitute is lost.
    pub fn ren_to_log(&self, ich_ren: usize) -> usize {
        let k = self.entries.partition_point(|e| e.ich_ren_lim <= ich_ren);
        if let Some(e) = self.entries.get(k)
            && ich_ren >= e.ich_ren_min()
        {
            return e.ich_log;
        }
        match k.checked_sub(1).map(|i| &self.entries[i]) {
            None => ich_ren,
            Some(e) => e.ich_log + 1 + (ich_ren - e.ich_ren_lim),
        }
    }

    /// Rendered length of a paragraph with `log_len` logical characters.
    pub fn rendered_len(&self, log_len: usize) -> usize {
        self.log_to_ren(log_len)
    }

    /// The substitution whose rendered text contains `ich_ren`.
    pub fn substitution_at(&self, ich_ren: usize) -> Option<&MapEntry> {
        let k = self.entries.partition_point(|e| e.ich_ren_lim <= ich_ren);
        self.entries
            .get(k)
            .filter(|e| ich_ren >= e.ich_ren_min())
    }

    /// First substitution whose placeholder is at or after `ich_log`.
    pub fn first_at_or_after(&self, ich_log: usize) -> Option<&MapEntry> {
        let k = self.entries.partition_point(|e| e.ich_log < ich_log);
        self.entries.get(k)
    }

    /// Last substitution whose placeholder is strictly before `ich_log`.
    pub fn last_before(&self, ich_log: usize) -> Option<&MapEntry> {
        let k = self.entries.partition_point(|e| e.ich_log < ich_log);
        k.checked_sub(1).map(|i| &self.entries[i])
    }

    /// Replace the entries inside `change` with `inserted` (absolute post-change logical
    /// offsets, ascending), shifting the entries after it.
    pub(crate) fn splice(&mut self, change: ChangeSpan, inserted: Vec<(usize, TsString)>) {
        let lo = self.entries.partition_point(|e| e.ich_log < change.start);
        let hi = self.entries.partition_point(|e| e.ich_log < change.old_end());
        for e in &mut self.entries[hi..] {
            e.ich_log = e.ich_log - change.deleted_len + change.inserted_len;
        }
        self.entries.splice(
            lo..hi,
            inserted.into_iter().map(|(ich_log, text)| MapEntry {
                ich_log,
                ich_ren_lim: 0,
                text,
            }),
        );
        self.recompute_rendered();
    }

    fn recompute_rendered(&mut self) {
        let mut extra = 0usize;
        for e in &mut self.entries {
            e.ich_ren_lim = e.ich_log + extra + e.text.len();
            extra += e.text.len() - 1;
        }
        debug_assert!(self.is_consistent());
    }

    /// Check the ordering and length invariants.
    pub fn is_consistent(&self) -> bool {
        self.entries.windows(2).all(|w| {
            w[0].ich_log < w[1].ich_log && w[0].ich_ren_lim < w[1].ich_ren_min()
        }) && self.entries.iter().all(|e| !e.text.is_empty())
    }
}

/// Logical offsets of the placeholders omitted from search space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOmissions {
    positions: Vec<usize>,
}

impl SearchOmissions {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Omitted logical offsets, ascending.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Returns `true` if the character at `ich_log` is omitted.
    pub fn is_omitted(&self, ich_log: usize) -> bool {
        self.positions.binary_search(&ich_log).is_ok()
    }

    /// Map a logical offset to search space.
    pub fn log_to_search(&self, ich_log: usize) -> usize {
        ich_log - self.positions.partition_point(|&p| p < ich_log)
    }

    /// Map a search offset to logical space.
    ///
    /// When omitted characters sit at the boundary, `Association::Prev` resolves before
    /// them and `Association::Next` after them.
    pub fn search_to_log(&self, ich_search: usize, assoc: Association) -> usize {
        // Omitted position i lies before the boundary iff its search offset p - i < ich_search.
        let mut lo = 0;
        let mut hi = self.positions.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.positions[mid] - mid < ich_search {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let k = lo;
        let ich_prev = ich_search + k;
        match assoc {
            Association::Prev => ich_prev,
            Association::Next => {
                let run = self.positions[k..]
                    .iter()
                    .enumerate()
                    .take_while(|(j, p)| **p == ich_prev + j)
                    .count();
                ich_prev + run
            }
        }
    }

    /// Search length of a paragraph with `log_len` logical characters.
    pub fn search_len(&self, log_len: usize) -> usize {
        log_len - self.positions.len()
    }

    /// Replace the positions inside `change` with `inserted` (absolute, ascending).
    pub(crate) fn splice(&mut self, change: ChangeSpan, inserted: Vec<usize>) {
        let lo = self.positions.partition_point(|&p| p < change.start);
        let hi = self.positions.partition_point(|&p| p < change.old_end());
        for p in &mut self.positions[hi..] {
            *p = *p - change.deleted_len + change.inserted_len;
        }
        self.positions.splice(lo..hi, inserted);
    }
}
