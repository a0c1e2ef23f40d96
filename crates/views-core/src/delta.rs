//! Structured content-change records.
//!
//! Every text source mutation returns a [`ContentChange`] describing what moved, so that
//! incremental consumers (segment caches, selections, concordance windows) can invalidate
//! exactly the offsets at or after the edit without diffing old and new text.

use std::ops::Range;

/// A replaced span in one coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSpan {
    /// Start offset of the replaced text (same before and after the change).
    pub start: usize,
    /// Number of characters removed.
    pub deleted_len: usize,
    /// Number of characters inserted.
    pub inserted_len: usize,
}

impl ChangeSpan {
    /// Exclusive end offset in the pre-change text.
    pub fn old_end(&self) -> usize {
        self.start + self.deleted_len
    }

    /// Exclusive end offset in the post-change text.
    pub fn new_end(&self) -> usize {
        self.start + self.inserted_len
    }

    /// Map a pre-change offset to the post-change text.
    ///
    /// Offsets inside the replaced text snap to the end of the inserted text.
    pub fn map_offset(&self, offset: usize) -> usize {
        if offset < self.start {
            offset
        } else if offset < self.old_end() {
            self.new_end()
        } else {
            offset - self.deleted_len + self.inserted_len
        }
    }

    /// Returns `true` if nothing was removed or inserted.
    pub fn is_empty(&self) -> bool {
        self.deleted_len == 0 && self.inserted_len == 0
    }
}

/// Description of one `replace_contents` call.
///
/// Capability changes that restyle or reframe text without editing it report an empty
/// `runs` range and equal deleted and inserted logical lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    /// Replaced run indices, in the pre-change run sequence.
    pub runs: Range<usize>,
    /// Number of runs inserted in their place.
    pub inserted_runs: usize,
    /// The change in logical coordinates.
    pub logical: ChangeSpan,
    /// The change in rendered coordinates, as seen through the source's `TextSource` view.
    pub rendered: ChangeSpan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_offset() {
        let span = ChangeSpan {
            start: 5,
            deleted_len: 3,
            inserted_len: 1,
        };
        assert_eq!(span.map_offset(4), 4);
        assert_eq!(span.map_offset(5), 6);
        assert_eq!(span.map_offset(7), 6);
        assert_eq!(span.map_offset(8), 6);
        assert_eq!(span.map_offset(12), 10);
    }
}
