//! Interval storage for property override tables.
//!
//! A sorted vector with a prefix-maximum of interval ends, so point and range queries
//! only scan the intervals that can possibly overlap.

use std::ops::Range;

/// Half-open interval `[start, end)` carrying a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval<T> {
    /// Start offset.
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Insertion sequence number; later intervals have larger numbers.
    pub seq: u64,
    /// Payload.
    pub value: T,
}

impl<T> Interval<T> {
    /// Check if interval contains a specific position
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Check if interval overlaps `[start, end)`
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }

    /// The interval as a range.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Interval tree keyed by start offset.
///
/// Query complexity: O(log n + k), where k is the number of intervals scanned.
#[derive(Debug, Clone)]
pub struct IntervalTree<T> {
    /// List of intervals (kept sorted by start position, ties in insertion order)
    intervals: Vec<Interval<T>>,
    /// `prefix_max_end[i] = max(intervals[0..=i].end)`
    prefix_max_end: Vec<usize>,
    next_seq: u64,
}

impl<T> IntervalTree<T> {
    /// Create an empty interval tree.
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
            prefix_max_end: Vec::new(),
            next_seq: 0,
        }
    }

    fn rebuild_prefix_max_end_from(&mut self, start_idx: usize) {
        if self.intervals.is_empty() {
            self.prefix_max_end.clear();
            return;
        }

        if self.prefix_max_end.len() != self.intervals.len() {
            self.prefix_max_end.resize(self.intervals.len(), 0);
        }

        let mut max_end = if start_idx == 0 {
            0
        } else {
            self.prefix_max_end[start_idx - 1]
        };

        for (idx, interval) in self.intervals.iter().enumerate().skip(start_idx) {
            max_end = max_end.max(interval.end);
            self.prefix_max_end[idx] = max_end;
        }
    }

    /// Insert an interval. Empty intervals are ignored.
    pub fn insert(&mut self, range: Range<usize>, value: T) {
        if range.start >= range.end {
            return;
        }
        // After any interval with the same start, so ties stay in insertion order.
        let pos = self.intervals.partition_point(|i| i.start <= range.start);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.intervals.insert(
            pos,
            Interval {
                start: range.start,
                end: range.end,
                seq,
                value,
            },
        );
        self.prefix_max_end.insert(pos, 0);
        self.rebuild_prefix_max_end_from(pos);
    }

    /// Query all intervals containing `pos`, in start order.
    pub fn query_point(&self, pos: usize) -> Vec<&Interval<T>> {
        let idx = self.intervals.partition_point(|i| i.start <= pos);
        let mut result = Vec::new();

        // Intervals with start <= pos are before idx.
        for i in (0..idx).rev() {
            if self.prefix_max_end[i] <= pos {
                break;
            }
            let interval = &self.intervals[i];
            if interval.contains(pos) {
                result.push(interval);
            }
        }

        result.reverse();
        result
    }

    /// Query all intervals overlapping `[start, end)`, in start order.
    pub fn query_range(&self, start: usize, end: usize) -> Vec<&Interval<T>> {
        if self.intervals.is_empty() || start >= end {
            return Vec::new();
        }

        let search_end = self.intervals.partition_point(|i| i.start < end);
        let mut scan_start = self
            .intervals
            .partition_point(|i| i.start < start)
            .min(search_end);
        while scan_start > 0 && self.prefix_max_end[scan_start - 1] > start {
            scan_start -= 1;
        }

        self.intervals[scan_start..search_end]
            .iter()
            .filter(|i| i.overlaps(start, end))
            .collect()
    }

    /// All intervals in start order.
    pub fn iter(&self) -> impl Iterator<Item = &Interval<T>> {
        self.intervals.iter()
    }

    /// Clear all intervals
    pub fn clear(&mut self) {
        self.intervals.clear();
        self.prefix_max_end.clear();
    }

    /// Get number of intervals
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Update offsets for an edit that replaced `deleted` characters at `start` with
    /// `inserted` characters.
    ///
    /// Intervals entirely inside the deleted text are dropped; intervals straddling it are
    /// trimmed; intervals after it are shifted.
    pub fn apply_edit(&mut self, start: usize, deleted: usize, inserted: usize) {
        let del_end = start + deleted;
        self.intervals.retain_mut(|interval| {
            if interval.end <= start {
                return true;
            }
            if interval.start >= del_end {
                interval.start = interval.start - deleted + inserted;
                interval.end = interval.end - deleted + inserted;
                return true;
            }
            if interval.start >= start && interval.end <= del_end {
                return false;
            }
            // Straddles: keep the parts outside the deleted text.
            let new_start = interval.start.min(start);
            let tail = interval.end.saturating_sub(del_end);
            let head = start.saturating_sub(interval.start);
            interval.start = new_start;
            interval.end = if tail > 0 {
                start + inserted + tail
            } else {
                new_start + head
            };
            interval.start < interval.end
        });
        self.intervals.sort_by_key(|i| (i.start, i.seq));
        self.rebuild_prefix_max_end_from(0);
    }
}

impl<T> Default for IntervalTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starts<T>(v: &[&Interval<T>]) -> Vec<usize> {
        v.iter().map(|i| i.start).collect()
    }

    #[test]
    fn test_interval_contains() {
        let mut tree = IntervalTree::new();
        tree.insert(10..20, ());
        let interval = tree.iter().next().unwrap();
        assert!(interval.contains(10));
        assert!(interval.contains(19));
        assert!(!interval.contains(20));
        assert!(!interval.contains(9));
    }

    #[test]
    fn test_query_point_nested() {
        let mut tree = IntervalTree::new();
        tree.insert(0..100, 'a');
        tree.insert(10..20, 'b');
        tree.insert(30..40, 'c');

        assert_eq!(starts(&tree.query_point(15)), vec![0, 10]);
        assert_eq!(starts(&tree.query_point(25)), vec![0]);
        assert_eq!(starts(&tree.query_point(35)), vec![0, 30]);
        assert!(tree.query_point(100).is_empty());
    }

    #[test]
    fn test_query_range() {
        let mut tree = IntervalTree::new();
        tree.insert(0..5, ());
        tree.insert(5..10, ());
        tree.insert(20..30, ());

        assert_eq!(starts(&tree.query_range(4, 6)), vec![0, 5]);
        assert_eq!(starts(&tree.query_range(10, 20)), Vec::<usize>::new());
        assert_eq!(starts(&tree.query_range(0, 100)), vec![0, 5, 20]);
    }

    #[test]
    fn test_empty_insert_ignored() {
        let mut tree: IntervalTree<()> = IntervalTree::new();
        tree.insert(5..5, ());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut tree = IntervalTree::new();
        tree.insert(0..10, "first");
        tree.insert(0..10, "second");
        let values: Vec<_> = tree.query_point(3).iter().map(|i| i.value).collect();
        assert_eq!(values, vec!["first", "second"]);
    }

    #[test]
    fn test_apply_edit_shift_trim_drop() {
        let mut tree = IntervalTree::new();
        tree.insert(0..4, 'a'); // before
        tree.insert(5..7, 'b'); // inside deletion
        tree.insert(3..12, 'c'); // straddles
        tree.insert(20..25, 'd'); // after

        // Replace [4, 10) with 2 characters.
        tree.apply_edit(4, 6, 2);

        let got: Vec<_> = tree.iter().map(|i| (i.value, i.range())).collect();
        assert_eq!(got, vec![('a', 0..4), ('c', 3..8), ('d', 16..21)]);
    }
}
