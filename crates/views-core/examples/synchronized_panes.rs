//! Two panes showing the same list of entries side by side: a vernacular text and its
//! back translation. Entries start lazy; expanding them in one pane expands them in both,
//! and every entry's top is aligned across panes.

use std::collections::{BTreeMap, BTreeSet};
use views_core::{
    BoxId, ExpandedRegion, Expansion, GapSide, LazyRange, ObjectId, PropTag, Rect, Size,
    SyncContext, SyncRoot, Synchronizer,
};

const ENTRIES: PropTag = PropTag(1);
const LINE_HEIGHT: i32 = 12;

struct Pane {
    name: &'static str,
    /// Lines of text per entry in this pane.
    lines_per_entry: Vec<i32>,
    materialized: BTreeSet<usize>,
    gaps: BTreeMap<ObjectId, i32>,
    heights: BTreeMap<ObjectId, i32>,
}

impl Pane {
    fn new(name: &'static str, lines_per_entry: Vec<i32>) -> Self {
        Self {
            name,
            lines_per_entry,
            materialized: BTreeSet::new(),
            gaps: BTreeMap::new(),
            heights: BTreeMap::new(),
        }
    }

    fn entry(&self, object: ObjectId) -> Option<usize> {
        usize::try_from(object.0)
            .ok()
            .filter(|i| self.materialized.contains(i))
    }

    fn height(&self) -> i32 {
        self.materialized
            .iter()
            .map(|&i| {
                let object = ObjectId(i as i64);
                self.heights
                    .get(&object)
                    .copied()
                    .unwrap_or(self.lines_per_entry[i] * LINE_HEIGHT)
                    + self.gaps.get(&object).copied().unwrap_or(0)
            })
            .sum()
    }
}

impl SyncRoot for Pane {
    fn natural_gap(&mut self, object: ObjectId, _side: GapSide, _ctx: &mut SyncContext) -> Option<i32> {
        self.entry(object).map(|_| LINE_HEIGHT / 2)
    }

    fn set_actual_gap(&mut self, object: ObjectId, _side: GapSide, gap: i32, _ctx: &mut SyncContext) -> bool {
        if self.entry(object).is_none() {
            return false;
        }
        self.gaps.insert(object, gap);
        true
    }

    fn natural_height(&self, object: ObjectId) -> Option<i32> {
        self.entry(object).map(|i| self.lines_per_entry[i] * LINE_HEIGHT)
    }

    fn set_synced_height(&mut self, object: ObjectId, height: i32) {
        self.heights.insert(object, height);
    }

    fn has_box_for(&self, object: ObjectId) -> bool {
        self.entry(object).is_some()
    }

    fn expand_lazy_items(&mut self, range: &LazyRange, _ctx: &mut SyncContext) -> Option<Expansion> {
        let end = range.items.end.min(self.lines_per_entry.len());
        let new: Vec<usize> = (range.items.start..end)
            .filter(|&i| self.materialized.insert(i))
            .collect();
        let (&first, &last) = (new.first()?, new.last()?);
        Some(Expansion {
            first_box: BoxId(first as u64),
            items: first..last + 1,
            bounds: Rect::new(0, 0, 200, self.height()),
        })
    }

    fn contract_lazy_items(&mut self, range: &LazyRange) {
        for i in range.items.clone() {
            self.materialized.remove(&i);
        }
    }

    fn layout_expanded(&mut self, region: &ExpandedRegion, _ctx: &mut SyncContext) {
        println!("{}: laid out entries {:?}", self.name, region.items);
    }

    fn adjust_box_positions(&mut self, region: &ExpandedRegion, _ctx: &mut SyncContext) {
        println!("{}: repositioned around entries {:?}", self.name, region.items);
    }

    fn reconstruct_contents(&mut self) {
        self.gaps.clear();
        self.heights.clear();
    }

    fn layout(&mut self, _ctx: &mut SyncContext) {}

    fn extent(&self) -> Size {
        Size {
            width: 200,
            height: self.height(),
        }
    }

    fn notify_size_changed(&mut self, old: Size, new: Size) {
        println!("{}: height {} -> {}", self.name, old.height, new.height);
    }
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let mut sync = Synchronizer::new();
    let text = sync
        .add_root(Pane::new("text", vec![2, 1, 3, 1]))
        .unwrap();
    let gloss = sync
        .add_root(Pane::new("gloss", vec![3, 1, 2, 2]))
        .unwrap();

    let range = LazyRange {
        context: ObjectId(0),
        tag: ENTRIES,
        prop_index: 0,
        items: 0..4,
    };
    let first = sync.expand_lazy_items(text, range).unwrap();
    println!("first box in the text pane: {first:?}");

    for entry in 0..4 {
        let object = ObjectId(entry);
        let gap = sync
            .sync_natural_top_to_top(gloss, object, LINE_HEIGHT / 2)
            .unwrap();
        let height = sync.adjust_synced_box_heights(object);
        println!("entry {entry}: gap {gap}, height {height:?}");
    }

    sync.reconstruct().unwrap();
    for (_, pane) in sync.roots() {
        println!("{}: extent {:?}", pane.name, pane.extent());
    }
    println!("gloss pane has every entry: {}", sync.verify_correspondence(ObjectId(3)).is_empty());
}
