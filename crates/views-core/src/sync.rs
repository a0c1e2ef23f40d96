//! Layout synchronization across parallel root boxes.
//!
//! Several root boxes (panes) may display the same backing sequence of objects side by side.
//! A [`Synchronizer`] owns those roots and keeps them aligned:
//!
//! - **Top-to-top gaps**: when one pane computes the natural vertical gap above (or below)
//!   the box of an object, every pane is told to use the maximum gap any pane needs.
//! - **Lazy expansion**: materializing a lazy block in one pane materializes the same logical
//!   range in every pane. Expansion may cascade; follow-up requests go through a FIFO
//!   worklist instead of recursion, and no pane lays out until the worklist is drained.
//! - **Contraction** and **reconstruction** are fanned out to every pane.
//!
//! Roots never hold a reference to the synchronizer. Methods that may need to trigger more
//! synchronization receive a [`SyncContext`] and queue [`SyncRequest`]s on it; the
//! synchronizer handles them after the root method returns, according to its current
//! [`SyncState`].

use crate::error::SyncError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::Range;

/// Identifier of a root registered with a [`Synchronizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RootId(usize);

impl RootId {
    /// Get the underlying slot index.
    pub fn get(self) -> usize {
        self.0
    }
}

/// Identifier of a backing object (shared by every pane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub i64);

/// Identifier of the property holding a sequence of objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropTag(pub u32);

/// Identifier of a box inside one root's box tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxId(pub u64);

/// Axis-aligned rectangle in layout units. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge.
    pub right: i32,
    /// Bottom edge.
    pub bottom: i32,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Returns `true` if the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Smallest rectangle covering both. Empty rectangles are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Extent of a root box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

/// Which gap of an object's box is synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GapSide {
    /// Gap between the top of the previous box and the top of this one.
    Before,
    /// Gap between the top of this box and the top of the next one.
    After,
}

/// A range of lazily displayed items: `items` of property `tag` of object `context`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LazyRange {
    /// Object owning the sequence.
    pub context: ObjectId,
    /// Property holding the sequence.
    pub tag: PropTag,
    /// Which occurrence of the property in the display of `context`.
    pub prop_index: usize,
    /// Item indexes (half-open).
    pub items: Range<usize>,
}

/// What one root materialized for one expansion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// First box created.
    pub first_box: BoxId,
    /// Items actually materialized.
    pub items: Range<usize>,
    /// Area covered by the new boxes.
    pub bounds: Rect,
}

/// Everything one root materialized during one worklist drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedRegion {
    /// First box created during the drain.
    pub first_box: BoxId,
    /// Union of the materialized item ranges.
    pub items: Range<usize>,
    /// Union of the areas covered.
    pub bounds: Rect,
}

impl ExpandedRegion {
    fn new(expansion: Expansion) -> Self {
        Self {
            first_box: expansion.first_box,
            items: expansion.items,
            bounds: expansion.bounds,
        }
    }

    fn merge(&mut self, expansion: &Expansion) {
        self.items = self.items.start.min(expansion.items.start)
            ..self.items.end.max(expansion.items.end);
        self.bounds = self.bounds.union(&expansion.bounds);
    }
}

/// What the synchronizer is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No synchronized operation is running.
    #[default]
    Idle,
    /// Computing and distributing a top-to-top gap. Another top sync is a contract violation.
    SyncingTops,
    /// Draining the lazy-expansion worklist. Further expansion requests are queued.
    ExpandingLazyItems,
}

/// Work a root asks the synchronizer to do once the current root call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    /// Expand `range` in every root.
    ExpandLazyItems(LazyRange),
    /// Synchronize the gap of `object`'s box.
    TopToTop {
        /// The object.
        object: ObjectId,
        /// Which gap.
        side: GapSide,
        /// The requesting root's natural gap.
        natural_gap: i32,
    },
}

/// Channel from a root back to the synchronizer during a synchronized call.
#[derive(Debug)]
pub struct SyncContext {
    root: RootId,
    state: SyncState,
    requests: Vec<SyncRequest>,
}

impl SyncContext {
    pub(crate) fn new(root: RootId, state: SyncState) -> Self {
        Self {
            root,
            state,
            requests: Vec::new(),
        }
    }

    /// The root being called.
    pub fn root(&self) -> RootId {
        self.root
    }

    /// Synchronizer state during the call.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Ask for `range` to be expanded in every root.
    ///
    /// The calling root is expected to have materialized the range itself already.
    pub fn request_expand(&mut self, range: LazyRange) {
        self.requests.push(SyncRequest::ExpandLazyItems(range));
    }

    /// Ask for the gap of `object`'s box to be synchronized.
    pub fn request_top_sync(&mut self, object: ObjectId, side: GapSide, natural_gap: i32) {
        self.requests.push(SyncRequest::TopToTop {
            object,
            side,
            natural_gap,
        });
    }

    /// Requests queued so far.
    pub fn requests(&self) -> &[SyncRequest] {
        &self.requests
    }
}

/// Root-box contract consumed by the [`Synchronizer`].
pub trait SyncRoot {
    /// Natural (unsynchronized) gap of `object`'s box, or `None` if this root does not
    /// display the object.
    fn natural_gap(&mut self, object: ObjectId, side: GapSide, ctx: &mut SyncContext)
    -> Option<i32>;

    /// Force the gap of `object`'s box. Returns `false` if this root does not display it.
    fn set_actual_gap(
        &mut self,
        object: ObjectId,
        side: GapSide,
        gap: i32,
        ctx: &mut SyncContext,
    ) -> bool;

    /// Natural height of `object`'s box, or `None` if this root does not display it.
    fn natural_height(&self, object: ObjectId) -> Option<i32>;

    /// Force the height of `object`'s box.
    fn set_synced_height(&mut self, object: ObjectId, height: i32);

    /// Returns `true` if this root has a box for `object`.
    fn has_box_for(&self, object: ObjectId) -> bool;

    /// Materialize `range` without laying it out. Returns `None` if nothing was materialized
    /// (already expanded, or not displayed by this root).
    fn expand_lazy_items(&mut self, range: &LazyRange, ctx: &mut SyncContext)
    -> Option<Expansion>;

    /// Turn `range` back into a lazy block.
    fn contract_lazy_items(&mut self, range: &LazyRange);

    /// Lay out what this root materialized during a drain (peer roots).
    fn layout_expanded(&mut self, region: &ExpandedRegion, ctx: &mut SyncContext);

    /// Lay out and reposition boxes around `region` (the originating root), using the
    /// geometry the peers already established.
    fn adjust_box_positions(&mut self, region: &ExpandedRegion, ctx: &mut SyncContext);

    /// Drop selection, notifiers and box-tree contents, then construct again.
    fn reconstruct_contents(&mut self);

    /// Full layout pass.
    fn layout(&mut self, ctx: &mut SyncContext);

    /// Current extent.
    fn extent(&self) -> Size;

    /// Tell the hosting site the extent changed.
    fn notify_size_changed(&mut self, old: Size, new: Size);
}

/// One queued expansion and the roots that already handled it.
#[derive(Debug)]
struct PendingExpansion {
    range: LazyRange,
    processed: HashSet<RootId>,
}

/// Coordinator of a set of parallel root boxes.
#[derive(Debug)]
pub struct Synchronizer<R: SyncRoot> {
    roots: Vec<Option<R>>,
    state: SyncState,
    started_expanding: bool,
    worklist: VecDeque<PendingExpansion>,
    regions: HashMap<RootId, ExpandedRegion>,
    deferred: Vec<(RootId, LazyRange)>,
}

impl<R: SyncRoot> Default for Synchronizer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SyncRoot> Synchronizer<R> {
    /// A synchronizer with no roots.
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            state: SyncState::Idle,
            started_expanding: false,
            worklist: VecDeque::new(),
            regions: HashMap::new(),
            deferred: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Returns `true` once any lazy expansion has run; registration is frozen from then on.
    pub fn started_expanding(&self) -> bool {
        self.started_expanding
    }

    /// Number of registered roots.
    pub fn len(&self) -> usize {
        self.roots.iter().flatten().count()
    }

    /// Returns `true` if no root is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a root.
    ///
    /// # Errors
    ///
    /// [`SyncError::RegistrationFrozen`] once lazy expansion has started.
    pub fn add_root(&mut self, root: R) -> Result<RootId, SyncError> {
        if self.started_expanding {
            return Err(SyncError::RegistrationFrozen);
        }
        let id = RootId(self.roots.len());
        self.roots.push(Some(root));
        tracing::debug!(root = id.0, "root registered");
        Ok(id)
    }

    /// Unregister a root and hand it back. Ids are never reused.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnknownRoot`] if `id` is not registered, [`SyncError::Busy`] during a
    /// synchronized operation.
    pub fn remove_root(&mut self, id: RootId) -> Result<R, SyncError> {
        self.require_idle("remove_root")?;
        self.roots
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(SyncError::UnknownRoot(id))
    }

    /// Registered root `id`.
    pub fn root(&self, id: RootId) -> Option<&R> {
        self.roots.get(id.0).and_then(Option::as_ref)
    }

    /// Registered root `id`, mutably.
    pub fn root_mut(&mut self, id: RootId) -> Option<&mut R> {
        self.roots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Registered roots in registration order.
    pub fn roots(&self) -> impl Iterator<Item = (RootId, &R)> {
        self.roots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|root| (RootId(i), root)))
    }

    /// Synchronize the gap above `object`'s box after `source` computed `natural_gap`.
    ///
    /// Every root (including `source`) is given the maximum natural gap of all roots
    /// displaying the object; the gap is returned.
    ///
    /// # Errors
    ///
    /// [`SyncError::ReentrantTopSync`] if a top sync is already running (directly or
    /// requested by a root during this one), [`SyncError::UnknownRoot`] for a bad `source`.
    pub fn sync_natural_top_to_top(
        &mut self,
        source: RootId,
        object: ObjectId,
        natural_gap: i32,
    ) -> Result<i32, SyncError> {
        self.sync_gap(source, object, GapSide::Before, natural_gap)
    }

    /// Like [`Self::sync_natural_top_to_top`], for the gap below `object`'s box.
    ///
    /// # Errors
    ///
    /// See [`Self::sync_natural_top_to_top`].
    pub fn sync_natural_top_to_top_after(
        &mut self,
        source: RootId,
        object: ObjectId,
        natural_gap: i32,
    ) -> Result<i32, SyncError> {
        self.sync_gap(source, object, GapSide::After, natural_gap)
    }

    fn sync_gap(
        &mut self,
        source: RootId,
        object: ObjectId,
        side: GapSide,
        natural_gap: i32,
    ) -> Result<i32, SyncError> {
        if self.state == SyncState::SyncingTops {
            return Err(SyncError::ReentrantTopSync);
        }
        self.require_root(source)?;

        let prev = self.state;
        self.state = SyncState::SyncingTops;
        let result = self.distribute_gap(source, object, side, natural_gap);
        self.state = prev;

        // Expansion requests raised while syncing run once the gap is settled.
        let deferred = std::mem::take(&mut self.deferred);
        let gap = result?;
        for (from, range) in deferred {
            self.expand_lazy_items(from, range)?;
        }
        Ok(gap)
    }

    fn distribute_gap(
        &mut self,
        source: RootId,
        object: ObjectId,
        side: GapSide,
        natural_gap: i32,
    ) -> Result<i32, SyncError> {
        let ids = self.root_ids();
        let mut actual = natural_gap;
        for &id in ids.iter().filter(|&&id| id != source) {
            let mut ctx = SyncContext::new(id, self.state);
            let Some(root) = self.slot_mut(id) else {
                continue;
            };
            match root.natural_gap(object, side, &mut ctx) {
                Some(gap) => actual = actual.max(gap),
                None => {
                    tracing::warn!(
                        root = id.0,
                        object = object.0,
                        "no box for object, peer skipped"
                    );
                }
            }
            self.dispatch(ctx)?;
        }

        for &id in &ids {
            let mut ctx = SyncContext::new(id, self.state);
            let Some(root) = self.slot_mut(id) else {
                continue;
            };
            if !root.set_actual_gap(object, side, actual, &mut ctx) && id != source {
                tracing::warn!(root = id.0, object = object.0, "could not apply synced gap");
            }
            self.dispatch(ctx)?;
        }

        tracing::debug!(object = object.0, ?side, natural_gap, actual, "top-to-top gap synced");
        Ok(actual)
    }

    /// Materialize `range` in every root, starting from `source`.
    ///
    /// Returns the first box `source` materialized, if any. When called while a drain is
    /// already running, the request is queued and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnknownRoot`] for a bad `source`; [`SyncError::ReentrantTopSync`] if a
    /// root requested a top sync while another one was running.
    pub fn expand_lazy_items(
        &mut self,
        source: RootId,
        range: LazyRange,
    ) -> Result<Option<BoxId>, SyncError> {
        self.require_root(source)?;
        self.started_expanding = true;

        match self.state {
            SyncState::ExpandingLazyItems => {
                self.enqueue(source, range);
                return Ok(None);
            }
            SyncState::SyncingTops => {
                self.deferred.push((source, range));
                return Ok(None);
            }
            SyncState::Idle => {}
        }

        self.state = SyncState::ExpandingLazyItems;
        self.worklist.push_back(PendingExpansion {
            range,
            processed: HashSet::new(),
        });
        let result = self.drain(source);
        self.worklist.clear();
        self.regions.clear();
        self.state = SyncState::Idle;
        result
    }

    /// Queue a follow-up raised by `from`; `from` already materialized it.
    fn enqueue(&mut self, from: RootId, range: LazyRange) {
        tracing::trace!(root = from.0, items = ?range.items, "expansion queued");
        self.worklist.push_back(PendingExpansion {
            range,
            processed: HashSet::from([from]),
        });
    }

    fn drain(&mut self, source: RootId) -> Result<Option<BoxId>, SyncError> {
        let mut first_box = None;
        let mut round = 0;
        while !self.worklist.is_empty() {
            round += 1;
            while let Some(pending) = self.worklist.pop_front() {
                for id in self.root_ids() {
                    if pending.processed.contains(&id) {
                        continue;
                    }
                    let mut ctx = SyncContext::new(id, self.state);
                    let Some(root) = self.slot_mut(id) else {
                        continue;
                    };
                    match root.expand_lazy_items(&pending.range, &mut ctx) {
                        Some(expansion) => {
                            if id == source && first_box.is_none() {
                                first_box = Some(expansion.first_box);
                            }
                            self.regions
                                .entry(id)
                                .and_modify(|region| region.merge(&expansion))
                                .or_insert_with(|| ExpandedRegion::new(expansion));
                        }
                        None => {
                            tracing::debug!(
                                root = id.0,
                                items = ?pending.range.items,
                                "nothing expanded"
                            );
                        }
                    }
                    self.dispatch(ctx)?;
                }
            }

            tracing::debug!(round, roots = self.regions.len(), "expansion worklist drained");
            let mut regions: Vec<_> = self.regions.drain().collect();
            regions.sort_by_key(|(id, _)| *id);
            let (origin, peers): (Vec<_>, Vec<_>) =
                regions.into_iter().partition(|(id, _)| *id == source);

            for (id, region) in peers {
                let mut ctx = SyncContext::new(id, self.state);
                if let Some(root) = self.slot_mut(id) {
                    root.layout_expanded(&region, &mut ctx);
                }
                self.dispatch(ctx)?;
            }
            for (id, region) in origin {
                let mut ctx = SyncContext::new(id, self.state);
                if let Some(root) = self.slot_mut(id) {
                    root.adjust_box_positions(&region, &mut ctx);
                }
                self.dispatch(ctx)?;
            }
        }
        Ok(first_box)
    }

    /// Turn `range` back into a lazy block in every root.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnknownRoot`] for a bad `source`, [`SyncError::Busy`] during another
    /// synchronized operation.
    pub fn contract_lazy_items(
        &mut self,
        source: RootId,
        range: &LazyRange,
    ) -> Result<(), SyncError> {
        self.require_root(source)?;
        self.require_idle("contract_lazy_items")?;
        for root in self.roots.iter_mut().flatten() {
            root.contract_lazy_items(range);
        }
        tracing::debug!(root = source.0, items = ?range.items, "lazy items contracted");
        Ok(())
    }

    /// Rebuild every root: construct all, then lay out all, then notify the roots whose
    /// extent changed.
    ///
    /// # Errors
    ///
    /// [`SyncError::Busy`] during another synchronized operation, or any error raised by
    /// requests the roots queue during layout.
    pub fn reconstruct(&mut self) -> Result<(), SyncError> {
        self.require_idle("reconstruct")?;
        let ids = self.root_ids();

        let mut before = Vec::with_capacity(ids.len());
        for &id in &ids {
            if let Some(root) = self.slot_mut(id) {
                before.push(root.extent());
                root.reconstruct_contents();
            }
        }

        for &id in &ids {
            let mut ctx = SyncContext::new(id, self.state);
            if let Some(root) = self.slot_mut(id) {
                root.layout(&mut ctx);
            }
            self.dispatch(ctx)?;
        }

        for (&id, old) in ids.iter().zip(before) {
            let Some(root) = self.slot_mut(id) else {
                continue;
            };
            let new = root.extent();
            if new != old {
                root.notify_size_changed(old, new);
            }
        }
        tracing::debug!(roots = ids.len(), "roots reconstructed");
        Ok(())
    }

    /// Give `object`'s box in every root the largest natural height among them.
    ///
    /// Returns the height used, or `None` if no root displays the object.
    pub fn adjust_synced_box_heights(&mut self, object: ObjectId) -> Option<i32> {
        let mut height = None;
        for (id, root) in self.roots() {
            match root.natural_height(object) {
                Some(h) => height = Some(height.map_or(h, |max: i32| max.max(h))),
                None => {
                    tracing::warn!(
                        root = id.0,
                        object = object.0,
                        "no box for object, peer skipped"
                    );
                }
            }
        }
        let height = height?;
        for root in self.roots.iter_mut().flatten() {
            if root.has_box_for(object) {
                root.set_synced_height(object, height);
            }
        }
        Some(height)
    }

    /// Roots that have no box for `object`. Empty when the panes correspond.
    pub fn verify_correspondence(&self, object: ObjectId) -> Vec<RootId> {
        let missing: Vec<RootId> = self
            .roots()
            .filter(|(_, root)| !root.has_box_for(object))
            .map(|(id, _)| id)
            .collect();
        if !missing.is_empty() && missing.len() < self.len() {
            tracing::warn!(object = object.0, missing = ?missing, "panes out of correspondence");
        }
        missing
    }

    /// Handle the requests a root queued during one call.
    fn dispatch(&mut self, ctx: SyncContext) -> Result<(), SyncError> {
        let from = ctx.root;
        for request in ctx.requests {
            match request {
                SyncRequest::ExpandLazyItems(range) => {
                    self.expand_lazy_items(from, range)?;
                }
                SyncRequest::TopToTop {
                    object,
                    side,
                    natural_gap,
                } => {
                    self.sync_gap(from, object, side, natural_gap)?;
                }
            }
        }
        Ok(())
    }

    fn root_ids(&self) -> Vec<RootId> {
        self.roots().map(|(id, _)| id).collect()
    }

    fn slot_mut(&mut self, id: RootId) -> Option<&mut R> {
        self.root_mut(id)
    }

    fn require_root(&self, id: RootId) -> Result<(), SyncError> {
        match self.root(id) {
            Some(_) => Ok(()),
            None => Err(SyncError::UnknownRoot(id)),
        }
    }

    fn require_idle(&self, operation: &'static str) -> Result<(), SyncError> {
        match self.state {
            SyncState::Idle => Ok(()),
            _ => Err(SyncError::Busy(operation)),
        }
    }
}
