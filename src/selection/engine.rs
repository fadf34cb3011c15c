//! Multi-select workflow for the gallery.
//!
//! The engine owns the selection-mode flag and the selected-item set;
//! everything visual is a projection of them. It registers a single
//! `"selection"` overlay entry with the overlay stack so the platform
//! back gesture dismisses selection mode through the same code path as
//! every other overlay, and it carries the guard flags that make the
//! cooperative event loop safe: an epoch for in-flight select-all
//! fetches and a job id for bulk dispatch, both checked before a reply
//! is applied.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::{debug, info, trace};

use crate::api::{BulkAction, RemoteIndex};
use crate::error::MedleyError;
use crate::models::{ItemDescriptor, ItemId, ViewQuery};
use crate::overlay::{OverlayKind, OverlayStack};
use crate::reconcile::Reconciler;

use super::toolbar::ToolbarState;

/// Best-effort physical feedback when selection mode engages.
pub trait Haptics {
    fn cue(&self);
}

/// Non-blocking user-visible notices (toast bar in the shell).
pub trait Notices {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// What the engine needs to know about the gallery view: the current
/// visual ordering of loaded items and the query identifying the view.
pub trait GalleryIndex {
    fn ordered_items(&self) -> Vec<(ItemId, ItemDescriptor)>;
    fn current_query(&self) -> ViewQuery;
}

/// Cached server-fetched complete id list for one view. Valid only
/// while selection mode stays open; any manual deselection discards it.
#[derive(Debug, Clone)]
pub struct SelectAllSnapshot {
    pub query: ViewQuery,
    pub ids: Vec<ItemId>,
}

/// Position index built once per drag gesture so range extension stays
/// O(1) per pointer move, even over large galleries.
struct RangeIndex {
    anchor: usize,
    positions: HashMap<ItemId, usize>,
    order: Vec<(ItemId, ItemDescriptor)>,
}

enum BulkPhase {
    /// One batched call covering all ids is in flight.
    Batched,
    /// The batched call failed; ids are retried one at a time.
    Sequential { remaining: VecDeque<ItemId>, ok: usize },
}

struct BulkJob {
    id: u64,
    action: BulkAction,
    ids: Vec<ItemId>,
    phase: BulkPhase,
}

#[derive(Default)]
struct EngineState {
    active: bool,
    selected: HashMap<ItemId, ItemDescriptor>,
    all_selected: bool,
    snapshot: Option<SelectAllSnapshot>,
    /// Monotonic token for select-all fetches; a reply is applied only
    /// if it carries the epoch currently in flight.
    listing_epoch: u64,
    listing_in_flight: Option<(u64, ViewQuery)>,
    next_job: u64,
    bulk: Option<BulkJob>,
    range: Option<RangeIndex>,
}

pub type SelectionChangedCallback = Box<dyn Fn(&ToolbarState)>;
pub type ModeChangedCallback = Box<dyn Fn(bool)>;

/// Owns the selection set and selection-mode lifecycle.
pub struct SelectionEngine {
    state: RefCell<EngineState>,
    overlays: Rc<OverlayStack>,
    reconciler: Rc<Reconciler>,
    remote: Rc<dyn RemoteIndex>,
    gallery: Rc<dyn GalleryIndex>,
    haptics: Rc<dyn Haptics>,
    notices: Rc<dyn Notices>,
    on_selection_changed: RefCell<Option<SelectionChangedCallback>>,
    on_mode_changed: RefCell<Option<ModeChangedCallback>>,
}

impl SelectionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        overlays: Rc<OverlayStack>,
        reconciler: Rc<Reconciler>,
        remote: Rc<dyn RemoteIndex>,
        gallery: Rc<dyn GalleryIndex>,
        haptics: Rc<dyn Haptics>,
        notices: Rc<dyn Notices>,
    ) -> Rc<Self> {
        let engine = Rc::new(Self {
            state: RefCell::new(EngineState::default()),
            overlays,
            reconciler,
            remote,
            gallery,
            haptics,
            notices,
            on_selection_changed: RefCell::new(None),
            on_mode_changed: RefCell::new(None),
        });
        engine.register_close_handler();
        engine
    }

    /// Register the `"selection"` overlay close handler so the overlay
    /// stack can dismiss selection mode on back-navigation.
    fn register_close_handler(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.overlays
            .register_close_handler(OverlayKind::Selection, move || {
                if let Some(engine) = weak.upgrade() {
                    engine.exit_selection_mode();
                }
            });
    }

    pub fn connect_selection_changed<F>(&self, callback: F)
    where
        F: Fn(&ToolbarState) + 'static,
    {
        *self.on_selection_changed.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_mode_changed<F>(&self, callback: F)
    where
        F: Fn(bool) + 'static,
    {
        *self.on_mode_changed.borrow_mut() = Some(Box::new(callback));
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.state.borrow().selected.contains_key(id)
    }

    pub fn selected_count(&self) -> usize {
        self.state.borrow().selected.len()
    }

    pub fn toolbar_state(&self) -> ToolbarState {
        let state = self.state.borrow();
        ToolbarState::recompute(state.selected.values(), state.all_selected)
    }

    /// Enter selection mode, optionally selecting `initial`. No-op when
    /// already active: the set is left untouched and no second overlay
    /// entry is pushed.
    pub fn enter_selection_mode(&self, initial: Option<(ItemId, ItemDescriptor)>) {
        {
            let mut state = self.state.borrow_mut();
            if state.active {
                debug!("enter_selection_mode while active is a no-op");
                return;
            }
            state.active = true;
            state.selected.clear();
            state.all_selected = false;
            state.snapshot = None;
        }
        self.overlays.push(OverlayKind::Selection, HashMap::new());
        self.haptics.cue();
        self.emit_mode(true);
        if let Some((id, descriptor)) = initial {
            self.select_item(id, descriptor);
        } else {
            self.emit_changed();
        }
    }

    /// Leave selection mode: clears the set, the flags and every visual
    /// selection mark. Idempotent; also serves as the overlay stack's
    /// close handler.
    pub fn exit_selection_mode(&self) {
        let cleared: Vec<ItemId> = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                debug!("exit_selection_mode while inactive is a no-op");
                return;
            }
            state.active = false;
            state.all_selected = false;
            state.snapshot = None;
            state.range = None;
            state.listing_in_flight = None;
            state.bulk = None;
            state.selected.drain().map(|(id, _)| id).collect()
        };
        for id in cleared {
            self.reconciler.schedule(id, false);
        }
        self.emit_mode(false);
        self.emit_changed();
    }

    /// Close selection mode through the history mechanism when its
    /// overlay entry exists, so the overlay stack performs the cleanup
    /// through its single back path; otherwise exit directly. Keeps
    /// user close buttons and the back button from racing a
    /// double-cleanup.
    pub fn exit_with_history(&self) {
        if self.overlays.contains(OverlayKind::Selection) {
            self.overlays.request_back();
        } else {
            self.exit_selection_mode();
        }
    }

    /// Add one item to the selection. Works for items that are not
    /// currently rendered, which select-all on paginated data needs.
    pub fn select_item(&self, id: ItemId, descriptor: ItemDescriptor) {
        let inserted = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                debug!(%id, "select_item while inactive ignored");
                return;
            }
            state.selected.insert(id.clone(), descriptor).is_none()
        };
        if inserted {
            self.reconciler.schedule(id, true);
        }
        self.emit_changed();
    }

    /// Remove one item. A manual deselection invalidates the select-all
    /// snapshot. With `auto_exit`, emptying the set leaves selection
    /// mode through the history path.
    pub fn deselect_item(&self, id: &ItemId, auto_exit: bool) {
        let (removed, now_empty) = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                return;
            }
            let removed = state.selected.remove(id).is_some();
            if removed {
                state.all_selected = false;
                state.snapshot = None;
            }
            (removed, state.selected.is_empty())
        };
        if !removed {
            return;
        }
        self.reconciler.schedule(id.clone(), false);
        self.emit_changed();
        if now_empty && auto_exit {
            self.exit_with_history();
        }
    }

    pub fn toggle_item(&self, id: ItemId, descriptor: ItemDescriptor) {
        if self.is_selected(&id) {
            self.deselect_item(&id, true);
        } else {
            self.select_item(id, descriptor);
        }
    }

    /// Two-phase select-all toggle. With the all-selected flag already
    /// set this deselects everything instead. Otherwise it fetches the
    /// complete ordered id list for the current view; a second call
    /// while the fetch is in flight is rejected, never interleaved.
    pub fn select_all(&self) {
        let query = self.gallery.current_query();
        let fetch = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                debug!("select_all while inactive ignored");
                return;
            }
            if state.all_selected {
                None
            } else {
                if state.listing_in_flight.is_some() {
                    debug!("select_all already in flight, rejecting");
                    return;
                }
                state.listing_epoch += 1;
                let epoch = state.listing_epoch;
                state.listing_in_flight = Some((epoch, query.clone()));
                Some(epoch)
            }
        };
        match fetch {
            Some(epoch) => self.remote.fetch_listing(query, epoch),
            None => self.deselect_all(),
        }
    }

    /// Apply a select-all listing reply. Stale replies — selection mode
    /// exited, or a newer fetch superseded this epoch — are dropped on
    /// arrival. On failure, falls back to selecting only the items
    /// already loaded in the view and surfaces a distinct warning; the
    /// set always equals exactly what was processed.
    pub fn on_listing_reply(
        &self,
        epoch: u64,
        result: Result<Vec<(ItemId, ItemDescriptor)>, MedleyError>,
    ) {
        let query = {
            let mut state = self.state.borrow_mut();
            match &state.listing_in_flight {
                Some((in_flight, query)) if *in_flight == epoch && state.active => {
                    let query = query.clone();
                    state.listing_in_flight = None;
                    query
                }
                _ => {
                    trace!(epoch, "stale select-all reply dropped");
                    return;
                }
            }
        };
        match result {
            Ok(items) => {
                let selectable: Vec<(ItemId, ItemDescriptor)> = items
                    .into_iter()
                    .filter(|(_, d)| d.kind.is_selectable())
                    .collect();
                let newly: Vec<ItemId> = {
                    let mut state = self.state.borrow_mut();
                    let mut newly = Vec::new();
                    let mut ids = Vec::with_capacity(selectable.len());
                    for (id, descriptor) in selectable {
                        ids.push(id.clone());
                        if state.selected.insert(id.clone(), descriptor).is_none() {
                            newly.push(id);
                        }
                    }
                    state.all_selected = true;
                    state.snapshot = Some(SelectAllSnapshot { query, ids });
                    newly
                };
                info!(count = newly.len(), "select-all applied from server listing");
                for id in newly {
                    self.reconciler.schedule(id, true);
                }
            }
            Err(err) => {
                // Scoped fallback: exactly the loaded items, nothing more.
                let loaded: Vec<(ItemId, ItemDescriptor)> = self
                    .gallery
                    .ordered_items()
                    .into_iter()
                    .filter(|(_, d)| d.kind.is_selectable())
                    .collect();
                let count = loaded.len();
                let newly: Vec<ItemId> = {
                    let mut state = self.state.borrow_mut();
                    let mut newly = Vec::new();
                    for (id, descriptor) in loaded {
                        if state.selected.insert(id.clone(), descriptor).is_none() {
                            newly.push(id);
                        }
                    }
                    newly
                };
                debug!(%err, count, "select-all fetch failed, selected loaded items only");
                for id in newly {
                    self.reconciler.schedule(id, true);
                }
                self.notices.warn(&format!(
                    "Couldn't fetch the full item list — selected the {count} loaded items"
                ));
            }
        }
        self.emit_changed();
    }

    /// Clear the set and the all-selected flag without leaving
    /// selection mode.
    pub fn deselect_all(&self) {
        let cleared: Vec<ItemId> = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                return;
            }
            state.all_selected = false;
            state.snapshot = None;
            state.selected.drain().map(|(id, _)| id).collect()
        };
        for id in cleared {
            self.reconciler.schedule(id, false);
        }
        self.emit_changed();
    }

    /// Anchor a range drag at `anchor`, computing the position index
    /// for the current visual ordering once for the whole gesture.
    pub fn begin_range(&self, anchor: &ItemId) {
        let order = self.gallery.ordered_items();
        let positions: HashMap<ItemId, usize> = order
            .iter()
            .enumerate()
            .map(|(pos, (id, _))| (id.clone(), pos))
            .collect();
        let mut state = self.state.borrow_mut();
        state.range = match positions.get(anchor) {
            Some(&anchor_pos) => Some(RangeIndex {
                anchor: anchor_pos,
                positions,
                order,
            }),
            None => {
                debug!(%anchor, "range anchor is not in the current view");
                None
            }
        };
    }

    /// Extend the range to `current`: selects every item whose position
    /// lies within the inclusive anchor..current span and whose kind is
    /// selectable. Non-selectable items inside the span are silently
    /// skipped. O(1) position lookups from the cached index.
    pub fn extend_range(&self, current: &ItemId) {
        let additions: Vec<(ItemId, ItemDescriptor)> = {
            let state = self.state.borrow();
            if !state.active {
                return;
            }
            let Some(range) = &state.range else {
                debug!("extend_range without an anchored drag");
                return;
            };
            let Some(&current_pos) = range.positions.get(current) else {
                return;
            };
            let (lo, hi) = if current_pos < range.anchor {
                (current_pos, range.anchor)
            } else {
                (range.anchor, current_pos)
            };
            range.order[lo..=hi]
                .iter()
                .filter(|(id, d)| d.kind.is_selectable() && !state.selected.contains_key(id))
                .cloned()
                .collect()
        };
        if additions.is_empty() {
            return;
        }
        {
            let mut state = self.state.borrow_mut();
            for (id, descriptor) in &additions {
                state.selected.insert(id.clone(), descriptor.clone());
            }
        }
        for (id, _) in additions {
            self.reconciler.schedule(id, true);
        }
        self.emit_changed();
    }

    /// Drop the cached position index when the drag gesture ends.
    pub fn end_range(&self) {
        self.state.borrow_mut().range = None;
    }

    /// Dispatch a bulk action over every selected id: one batched call
    /// first, then a sequential per-id fallback if the batch fails.
    /// Rejected while another bulk job is running.
    pub fn apply_bulk(&self, action: BulkAction) {
        let (ids, job) = {
            let mut state = self.state.borrow_mut();
            if !state.active || state.selected.is_empty() {
                debug!("bulk dispatch with nothing selected ignored");
                return;
            }
            if state.bulk.is_some() {
                debug!("bulk dispatch already running, rejecting");
                return;
            }
            state.next_job += 1;
            let job = state.next_job;
            let mut ids: Vec<ItemId> = state.selected.keys().cloned().collect();
            ids.sort();
            state.bulk = Some(BulkJob {
                id: job,
                action: action.clone(),
                ids: ids.clone(),
                phase: BulkPhase::Batched,
            });
            (ids, job)
        };
        self.remote.apply_bulk(action, ids, job);
    }

    /// Handle the batched reply. Success reports the server's count;
    /// failure switches the job to the sequential per-id fallback.
    pub fn on_bulk_reply(&self, job: u64, result: Result<usize, MedleyError>) {
        enum Next {
            Report { ok: usize, total: usize, action: BulkAction },
            Fallback { action: BulkAction, first: ItemId },
        }
        let next = {
            let mut state = self.state.borrow_mut();
            let Some(bulk) = state.bulk.as_mut() else {
                trace!(job, "bulk reply with no job in flight");
                return;
            };
            if bulk.id != job || !matches!(bulk.phase, BulkPhase::Batched) {
                trace!(job, "stale bulk reply dropped");
                return;
            }
            match result {
                Ok(count) => {
                    let total = bulk.ids.len();
                    let action = bulk.action.clone();
                    state.bulk = None;
                    Next::Report {
                        ok: count,
                        total,
                        action,
                    }
                }
                Err(err) => {
                    debug!(%err, job, "batched apply failed, falling back to per-id calls");
                    let mut remaining: VecDeque<ItemId> = bulk.ids.iter().cloned().collect();
                    match remaining.pop_front() {
                        Some(first) => {
                            let action = bulk.action.clone();
                            bulk.phase = BulkPhase::Sequential { remaining, ok: 0 };
                            Next::Fallback { action, first }
                        }
                        None => {
                            let action = bulk.action.clone();
                            state.bulk = None;
                            Next::Report {
                                ok: 0,
                                total: 0,
                                action,
                            }
                        }
                    }
                }
            }
        };
        match next {
            Next::Report { ok, total, action } => self.report_bulk(&action, ok, total),
            Next::Fallback { action, first } => self.remote.apply_single(action, first, job),
        }
    }

    /// Handle one reply on the sequential fallback path, aggregating a
    /// success count and issuing the next call until the ids run out.
    pub fn on_single_reply(&self, job: u64, id: &ItemId, result: Result<(), MedleyError>) {
        enum Next {
            Dispatch { action: BulkAction, id: ItemId },
            Report { ok: usize, total: usize, action: BulkAction },
        }
        let next = {
            let mut state = self.state.borrow_mut();
            let Some(bulk) = state.bulk.as_mut() else {
                trace!(job, %id, "single reply with no job in flight");
                return;
            };
            if bulk.id != job {
                trace!(job, "stale single reply dropped");
                return;
            }
            let BulkPhase::Sequential { remaining, ok } = &mut bulk.phase else {
                trace!(job, "single reply outside fallback phase dropped");
                return;
            };
            if result.is_ok() {
                *ok += 1;
            }
            match remaining.pop_front() {
                Some(next_id) => Next::Dispatch {
                    action: bulk.action.clone(),
                    id: next_id,
                },
                None => {
                    let report = Next::Report {
                        ok: *ok,
                        total: bulk.ids.len(),
                        action: bulk.action.clone(),
                    };
                    state.bulk = None;
                    report
                }
            }
        };
        match next {
            Next::Dispatch { action, id } => self.remote.apply_single(action, id, job),
            Next::Report { ok, total, action } => self.report_bulk(&action, ok, total),
        }
    }

    /// Current snapshot, if a select-all succeeded and nothing was
    /// manually deselected since.
    pub fn snapshot(&self) -> Option<SelectAllSnapshot> {
        self.state.borrow().snapshot.clone()
    }

    fn report_bulk(&self, action: &BulkAction, ok: usize, total: usize) {
        let message = format!("{}: {ok} of {total} succeeded", action.describe());
        if ok == total {
            self.notices.info(&message);
        } else {
            self.notices.warn(&message);
        }
    }

    fn emit_changed(&self) {
        let toolbar = self.toolbar_state();
        if let Some(callback) = &*self.on_selection_changed.borrow() {
            callback(&toolbar);
        }
    }

    fn emit_mode(&self, active: bool) {
        if let Some(callback) = &*self.on_mode_changed.borrow() {
            callback(active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::models::{ItemKind, SortKey};
    use crate::overlay::{Defer, History};
    use crate::reconcile::{FrameScheduler, VisualTree};

    #[derive(Default)]
    struct FakeHistory {
        stack: RefCell<Option<std::rc::Weak<OverlayStack>>>,
        backs: Cell<usize>,
        pushes: Cell<usize>,
    }

    impl History for FakeHistory {
        fn push_entry(&self, _kind: OverlayKind) {
            self.pushes.set(self.pushes.get() + 1);
        }
        fn back(&self) {
            self.backs.set(self.backs.get() + 1);
            let stack = self.stack.borrow().as_ref().and_then(|w| w.upgrade());
            if let Some(stack) = stack {
                stack.handle_back_navigation();
            }
        }
        fn current_path(&self) -> String {
            "gallery".into()
        }
    }

    struct ImmediateDefer;

    impl Defer for ImmediateDefer {
        fn defer(&self, f: Box<dyn FnOnce()>) {
            f();
        }
    }

    #[derive(Default)]
    struct FakeRemote {
        listings: RefCell<Vec<(ViewQuery, u64)>>,
        bulks: RefCell<Vec<(BulkAction, Vec<ItemId>, u64)>>,
        singles: RefCell<Vec<(BulkAction, ItemId, u64)>>,
    }

    impl RemoteIndex for FakeRemote {
        fn fetch_listing(&self, query: ViewQuery, epoch: u64) {
            self.listings.borrow_mut().push((query, epoch));
        }
        fn fetch_browse(&self, _query: ViewQuery) {}
        fn apply_bulk(&self, action: BulkAction, ids: Vec<ItemId>, job: u64) {
            self.bulks.borrow_mut().push((action, ids, job));
        }
        fn apply_single(&self, action: BulkAction, id: ItemId, job: u64) {
            self.singles.borrow_mut().push((action, id, job));
        }
    }

    #[derive(Default)]
    struct FakeGallery {
        items: RefCell<Vec<(ItemId, ItemDescriptor)>>,
    }

    impl GalleryIndex for FakeGallery {
        fn ordered_items(&self) -> Vec<(ItemId, ItemDescriptor)> {
            self.items.borrow().clone()
        }
        fn current_query(&self) -> ViewQuery {
            ViewQuery {
                directory: "gallery".into(),
                sort: SortKey::Name,
                filter: None,
            }
        }
    }

    #[derive(Default)]
    struct FakeHaptics {
        cues: Cell<usize>,
    }

    impl Haptics for FakeHaptics {
        fn cue(&self) {
            self.cues.set(self.cues.get() + 1);
        }
    }

    #[derive(Default)]
    struct FakeNotices {
        infos: RefCell<Vec<String>>,
        warns: RefCell<Vec<String>>,
    }

    impl Notices for FakeNotices {
        fn info(&self, message: &str) {
            self.infos.borrow_mut().push(message.to_owned());
        }
        fn warn(&self, message: &str) {
            self.warns.borrow_mut().push(message.to_owned());
        }
    }

    #[derive(Default)]
    struct RecordingTree {
        applied: RefCell<Vec<(ItemId, bool)>>,
    }

    impl VisualTree for RecordingTree {
        fn set_selected(&self, id: &ItemId, selected: bool) {
            self.applied.borrow_mut().push((id.clone(), selected));
        }
    }

    struct ImmediateFrames;

    impl FrameScheduler for ImmediateFrames {
        fn request_frame(&self, flush: Box<dyn FnOnce()>) {
            flush();
        }
    }

    struct Harness {
        engine: Rc<SelectionEngine>,
        stack: Rc<OverlayStack>,
        history: Rc<FakeHistory>,
        remote: Rc<FakeRemote>,
        gallery: Rc<FakeGallery>,
        haptics: Rc<FakeHaptics>,
        notices: Rc<FakeNotices>,
        tree: Rc<RecordingTree>,
    }

    fn harness() -> Harness {
        let history = Rc::new(FakeHistory::default());
        let stack = OverlayStack::new(history.clone(), Rc::new(ImmediateDefer), false);
        *history.stack.borrow_mut() = Some(Rc::downgrade(&stack));

        let tree = Rc::new(RecordingTree::default());
        let reconciler = Reconciler::new(tree.clone(), Rc::new(ImmediateFrames));
        let remote = Rc::new(FakeRemote::default());
        let gallery = Rc::new(FakeGallery::default());
        let haptics = Rc::new(FakeHaptics::default());
        let notices = Rc::new(FakeNotices::default());

        let engine = SelectionEngine::new(
            stack.clone(),
            reconciler,
            remote.clone(),
            gallery.clone(),
            haptics.clone(),
            notices.clone(),
        );
        Harness {
            engine,
            stack,
            history,
            remote,
            gallery,
            haptics,
            notices,
            tree,
        }
    }

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    fn desc(kind: ItemKind) -> ItemDescriptor {
        ItemDescriptor::new("item", kind)
    }

    fn image(s: &str) -> (ItemId, ItemDescriptor) {
        (id(s), desc(ItemKind::Image))
    }

    #[test]
    fn enter_is_idempotent_and_pushes_once() {
        let h = harness();
        h.engine.enter_selection_mode(Some(image("a")));
        assert!(h.engine.is_active());
        assert_eq!(h.stack.depth(), 1);
        assert_eq!(h.history.pushes.get(), 1);
        assert_eq!(h.haptics.cues.get(), 1);

        h.engine.enter_selection_mode(Some(image("b")));
        assert_eq!(h.engine.selected_count(), 1, "selection set unchanged");
        assert!(h.engine.is_selected(&id("a")));
        assert_eq!(h.history.pushes.get(), 1, "no duplicate history push");
    }

    #[test]
    fn range_drag_skips_non_selectable_kinds() {
        let h = harness();
        // Gallery: [folder, image, image, other, video] at positions 0..4.
        *h.gallery.items.borrow_mut() = vec![
            (id("p0"), desc(ItemKind::Folder)),
            (id("p1"), desc(ItemKind::Image)),
            (id("p2"), desc(ItemKind::Image)),
            (id("p3"), desc(ItemKind::Other)),
            (id("p4"), desc(ItemKind::Video)),
        ];

        // Long-press on position 1 enters selection mode with {p1}.
        h.engine.enter_selection_mode(Some(image("p1")));
        h.engine.begin_range(&id("p1"));
        assert_eq!(h.engine.selected_count(), 1);

        // Dragging to position 4 selects {p1, p2, p4}; "other" at 3 is
        // silently excluded.
        h.engine.extend_range(&id("p4"));
        assert_eq!(h.engine.selected_count(), 3);
        assert!(h.engine.is_selected(&id("p1")));
        assert!(h.engine.is_selected(&id("p2")));
        assert!(!h.engine.is_selected(&id("p3")));
        assert!(h.engine.is_selected(&id("p4")));
        assert_eq!(h.engine.toolbar_state().summary(), "3 selected");

        h.engine.end_range();
    }

    #[test]
    fn range_drag_backwards_covers_inclusive_span() {
        let h = harness();
        *h.gallery.items.borrow_mut() =
            vec![image("a"), image("b"), image("c"), image("d")];
        h.engine.enter_selection_mode(Some(image("c")));
        h.engine.begin_range(&id("c"));
        h.engine.extend_range(&id("a"));
        assert_eq!(h.engine.selected_count(), 3);
        assert!(!h.engine.is_selected(&id("d")));
    }

    #[test]
    fn select_all_success_selects_exactly_the_listing() {
        let h = harness();
        h.engine.enter_selection_mode(None);
        h.engine.select_all();
        assert_eq!(h.remote.listings.borrow().len(), 1);
        let (_, epoch) = h.remote.listings.borrow()[0].clone();

        let listing: Vec<_> = (0..5).map(|n| image(&format!("srv-{n}"))).collect();
        h.engine.on_listing_reply(epoch, Ok(listing));
        assert_eq!(h.engine.selected_count(), 5);
        assert!(h.engine.toolbar_state().all_selected);
        assert_eq!(h.engine.snapshot().unwrap().ids.len(), 5);
        assert!(h.notices.warns.borrow().is_empty());
    }

    #[test]
    fn select_all_is_a_toggle_once_everything_is_selected() {
        let h = harness();
        h.engine.enter_selection_mode(None);
        h.engine.select_all();
        h.engine
            .on_listing_reply(1, Ok(vec![image("a"), image("b")]));
        assert_eq!(h.engine.selected_count(), 2);

        // Second call deselects everything but stays in selection mode.
        h.engine.select_all();
        assert_eq!(h.engine.selected_count(), 0);
        assert!(h.engine.is_active());
        assert!(!h.engine.toolbar_state().all_selected);
        assert_eq!(h.remote.listings.borrow().len(), 1, "no second fetch");
    }

    #[test]
    fn select_all_failure_falls_back_to_loaded_items() {
        let h = harness();
        *h.gallery.items.borrow_mut() = vec![
            image("loaded-1"),
            image("loaded-2"),
            (id("loaded-3"), desc(ItemKind::Other)),
        ];
        h.engine.enter_selection_mode(None);
        h.engine.select_all();
        h.engine
            .on_listing_reply(1, Err(MedleyError::Network("timeout".into())));

        // Exactly the loaded selectable items, never a partial superset.
        assert_eq!(h.engine.selected_count(), 2);
        assert!(!h.engine.toolbar_state().all_selected);
        assert_eq!(h.notices.warns.borrow().len(), 1);
        assert!(h.notices.warns.borrow()[0].contains("2 loaded items"));
    }

    #[test]
    fn concurrent_select_all_is_rejected_not_interleaved() {
        let h = harness();
        h.engine.enter_selection_mode(None);
        h.engine.select_all();
        h.engine.select_all();
        assert_eq!(h.remote.listings.borrow().len(), 1, "second call rejected");

        h.engine
            .on_listing_reply(1, Ok(vec![image("a"), image("b"), image("c")]));
        assert_eq!(h.engine.selected_count(), 3, "never exceeds true count");
        assert!(h.engine.toolbar_state().all_selected);
    }

    #[test]
    fn stale_listing_reply_after_exit_is_dropped() {
        let h = harness();
        h.engine.enter_selection_mode(None);
        h.engine.select_all();
        h.engine.exit_selection_mode();

        h.engine.on_listing_reply(1, Ok(vec![image("a")]));
        assert!(!h.engine.is_active());
        assert_eq!(h.engine.selected_count(), 0);
    }

    #[test]
    fn deselecting_the_last_item_exits_through_history() {
        let h = harness();
        h.engine.enter_selection_mode(Some(image("only")));
        assert_eq!(h.stack.depth(), 1);

        h.engine.deselect_item(&id("only"), true);
        assert!(!h.engine.is_active());
        assert_eq!(h.stack.depth(), 0, "exactly one overlay entry removed");
        assert!(!h.stack.contains(OverlayKind::Selection));
        assert_eq!(h.history.backs.get(), 1, "cleanup ran through the back path");
    }

    #[test]
    fn deselect_without_auto_exit_keeps_mode_open() {
        let h = harness();
        h.engine.enter_selection_mode(Some(image("only")));
        h.engine.deselect_item(&id("only"), false);
        assert!(h.engine.is_active());
        assert_eq!(h.stack.depth(), 1);
    }

    #[test]
    fn manual_deselection_invalidates_the_snapshot() {
        let h = harness();
        h.engine.enter_selection_mode(None);
        h.engine.select_all();
        h.engine
            .on_listing_reply(1, Ok(vec![image("a"), image("b")]));
        assert!(h.engine.snapshot().is_some());

        h.engine.deselect_item(&id("a"), true);
        assert!(h.engine.snapshot().is_none());
        assert!(!h.engine.toolbar_state().all_selected);
        assert_eq!(h.engine.selected_count(), 1);
    }

    #[test]
    fn toggle_off_the_last_item_exits_selection_mode() {
        let h = harness();
        h.engine.enter_selection_mode(Some(image("a")));
        h.engine.toggle_item(id("a"), desc(ItemKind::Image));
        assert!(!h.engine.is_active());
        assert_eq!(h.stack.depth(), 0);
    }

    #[test]
    fn exit_clears_every_visual_mark() {
        let h = harness();
        h.engine.enter_selection_mode(Some(image("a")));
        h.engine.select_item(id("b"), desc(ItemKind::Video));
        h.engine.exit_selection_mode();

        let applied = h.tree.applied.borrow();
        assert!(applied.contains(&(id("a"), false)));
        assert!(applied.contains(&(id("b"), false)));
        assert_eq!(h.engine.selected_count(), 0);
    }

    #[test]
    fn bulk_batched_success_reports_server_count() {
        let h = harness();
        h.engine.enter_selection_mode(Some(image("a")));
        h.engine.select_item(id("b"), desc(ItemKind::Image));
        h.engine.apply_bulk(BulkAction::Favorite);
        assert_eq!(h.bulk_total(), 2);

        let job = h.remote.bulks.borrow()[0].2;
        h.engine.on_bulk_reply(job, Ok(2));
        assert_eq!(h.notices.infos.borrow().len(), 1);
        assert!(h.notices.infos.borrow()[0].contains("2 of 2 succeeded"));
        assert!(h.remote.singles.borrow().is_empty());
    }

    #[test]
    fn bulk_falls_back_to_sequential_and_aggregates() {
        let h = harness();
        h.engine.enter_selection_mode(Some(image("a")));
        h.engine.select_item(id("b"), desc(ItemKind::Image));
        h.engine.select_item(id("c"), desc(ItemKind::Image));
        h.engine.apply_bulk(BulkAction::Tag("trip".into()));
        let job = h.remote.bulks.borrow()[0].2;

        h.engine
            .on_bulk_reply(job, Err(MedleyError::Network("500".into())));
        // One single-id call at a time, driven by replies.
        assert_eq!(h.remote.singles.borrow().len(), 1);
        let first = h.remote.singles.borrow()[0].1.clone();
        h.engine.on_single_reply(job, &first, Ok(()));

        assert_eq!(h.remote.singles.borrow().len(), 2);
        let second = h.remote.singles.borrow()[1].1.clone();
        h.engine
            .on_single_reply(job, &second, Err(MedleyError::Network("500".into())));

        assert_eq!(h.remote.singles.borrow().len(), 3);
        let third = h.remote.singles.borrow()[2].1.clone();
        h.engine.on_single_reply(job, &third, Ok(()));

        assert_eq!(h.notices.warns.borrow().len(), 1);
        assert!(h.notices.warns.borrow()[0].contains("2 of 3 succeeded"));
    }

    #[test]
    fn second_bulk_dispatch_is_rejected_while_one_runs() {
        let h = harness();
        h.engine.enter_selection_mode(Some(image("a")));
        h.engine.apply_bulk(BulkAction::Favorite);
        h.engine.apply_bulk(BulkAction::Favorite);
        assert_eq!(h.remote.bulks.borrow().len(), 1);

        // After the job completes a new dispatch is allowed again.
        let job = h.remote.bulks.borrow()[0].2;
        h.engine.on_bulk_reply(job, Ok(1));
        h.engine.apply_bulk(BulkAction::Favorite);
        assert_eq!(h.remote.bulks.borrow().len(), 2);
    }

    #[test]
    fn descriptor_selection_works_for_unrendered_items() {
        let h = harness();
        h.engine.enter_selection_mode(None);
        // Not present in the gallery's loaded items.
        h.engine
            .select_item(id("page-9-item"), desc(ItemKind::Playlist));
        assert!(h.engine.is_selected(&id("page-9-item")));
    }

    impl Harness {
        fn bulk_total(&self) -> usize {
            self.remote.bulks.borrow()[0].1.len()
        }
    }
}
