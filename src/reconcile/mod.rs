//! Batched projection of selection state onto the visual tree.
//!
//! During a fast drag-select sweep, many items change logical selection
//! state per frame. Applying each change synchronously would pay layout
//! cost per item, so changes are queued into a deduplicated pending map
//! and applied in one pass at the next frame boundary.
//!
//! The selection set is the single source of truth; this module is a
//! one-way projection of it and the only writer of selection visuals.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::models::ItemId;

/// Target of the projection. The gallery view implements this by
/// toggling the `selected` CSS class on the item's widget; ids with no
/// rendered widget are ignored.
pub trait VisualTree {
    fn set_selected(&self, id: &ItemId, selected: bool);
}

/// Arms a one-shot callback at the next frame boundary. Production uses
/// a glib idle/tick source; tests capture the callback and fire it by
/// hand.
pub trait FrameScheduler {
    fn request_frame(&self, flush: Box<dyn FnOnce()>);
}

/// Deduplicated pending updates in first-insertion order. A later
/// update for an id already queued overwrites its value in place.
#[derive(Default)]
struct PendingQueue {
    order: Vec<ItemId>,
    state: HashMap<ItemId, bool>,
}

impl PendingQueue {
    fn put(&mut self, id: ItemId, selected: bool) {
        if self.state.insert(id.clone(), selected).is_none() {
            self.order.push(id);
        }
    }

    fn drain(&mut self) -> Vec<(ItemId, bool)> {
        let state = std::mem::take(&mut self.state);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|id| {
                let selected = *state.get(&id)?;
                Some((id, selected))
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Coalesces selection-state changes into one visual update per frame.
pub struct Reconciler {
    pending: RefCell<PendingQueue>,
    armed: Cell<bool>,
    tree: Rc<dyn VisualTree>,
    scheduler: Rc<dyn FrameScheduler>,
}

impl Reconciler {
    pub fn new(tree: Rc<dyn VisualTree>, scheduler: Rc<dyn FrameScheduler>) -> Rc<Self> {
        Rc::new(Self {
            pending: RefCell::new(PendingQueue::default()),
            armed: Cell::new(false),
            tree,
            scheduler,
        })
    }

    /// Queue a selection-state change for `id`. Arms a single flush at
    /// the next frame boundary if one is not already armed.
    pub fn schedule(self: &Rc<Self>, id: ItemId, selected: bool) {
        self.pending.borrow_mut().put(id, selected);
        if self.armed.replace(true) {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        self.scheduler.request_frame(Box::new(move || {
            if let Some(reconciler) = weak.upgrade() {
                reconciler.flush();
            }
        }));
    }

    /// Apply every pending change in one pass, then clear and disarm.
    pub fn flush(&self) {
        let updates = self.pending.borrow_mut().drain();
        self.armed.set(false);
        trace!(count = updates.len(), "flushing selection visuals");
        for (id, selected) in updates {
            self.tree.set_selected(&id, selected);
        }
    }

    /// Number of unflushed updates (latest state per id).
    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }
}
