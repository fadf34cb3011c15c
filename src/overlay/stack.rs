//! Overlay stack: maps transient UI surfaces onto back-navigation.
//!
//! Every overlay (selection toolbar, lightbox, modals, player, search)
//! registers an idempotent close handler here. Each programmatic `push`
//! issues exactly one history entry, and the back handler is the single
//! authority deciding which overlay closes on any back or escape event:
//! strictly the most recently pushed one.
//!
//! Duplicate pushes of the same kind stack (nested); collaborators that
//! want a single instance guard their own entry, as the selection
//! engine does with its idempotent enter.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use super::history::History;

/// The overlay surfaces known to the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Selection,
    Lightbox,
    TagModal,
    MergeModal,
    Player,
    Search,
}

/// One open overlay. `sequence_id` orders entries globally;
/// `path_snapshot` records the view path at push time.
#[derive(Debug, Clone)]
pub struct OverlayEntry {
    pub kind: OverlayKind,
    pub data: HashMap<String, String>,
    pub sequence_id: u64,
    pub path_snapshot: String,
}

/// Runs a callback shortly after the current event completes.
/// Production uses a glib idle source; tests queue and fire by hand.
pub trait Defer {
    fn defer(&self, f: Box<dyn FnOnce()>);
}

type CloseHandler = Box<dyn Fn()>;

/// Ordered list of open overlays, kept 1:1 with history entries for
/// every programmatic push.
pub struct OverlayStack {
    entries: RefCell<Vec<OverlayEntry>>,
    handlers: RefCell<HashMap<OverlayKind, CloseHandler>>,
    history: Rc<dyn History>,
    defer: Rc<dyn Defer>,
    /// Re-entrancy guard: set while a close handler runs (and briefly
    /// after) so its side effects cannot recursively unwind the stack.
    /// Shared so the deferred release outlives the current event.
    guard: Rc<Cell<bool>>,
    next_sequence: Cell<u64>,
    /// Running as an installed standalone shell (escape on an empty
    /// stack at the root may request app close).
    standalone: bool,
    on_navigate_parent: RefCell<Option<Box<dyn Fn() -> bool>>>,
    on_request_app_close: RefCell<Option<Box<dyn Fn()>>>,
}

impl OverlayStack {
    pub fn new(history: Rc<dyn History>, defer: Rc<dyn Defer>, standalone: bool) -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(Vec::new()),
            handlers: RefCell::new(HashMap::new()),
            history,
            defer,
            guard: Rc::new(Cell::new(false)),
            next_sequence: Cell::new(0),
            standalone,
            on_navigate_parent: RefCell::new(None),
            on_request_app_close: RefCell::new(None),
        })
    }

    /// Register the close handler for an overlay kind. Handlers must be
    /// parameterless, idempotent and non-throwing.
    pub fn register_close_handler<F>(&self, kind: OverlayKind, handler: F)
    where
        F: Fn() + 'static,
    {
        self.handlers.borrow_mut().insert(kind, Box::new(handler));
    }

    /// Called when escape is pressed with an empty stack: navigate the
    /// view to its parent. Returns whether navigation happened.
    pub fn connect_navigate_parent<F>(&self, f: F)
    where
        F: Fn() -> bool + 'static,
    {
        *self.on_navigate_parent.borrow_mut() = Some(Box::new(f));
    }

    /// Called when escape is pressed with an empty stack at the root of
    /// a standalone shell.
    pub fn connect_request_app_close<F>(&self, f: F)
    where
        F: Fn() + 'static,
    {
        *self.on_request_app_close.borrow_mut() = Some(Box::new(f));
    }

    /// Open an overlay: append an entry and issue exactly one history
    /// push. Returns the entry's sequence id.
    pub fn push(&self, kind: OverlayKind, data: HashMap<String, String>) -> u64 {
        let sequence_id = self.next_sequence.get() + 1;
        self.next_sequence.set(sequence_id);
        self.entries.borrow_mut().push(OverlayEntry {
            kind,
            data,
            sequence_id,
            path_snapshot: self.history.current_path(),
        });
        self.history.push_entry(kind);
        trace!(?kind, sequence_id, depth = self.depth(), "overlay pushed");
        sequence_id
    }

    /// Remove the most recent entry of `kind` without touching history.
    /// Used when a collaborator closes itself programmatically. Popping
    /// a kind that is not open is a silent no-op.
    pub fn pop(&self, kind: OverlayKind) {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().rposition(|e| e.kind == kind) {
            Some(pos) => {
                entries.remove(pos);
                trace!(?kind, depth = entries.len(), "overlay popped");
            }
            None => debug!(?kind, "pop of an overlay that is not open"),
        }
    }

    /// Handle a back-navigation signal. Closes only the single most
    /// recently pushed entry. Returns false when the stack is empty:
    /// that back event is genuine app navigation, not an overlay
    /// dismissal, and the caller should let it proceed.
    pub fn handle_back_navigation(&self) -> bool {
        if self.guard.get() {
            debug!("re-entrant back-navigation suppressed");
            return true;
        }
        let top = match self.entries.borrow().last() {
            Some(entry) => (entry.kind, entry.sequence_id),
            None => return false,
        };
        let (kind, sequence_id) = top;

        self.guard.set(true);
        self.invoke_close(kind);
        // The handler may have popped its own entry already.
        self.entries
            .borrow_mut()
            .retain(|e| e.sequence_id != sequence_id);
        self.release_guard_soon();
        trace!(?kind, depth = self.depth(), "overlay closed via back");
        true
    }

    /// Escape routing: an open overlay defers to the back-navigation
    /// path; otherwise navigate to the parent view; otherwise, only
    /// inside a standalone shell, request app close.
    pub fn handle_escape(&self) {
        if !self.entries.borrow().is_empty() {
            self.history.back();
            return;
        }
        if let Some(navigate) = &*self.on_navigate_parent.borrow() {
            if navigate() {
                return;
            }
        }
        if self.standalone {
            if let Some(request_close) = &*self.on_request_app_close.borrow() {
                request_close();
            }
        }
    }

    /// Force-close every overlay kind currently visible, bypassing the
    /// stack discipline. Used for hard resets such as session expiry.
    pub fn close_all(&self) {
        let open: Vec<OverlayKind> = {
            let entries = self.entries.borrow();
            let mut kinds: Vec<OverlayKind> = Vec::new();
            for entry in entries.iter().rev() {
                if !kinds.contains(&entry.kind) {
                    kinds.push(entry.kind);
                }
            }
            kinds
        };
        if open.is_empty() {
            return;
        }
        self.guard.set(true);
        for kind in open {
            self.invoke_close(kind);
        }
        self.entries.borrow_mut().clear();
        self.release_guard_soon();
        debug!("all overlays force-closed");
    }

    /// Trigger a back-navigation through the history seam, so dismissal
    /// runs through the same single code path as a platform back event.
    pub fn request_back(&self) {
        self.history.back();
    }

    pub fn depth(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn contains(&self, kind: OverlayKind) -> bool {
        self.entries.borrow().iter().any(|e| e.kind == kind)
    }

    pub fn top_kind(&self) -> Option<OverlayKind> {
        self.entries.borrow().last().map(|e| e.kind)
    }

    fn invoke_close(&self, kind: OverlayKind) {
        match self.handlers.borrow().get(&kind) {
            Some(handler) => handler(),
            None => debug!(?kind, "no close handler registered"),
        }
    }

    fn release_guard_soon(&self) {
        // Keep the guard up until the current event (and any side
        // effects the close handler scheduled) has drained.
        let guard = Rc::clone(&self.guard);
        self.defer.defer(Box::new(move || guard.set(false)));
    }
}
