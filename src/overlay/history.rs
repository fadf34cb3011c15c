//! Navigation history seam between the overlay stack and the shell.
//!
//! The overlay stack never talks to the window directly: it pushes
//! entries into and requests backs from this trait, and the shell
//! routes the resulting back events into the stack's single back
//! handler. Tests substitute a recording fake.

use std::cell::{Cell, RefCell};

use tracing::trace;

use super::stack::OverlayKind;

/// The platform history mechanism, as the overlay stack sees it.
pub trait History {
    /// Record one history entry for a programmatic overlay push.
    fn push_entry(&self, kind: OverlayKind);
    /// Trigger a back-navigation. The resulting back event must reach
    /// the shell's back dispatcher (and from there the overlay stack).
    fn back(&self);
    /// The current view path, snapshotted into overlay entries.
    fn current_path(&self) -> String;
}

/// In-app navigation history for the GTK shell.
///
/// Tracks the current gallery path plus a depth counter for overlay
/// entries, and fans back events out to the dispatcher the window
/// registers. Alt+Left, the mouse back button and `Escape` all funnel
/// through [`NavHistory::back`].
pub struct NavHistory {
    path: RefCell<String>,
    overlay_depth: Cell<usize>,
    on_back: RefCell<Option<Box<dyn Fn()>>>,
}

impl NavHistory {
    pub fn new() -> Self {
        Self {
            path: RefCell::new(String::new()),
            overlay_depth: Cell::new(0),
            on_back: RefCell::new(None),
        }
    }

    /// Register the shell's back dispatcher. Exactly one is expected.
    pub fn connect_back<F>(&self, dispatcher: F)
    where
        F: Fn() + 'static,
    {
        *self.on_back.borrow_mut() = Some(Box::new(dispatcher));
    }

    /// Update the current path when the gallery navigates.
    pub fn set_path(&self, path: impl Into<String>) {
        *self.path.borrow_mut() = path.into();
    }

    /// Overlay entries currently recorded on top of the path.
    pub fn overlay_depth(&self) -> usize {
        self.overlay_depth.get()
    }
}

impl Default for NavHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl History for NavHistory {
    fn push_entry(&self, kind: OverlayKind) {
        self.overlay_depth.set(self.overlay_depth.get() + 1);
        trace!(?kind, depth = self.overlay_depth.get(), "history entry pushed");
    }

    fn back(&self) {
        let depth = self.overlay_depth.get();
        if depth > 0 {
            self.overlay_depth.set(depth - 1);
        }
        if let Some(dispatcher) = &*self.on_back.borrow() {
            dispatcher();
        }
    }

    fn current_path(&self) -> String {
        self.path.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn back_unwinds_overlay_depth_and_dispatches() {
        let history = Rc::new(NavHistory::new());
        let dispatched = Rc::new(Cell::new(0));
        {
            let dispatched = dispatched.clone();
            history.connect_back(move || dispatched.set(dispatched.get() + 1));
        }

        history.push_entry(OverlayKind::Lightbox);
        history.push_entry(OverlayKind::Selection);
        assert_eq!(history.overlay_depth(), 2);

        history.back();
        assert_eq!(history.overlay_depth(), 1);
        assert_eq!(dispatched.get(), 1);

        // Backs past the overlay entries still dispatch (path
        // navigation), but depth never underflows.
        history.back();
        history.back();
        assert_eq!(history.overlay_depth(), 0);
        assert_eq!(dispatched.get(), 3);
    }

    #[test]
    fn current_path_follows_navigation() {
        let history = NavHistory::new();
        assert_eq!(history.current_path(), "");
        history.set_path("photos/2024");
        assert_eq!(history.current_path(), "photos/2024");
    }
}
