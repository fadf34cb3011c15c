//! Pointer gesture detection for the gallery grid.
//!
//! Resolves the inherently ambiguous touch stream (scroll vs. tap vs.
//! long-press vs. drag) into discrete selection gestures with a fixed
//! per-pointer state machine:
//!
//! `Idle -> Pressing` on pointer-down over a selectable item (long-press
//! timer armed) `-> Idle` when movement exceeds the threshold or the
//! pointer lifts early (tap / double-tap) `-> Triggered` when the timer
//! fires `-> Dragging` while the pointer crosses item boundaries
//! `-> Idle` on pointer-up or cancel.
//!
//! The timer is an injected trait so tests drive the machine with
//! synthetic timestamps instead of real timeouts.

use std::time::Duration;

use tracing::trace;

use crate::models::ItemId;

/// Hold duration before a press becomes a long-press.
pub const LONG_PRESS: Duration = Duration::from_millis(500);

/// Movement beyond this many pixels cancels a pending press (the
/// gesture is a scroll, not a long-press).
pub const MOVE_THRESHOLD_PX: f64 = 10.0;

/// Two taps on the same target within this window form a double-tap.
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Tunable thresholds, defaulting to the constants above.
#[derive(Debug, Clone)]
pub struct GestureConfig {
    pub long_press: Duration,
    pub move_threshold_px: f64,
    pub double_tap_window: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press: LONG_PRESS,
            move_threshold_px: MOVE_THRESHOLD_PX,
            double_tap_window: DOUBLE_TAP_WINDOW,
        }
    }
}

/// A resolved gesture, ready for the selection engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureEvent {
    /// Long-press fired over an item: enter selection mode and anchor a
    /// range at this item.
    LongPress(ItemId),
    /// While range-dragging, the pointer crossed onto a new item.
    DragOver(ItemId),
    /// The range drag ended (pointer lifted or cancelled).
    DragEnd,
    /// A plain tap on an item.
    Tap(ItemId),
    /// Second tap on the same item within the double-tap window. The
    /// pair is never reported as two independent taps: the first tap is
    /// delivered normally, the second is upgraded.
    DoubleTap(ItemId),
}

/// Arms and cancels the long-press timer. The production implementation
/// uses a glib timeout that calls back into [`GestureDetector::timer_fired`]
/// with the token it was armed with; tests fire tokens by hand.
pub trait PressTimer {
    fn arm(&self, token: u64, after: Duration);
    fn cancel(&self, token: u64);
}

#[derive(Debug)]
enum State {
    Idle,
    Pressing {
        item: ItemId,
        x: f64,
        y: f64,
        token: u64,
    },
    Triggered {
        current: ItemId,
    },
    Dragging {
        current: ItemId,
    },
}

/// Per-pointer gesture state machine.
pub struct GestureDetector<T: PressTimer> {
    config: GestureConfig,
    timer: T,
    state: State,
    next_token: u64,
    last_tap: Option<(ItemId, Duration)>,
}

impl<T: PressTimer> GestureDetector<T> {
    pub fn new(timer: T) -> Self {
        Self::with_config(timer, GestureConfig::default())
    }

    pub fn with_config(timer: T, config: GestureConfig) -> Self {
        Self {
            config,
            timer,
            state: State::Idle,
            next_token: 0,
            last_tap: None,
        }
    }

    /// Pointer pressed at (x, y). `item` is the gallery item under the
    /// pointer, if any; presses over empty space never arm the timer.
    pub fn pointer_down(&mut self, item: Option<ItemId>, x: f64, y: f64) {
        self.cancel_pending();
        let Some(item) = item else {
            self.state = State::Idle;
            return;
        };
        self.next_token += 1;
        let token = self.next_token;
        self.timer.arm(token, self.config.long_press);
        trace!(%item, token, "press armed");
        self.state = State::Pressing { item, x, y, token };
    }

    /// Pointer moved. `item` is the item currently under the pointer.
    pub fn pointer_move(&mut self, item: Option<ItemId>, x: f64, y: f64) -> Option<GestureEvent> {
        match &self.state {
            State::Pressing {
                x: sx,
                y: sy,
                token,
                ..
            } => {
                let dist = ((x - sx).powi(2) + (y - sy).powi(2)).sqrt();
                if dist > self.config.move_threshold_px {
                    // Scroll wins over a pending long-press.
                    self.timer.cancel(*token);
                    self.state = State::Idle;
                }
                None
            }
            State::Triggered { current } | State::Dragging { current } => {
                let next = item?;
                if next == *current {
                    return None;
                }
                self.state = State::Dragging {
                    current: next.clone(),
                };
                Some(GestureEvent::DragOver(next))
            }
            State::Idle => None,
        }
    }

    /// The long-press timer fired. Stale tokens (from an earlier press)
    /// are ignored.
    pub fn timer_fired(&mut self, token: u64) -> Option<GestureEvent> {
        match &self.state {
            State::Pressing {
                item, token: armed, ..
            } if *armed == token => {
                let item = item.clone();
                self.last_tap = None;
                self.state = State::Triggered {
                    current: item.clone(),
                };
                Some(GestureEvent::LongPress(item))
            }
            _ => {
                trace!(token, "stale long-press timer ignored");
                None
            }
        }
    }

    /// Pointer lifted at the given event timestamp.
    pub fn pointer_up(&mut self, at: Duration) -> Option<GestureEvent> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Pressing { item, token, .. } => {
                self.timer.cancel(token);
                if let Some((last_item, last_at)) = self.last_tap.take() {
                    if last_item == item
                        && at.saturating_sub(last_at) <= self.config.double_tap_window
                    {
                        return Some(GestureEvent::DoubleTap(item));
                    }
                }
                self.last_tap = Some((item.clone(), at));
                Some(GestureEvent::Tap(item))
            }
            State::Triggered { .. } | State::Dragging { .. } => Some(GestureEvent::DragEnd),
            State::Idle => None,
        }
    }

    /// Pointer sequence cancelled by the platform (e.g. the scroll view
    /// claimed the sequence).
    pub fn pointer_cancel(&mut self) -> Option<GestureEvent> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Pressing { token, .. } => {
                self.timer.cancel(token);
                None
            }
            State::Triggered { .. } | State::Dragging { .. } => Some(GestureEvent::DragEnd),
            State::Idle => None,
        }
    }

    /// Whether a range drag is currently in progress.
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, State::Triggered { .. } | State::Dragging { .. })
    }

    fn cancel_pending(&mut self) {
        if let State::Pressing { token, .. } = &self.state {
            self.timer.cancel(*token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingTimer {
        armed: Rc<RefCell<Vec<u64>>>,
        cancelled: Rc<RefCell<Vec<u64>>>,
    }

    impl PressTimer for RecordingTimer {
        fn arm(&self, token: u64, _after: Duration) {
            self.armed.borrow_mut().push(token);
        }
        fn cancel(&self, token: u64) {
            self.cancelled.borrow_mut().push(token);
        }
    }

    fn detector() -> GestureDetector<RecordingTimer> {
        GestureDetector::new(RecordingTimer::default())
    }

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn long_press_enters_tracking_then_drag_extends() {
        let mut d = detector();
        d.pointer_down(Some(id("a")), 10.0, 10.0);
        assert_eq!(d.timer_fired(1), Some(GestureEvent::LongPress(id("a"))));
        assert!(d.is_dragging());

        // Same item: no event. New item: one DragOver per boundary.
        assert_eq!(d.pointer_move(Some(id("a")), 12.0, 10.0), None);
        assert_eq!(
            d.pointer_move(Some(id("b")), 40.0, 10.0),
            Some(GestureEvent::DragOver(id("b")))
        );
        assert_eq!(d.pointer_move(Some(id("b")), 41.0, 10.0), None);
        assert_eq!(d.pointer_up(ms(900)), Some(GestureEvent::DragEnd));
        assert!(!d.is_dragging());
    }

    #[test]
    fn movement_beyond_threshold_cancels_press() {
        let mut d = detector();
        d.pointer_down(Some(id("a")), 0.0, 0.0);
        assert_eq!(d.pointer_move(Some(id("a")), 0.0, 20.0), None);
        // Timer fire after cancellation is stale.
        assert_eq!(d.timer_fired(1), None);
        assert_eq!(d.pointer_up(ms(100)), None);
    }

    #[test]
    fn small_jitter_keeps_press_alive() {
        let mut d = detector();
        d.pointer_down(Some(id("a")), 0.0, 0.0);
        assert_eq!(d.pointer_move(Some(id("a")), 3.0, 4.0), None);
        assert_eq!(d.timer_fired(1), Some(GestureEvent::LongPress(id("a"))));
    }

    #[test]
    fn early_lift_is_a_tap() {
        let mut d = detector();
        d.pointer_down(Some(id("a")), 0.0, 0.0);
        assert_eq!(d.pointer_up(ms(100)), Some(GestureEvent::Tap(id("a"))));
    }

    #[test]
    fn second_tap_within_window_upgrades_to_double_tap() {
        let mut d = detector();
        d.pointer_down(Some(id("a")), 0.0, 0.0);
        assert_eq!(d.pointer_up(ms(100)), Some(GestureEvent::Tap(id("a"))));
        d.pointer_down(Some(id("a")), 1.0, 1.0);
        assert_eq!(d.pointer_up(ms(300)), Some(GestureEvent::DoubleTap(id("a"))));

        // The pair is consumed: a third tap starts a fresh sequence.
        d.pointer_down(Some(id("a")), 1.0, 1.0);
        assert_eq!(d.pointer_up(ms(400)), Some(GestureEvent::Tap(id("a"))));
    }

    #[test]
    fn slow_second_tap_stays_a_tap() {
        let mut d = detector();
        d.pointer_down(Some(id("a")), 0.0, 0.0);
        d.pointer_up(ms(100));
        d.pointer_down(Some(id("a")), 0.0, 0.0);
        assert_eq!(d.pointer_up(ms(900)), Some(GestureEvent::Tap(id("a"))));
    }

    #[test]
    fn double_tap_requires_same_target() {
        let mut d = detector();
        d.pointer_down(Some(id("a")), 0.0, 0.0);
        d.pointer_up(ms(100));
        d.pointer_down(Some(id("b")), 0.0, 0.0);
        assert_eq!(d.pointer_up(ms(200)), Some(GestureEvent::Tap(id("b"))));
    }

    #[test]
    fn press_over_empty_space_is_inert() {
        let mut d = detector();
        d.pointer_down(None, 0.0, 0.0);
        assert_eq!(d.timer_fired(1), None);
        assert_eq!(d.pointer_up(ms(100)), None);
    }

    #[test]
    fn cancel_during_drag_ends_the_range() {
        let mut d = detector();
        d.pointer_down(Some(id("a")), 0.0, 0.0);
        d.timer_fired(1);
        assert_eq!(d.pointer_cancel(), Some(GestureEvent::DragEnd));
        assert!(!d.is_dragging());
    }

    #[test]
    fn stale_timer_token_from_previous_press_is_ignored() {
        let mut d = detector();
        d.pointer_down(Some(id("a")), 0.0, 0.0);
        d.pointer_up(ms(50));
        d.pointer_down(Some(id("b")), 0.0, 0.0);
        // Token 1 belonged to the first press.
        assert_eq!(d.timer_fired(1), None);
        assert_eq!(d.timer_fired(2), Some(GestureEvent::LongPress(id("b"))));
    }
}
