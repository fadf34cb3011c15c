// Keybindings for the medley media browser
//
// - Escape: close the topmost overlay, else navigate to the parent
// - Ctrl+A: select all (entering selection mode if needed)
// - Alt+Left / mouse-back: history back
// - Ctrl+F: open search
// - Ctrl+D: deselect all

use gdk4::{Key, ModifierType};
use gtk4::prelude::*;
use gtk4::{EventControllerKey, PropagationPhase, Widget};
use std::cell::RefCell;
use std::rc::Rc;

/// The discrete actions the key layer can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Escape,
    SelectAll,
    DeselectAll,
    HistoryBack,
    OpenSearch,
}

/// Pure key-to-action mapping, kept separate from the controller so it
/// is testable without a GTK display.
pub fn action_for(keyval: Key, modifiers: ModifierType) -> Option<KeyAction> {
    let ctrl = modifiers.contains(ModifierType::CONTROL_MASK);
    let alt = modifiers.contains(ModifierType::ALT_MASK);

    if keyval == Key::Escape {
        return Some(KeyAction::Escape);
    }
    if ctrl && (keyval == Key::a || keyval == Key::A) {
        return Some(KeyAction::SelectAll);
    }
    if ctrl && (keyval == Key::d || keyval == Key::D) {
        return Some(KeyAction::DeselectAll);
    }
    if ctrl && (keyval == Key::f || keyval == Key::F) {
        return Some(KeyAction::OpenSearch);
    }
    if alt && keyval == Key::Left {
        return Some(KeyAction::HistoryBack);
    }
    None
}

pub type ActionCallback = Box<dyn Fn(KeyAction)>;

/// Keybinding manager for the main window.
pub struct MedleyKeys {
    controller: EventControllerKey,
    on_action: Rc<RefCell<Option<ActionCallback>>>,
}

impl MedleyKeys {
    pub fn new() -> Self {
        let controller = EventControllerKey::new();
        controller.set_propagation_phase(PropagationPhase::Capture);

        let on_action: Rc<RefCell<Option<ActionCallback>>> = Rc::new(RefCell::new(None));
        let on_action_clone = on_action.clone();

        controller.connect_key_pressed(move |_controller, keyval, _keycode, state| {
            if let Some(action) = action_for(keyval, state) {
                if let Some(callback) = &*on_action_clone.borrow() {
                    callback(action);
                    return glib::Propagation::Stop;
                }
            }
            glib::Propagation::Proceed
        });

        Self {
            controller,
            on_action,
        }
    }

    /// Attach the key controller to a widget (typically the window).
    pub fn attach(&self, widget: &impl IsA<Widget>) {
        widget.add_controller(self.controller.clone());
    }

    pub fn connect_action<F>(&self, callback: F)
    where
        F: Fn(KeyAction) + 'static,
    {
        *self.on_action.borrow_mut() = Some(Box::new(callback));
    }
}

impl Default for MedleyKeys {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_maps_regardless_of_modifiers() {
        assert_eq!(
            action_for(Key::Escape, ModifierType::empty()),
            Some(KeyAction::Escape)
        );
        assert_eq!(
            action_for(Key::Escape, ModifierType::CONTROL_MASK),
            Some(KeyAction::Escape)
        );
    }

    #[test]
    fn select_all_requires_ctrl() {
        assert_eq!(
            action_for(Key::a, ModifierType::CONTROL_MASK),
            Some(KeyAction::SelectAll)
        );
        assert_eq!(action_for(Key::a, ModifierType::empty()), None);
    }

    #[test]
    fn alt_left_is_history_back() {
        assert_eq!(
            action_for(Key::Left, ModifierType::ALT_MASK),
            Some(KeyAction::HistoryBack)
        );
        assert_eq!(action_for(Key::Left, ModifierType::empty()), None);
    }
}
