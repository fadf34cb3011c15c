// Selection toolbar: the visible face of selection mode.
//
// A revealer above the gallery showing the live count and the bulk
// actions. Sensitivity is a pure projection of ToolbarState; the
// buttons only forward clicks to the window's wiring.

use gtk4::prelude::*;
use gtk4::{Button, Label, Orientation, Revealer, RevealerTransitionType};
use std::cell::RefCell;
use std::rc::Rc;

use crate::selection::ToolbarState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarCommand {
    SelectAll,
    DeselectAll,
    ApplyTag,
    ApplyFavorite,
    CopyTags,
    MergeTags,
    Close,
}

pub type CommandCallback = Box<dyn Fn(ToolbarCommand)>;

pub struct SelectionToolbar {
    revealer: Revealer,
    count_label: Label,
    select_all: Button,
    deselect_all: Button,
    apply_tag: Button,
    apply_favorite: Button,
    copy_tags: Button,
    merge_tags: Button,
    on_command: Rc<RefCell<Option<CommandCallback>>>,
}

impl SelectionToolbar {
    pub fn new() -> Rc<Self> {
        let bar = gtk4::Box::new(Orientation::Horizontal, 8);
        bar.add_css_class("selection-toolbar");
        bar.set_margin_top(4);
        bar.set_margin_bottom(4);
        bar.set_margin_start(8);
        bar.set_margin_end(8);

        let count_label = Label::new(Some("0 selected"));
        count_label.add_css_class("selection-count");
        bar.append(&count_label);

        let select_all = Button::with_label("Select all");
        let deselect_all = Button::with_label("Deselect all");
        let apply_tag = Button::with_label("Tag");
        let apply_favorite = Button::with_label("Favorite");
        let copy_tags = Button::with_label("Copy tags");
        let merge_tags = Button::with_label("Merge tags");
        let close = Button::with_label("Done");
        close.add_css_class("toolbar-close");

        for button in [
            &select_all,
            &deselect_all,
            &apply_tag,
            &apply_favorite,
            &copy_tags,
            &merge_tags,
            &close,
        ] {
            bar.append(button);
        }

        let revealer = Revealer::builder()
            .transition_type(RevealerTransitionType::SlideDown)
            .reveal_child(false)
            .child(&bar)
            .build();

        let on_command: Rc<RefCell<Option<CommandCallback>>> = Rc::new(RefCell::new(None));
        let toolbar = Rc::new(Self {
            revealer,
            count_label,
            select_all,
            deselect_all,
            apply_tag,
            apply_favorite,
            copy_tags,
            merge_tags,
            on_command,
        });

        toolbar.wire(&toolbar.select_all, ToolbarCommand::SelectAll);
        toolbar.wire(&toolbar.deselect_all, ToolbarCommand::DeselectAll);
        toolbar.wire(&toolbar.apply_tag, ToolbarCommand::ApplyTag);
        toolbar.wire(&toolbar.apply_favorite, ToolbarCommand::ApplyFavorite);
        toolbar.wire(&toolbar.copy_tags, ToolbarCommand::CopyTags);
        toolbar.wire(&toolbar.merge_tags, ToolbarCommand::MergeTags);
        toolbar.wire(&close, ToolbarCommand::Close);

        toolbar
    }

    fn wire(&self, button: &Button, command: ToolbarCommand) {
        let on_command = self.on_command.clone();
        button.connect_clicked(move |_| {
            if let Some(callback) = &*on_command.borrow() {
                callback(command);
            }
        });
    }

    pub fn widget(&self) -> &Revealer {
        &self.revealer
    }

    pub fn connect_command<F>(&self, callback: F)
    where
        F: Fn(ToolbarCommand) + 'static,
    {
        *self.on_command.borrow_mut() = Some(Box::new(callback));
    }

    pub fn set_visible(&self, visible: bool) {
        self.revealer.set_reveal_child(visible);
    }

    /// Project the recomputed enablement onto the buttons.
    pub fn refresh(&self, state: &ToolbarState) {
        self.count_label.set_text(&state.summary());
        self.select_all
            .set_label(if state.all_selected { "Reselect" } else { "Select all" });
        self.deselect_all.set_sensitive(state.selected > 0);
        self.apply_tag.set_sensitive(state.can_apply_tag);
        self.apply_favorite.set_sensitive(state.can_apply_favorite);
        self.copy_tags.set_sensitive(state.can_copy_tags);
        self.merge_tags.set_sensitive(state.can_merge_tags);
    }
}
