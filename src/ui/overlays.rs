// Collaborator overlay surfaces: lightbox, tag modal, merge modal,
// player shell, search panel.
//
// These are deliberately thin: playback, tag CRUD and search results
// are plumbing behind narrow interfaces. What matters to the core is
// the contract every surface honors — a parameterless, idempotent,
// non-throwing close() that the overlay stack invokes on back
// navigation or close_all().

use gtk4::prelude::*;
use gtk4::{Align, Button, Entry, Label, Orientation, Window};
use std::cell::RefCell;
use std::rc::Rc;

use crate::models::ItemDescriptor;

const SHELL_MARGIN: i32 = 12;

/// Shared chrome for a transient overlay window.
struct OverlayShell {
    window: Window,
    content: gtk4::Box,
}

impl OverlayShell {
    fn new(parent: &impl IsA<Window>, title: &str) -> Self {
        let content = gtk4::Box::new(Orientation::Vertical, 8);
        content.set_margin_top(SHELL_MARGIN);
        content.set_margin_bottom(SHELL_MARGIN);
        content.set_margin_start(SHELL_MARGIN);
        content.set_margin_end(SHELL_MARGIN);

        let window = Window::builder()
            .transient_for(parent)
            .modal(false)
            .decorated(false)
            .title(title)
            .child(&content)
            .build();
        window.add_css_class("overlay-shell");
        // Dismissal goes through the overlay stack, never the WM.
        window.set_hide_on_close(true);

        Self { window, content }
    }

    fn open(&self) {
        if !self.window.is_visible() {
            self.window.present();
        }
    }

    fn close(&self) {
        if self.window.is_visible() {
            self.window.set_visible(false);
        }
    }

    fn is_open(&self) -> bool {
        self.window.is_visible()
    }
}

/// Full-screen image surface.
pub struct Lightbox {
    shell: OverlayShell,
    caption: Label,
}

impl Lightbox {
    pub fn new(parent: &impl IsA<Window>) -> Rc<Self> {
        let shell = OverlayShell::new(parent, "Lightbox");
        shell.window.set_default_size(960, 720);
        let caption = Label::new(None);
        caption.set_halign(Align::Center);
        caption.add_css_class("lightbox-caption");
        shell.content.append(&caption);
        Rc::new(Self { shell, caption })
    }

    pub fn open(&self, descriptor: &ItemDescriptor) {
        self.caption.set_text(&descriptor.display_name);
        self.shell.open();
    }

    pub fn close(&self) {
        self.shell.close();
    }

    pub fn is_open(&self) -> bool {
        self.shell.is_open()
    }
}

/// Video/audio playback surface.
pub struct PlayerShell {
    shell: OverlayShell,
    title: Label,
}

impl PlayerShell {
    pub fn new(parent: &impl IsA<Window>) -> Rc<Self> {
        let shell = OverlayShell::new(parent, "Player");
        shell.window.set_default_size(960, 540);
        let title = Label::new(None);
        title.add_css_class("player-title");
        shell.content.append(&title);
        Rc::new(Self { shell, title })
    }

    pub fn open(&self, descriptor: &ItemDescriptor) {
        self.title.set_text(&descriptor.display_name);
        self.shell.open();
    }

    pub fn close(&self) {
        self.shell.close();
    }
}

/// Modal for applying a tag to the current selection.
pub struct TagModal {
    shell: OverlayShell,
    entry: Entry,
    on_apply: Rc<RefCell<Option<Box<dyn Fn(String)>>>>,
}

impl TagModal {
    pub fn new(parent: &impl IsA<Window>) -> Rc<Self> {
        let shell = OverlayShell::new(parent, "Apply tag");
        let entry = Entry::new();
        entry.set_placeholder_text(Some("Tag name"));
        shell.content.append(&entry);

        let apply = Button::with_label("Apply to selection");
        shell.content.append(&apply);

        let on_apply: Rc<RefCell<Option<Box<dyn Fn(String)>>>> = Rc::new(RefCell::new(None));
        {
            let on_apply = on_apply.clone();
            let entry = entry.clone();
            apply.connect_clicked(move |_| {
                let tag = entry.text().trim().to_owned();
                if tag.is_empty() {
                    return;
                }
                if let Some(callback) = &*on_apply.borrow() {
                    callback(tag);
                }
            });
        }

        Rc::new(Self {
            shell,
            entry,
            on_apply,
        })
    }

    pub fn connect_apply<F>(&self, callback: F)
    where
        F: Fn(String) + 'static,
    {
        *self.on_apply.borrow_mut() = Some(Box::new(callback));
    }

    pub fn open(&self) {
        self.entry.set_text("");
        self.shell.open();
        self.entry.grab_focus();
    }

    pub fn close(&self) {
        self.shell.close();
    }
}

/// Modal for merging the tags of the selected items.
pub struct MergeModal {
    shell: OverlayShell,
    summary: Label,
    on_confirm: Rc<RefCell<Option<Box<dyn Fn()>>>>,
}

impl MergeModal {
    pub fn new(parent: &impl IsA<Window>) -> Rc<Self> {
        let shell = OverlayShell::new(parent, "Merge tags");
        let summary = Label::new(None);
        shell.content.append(&summary);

        let confirm = Button::with_label("Merge");
        shell.content.append(&confirm);

        let on_confirm: Rc<RefCell<Option<Box<dyn Fn()>>>> = Rc::new(RefCell::new(None));
        {
            let on_confirm = on_confirm.clone();
            confirm.connect_clicked(move |_| {
                if let Some(callback) = &*on_confirm.borrow() {
                    callback();
                }
            });
        }

        Rc::new(Self {
            shell,
            summary,
            on_confirm,
        })
    }

    pub fn connect_confirm<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        *self.on_confirm.borrow_mut() = Some(Box::new(callback));
    }

    pub fn open(&self, selected: usize) {
        self.summary
            .set_text(&format!("Merge tags across {selected} items"));
        self.shell.open();
    }

    pub fn close(&self) {
        self.shell.close();
    }
}

/// Search results surface.
pub struct SearchPanel {
    shell: OverlayShell,
    entry: Entry,
}

impl SearchPanel {
    pub fn new(parent: &impl IsA<Window>) -> Rc<Self> {
        let shell = OverlayShell::new(parent, "Search");
        let entry = Entry::new();
        entry.set_placeholder_text(Some("Search the gallery"));
        shell.content.append(&entry);
        Rc::new(Self { shell, entry })
    }

    pub fn open(&self) {
        self.shell.open();
        self.entry.grab_focus();
    }

    pub fn close(&self) {
        self.shell.close();
    }
}
