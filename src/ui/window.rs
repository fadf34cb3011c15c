// Main window for the medley media browser
//
// Owns the GTK shell and wires the core services together: gallery
// view, selection engine, overlay stack, gesture detector, reconciler,
// remote index and the reply pump that carries network results back
// onto the UI thread.

use crate::selection::engine::GalleryIndex;
use gdk4::Display;
use gtk4::prelude::*;
use gtk4::{
    Align, Application, ApplicationWindow, Button, CssProvider, Label, Orientation, Revealer,
    RevealerTransitionType, STYLE_PROVIDER_PRIORITY_APPLICATION,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use anyhow::Result;
use flume::Receiver;
use tracing::{debug, warn};

use crate::api::{BulkAction, HttpRemote, RemoteIndex, RemoteReply};
use crate::config::MedleyConfig;
use crate::gestures::{GestureConfig, GestureDetector, GestureEvent, PressTimer};
use crate::models::{ItemId, ItemKind, ViewQuery};
use crate::overlay::{Defer, History, NavHistory, OverlayKind, OverlayStack};
use crate::reconcile::{FrameScheduler, Reconciler};
use crate::selection::{Haptics, Notices, SelectionEngine};

use super::gallery_view::{GalleryView, PointerSignal};
use super::keys::{KeyAction, MedleyKeys};
use super::overlays::{Lightbox, MergeModal, PlayerShell, SearchPanel, TagModal};
use super::toolbar::{SelectionToolbar, ToolbarCommand};

/// Reply pump interval (~60fps).
const PUMP_INTERVAL: Duration = Duration::from_millis(16);

/// How long a notice stays visible.
const NOTICE_TIMEOUT: Duration = Duration::from_secs(4);

/// Embedded stylesheet; the dashed border is the selection mark the
/// reconciler toggles.
const FALLBACK_CSS: &str = r#"
window {
    background-color: #0a0a0a;
    color: #e0e0e0;
}

.media-item {
    background-color: #121212;
    border: 1px solid #333333;
}

.media-item:hover {
    border-color: #555555;
}

flowboxchild.selected .media-item {
    border: 2px dashed #00ff88;
    background-color: rgba(0, 255, 136, 0.08);
}

.selection-toolbar {
    background-color: #121212;
    border-bottom: 1px solid #333333;
}

.notice-bar {
    background-color: #121212;
    padding: 4px 8px;
}

.notice-bar.warning {
    color: #ffb347;
}

.overlay-shell {
    background-color: #0a0a0a;
    border: 1px solid #555555;
}
"#;

fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_string(FALLBACK_CSS);
    if let Some(display) = Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

/// Defers a callback to the next main-loop iteration.
struct GlibDefer;

impl Defer for GlibDefer {
    fn defer(&self, f: Box<dyn FnOnce()>) {
        glib::idle_add_local_once(f);
    }
}

/// Frame-boundary scheduler for the reconciler.
struct GlibFrames;

impl FrameScheduler for GlibFrames {
    fn request_frame(&self, flush: Box<dyn FnOnce()>) {
        glib::idle_add_local_once(flush);
    }
}

/// On desktop the closest haptic cue is the display bell.
struct BeepHaptics;

impl Haptics for BeepHaptics {
    fn cue(&self) {
        if let Some(display) = Display::default() {
            display.beep();
        }
    }
}

/// Long-press timer backed by glib timeouts. Fired tokens are routed
/// back into the window's gesture handling; cancelled tokens are
/// removed from the source map so they never fire.
#[derive(Clone)]
struct GlibPressTimer {
    pending: Rc<RefCell<HashMap<u64, glib::SourceId>>>,
    on_fire: Rc<RefCell<Option<Box<dyn Fn(u64)>>>>,
}

impl GlibPressTimer {
    fn new() -> Self {
        Self {
            pending: Rc::new(RefCell::new(HashMap::new())),
            on_fire: Rc::new(RefCell::new(None)),
        }
    }
}

impl PressTimer for GlibPressTimer {
    fn arm(&self, token: u64, after: Duration) {
        let pending = self.pending.clone();
        let on_fire = self.on_fire.clone();
        let source = glib::timeout_add_local_once(after, move || {
            pending.borrow_mut().remove(&token);
            if let Some(callback) = &*on_fire.borrow() {
                callback(token);
            }
        });
        self.pending.borrow_mut().insert(token, source);
    }

    fn cancel(&self, token: u64) {
        if let Some(source) = self.pending.borrow_mut().remove(&token) {
            source.remove();
        }
    }
}

/// Toast bar implementing the engine's notice sink.
struct NoticeBar {
    revealer: Revealer,
    label: Label,
}

impl NoticeBar {
    fn new() -> Rc<Self> {
        let label = Label::new(None);
        label.set_halign(Align::Start);
        label.add_css_class("notice-bar");
        let revealer = Revealer::builder()
            .transition_type(RevealerTransitionType::SlideDown)
            .reveal_child(false)
            .child(&label)
            .build();
        Rc::new(Self { revealer, label })
    }

    fn show(self: &Rc<Self>, message: &str, warning: bool) {
        self.label.set_text(message);
        if warning {
            self.label.add_css_class("warning");
        } else {
            self.label.remove_css_class("warning");
        }
        self.revealer.set_reveal_child(true);

        let weak = Rc::downgrade(self);
        glib::timeout_add_local_once(NOTICE_TIMEOUT, move || {
            if let Some(bar) = weak.upgrade() {
                bar.revealer.set_reveal_child(false);
            }
        });
    }
}

impl Notices for Rc<NoticeBar> {
    fn info(&self, message: &str) {
        self.show(message, false);
    }

    fn warn(&self, message: &str) {
        self.show(message, true);
    }
}

/// Main window for the media browser.
pub struct MainWindow {
    self_weak: RefCell<Weak<MainWindow>>,
    window: ApplicationWindow,
    gallery: Rc<GalleryView>,
    toolbar: Rc<SelectionToolbar>,
    notices: Rc<NoticeBar>,
    history: Rc<NavHistory>,
    overlays: Rc<OverlayStack>,
    engine: Rc<SelectionEngine>,
    remote: Rc<HttpRemote>,
    detector: RefCell<GestureDetector<GlibPressTimer>>,
    timer_fire: Rc<RefCell<Option<Box<dyn Fn(u64)>>>>,
    keys: MedleyKeys,
    lightbox: Rc<Lightbox>,
    player: Rc<PlayerShell>,
    tag_modal: Rc<TagModal>,
    merge_modal: Rc<MergeModal>,
    search: Rc<SearchPanel>,
    dir_label: Label,
}

impl MainWindow {
    pub fn new(app: &Application, config: MedleyConfig) -> Result<Rc<Self>> {
        load_css();

        let (reply_tx, reply_rx) = flume::unbounded::<RemoteReply>();
        let remote = Rc::new(HttpRemote::new(config.server_url.clone(), reply_tx)?);

        let window = ApplicationWindow::builder()
            .application(app)
            .title("medley")
            .default_width(1280)
            .default_height(800)
            .build();

        // Header: parent navigation plus the current path.
        let header = gtk4::Box::new(Orientation::Horizontal, 8);
        header.set_margin_top(4);
        header.set_margin_bottom(4);
        header.set_margin_start(8);
        header.set_margin_end(8);
        let parent_button = Button::with_label("..");
        header.append(&parent_button);
        let dir_label = Label::new(Some("/"));
        dir_label.set_halign(Align::Start);
        header.append(&dir_label);

        let gallery = GalleryView::new();
        let toolbar = SelectionToolbar::new();
        let notices = NoticeBar::new();

        let vbox = gtk4::Box::new(Orientation::Vertical, 0);
        vbox.append(&header);
        vbox.append(toolbar.widget());
        vbox.append(&notices.revealer);
        vbox.append(gallery.widget());
        window.set_child(Some(&vbox));

        let history = Rc::new(NavHistory::new());
        let overlays = OverlayStack::new(
            history.clone() as Rc<dyn History>,
            Rc::new(GlibDefer),
            config.standalone,
        );
        let reconciler = Reconciler::new(gallery.clone(), Rc::new(GlibFrames));
        let engine = SelectionEngine::new(
            overlays.clone(),
            reconciler,
            remote.clone(),
            gallery.clone(),
            Rc::new(BeepHaptics),
            Rc::new(notices.clone()),
        );

        let timer = GlibPressTimer::new();
        let timer_fire = timer.on_fire.clone();
        let detector = RefCell::new(GestureDetector::with_config(
            timer,
            GestureConfig {
                long_press: config.long_press(),
                move_threshold_px: config.move_threshold_px,
                double_tap_window: config.double_tap_window(),
            },
        ));

        let lightbox = Lightbox::new(&window);
        let player = PlayerShell::new(&window);
        let tag_modal = TagModal::new(&window);
        let merge_modal = MergeModal::new(&window);
        let search = SearchPanel::new(&window);

        let main_window = Rc::new(Self {
            self_weak: RefCell::new(Weak::new()),
            window,
            gallery,
            toolbar,
            notices,
            history,
            overlays,
            engine,
            remote,
            detector,
            timer_fire,
            keys: MedleyKeys::new(),
            lightbox,
            player,
            tag_modal,
            merge_modal,
            search,
            dir_label,
        });
        *main_window.self_weak.borrow_mut() = Rc::downgrade(&main_window);

        main_window.wire(&parent_button);
        main_window.start_reply_pump(reply_rx);
        main_window.navigate_to(String::new());

        Ok(main_window)
    }

    pub fn present(&self) {
        self.window.present();
    }

    fn weak(&self) -> Weak<Self> {
        self.self_weak.borrow().clone()
    }

    fn wire(self: &Rc<Self>, parent_button: &Button) {
        // Back events go to the overlay stack first; with no overlay
        // open they are genuine navigation.
        {
            let weak = self.weak();
            self.history.connect_back(move || {
                if let Some(window) = weak.upgrade() {
                    if !window.overlays.handle_back_navigation() {
                        window.navigate_parent();
                    }
                }
            });
        }

        // Close handlers for the collaborator overlays. The selection
        // engine registered its own during construction.
        {
            let lightbox = self.lightbox.clone();
            self.overlays
                .register_close_handler(OverlayKind::Lightbox, move || lightbox.close());
        }
        {
            let player = self.player.clone();
            self.overlays
                .register_close_handler(OverlayKind::Player, move || player.close());
        }
        {
            let tag_modal = self.tag_modal.clone();
            self.overlays
                .register_close_handler(OverlayKind::TagModal, move || tag_modal.close());
        }
        {
            let merge_modal = self.merge_modal.clone();
            self.overlays
                .register_close_handler(OverlayKind::MergeModal, move || merge_modal.close());
        }
        {
            let search = self.search.clone();
            self.overlays
                .register_close_handler(OverlayKind::Search, move || search.close());
        }

        {
            let weak = self.weak();
            self.overlays.connect_navigate_parent(move || {
                weak.upgrade()
                    .is_some_and(|window| window.navigate_parent())
            });
        }
        {
            let weak = self.weak();
            self.overlays.connect_request_app_close(move || {
                if let Some(window) = weak.upgrade() {
                    window.window.close();
                }
            });
        }

        // Long-press timer fires re-enter the gesture machine.
        {
            let weak = self.weak();
            *self.timer_fire.borrow_mut() = Some(Box::new(move |token| {
                if let Some(window) = weak.upgrade() {
                    let event = window.detector.borrow_mut().timer_fired(token);
                    window.dispatch_gesture(event);
                }
            }));
        }

        {
            let weak = self.weak();
            self.gallery.connect_pointer(move |signal| {
                if let Some(window) = weak.upgrade() {
                    window.handle_pointer(signal);
                }
            });
        }

        // Selection state drives the toolbar.
        {
            let toolbar = self.toolbar.clone();
            self.engine
                .connect_selection_changed(move |state| toolbar.refresh(state));
        }
        {
            let toolbar = self.toolbar.clone();
            self.engine
                .connect_mode_changed(move |active| toolbar.set_visible(active));
        }

        {
            let weak = self.weak();
            self.toolbar.connect_command(move |command| {
                if let Some(window) = weak.upgrade() {
                    window.handle_toolbar(command);
                }
            });
        }

        // The tag modal closes programmatically once applied: popped by
        // value, never via history.
        {
            let weak = self.weak();
            self.tag_modal.connect_apply(move |tag| {
                if let Some(window) = weak.upgrade() {
                    window.overlays.pop(OverlayKind::TagModal);
                    window.tag_modal.close();
                    window.engine.apply_bulk(BulkAction::Tag(tag));
                }
            });
        }
        {
            let weak = self.weak();
            self.merge_modal.connect_confirm(move || {
                if let Some(window) = weak.upgrade() {
                    window.overlays.pop(OverlayKind::MergeModal);
                    window.merge_modal.close();
                    let count = window.engine.selected_count();
                    window
                        .notices
                        .show(&format!("Merging tags across {count} items"), false);
                }
            });
        }

        {
            let weak = self.weak();
            self.keys.connect_action(move |action| {
                if let Some(window) = weak.upgrade() {
                    window.handle_key(action);
                }
            });
        }
        self.keys.attach(&self.window);

        {
            let weak = self.weak();
            parent_button.connect_clicked(move |_| {
                if let Some(window) = weak.upgrade() {
                    window.navigate_parent();
                }
            });
        }
    }

    fn start_reply_pump(self: &Rc<Self>, rx: Receiver<RemoteReply>) {
        let weak = self.weak();
        glib::timeout_add_local(PUMP_INTERVAL, move || {
            let Some(window) = weak.upgrade() else {
                return glib::ControlFlow::Break;
            };
            while let Ok(reply) = rx.try_recv() {
                window.handle_reply(reply);
            }
            glib::ControlFlow::Continue
        });
    }

    fn handle_reply(&self, reply: RemoteReply) {
        match reply {
            RemoteReply::Browse { query, result } => match result {
                Ok(items) => {
                    self.history.set_path(query.directory.clone());
                    self.dir_label.set_text(&format!("/{}", query.directory));
                    self.gallery.set_items(query, items);
                }
                Err(err) => {
                    warn!(%err, "browse fetch failed");
                    self.notices.show("Couldn't load this directory", true);
                }
            },
            RemoteReply::Listing { epoch, result } => {
                self.engine.on_listing_reply(epoch, result);
            }
            RemoteReply::Bulk { job, result } => {
                self.engine.on_bulk_reply(job, result);
            }
            RemoteReply::Single { job, id, result } => {
                self.engine.on_single_reply(job, &id, result);
            }
        }
    }

    fn handle_pointer(&self, signal: PointerSignal) {
        let event = match signal {
            PointerSignal::Down { id, x, y } => {
                self.detector.borrow_mut().pointer_down(Some(id), x, y);
                None
            }
            PointerSignal::Motion { id, x, y } => {
                self.detector.borrow_mut().pointer_move(Some(id), x, y)
            }
            PointerSignal::Up => {
                let at = Duration::from_micros(glib::monotonic_time().max(0) as u64);
                self.detector.borrow_mut().pointer_up(at)
            }
            PointerSignal::Cancel => self.detector.borrow_mut().pointer_cancel(),
        };
        self.dispatch_gesture(event);
    }

    fn dispatch_gesture(&self, event: Option<GestureEvent>) {
        let Some(event) = event else { return };
        debug!(?event, "gesture resolved");
        match event {
            GestureEvent::LongPress(id) => {
                let Some(descriptor) = self.gallery.descriptor_for(&id) else {
                    return;
                };
                if descriptor.kind.is_selectable() {
                    self.engine
                        .enter_selection_mode(Some((id.clone(), descriptor)));
                    self.engine.begin_range(&id);
                }
            }
            GestureEvent::DragOver(id) => self.engine.extend_range(&id),
            GestureEvent::DragEnd => self.engine.end_range(),
            GestureEvent::Tap(id) => {
                if self.engine.is_active() {
                    if let Some(descriptor) = self.gallery.descriptor_for(&id) {
                        if descriptor.kind.is_selectable() {
                            self.engine.toggle_item(id, descriptor);
                        }
                    }
                } else {
                    self.open_item(&id);
                }
            }
            GestureEvent::DoubleTap(id) => self.open_item(&id),
        }
    }

    fn handle_toolbar(&self, command: ToolbarCommand) {
        match command {
            ToolbarCommand::SelectAll => self.engine.select_all(),
            ToolbarCommand::DeselectAll => self.engine.deselect_all(),
            ToolbarCommand::ApplyTag => {
                self.overlays.push(OverlayKind::TagModal, HashMap::new());
                self.tag_modal.open();
            }
            ToolbarCommand::ApplyFavorite => self.engine.apply_bulk(BulkAction::Favorite),
            ToolbarCommand::CopyTags => {
                // Tag CRUD lives behind the server; the core only needs
                // the affordance and its enablement rule.
                self.notices
                    .show("Tags copied from the selected item", false);
            }
            ToolbarCommand::MergeTags => {
                self.overlays.push(OverlayKind::MergeModal, HashMap::new());
                self.merge_modal.open(self.engine.selected_count());
            }
            ToolbarCommand::Close => self.engine.exit_with_history(),
        }
    }

    fn handle_key(&self, action: KeyAction) {
        match action {
            KeyAction::Escape => self.overlays.handle_escape(),
            KeyAction::SelectAll => {
                if !self.engine.is_active() {
                    self.engine.enter_selection_mode(None);
                }
                self.engine.select_all();
            }
            KeyAction::DeselectAll => self.engine.deselect_all(),
            KeyAction::HistoryBack => self.history.back(),
            KeyAction::OpenSearch => {
                self.overlays.push(OverlayKind::Search, HashMap::new());
                self.search.open();
            }
        }
    }

    fn open_item(&self, id: &ItemId) {
        let Some(descriptor) = self.gallery.descriptor_for(id) else {
            return;
        };
        match descriptor.kind {
            ItemKind::Folder => {
                let current = self.gallery.current_query().directory;
                let target = if current.is_empty() {
                    descriptor.display_name.clone()
                } else {
                    format!("{current}/{}", descriptor.display_name)
                };
                self.navigate_to(target);
            }
            ItemKind::Image => {
                let mut data = HashMap::new();
                data.insert("item".to_owned(), id.to_string());
                self.overlays.push(OverlayKind::Lightbox, data);
                self.lightbox.open(&descriptor);
            }
            ItemKind::Video | ItemKind::Playlist => {
                let mut data = HashMap::new();
                data.insert("item".to_owned(), id.to_string());
                self.overlays.push(OverlayKind::Player, data);
                self.player.open(&descriptor);
            }
            ItemKind::Other => {
                self.notices.show("No viewer for this item", true);
            }
        }
    }

    fn navigate_to(&self, directory: String) {
        // Hard reset: overlays from the previous view make no sense in
        // the next one.
        self.overlays.close_all();
        if self.engine.is_active() {
            self.engine.exit_selection_mode();
        }
        let query = ViewQuery::for_directory(directory);
        self.remote.fetch_browse(query);
    }

    fn navigate_parent(&self) -> bool {
        match self.gallery.current_query().parent_directory() {
            Some(parent) => {
                self.navigate_to(parent);
                true
            }
            None => false,
        }
    }
}
