// Gallery view: a scrollable flow of item tiles keyed by ItemId.
//
// The view is a projection: tiles carry the `selected` CSS class only
// when the reconciler writes it, and all pointer input is forwarded to
// the window's gesture detector rather than interpreted here.

use gtk4::prelude::*;
use gtk4::{
    Align, EventControllerMotion, FlowBox, FlowBoxChild, GestureClick, Label, Orientation,
    PolicyType, ScrolledWindow, SelectionMode,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::models::{ItemDescriptor, ItemId, ItemKind, ViewQuery};
use crate::reconcile::VisualTree;
use crate::selection::GalleryIndex;

/// Raw pointer input forwarded to the gesture detector. Coordinates are
/// local to the tile the pointer is over.
#[derive(Debug, Clone)]
pub enum PointerSignal {
    Down { id: ItemId, x: f64, y: f64 },
    Motion { id: ItemId, x: f64, y: f64 },
    Up,
    Cancel,
}

pub type PointerCallback = Box<dyn Fn(PointerSignal)>;

fn icon_for(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Folder => "folder-symbolic",
        ItemKind::Image => "image-x-generic-symbolic",
        ItemKind::Video => "video-x-generic-symbolic",
        ItemKind::Playlist => "media-playlist-symbolic",
        ItemKind::Other => "text-x-generic-symbolic",
    }
}

/// Scrollable flow of media tiles for one gallery view.
pub struct GalleryView {
    scroller: ScrolledWindow,
    flow: FlowBox,
    tiles: RefCell<HashMap<ItemId, FlowBoxChild>>,
    order: RefCell<Vec<(ItemId, ItemDescriptor)>>,
    query: RefCell<ViewQuery>,
    on_pointer: Rc<RefCell<Option<PointerCallback>>>,
}

impl GalleryView {
    pub fn new() -> Rc<Self> {
        let flow = FlowBox::new();
        flow.set_selection_mode(SelectionMode::None);
        flow.set_valign(Align::Start);
        flow.set_homogeneous(true);
        flow.set_max_children_per_line(8);
        flow.set_column_spacing(4);
        flow.set_row_spacing(4);
        flow.add_css_class("gallery-flow");

        let scroller = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .vscrollbar_policy(PolicyType::Automatic)
            .kinetic_scrolling(true)
            .child(&flow)
            .build();
        scroller.set_hexpand(true);
        scroller.set_vexpand(true);

        Rc::new(Self {
            scroller,
            flow,
            tiles: RefCell::new(HashMap::new()),
            order: RefCell::new(Vec::new()),
            query: RefCell::new(ViewQuery::default()),
            on_pointer: Rc::new(RefCell::new(None)),
        })
    }

    /// The widget to place into the window.
    pub fn widget(&self) -> &ScrolledWindow {
        &self.scroller
    }

    pub fn connect_pointer<F>(&self, callback: F)
    where
        F: Fn(PointerSignal) + 'static,
    {
        *self.on_pointer.borrow_mut() = Some(Box::new(callback));
    }

    /// Replace the view's contents with the items of a new query.
    pub fn set_items(&self, query: ViewQuery, items: Vec<(ItemId, ItemDescriptor)>) {
        self.flow.remove_all();
        self.tiles.borrow_mut().clear();

        for (id, descriptor) in &items {
            let tile = self.build_tile(id, descriptor);
            self.flow.insert(&tile, -1);
            self.tiles.borrow_mut().insert(id.clone(), tile);
        }
        *self.order.borrow_mut() = items;
        *self.query.borrow_mut() = query;
    }

    /// Descriptor for a loaded item, if present.
    pub fn descriptor_for(&self, id: &ItemId) -> Option<ItemDescriptor> {
        self.order
            .borrow()
            .iter()
            .find(|(item_id, _)| item_id == id)
            .map(|(_, descriptor)| descriptor.clone())
    }

    pub fn item_count(&self) -> usize {
        self.order.borrow().len()
    }

    fn build_tile(&self, id: &ItemId, descriptor: &ItemDescriptor) -> FlowBoxChild {
        let content = gtk4::Box::new(Orientation::Vertical, 4);
        content.add_css_class("media-item");
        content.set_size_request(144, 144);

        let icon = gtk4::Image::from_icon_name(icon_for(descriptor.kind));
        icon.set_pixel_size(64);
        icon.set_vexpand(true);
        content.append(&icon);

        let label = Label::new(Some(&descriptor.display_name));
        label.set_ellipsize(gtk4::pango::EllipsizeMode::Middle);
        label.add_css_class("item-name");
        content.append(&label);

        let tile = FlowBoxChild::new();
        tile.set_child(Some(&content));

        // Pointer plumbing: one click gesture and one motion controller
        // per tile, all funneled into the shared detector.
        let click = GestureClick::new();
        click.set_button(1);
        {
            let on_pointer = self.on_pointer.clone();
            let id = id.clone();
            click.connect_pressed(move |_, _n, x, y| {
                if let Some(callback) = &*on_pointer.borrow() {
                    callback(PointerSignal::Down {
                        id: id.clone(),
                        x,
                        y,
                    });
                }
            });
        }
        {
            let on_pointer = self.on_pointer.clone();
            click.connect_released(move |_, _n, _x, _y| {
                if let Some(callback) = &*on_pointer.borrow() {
                    callback(PointerSignal::Up);
                }
            });
        }
        {
            let on_pointer = self.on_pointer.clone();
            click.connect_stopped(move |gesture| {
                // The scroll view claimed the sequence.
                if gesture.current_button() == 0 {
                    if let Some(callback) = &*on_pointer.borrow() {
                        callback(PointerSignal::Cancel);
                    }
                }
            });
        }
        tile.add_controller(click);

        let motion = EventControllerMotion::new();
        {
            let on_pointer = self.on_pointer.clone();
            let id = id.clone();
            motion.connect_motion(move |_, x, y| {
                if let Some(callback) = &*on_pointer.borrow() {
                    callback(PointerSignal::Motion {
                        id: id.clone(),
                        x,
                        y,
                    });
                }
            });
        }
        tile.add_controller(motion);

        tile
    }
}

impl VisualTree for GalleryView {
    fn set_selected(&self, id: &ItemId, selected: bool) {
        // Ids without a rendered tile (paginated select-all) are fine.
        if let Some(tile) = self.tiles.borrow().get(id) {
            if selected {
                tile.add_css_class("selected");
            } else {
                tile.remove_css_class("selected");
            }
        }
    }
}

impl GalleryIndex for GalleryView {
    fn ordered_items(&self) -> Vec<(ItemId, ItemDescriptor)> {
        self.order.borrow().clone()
    }

    fn current_query(&self) -> ViewQuery {
        self.query.borrow().clone()
    }
}
