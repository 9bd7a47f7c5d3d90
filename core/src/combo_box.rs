use crate::color::Color;
use crate::control::{Control, ControlState};
use crate::draw::DrawContext;
use crate::events::{EventType, UIEvent};
use crate::label::Label;
use crate::list_view::ListView;
use crate::overlay::OverlayManager;
use crate::path::{Path, Segment};
use crate::rect::Rect;
use crate::responder::ResponderChain;
use crate::scroll_view::ScrollView;
use crate::selection::SelectionMode;
use crate::view::{View, ViewDelegate, WeakView};
use crate::window::Window;
use cgmath::Point2;
use core::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

const ITEM_HEIGHT: f64 = 20.;
const MAX_LIST_HEIGHT: f64 = 200.;

struct ComboBoxState {
    control: ControlState,
    manager: Rc<OverlayManager>,
    items: RefCell<Vec<String>>,
    selected: Cell<Option<usize>>,
    window: RefCell<Option<Window>>,
    did_select_fn: RefCell<Option<Rc<dyn Fn(usize)>>>,
}

impl ComboBoxState {
    fn is_open(&self) -> bool {
        self.window.borrow().is_some()
    }

    fn open(self: &Rc<Self>, view: &View) {
        if self.is_open() {
            return;
        }
        // only one overlay at a time
        self.manager.close_all();

        let items = self.items.borrow().clone();
        let anchor = view.resolved_rect();
        let height = (items.len() as f64 * ITEM_HEIGHT).min(MAX_LIST_HEIGHT).max(ITEM_HEIGHT);
        let window = Window::new(
            &format!("{} list", view.name()),
            Rect::from_xywh(anchor.origin.x, anchor.max_y(), anchor.width(), height),
        );
        window.content_view().set_background(Color::CONTROL);

        let scroll_view = ScrollView::new("comboScroll");
        scroll_view
            .view()
            .set_frame(Rect::from_xywh(0., 0., anchor.width(), height));
        let list = ListView::new("comboList", ITEM_HEIGHT, SelectionMode::Single);
        let count = items.len();
        list.set_nb_rows_fn(move || count);
        list.set_view_for_row_fn(move |row| {
            let label = Label::new("item", items.get(row).map_or("", String::as_str));
            label.view().clone()
        });
        scroll_view.set_content_view(list.view());
        scroll_view.set_fits_width(true);
        window.content_view().add_subview(scroll_view.view());
        list.reload();

        if let Some(selected) = self.selected.get() {
            list.select_row(selected, true);
            scroll_view.scroll_to_visible(list.row_frame(selected));
        }

        let combo = Rc::downgrade(self);
        let combo_view = view.downgrade();
        list.set_did_click_row_fn(move |row| {
            if let (Some(combo), Some(view)) = (combo.upgrade(), combo_view.upgrade()) {
                combo.choose(&view, row);
            }
        });

        let on_close = Self::on_close(Rc::downgrade(self), view.downgrade());
        *self.window.borrow_mut() = Some(window.clone());
        self.manager.open(window, Some(on_close));
        view.set_dirty();
    }

    fn on_close(combo: Weak<ComboBoxState>, view: WeakView) -> Rc<dyn Fn()> {
        Rc::new(move || {
            if let Some(combo) = combo.upgrade() {
                combo.window.borrow_mut().take();
            }
            if let Some(view) = view.upgrade() {
                view.set_dirty();
            }
        })
    }

    fn close(&self) {
        let window = self.window.borrow_mut().take();
        if let Some(window) = window {
            self.manager.close(window.id());
        }
    }

    fn choose(&self, view: &View, row: usize) {
        self.close();
        self.selected.set(Some(row));
        view.set_dirty();
        let did_select = self.did_select_fn.borrow().clone();
        if let Some(did_select) = did_select {
            did_select(row);
        }
    }

    fn arrow() -> Path {
        Path::from_segments(vec![
            Segment::MoveTo(Point2::new(0., 0.)),
            Segment::LineTo(Point2::new(8., 0.)),
            Segment::LineTo(Point2::new(4., 5.)),
            Segment::Close,
        ])
    }
}

/// Delegate wrapper, since opening needs an `Rc` of the state.
struct ComboBoxDelegate(Rc<ComboBoxState>);

impl ViewDelegate for ComboBoxDelegate {
    fn handle_event(&self, view: &View, event: &UIEvent, _chain: &ResponderChain) -> bool {
        let state = &self.0;
        if !state.control.is_enabled() || event.event_type() != EventType::MouseDown {
            return false;
        }
        if state.is_open() {
            state.close();
        } else {
            state.open(view);
        }
        true
    }

    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        let state = &self.0;
        let bounds = view.bounds();
        let alpha = if state.control.is_enabled() { 1. } else { 0.4 };
        let fill = if state.is_open() {
            Color::HIGHLIGHT
        } else {
            Color::CONTROL
        };
        ctx.fill_rect(bounds, fill.with_alpha(alpha));
        let title = state
            .selected
            .get()
            .and_then(|i| state.items.borrow().get(i).cloned())
            .unwrap_or_default();
        ctx.draw_text(
            Rect::from_xywh(4., 0., bounds.width() - 20., bounds.height()),
            &title,
            Color::TEXT.with_alpha(alpha),
        );
        ctx.fill_path(
            Point2::new(bounds.max_x() - 14., bounds.height() / 2. - 2.),
            &ComboBoxState::arrow(),
            Color::TEXT.with_alpha(alpha),
        );
    }
}

/// A button that opens a list of items in an overlay.
///
/// Opening one combo box closes every other overlay managed by the same [`OverlayManager`].
#[derive(Clone)]
pub struct ComboBox {
    view: View,
    state: Rc<ComboBoxState>,
}

impl ComboBox {
    pub fn new(name: &str, manager: &Rc<OverlayManager>) -> ComboBox {
        let state = Rc::new(ComboBoxState {
            control: ControlState::default(),
            manager: Rc::clone(manager),
            items: RefCell::new(Vec::new()),
            selected: Cell::new(None),
            window: RefCell::new(None),
            did_select_fn: RefCell::new(None),
        });
        ComboBox {
            view: View::with_delegate(name, Rc::new(ComboBoxDelegate(Rc::clone(&state)))),
            state,
        }
    }

    pub fn items(&self) -> Vec<String> {
        self.state.items.borrow().clone()
    }

    /// Replaces the items, keeping the selection if it is still in range.
    pub fn set_items(&self, items: Vec<String>) {
        let len = items.len();
        *self.state.items.borrow_mut() = items;
        if self.state.selected.get().map_or(false, |i| i >= len) {
            self.state.selected.set(None);
        }
        self.close();
        self.view.set_dirty();
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.state.selected.get()
    }

    pub fn selected_item(&self) -> Option<String> {
        let index = self.selected_index()?;
        self.state.items.borrow().get(index).cloned()
    }

    /// Selects an item without firing `did_select`.
    pub fn set_selected_index(&self, index: Option<usize>) {
        let index = index.filter(|i| *i < self.state.items.borrow().len());
        self.state.selected.set(index);
        self.view.set_dirty();
    }

    pub fn set_did_select_fn(&self, f: impl Fn(usize) + 'static) {
        *self.state.did_select_fn.borrow_mut() = Some(Rc::new(f));
    }

    /// Opens the item list below the combo box.
    pub fn open(&self) {
        self.state.open(&self.view);
    }

    pub fn close(&self) {
        self.state.close();
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// The overlay window while open.
    pub fn window(&self) -> Option<Window> {
        self.state.window.borrow().clone()
    }
}

impl Control for ComboBox {
    fn view(&self) -> &View {
        &self.view
    }

    fn control_state(&self) -> &ControlState {
        &self.state.control
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(name: &str, manager: &Rc<OverlayManager>, y: f64) -> ComboBox {
        let combo = ComboBox::new(name, manager);
        combo.view().set_frame(Rect::from_xywh(10., y, 100., 20.));
        combo.set_items(vec!["one".into(), "two".into(), "three".into()]);
        combo
    }

    #[test]
    fn opening_one_closes_the_other() {
        let manager = OverlayManager::new();
        let root = View::new("root");
        root.set_frame(Rect::from_xywh(0., 0., 300., 300.));
        let first = combo("first", &manager, 10.);
        let second = combo("second", &manager, 50.);
        root.add_subview(first.view());
        root.add_subview(second.view());

        first.open();
        assert!(first.is_open());
        assert_eq!(
            first.window().map(|w| w.frame()),
            Some(Rect::from_xywh(10., 30., 100., 60.))
        );

        second.open();
        assert!(first.window().is_none(), "force-closed before the second opened");
        assert!(second.is_open());
        assert_eq!(manager.open_count(), 1);

        second.close();
        assert!(!second.is_open());
        assert_eq!(manager.open_count(), 0);
    }

    #[test]
    fn choosing_an_item_closes_the_list() {
        let manager = OverlayManager::new();
        let root = View::new("root");
        root.set_frame(Rect::from_xywh(0., 0., 300., 300.));
        let combo = combo("combo", &manager, 10.);
        root.add_subview(combo.view());
        let chosen = Rc::new(Cell::new(None));
        let recorded = Rc::clone(&chosen);
        combo.set_did_select_fn(move |i| recorded.set(Some(i)));

        let chain = ResponderChain::new(&root);
        chain.send_event(&UIEvent::mouse_down(Point2::new(20., 20.)));
        assert!(combo.is_open());

        // second row of the list, in the main window’s coordinates
        assert!(manager.send_event(&UIEvent::mouse_down(Point2::new(20., 55.))));
        assert_eq!(chosen.get(), Some(1));
        assert_eq!(combo.selected_item(), Some("two".to_string()));
        assert!(!combo.is_open());

        combo.open();
        assert!(manager.send_event(&UIEvent::mouse_down(Point2::new(250., 250.))));
        assert!(!combo.is_open(), "clicking elsewhere closes");
        assert_eq!(chosen.get(), Some(1));
    }
}
