//! A fixed viewport over a larger content view.

use crate::events::{EventType, UIEvent};
use crate::rect::Rect;
use crate::responder::ResponderChain;
use crate::view::{View, ViewDelegate, WeakView};
use cgmath::{Vector2, Zero};
use core::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

pub(crate) struct ScrollViewState {
    content: RefCell<View>,
    pos: Cell<Vector2<f64>>,
    fits_width: Cell<bool>,
    scroll_bars: RefCell<Vec<WeakView>>,
    pos_changed_fn: RefCell<Option<Rc<dyn Fn(Vector2<f64>)>>>,
}

impl ScrollViewState {
    fn content_size(&self) -> Vector2<f64> {
        self.content.borrow().frame().size
    }

    pub(crate) fn max_pos(&self, view: &View) -> Vector2<f64> {
        let viewport = view.frame().size;
        let content = self.content_size();
        Vector2::new(
            (content.x - viewport.x).max(0.),
            (content.y - viewport.y).max(0.),
        )
    }

    pub(crate) fn pos(&self) -> Vector2<f64> {
        self.pos.get()
    }

    pub(crate) fn content_view(&self) -> View {
        self.content.borrow().clone()
    }

    /// Returns true if the position changed.
    pub(crate) fn set_pos(&self, view: &View, pos: Vector2<f64>) -> bool {
        let max = self.max_pos(view);
        let pos = Vector2::new(pos.x.max(0.).min(max.x), pos.y.max(0.).min(max.y));
        if self.pos.replace(pos) == pos {
            return false;
        }
        view.set_offset(-pos);
        view.set_dirty();
        self.dirty_scroll_bars();

        let pos_changed = self.pos_changed_fn.borrow().clone();
        if let Some(pos_changed) = pos_changed {
            pos_changed(pos);
        }
        true
    }

    fn dirty_scroll_bars(&self) {
        let bars: Vec<_> = self
            .scroll_bars
            .borrow()
            .iter()
            .filter_map(WeakView::upgrade)
            .collect();
        for bar in bars {
            bar.set_dirty();
        }
    }
}

impl ViewDelegate for ScrollViewState {
    fn handle_event(&self, view: &View, event: &UIEvent, _chain: &ResponderChain) -> bool {
        if event.event_type() != EventType::Scroll {
            return false;
        }
        let max = self.max_pos(view);
        if max.x <= 0. && max.y <= 0. {
            return false;
        }
        self.set_pos(
            view,
            self.pos.get() + Vector2::new(event.delta_x(), event.delta_y()),
        );
        true
    }

    fn layout(&self, view: &View) {
        if self.fits_width.get() {
            let content = self.content_view();
            let frame = content.frame();
            content.set_frame(frame.with_size(Vector2::new(view.frame().width(), frame.height())));
        }
        self.set_pos(view, self.pos.get());
    }

    fn will_draw(&self, view: &View) {
        // content may have shrunk since the last scroll
        self.set_pos(view, self.pos.get());
    }
}

/// A viewport that scrolls its content view.
///
/// The content view is the scroll view’s only subview; scrolling sets the scroll view’s offset to
/// the negated position.
#[derive(Clone)]
pub struct ScrollView {
    view: View,
    pub(crate) state: Rc<ScrollViewState>,
}

impl ScrollView {
    pub fn new(name: &str) -> ScrollView {
        let content = View::new("content");
        let state = Rc::new(ScrollViewState {
            content: RefCell::new(content.clone()),
            pos: Cell::new(Vector2::zero()),
            fits_width: Cell::new(false),
            scroll_bars: RefCell::new(Vec::new()),
            pos_changed_fn: RefCell::new(None),
        });
        let view = View::with_delegate(name, state.clone());
        view.add_subview(&content);
        ScrollView { view, state }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn content_view(&self) -> View {
        self.state.content_view()
    }

    /// Replaces the content view. The position is reset.
    pub fn set_content_view(&self, content: &View) {
        let previous = self.state.content.replace(content.clone());
        previous.remove_from_superview();
        self.view.add_subview(content);
        self.state.pos.set(Vector2::zero());
        self.view.set_offset(Vector2::zero());
        self.state.layout(&self.view);
        self.view.set_dirty();
    }

    pub fn content_size(&self) -> Vector2<f64> {
        self.state.content_size()
    }

    /// Resizes the content view, keeping its origin.
    pub fn set_content_size(&self, size: Vector2<f64>) {
        let content = self.content_view();
        content.set_frame(content.frame().with_size(size));
        self.state.set_pos(&self.view, self.state.pos());
        self.view.set_dirty();
    }

    /// If true, the content is kept as wide as the viewport.
    pub fn set_fits_width(&self, fits_width: bool) {
        self.state.fits_width.set(fits_width);
        self.state.layout(&self.view);
    }

    pub fn pos(&self) -> Vector2<f64> {
        self.state.pos()
    }

    /// The largest valid position, i.e. the content size minus the viewport (but at least zero).
    pub fn max_pos(&self) -> Vector2<f64> {
        self.state.max_pos(&self.view)
    }

    /// Scrolls to a position, clamped to `0..=max_pos`.
    pub fn set_pos(&self, pos: Vector2<f64>) {
        self.state.set_pos(&self.view, pos);
    }

    pub fn scroll_by(&self, delta: Vector2<f64>) {
        self.set_pos(self.pos() + delta);
    }

    /// Scrolls the minimum amount needed to show a rect given in content coordinates.
    pub fn scroll_to_visible(&self, rect: Rect) {
        let viewport = self.view.frame().size;
        let mut pos = self.pos();
        if rect.origin.y < pos.y {
            pos.y = rect.origin.y;
        } else if rect.max_y() > pos.y + viewport.y {
            pos.y = rect.max_y() - viewport.y;
        }
        if rect.origin.x < pos.x {
            pos.x = rect.origin.x;
        } else if rect.max_x() > pos.x + viewport.x {
            pos.x = rect.max_x() - viewport.x;
        }
        self.set_pos(pos);
    }

    pub fn set_pos_changed_fn(&self, f: impl Fn(Vector2<f64>) + 'static) {
        *self.state.pos_changed_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub(crate) fn add_scroll_bar(&self, bar: &View) {
        self.state.scroll_bars.borrow_mut().push(bar.downgrade());
    }

    pub(crate) fn downgrade(&self) -> (WeakView, Weak<ScrollViewState>) {
        (self.view.downgrade(), Rc::downgrade(&self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point2;

    fn scroll_view() -> ScrollView {
        let scroll_view = ScrollView::new("scroller");
        scroll_view.view().set_frame(Rect::from_xywh(0., 0., 100., 200.));
        scroll_view.set_content_size(Vector2::new(100., 1000.));
        scroll_view
    }

    #[test]
    fn positions_are_clamped() {
        let scroll_view = scroll_view();
        assert_eq!(scroll_view.max_pos(), Vector2::new(0., 800.));
        scroll_view.set_pos(Vector2::new(30., 900.));
        assert_eq!(scroll_view.pos(), Vector2::new(0., 800.));
        assert_eq!(scroll_view.view().offset(), Vector2::new(0., -800.));
        scroll_view.scroll_by(Vector2::new(0., -1000.));
        assert_eq!(scroll_view.pos(), Vector2::new(0., 0.));

        scroll_view.set_pos(Vector2::new(0., 700.));
        scroll_view.set_content_size(Vector2::new(100., 500.));
        assert_eq!(scroll_view.pos(), Vector2::new(0., 300.), "shrinking re-clamps");
    }

    #[test]
    fn scroll_events_move_the_content() {
        let scroll_view = scroll_view();
        let chain = ResponderChain::new(scroll_view.view());
        let positions = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&positions);
        scroll_view.set_pos_changed_fn(move |pos| recorded.borrow_mut().push(pos.y));

        let point = Point2::new(50., 50.);
        assert!(chain.send_event(&UIEvent::scroll(point, Vector2::new(0., 120.))));
        assert!(chain.send_event(&UIEvent::scroll(point, Vector2::new(0., -20.))));
        assert_eq!(*positions.borrow(), vec![120., 100.]);

        let row = View::new("row");
        row.set_frame(Rect::from_xywh(0., 300., 100., 20.));
        scroll_view.content_view().add_subview(&row);
        assert_eq!(row.resolved_rect(), Rect::from_xywh(0., 200., 100., 20.));

        scroll_view.scroll_to_visible(row.frame());
        assert_eq!(scroll_view.pos(), Vector2::new(0., 120.));
    }

    #[test]
    fn small_content_doesnt_consume_scrolls() {
        let scroll_view = ScrollView::new("small");
        scroll_view.view().set_frame(Rect::from_xywh(0., 0., 100., 100.));
        scroll_view.set_content_size(Vector2::new(100., 50.));
        let chain = ResponderChain::new(scroll_view.view());
        assert!(!chain.send_event(&UIEvent::scroll(Point2::new(5., 5.), Vector2::new(0., 10.))));
    }
}
