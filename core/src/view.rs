use crate::color::Color;
use crate::draw::DrawContext;
use crate::events::UIEvent;
use crate::rect::Rect;
use crate::responder::ResponderChain;
use cgmath::{Point2, Vector2, Zero};
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// A unique identifier for a view.
///
/// (this is just a UUID)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(u32, u16, u16, [u8; 8]);

impl ViewId {
    pub(crate) fn new() -> ViewId {
        let uuid = Uuid::new_v4();
        let (a, b, c, d) = uuid.as_fields();
        ViewId(a, b, c, *d)
    }
}

/// Behavior attached to a view.
///
/// Widgets implement this on their state object and install it with [`View::with_delegate`].
/// The state object must not hold a strong reference to its own view; the view is passed to every
/// method instead.
///
/// It’s generally not safe to keep `RefCell` borrows of widget state alive while calling user
/// callbacks from these methods, since callbacks may call back into the widget.
pub trait ViewDelegate {
    /// Handles an event. Returns true if the event was consumed.
    fn handle_event(&self, view: &View, event: &UIEvent, chain: &ResponderChain) -> bool {
        let _ = (view, event, chain);
        false
    }

    /// Draws the view in its local coordinate system.
    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        let _ = (view, ctx);
    }

    /// Called after the frame changed; composite views lay out their subviews here.
    fn layout(&self, view: &View) {
        let _ = view;
    }

    /// Called on every visible view right before a redraw, while the tree may still be mutated.
    fn will_draw(&self, view: &View) {
        let _ = view;
    }

    /// The view is about to lose keyboard focus; pending edits should be committed.
    fn resign_first_responder(&self, view: &View) {
        let _ = view;
    }
}

/// A plain view that does nothing on its own.
impl ViewDelegate for () {}

/// Receives window-space dirty rectangles; installed on window roots.
pub type DirtySink = Rc<dyn Fn(Rect)>;

struct ViewInner {
    id: ViewId,
    name: RefCell<String>,
    owner: RefCell<Option<Weak<dyn Any>>>,
    frame: Cell<Rect>,
    offset: Cell<Vector2<f64>>,
    background: Cell<Color>,
    is_visible: Cell<bool>,
    is_dirty: Cell<bool>,
    superview: RefCell<Weak<ViewInner>>,
    subviews: RefCell<Vec<View>>,
    delegate: RefCell<Rc<dyn ViewDelegate>>,
    dirty_sink: RefCell<Option<DirtySink>>,
    responder_chain: RefCell<Weak<ResponderChain>>,
}

/// A node in the view tree.
///
/// This is a cheap handle; clones refer to the same view. Superviews own their subviews, while
/// subviews only keep a weak reference to their superview.
#[derive(Clone)]
pub struct View {
    inner: Rc<ViewInner>,
}

/// A weak view handle that doesn’t keep the view alive.
#[derive(Clone, Default)]
pub struct WeakView {
    inner: Weak<ViewInner>,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let frame = self.frame();
        write!(
            f,
            "View({:?} [{}, {} {}×{}]{})",
            self.name(),
            frame.origin.x,
            frame.origin.y,
            frame.size.x,
            frame.size.y,
            if self.is_visible() { "" } else { " <hidden>" }
        )
    }
}

impl fmt::Debug for WeakView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.upgrade() {
            Some(view) => write!(f, "WeakView({:?})", view.name()),
            None => write!(f, "WeakView(<dropped>)"),
        }
    }
}

impl PartialEq for View {
    fn eq(&self, other: &View) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for View {}

impl View {
    /// Creates a plain view.
    pub fn new(name: &str) -> View {
        View::with_delegate(name, Rc::new(()))
    }

    /// Creates a view with custom behavior.
    pub fn with_delegate(name: &str, delegate: Rc<dyn ViewDelegate>) -> View {
        View {
            inner: Rc::new(ViewInner {
                id: ViewId::new(),
                name: RefCell::new(name.to_string()),
                owner: RefCell::new(None),
                frame: Cell::new(Rect::zero()),
                offset: Cell::new(Vector2::zero()),
                background: Cell::new(Color::CLEAR),
                is_visible: Cell::new(true),
                is_dirty: Cell::new(false),
                superview: RefCell::new(Weak::new()),
                subviews: RefCell::new(Vec::new()),
                delegate: RefCell::new(delegate),
                dirty_sink: RefCell::new(None),
                responder_chain: RefCell::new(Weak::new()),
            }),
        }
    }

    pub fn id(&self) -> ViewId {
        self.inner.id
    }

    pub fn name(&self) -> String {
        self.inner.name.borrow().clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.inner.name.borrow_mut() = name.to_string();
    }

    pub fn downgrade(&self) -> WeakView {
        WeakView {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The untyped object this view belongs to, if it is still alive.
    pub fn owner(&self) -> Option<Rc<dyn Any>> {
        self.inner.owner.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn set_owner(&self, owner: Option<Weak<dyn Any>>) {
        *self.inner.owner.borrow_mut() = owner;
    }

    pub fn delegate(&self) -> Rc<dyn ViewDelegate> {
        Rc::clone(&self.inner.delegate.borrow())
    }

    pub fn set_delegate(&self, delegate: Rc<dyn ViewDelegate>) {
        *self.inner.delegate.borrow_mut() = delegate;
    }

    // geometry

    /// The frame in the superview’s coordinate system.
    pub fn frame(&self) -> Rect {
        self.inner.frame.get()
    }

    /// The frame in the view’s own coordinate system.
    pub fn bounds(&self) -> Rect {
        Rect::new(Point2::new(0., 0.), self.frame().size)
    }

    /// Sets the frame and lets the delegate lay out subviews.
    ///
    /// Does not mark anything dirty.
    pub fn set_frame(&self, frame: Rect) {
        self.inner.frame.set(frame);
        self.delegate().layout(self);
    }

    /// Translation applied to all subviews (used for scrolling).
    pub fn offset(&self) -> Vector2<f64> {
        self.inner.offset.get()
    }

    pub fn set_offset(&self, offset: Vector2<f64>) {
        self.inner.offset.set(offset);
    }

    pub fn background(&self) -> Color {
        self.inner.background.get()
    }

    pub fn set_background(&self, color: Color) {
        self.inner.background.set(color);
    }

    /// Returns the frame in window coordinates.
    ///
    /// This is computed every time since ancestors may move without notifying their subviews.
    pub fn resolved_rect(&self) -> Rect {
        self.resolve().0
    }

    /// Returns the visible part of the frame in window coordinates, i.e. the intersection with
    /// every ancestor’s clipped rect, or None if nothing of it is visible.
    pub fn resolved_clipped_rect(&self) -> Option<Rect> {
        self.resolve().1
    }

    fn resolve(&self) -> (Rect, Option<Rect>) {
        match self.superview() {
            Some(superview) => {
                let (parent_rect, parent_clip) = superview.resolve();
                let origin = parent_rect.origin + superview.offset();
                let rect = self.frame() + Vector2::new(origin.x, origin.y);
                let clip = parent_clip.and_then(|clip| clip.intersect(rect));
                (rect, clip)
            }
            None => {
                let rect = self.frame();
                let clip = if rect.is_empty() { None } else { Some(rect) };
                (rect, clip)
            }
        }
    }

    /// Converts a window-space point to the view’s local coordinate system.
    pub fn convert_from_window(&self, point: Point2<f64>) -> Point2<f64> {
        let origin = self.resolved_rect().origin;
        Point2::new(point.x - origin.x, point.y - origin.y)
    }

    /// Returns true if the window-space point is inside the visible part of the view.
    pub fn contains_point(&self, point: Point2<f64>) -> bool {
        self.resolved_clipped_rect()
            .map_or(false, |clip| clip.contains(point))
    }

    // hierarchy

    pub fn superview(&self) -> Option<View> {
        self.inner
            .superview
            .borrow()
            .upgrade()
            .map(|inner| View { inner })
    }

    /// Returns a snapshot of the subviews, back to front.
    pub fn subviews(&self) -> Vec<View> {
        self.inner.subviews.borrow().clone()
    }

    pub fn subview_count(&self) -> usize {
        self.inner.subviews.borrow().len()
    }

    /// Appends a subview on top of all others, detaching it from its current superview first.
    ///
    /// Does not mark anything dirty; call [`View::set_dirty`] if that’s needed.
    pub fn add_subview(&self, subview: &View) {
        if subview == self || self.is_descendant_of(subview) {
            log::warn!(
                "refusing to add {:?} as a subview of its own descendant {:?}",
                subview,
                self
            );
            return;
        }
        subview.remove_from_superview();
        *subview.inner.superview.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.subviews.borrow_mut().push(subview.clone());
    }

    /// Removes a subview. Returns false if it wasn’t a subview of this view.
    pub fn remove_subview(&self, subview: &View) -> bool {
        let removed = {
            let mut subviews = self.inner.subviews.borrow_mut();
            let pos = subviews.iter().position(|v| v == subview);
            pos.map(|pos| subviews.remove(pos))
        };
        match removed {
            Some(removed) => {
                *removed.inner.superview.borrow_mut() = Weak::new();
                true
            }
            None => false,
        }
    }

    pub fn remove_from_superview(&self) {
        if let Some(superview) = self.superview() {
            superview.remove_subview(self);
        }
    }

    pub fn remove_all_subviews(&self) {
        let subviews = std::mem::replace(&mut *self.inner.subviews.borrow_mut(), Vec::new());
        for subview in subviews {
            *subview.inner.superview.borrow_mut() = Weak::new();
        }
    }

    /// Returns true if `ancestor` is a (transitive) superview of this view.
    pub fn is_descendant_of(&self, ancestor: &View) -> bool {
        let mut current = self.superview();
        while let Some(view) = current {
            if &view == ancestor {
                return true;
            }
            current = view.superview();
        }
        false
    }

    /// Returns the topmost ancestor (or the view itself).
    pub fn root(&self) -> View {
        let mut view = self.clone();
        while let Some(superview) = view.superview() {
            view = superview;
        }
        view
    }

    /// Finds a descendant (or this view) by name, depth first.
    pub fn find(&self, name: &str) -> Option<View> {
        if *self.inner.name.borrow() == name {
            return Some(self.clone());
        }
        self.subviews().iter().find_map(|subview| subview.find(name))
    }

    // visibility & dirtiness

    pub fn is_visible(&self) -> bool {
        self.inner.is_visible.get()
    }

    /// Shows or hides the view; the covered area is marked dirty either way.
    pub fn set_visible(&self, is_visible: bool) {
        if self.is_visible() == is_visible {
            return;
        }
        if is_visible {
            self.inner.is_visible.set(true);
            self.set_dirty();
        } else {
            self.set_dirty();
            self.inner.is_visible.set(false);
        }
    }

    /// Returns true if this view and all its ancestors are visible.
    pub fn is_visible_in_hierarchy(&self) -> bool {
        let mut current = Some(self.clone());
        while let Some(view) = current {
            if !view.is_visible() {
                return false;
            }
            current = view.superview();
        }
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty.get()
    }

    pub(crate) fn clear_dirty(&self) {
        self.inner.is_dirty.set(false);
    }

    /// Marks the whole visible area of the view as needing a redraw.
    pub fn set_dirty(&self) {
        self.inner.is_dirty.set(true);
        if let Some(clip) = self.resolved_clipped_rect() {
            self.report_dirty(clip);
        }
    }

    /// Marks a part of the view (in local coordinates) as needing a redraw.
    pub fn set_dirty_rect(&self, rect: Rect) {
        self.inner.is_dirty.set(true);
        let (resolved, clip) = self.resolve();
        let rect = rect + Vector2::new(resolved.origin.x, resolved.origin.y);
        if let Some(rect) = clip.and_then(|clip| clip.intersect(rect)) {
            self.report_dirty(rect);
        }
    }

    /// Hands a window-space rect to the nearest view (starting with this one) holding a sink.
    fn report_dirty(&self, rect: Rect) {
        let mut current = Some(self.clone());
        while let Some(view) = current {
            let sink = view.inner.dirty_sink.borrow().clone();
            if let Some(sink) = sink {
                sink(rect);
                return;
            }
            current = view.superview();
        }
    }

    /// Installs the function receiving dirty rects from this subtree.
    pub fn set_dirty_sink(&self, sink: Option<DirtySink>) {
        *self.inner.dirty_sink.borrow_mut() = sink;
    }

    // responders

    /// The responder chain of the root this view is attached to.
    pub fn responder_chain(&self) -> Option<Rc<ResponderChain>> {
        self.root().inner.responder_chain.borrow().upgrade()
    }

    pub(crate) fn set_responder_chain(&self, chain: Weak<ResponderChain>) {
        *self.inner.responder_chain.borrow_mut() = chain;
    }

    /// Forwards an event to the delegate.
    pub fn handle_event(&self, event: &UIEvent, chain: &ResponderChain) -> bool {
        self.delegate().handle_event(self, event, chain)
    }

    pub(crate) fn resign_first_responder(&self) {
        self.delegate().resign_first_responder(self);
    }

    /// Returns the deepest visible view containing the window-space point, preferring views that
    /// were added last.
    pub fn hit_test(&self, point: Point2<f64>) -> Option<View> {
        if !self.is_visible() || !self.contains_point(point) {
            return None;
        }
        for subview in self.subviews().iter().rev() {
            if let Some(hit) = subview.hit_test(point) {
                return Some(hit);
            }
        }
        Some(self.clone())
    }
}

impl WeakView {
    pub fn new() -> WeakView {
        WeakView::default()
    }

    pub fn upgrade(&self) -> Option<View> {
        self.inner.upgrade().map(|inner| View { inner })
    }

    /// Returns true if this refers to the given (live) view.
    pub fn is(&self, view: &View) -> bool {
        self.inner.as_ptr() == Rc::as_ptr(&view.inner)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}
