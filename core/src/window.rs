use crate::dirty::DirtyRegion;
use crate::draw::{DrawContext, Renderer};
use crate::events::{Cursor, EventType, UIEvent};
use crate::rect::Rect;
use crate::responder::ResponderChain;
use crate::view::View;
use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Identifies a window in the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(Uuid);

impl WindowId {
    fn new() -> WindowId {
        WindowId(Uuid::new_v4())
    }
}

/// Posts a redraw request for a window to the platform.
pub type RedrawScheduler = Rc<dyn Fn(WindowId)>;

struct WindowInner {
    id: WindowId,
    title: String,
    frame: Cell<Rect>,
    content_view: View,
    responder_chain: Rc<ResponderChain>,
    dirty: RefCell<DirtyRegion>,
    scheduler: RefCell<Option<RedrawScheduler>>,
    is_key: Cell<bool>,
    is_drawing: Cell<bool>,
    cursor: Cell<Cursor>,
    did_resign_key_fn: RefCell<Option<Rc<dyn Fn()>>>,
}

/// A top-level window: the root of a view tree plus its responder chain and redraw state.
///
/// This is a handle; clones refer to the same window.
#[derive(Clone)]
pub struct Window {
    inner: Rc<WindowInner>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Window({:?} {:?})", self.inner.title, self.frame())
    }
}

impl Window {
    /// Creates a window. `frame` is in screen coordinates; the content view fills the window.
    pub fn new(title: &str, frame: Rect) -> Window {
        let content_view = View::new("contentView");
        content_view.set_frame(Rect::from_xywh(0., 0., frame.width(), frame.height()));
        let responder_chain = ResponderChain::new(&content_view);

        let inner = Rc::new(WindowInner {
            id: WindowId::new(),
            title: title.to_string(),
            frame: Cell::new(frame),
            content_view,
            responder_chain,
            dirty: RefCell::new(DirtyRegion::new()),
            scheduler: RefCell::new(None),
            is_key: Cell::new(false),
            is_drawing: Cell::new(false),
            cursor: Cell::new(Cursor::Arrow),
            did_resign_key_fn: RefCell::new(None),
        });

        let weak: Weak<WindowInner> = Rc::downgrade(&inner);
        inner
            .content_view
            .set_dirty_sink(Some(Rc::new(move |rect: Rect| {
                if let Some(inner) = weak.upgrade() {
                    Window { inner }.mark_dirty(rect);
                }
            })));

        Window { inner }
    }

    pub fn id(&self) -> WindowId {
        self.inner.id
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn frame(&self) -> Rect {
        self.inner.frame.get()
    }

    /// Moves or resizes the window; the content view follows and is redrawn.
    pub fn set_frame(&self, frame: Rect) {
        self.inner.frame.set(frame);
        self.inner
            .content_view
            .set_frame(Rect::from_xywh(0., 0., frame.width(), frame.height()));
        self.inner.content_view.set_dirty();
    }

    pub fn content_view(&self) -> &View {
        &self.inner.content_view
    }

    pub fn responder_chain(&self) -> &Rc<ResponderChain> {
        &self.inner.responder_chain
    }

    pub fn is_key(&self) -> bool {
        self.inner.is_key.get()
    }

    pub fn make_key(&self) {
        self.inner.is_key.set(true);
    }

    /// The window stopped being the key window; transient UI hanging off it should close.
    pub fn resign_key(&self) {
        if !self.inner.is_key.replace(false) {
            return;
        }
        let did_resign = self.inner.did_resign_key_fn.borrow().clone();
        if let Some(did_resign) = did_resign {
            did_resign();
        }
    }

    pub fn set_did_resign_key_fn(&self, f: impl Fn() + 'static) {
        *self.inner.did_resign_key_fn.borrow_mut() = Some(Rc::new(f));
    }

    /// True while `redraw` walks the view tree.
    pub fn is_drawing(&self) -> bool {
        self.inner.is_drawing.get()
    }

    /// The cursor the platform should currently display.
    pub fn cursor(&self) -> Cursor {
        self.inner.cursor.get()
    }

    pub fn is_redraw_pending(&self) -> bool {
        self.inner.dirty.borrow().is_pending()
    }

    /// The dirty rect accumulated since the last redraw.
    pub fn dirty_rect(&self) -> Rect {
        self.inner.dirty.borrow().rect()
    }

    /// Installs the function that posts redraw events.
    ///
    /// If a redraw is already pending it is posted right away.
    pub fn set_redraw_scheduler(&self, scheduler: Option<RedrawScheduler>) {
        *self.inner.scheduler.borrow_mut() = scheduler.clone();
        if let Some(scheduler) = scheduler {
            if self.is_redraw_pending() {
                scheduler(self.id());
            }
        }
    }

    fn mark_dirty(&self, rect: Rect) {
        let needs_schedule = self.inner.dirty.borrow_mut().mark(rect);
        if !needs_schedule {
            return;
        }
        let scheduler = self.inner.scheduler.borrow().clone();
        if let Some(scheduler) = scheduler {
            log::trace!("{:?}: redraw scheduled", self);
            scheduler(self.id());
        }
    }

    /// Dispatches an event to the content view tree.
    pub fn send_event(&self, event: &UIEvent) -> bool {
        let consumed = self.inner.responder_chain.send_event(event);
        if event.event_type() == EventType::MouseMoved {
            self.inner
                .cursor
                .set(self.inner.responder_chain.cursor_at(event.point()));
        }
        consumed
    }

    /// Runs a pending redraw: the pre-draw pass, then `draw` on every visible view intersecting
    /// the dirty rect. Returns false if nothing was pending.
    pub fn redraw(&self, renderer: &mut dyn Renderer) -> bool {
        will_draw(&self.inner.content_view);

        let dirty = match self.inner.dirty.borrow_mut().take() {
            Some(dirty) => dirty,
            None => return false,
        };

        let mut ctx = DrawContext::new();
        self.inner.is_drawing.set(true);
        draw_view(&self.inner.content_view, dirty, &mut ctx);
        self.inner.is_drawing.set(false);

        renderer.present(&self.inner.title, dirty, ctx.commands());
        true
    }
}

/// Runs the pre-draw pass over a subtree.
pub(crate) fn will_draw(view: &View) {
    if !view.is_visible() {
        return;
    }
    view.delegate().will_draw(view);
    for subview in view.subviews() {
        will_draw(&subview);
    }
}

fn draw_view(view: &View, dirty: Rect, ctx: &mut DrawContext) {
    if !view.is_visible() {
        return;
    }
    let clip = match view
        .resolved_clipped_rect()
        .and_then(|clip| clip.intersect(dirty))
    {
        Some(clip) => clip,
        None => return,
    };

    ctx.begin_view(view.resolved_rect(), clip);
    ctx.fill_rect(view.bounds(), view.background());
    view.delegate().draw(view, ctx);
    view.clear_dirty();

    for subview in view.subviews() {
        draw_view(&subview, dirty, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::draw::{DrawCommand, NullRenderer};

    #[derive(Default)]
    struct Recorder {
        frames: Vec<(Rect, Vec<DrawCommand>)>,
    }

    impl Renderer for Recorder {
        fn present(&mut self, _window: &str, dirty: Rect, commands: &[DrawCommand]) {
            self.frames.push((dirty, commands.to_vec()));
        }
    }

    fn window_with_counter() -> (Window, Rc<Cell<usize>>) {
        let window = Window::new("test", Rect::from_xywh(0., 0., 200., 100.));
        let scheduled = Rc::new(Cell::new(0));
        let counter = Rc::clone(&scheduled);
        window.set_redraw_scheduler(Some(Rc::new(move |_: WindowId| counter.set(counter.get() + 1))));
        (window, scheduled)
    }

    #[test]
    fn repeated_set_dirty_schedules_once() {
        let (window, scheduled) = window_with_counter();
        let a = View::new("a");
        a.set_frame(Rect::from_xywh(0., 0., 10., 10.));
        let b = View::new("b");
        b.set_frame(Rect::from_xywh(100., 50., 20., 20.));
        window.content_view().add_subview(&a);
        window.content_view().add_subview(&b);

        for _ in 0..5 {
            a.set_dirty();
        }
        b.set_dirty();
        assert_eq!(scheduled.get(), 1);
        assert_eq!(window.dirty_rect(), Rect::from_xywh(0., 0., 120., 70.));

        let mut renderer = NullRenderer::default();
        assert!(window.redraw(&mut renderer));
        assert!(!window.is_redraw_pending());
        assert!(!a.is_dirty());
        assert!(!window.redraw(&mut renderer), "nothing pending any more");
        assert_eq!(renderer.frames, 1);

        a.set_dirty();
        assert_eq!(scheduled.get(), 2, "clean again, so the next mark schedules");
    }

    #[test]
    fn pending_redraw_is_posted_when_scheduler_arrives() {
        let window = Window::new("late", Rect::from_xywh(0., 0., 50., 50.));
        window.content_view().set_dirty();
        assert!(window.is_redraw_pending());

        let posted = Rc::new(Cell::new(0));
        let counter = Rc::clone(&posted);
        window.set_redraw_scheduler(Some(Rc::new(move |_: WindowId| counter.set(counter.get() + 1))));
        assert_eq!(posted.get(), 1);
    }

    #[test]
    fn redraw_only_draws_intersecting_views() {
        let (window, _) = window_with_counter();
        let left = View::new("left");
        left.set_frame(Rect::from_xywh(0., 0., 50., 50.));
        left.set_background(Color::WHITE);
        let right = View::new("right");
        right.set_frame(Rect::from_xywh(100., 0., 50., 50.));
        right.set_background(Color::BLACK);
        window.content_view().add_subview(&left);
        window.content_view().add_subview(&right);

        right.set_dirty();
        let mut recorder = Recorder::default();
        window.redraw(&mut recorder);

        let (dirty, commands) = &recorder.frames[0];
        assert_eq!(*dirty, Rect::from_xywh(100., 0., 50., 50.));
        let fills: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { rect, color } => Some((*rect, *color)),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![(Rect::from_xywh(100., 0., 50., 50.), Color::BLACK)]);
    }

    #[test]
    fn resign_key_fires_once() {
        let window = Window::new("key", Rect::from_xywh(0., 0., 10., 10.));
        let resigned = Rc::new(Cell::new(0));
        let counter = Rc::clone(&resigned);
        window.set_did_resign_key_fn(move || counter.set(counter.get() + 1));

        window.resign_key();
        assert_eq!(resigned.get(), 0, "wasn’t key");
        window.make_key();
        window.resign_key();
        window.resign_key();
        assert_eq!(resigned.get(), 1);
    }
}
