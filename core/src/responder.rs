//! Event dispatch.
//!
//! Every window root has one responder chain. An event first goes to the captured responder, if
//! any; otherwise pointer events are hit tested from the topmost view down and keyboard events go
//! to the first responder before walking the tree. Dispatch stops at the first view whose
//! delegate consumes the event.
//!
//! The chain only holds weak references, so a view that goes away simply stops being the captured
//! or first responder.

use crate::events::{Cursor, UIEvent};
use crate::rect::Rect;
use crate::view::{View, WeakView};
use cgmath::Point2;
use core::cell::RefCell;
use std::rc::Rc;

#[derive(Debug)]
struct CursorClaim {
    owner: WeakView,
    cursor: Cursor,
    /// Window coordinates.
    rect: Rect,
}

/// Tracks capture, keyboard focus and cursor ownership for one window root.
#[derive(Debug)]
pub struct ResponderChain {
    root: WeakView,
    first_responder: RefCell<WeakView>,
    captured_responder: RefCell<WeakView>,
    cursor: RefCell<Option<CursorClaim>>,
}

impl ResponderChain {
    /// Creates a responder chain for a root view and attaches it to the root.
    pub fn new(root: &View) -> Rc<ResponderChain> {
        let chain = Rc::new(ResponderChain {
            root: root.downgrade(),
            first_responder: RefCell::new(WeakView::new()),
            captured_responder: RefCell::new(WeakView::new()),
            cursor: RefCell::new(None),
        });
        root.set_responder_chain(Rc::downgrade(&chain));
        chain
    }

    /// Dispatches an event. Returns false if no view consumed it, in which case the caller may
    /// try another root.
    pub fn send_event(&self, event: &UIEvent) -> bool {
        let captured = self.captured_responder.borrow().upgrade();
        if let Some(captured) = captured {
            log::trace!("{:?} → captured {:?}", event.event_type(), captured);
            return captured.handle_event(event, self);
        }

        let root = match self.root.upgrade() {
            Some(root) => root,
            None => return false,
        };

        if event.event_type().is_pointer() {
            return self.dispatch_pointer(&root, event);
        }

        let first = self.first_responder.borrow().upgrade();
        if let Some(first) = &first {
            if first.handle_event(event, self) {
                return true;
            }
        }
        self.dispatch_key(&root, event, first.as_ref())
    }

    fn dispatch_pointer(&self, view: &View, event: &UIEvent) -> bool {
        if !view.is_visible() || !view.contains_point(event.point()) {
            return false;
        }
        for subview in view.subviews().iter().rev() {
            if self.dispatch_pointer(subview, event) {
                return true;
            }
        }
        view.handle_event(event, self)
    }

    fn dispatch_key(&self, view: &View, event: &UIEvent, skip: Option<&View>) -> bool {
        if !view.is_visible() {
            return false;
        }
        for subview in view.subviews().iter().rev() {
            if self.dispatch_key(subview, event, skip) {
                return true;
            }
        }
        if skip == Some(view) {
            return false;
        }
        view.handle_event(event, self)
    }

    /// Makes a view receive all events until it is released.
    ///
    /// Returns false (and changes nothing) if another view holds the capture.
    pub fn capture_responder(&self, view: &View) -> bool {
        let mut captured = self.captured_responder.borrow_mut();
        match captured.upgrade() {
            Some(holder) if &holder != view => {
                log::debug!("{:?} can’t capture; {:?} holds the capture", view, holder);
                false
            }
            _ => {
                *captured = view.downgrade();
                true
            }
        }
    }

    /// Releases the capture if (and only if) the view holds it.
    pub fn release_responder(&self, view: &View) {
        let mut captured = self.captured_responder.borrow_mut();
        if captured.is(view) {
            *captured = WeakView::new();
        } else {
            log::debug!("{:?} released a capture it doesn’t hold", view);
        }
    }

    pub fn captured_responder(&self) -> Option<View> {
        self.captured_responder.borrow().upgrade()
    }

    /// Changes the keyboard focus; the previous first responder is told to resign first.
    pub fn make_first_responder(&self, view: Option<&View>) {
        let previous = self.first_responder.borrow().upgrade();
        if previous.as_ref() == view {
            return;
        }
        if let Some(previous) = previous {
            previous.resign_first_responder();
        }
        *self.first_responder.borrow_mut() = view.map(View::downgrade).unwrap_or_default();
    }

    pub fn first_responder(&self) -> Option<View> {
        self.first_responder.borrow().upgrade()
    }

    pub fn is_first_responder(&self, view: &View) -> bool {
        self.first_responder.borrow().is(view)
    }

    /// Associates a cursor with a window-space region owned by a view.
    pub fn set_cursor_in_rect(&self, view: &View, cursor: Cursor, rect: Rect) {
        *self.cursor.borrow_mut() = Some(CursorClaim {
            owner: view.downgrade(),
            cursor,
            rect,
        });
    }

    /// Drops the cursor claim if the view owns it.
    pub fn release_cursor(&self, view: &View) {
        let mut cursor = self.cursor.borrow_mut();
        if cursor.as_ref().map_or(false, |claim| claim.owner.is(view)) {
            *cursor = None;
        }
    }

    /// The cursor the platform should show at a window-space point.
    pub fn cursor_at(&self, point: Point2<f64>) -> Cursor {
        match &*self.cursor.borrow() {
            Some(claim) if claim.owner.is_alive() && claim.rect.contains(point) => claim.cursor,
            _ => Cursor::Arrow,
        }
    }
}
