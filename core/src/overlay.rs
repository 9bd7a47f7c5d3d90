//! Transient overlay windows (open combo box lists, popups).
//!
//! At most one overlay is open at a time. Every widget that opens an overlay is handed the same
//! [`OverlayManager`]; opening closes whatever else is open first.

use crate::events::{EventType, KeyCode, UIEvent};
use crate::window::{RedrawScheduler, Window, WindowId};
use cgmath::Vector2;
use core::cell::RefCell;
use std::rc::Rc;

struct Overlay {
    window: Window,
    on_close: Option<Rc<dyn Fn()>>,
}

/// Keeps track of open overlays and routes input to them.
///
/// Overlay frames are in the coordinate system of the window whose events are routed through
/// [`OverlayManager::send_event`].
#[derive(Default)]
pub struct OverlayManager {
    overlays: RefCell<Vec<Overlay>>,
    scheduler: RefCell<Option<RedrawScheduler>>,
}

impl OverlayManager {
    pub fn new() -> Rc<OverlayManager> {
        Rc::new(OverlayManager::default())
    }

    /// Opens an overlay after closing every other one.
    ///
    /// `on_close` is called when the overlay is closed, whether by its owner or by the manager.
    pub fn open(&self, window: Window, on_close: Option<Rc<dyn Fn()>>) {
        self.close_all();
        let scheduler = self.scheduler.borrow().clone();
        window.set_redraw_scheduler(scheduler);
        window.content_view().set_dirty();
        window.make_key();
        log::debug!("opened overlay {:?}", window);
        self.overlays.borrow_mut().push(Overlay { window, on_close });
    }

    /// Closes one overlay. Returns false if it wasn’t open.
    pub fn close(&self, id: WindowId) -> bool {
        let overlay = {
            let mut overlays = self.overlays.borrow_mut();
            let pos = overlays.iter().position(|o| o.window.id() == id);
            pos.map(|pos| overlays.remove(pos))
        };
        match overlay {
            Some(overlay) => {
                Self::did_close(overlay);
                true
            }
            None => false,
        }
    }

    /// Closes every open overlay.
    pub fn close_all(&self) {
        let overlays = std::mem::replace(&mut *self.overlays.borrow_mut(), Vec::new());
        for overlay in overlays {
            Self::did_close(overlay);
        }
    }

    fn did_close(overlay: Overlay) {
        log::debug!("closed overlay {:?}", overlay.window);
        overlay.window.resign_key();
        overlay.window.set_redraw_scheduler(None);
        if let Some(on_close) = overlay.on_close {
            on_close();
        }
    }

    pub fn is_open(&self, id: WindowId) -> bool {
        self.overlays.borrow().iter().any(|o| o.window.id() == id)
    }

    pub fn open_count(&self) -> usize {
        self.overlays.borrow().len()
    }

    pub fn window(&self, id: WindowId) -> Option<Window> {
        self.overlays
            .borrow()
            .iter()
            .find(|o| o.window.id() == id)
            .map(|o| o.window.clone())
    }

    /// The most recently opened overlay.
    pub fn top(&self) -> Option<Window> {
        self.overlays.borrow().last().map(|o| o.window.clone())
    }

    /// Sets the redraw scheduler used for overlay windows (including those already open).
    pub fn set_redraw_scheduler(&self, scheduler: Option<RedrawScheduler>) {
        *self.scheduler.borrow_mut() = scheduler.clone();
        let windows: Vec<_> = self
            .overlays
            .borrow()
            .iter()
            .map(|o| o.window.clone())
            .collect();
        for window in windows {
            window.set_redraw_scheduler(scheduler.clone());
        }
    }

    /// Offers an event to the open overlay. Returns true if the event must not reach the window
    /// underneath.
    ///
    /// A mouse down outside the overlay closes it and is swallowed; escape closes it as well.
    pub fn send_event(&self, event: &UIEvent) -> bool {
        let window = match self.top() {
            Some(window) => window,
            None => return false,
        };

        if !event.event_type().is_pointer() {
            if event.event_type() == EventType::KeyDown && event.key() == Some(KeyCode::Escape) {
                self.close_all();
                return true;
            }
            return window.send_event(event);
        }

        let frame = window.frame();
        let local = event.translated(Vector2::new(-frame.origin.x, -frame.origin.y));
        let is_captured = window.responder_chain().captured_responder().is_some();

        if is_captured || frame.contains(event.point()) {
            window.send_event(&local);
            return true;
        }

        match event.event_type() {
            EventType::MouseDown | EventType::RightMouseDown => {
                self.close_all();
                true
            }
            _ => false,
        }
    }
}
