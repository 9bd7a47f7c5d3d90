//! The main-thread event loop.
//!
//! All view state lives on the thread running the loop. Other threads talk to it through an
//! [`Invoker`], which posts input, redraw requests and closures into the loop’s channel; closures
//! run on the next iteration with mutable access to the application state.

use crate::draw::Renderer;
use crate::events::{EventType, UIEvent};
use crate::overlay::OverlayManager;
use crate::window::{Window, WindowId};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// A closure run on the main thread.
pub type Task<A> = Box<dyn FnOnce(&mut A) + Send>;

/// Everything the loop can receive.
pub enum PlatformEvent<A> {
    /// Normalized input for a window.
    Input(WindowId, UIEvent),
    /// Redraws a window if it still has a pending dirty region.
    Redraw(WindowId),
    /// Runs a closure against the application state.
    Invoke(Task<A>),
    /// Stops the loop.
    Quit,
}

/// A thread-safe handle for posting to the event loop.
pub struct Invoker<A> {
    sender: Sender<PlatformEvent<A>>,
}

impl<A> Clone for Invoker<A> {
    fn clone(&self) -> Self {
        Invoker {
            sender: self.sender.clone(),
        }
    }
}

impl<A: 'static> Invoker<A> {
    /// Runs `f` on the main thread during the next loop iteration.
    ///
    /// Returns false if the loop is gone.
    pub fn invoke<F: FnOnce(&mut A) + Send + 'static>(&self, f: F) -> bool {
        self.post(PlatformEvent::Invoke(Box::new(f)))
    }

    pub fn post_event(&self, window: WindowId, event: UIEvent) -> bool {
        self.post(PlatformEvent::Input(window, event))
    }

    pub fn post_redraw(&self, window: WindowId) -> bool {
        self.post(PlatformEvent::Redraw(window))
    }

    pub fn quit(&self) -> bool {
        self.post(PlatformEvent::Quit)
    }

    fn post(&self, event: PlatformEvent<A>) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Owns the windows and the application state, and processes platform events.
pub struct EventLoop<A> {
    app: A,
    sender: Sender<PlatformEvent<A>>,
    receiver: Receiver<PlatformEvent<A>>,
    windows: HashMap<WindowId, Window>,
    overlays: Option<Rc<OverlayManager>>,
    renderer: Box<dyn Renderer>,
    is_quitting: bool,
}

impl<A: 'static> EventLoop<A> {
    pub fn new(app: A, renderer: Box<dyn Renderer>) -> EventLoop<A> {
        let (sender, receiver) = channel::unbounded();
        EventLoop {
            app,
            sender,
            receiver,
            windows: HashMap::new(),
            overlays: None,
            renderer,
            is_quitting: false,
        }
    }

    pub fn invoker(&self) -> Invoker<A> {
        Invoker {
            sender: self.sender.clone(),
        }
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    /// Registers a window; its redraw requests now go through the loop.
    pub fn add_window(&mut self, window: Window) {
        let invoker = self.invoker();
        window.set_redraw_scheduler(Some(Rc::new(move |id: WindowId| {
            invoker.post_redraw(id);
        })));
        log::debug!("added {:?}", window);
        self.windows.insert(window.id(), window);
    }

    pub fn remove_window(&mut self, id: WindowId) -> Option<Window> {
        let window = self.windows.remove(&id)?;
        window.set_redraw_scheduler(None);
        Some(window)
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    /// Routes input to open overlays before windows, and redraws overlay windows.
    pub fn set_overlay_manager(&mut self, overlays: Rc<OverlayManager>) {
        let invoker = self.invoker();
        overlays.set_redraw_scheduler(Some(Rc::new(move |id: WindowId| {
            invoker.post_redraw(id);
        })));
        self.overlays = Some(overlays);
    }

    pub fn is_quitting(&self) -> bool {
        self.is_quitting
    }

    /// Handles everything currently queued without blocking. Returns the number of events.
    pub fn process_pending(&mut self) -> usize {
        let mut count = 0;
        while !self.is_quitting {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.handle(event);
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        count
    }

    /// Waits up to `timeout` for one event and handles it along with everything queued after it.
    pub fn run_once(&mut self, timeout: Duration) -> usize {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => {
                self.handle(event);
                1 + self.process_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Runs until a quit event arrives.
    pub fn run(&mut self) {
        log::info!("event loop running");
        while !self.is_quitting {
            match self.receiver.recv() {
                Ok(event) => self.handle(event),
                Err(_) => break,
            }
        }
        log::info!("event loop stopped");
    }

    fn find_window(&self, id: WindowId) -> Option<Window> {
        self.windows.get(&id).cloned().or_else(|| {
            self.overlays
                .as_ref()
                .and_then(|overlays| overlays.window(id))
        })
    }

    fn handle(&mut self, event: PlatformEvent<A>) {
        match event {
            PlatformEvent::Input(id, event) => {
                if let Some(overlays) = &self.overlays {
                    if overlays.send_event(&event) {
                        return;
                    }
                }
                match self.windows.get(&id) {
                    Some(window) => {
                        if !window.send_event(&event) && event.event_type() != EventType::MouseMoved
                        {
                            log::trace!("unhandled {:?} in {:?}", event.event_type(), window);
                        }
                    }
                    None => log::debug!("input for unknown window {:?}", id),
                }
            }
            PlatformEvent::Redraw(id) => {
                if let Some(window) = self.find_window(id) {
                    window.redraw(&mut *self.renderer);
                }
            }
            PlatformEvent::Invoke(task) => task(&mut self.app),
            PlatformEvent::Quit => self.is_quitting = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawCommand;
    use crate::rect::Rect;
    use crate::view::View;
    use std::cell::RefCell;
    use std::thread;

    #[derive(Clone, Default)]
    struct SharedRenderer(Rc<RefCell<Vec<Rect>>>);

    impl Renderer for SharedRenderer {
        fn present(&mut self, _window: &str, dirty: Rect, _commands: &[DrawCommand]) {
            self.0.borrow_mut().push(dirty);
        }
    }

    #[test]
    fn invoke_from_another_thread() {
        let mut event_loop = EventLoop::new(Vec::<u32>::new(), Box::new(SharedRenderer::default()));
        let invoker = event_loop.invoker();

        let worker = thread::spawn(move || {
            for i in 0..3 {
                invoker.invoke(move |results: &mut Vec<u32>| results.push(i));
            }
        });
        worker.join().unwrap();

        assert_eq!(event_loop.process_pending(), 3);
        assert_eq!(event_loop.app(), &vec![0, 1, 2]);
    }

    #[test]
    fn dirty_views_are_redrawn_once_per_iteration() {
        let renderer = SharedRenderer::default();
        let mut event_loop = EventLoop::new((), Box::new(renderer.clone()));
        let window = Window::new("main", Rect::from_xywh(0., 0., 100., 100.));
        let view = View::new("v");
        view.set_frame(Rect::from_xywh(10., 10., 10., 10.));
        window.content_view().add_subview(&view);
        event_loop.add_window(window);

        for _ in 0..10 {
            view.set_dirty();
        }
        assert_eq!(event_loop.process_pending(), 1, "one redraw event queued");
        assert_eq!(*renderer.0.borrow(), vec![Rect::from_xywh(10., 10., 10., 10.)]);
    }

    #[test]
    fn quit_stops_processing() {
        let mut event_loop = EventLoop::new(0u32, Box::new(SharedRenderer::default()));
        let invoker = event_loop.invoker();
        invoker.invoke(|n: &mut u32| *n += 1);
        invoker.quit();
        invoker.invoke(|n: &mut u32| *n += 1);

        event_loop.run();
        assert!(event_loop.is_quitting());
        assert_eq!(*event_loop.app(), 1);
    }
}
