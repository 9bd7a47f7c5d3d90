//! The application state the event loop runs against.

use crate::midi_hub::{HubEvent, MidiDriver, MidiHub};
use crate::preferences::Preferences;
use crate::studio::Studio;
use crate::top_view_controller::{PortDirection, TopViewController};
use cgmath::Vector2;
use mdstudio::{EventLoop, Invoker, OverlayManager, Rect, Renderer, ScriptError, Window};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Where resources such as UI scripts live.
pub fn resource_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("ui")
}

pub struct MelobaseApp {
    window: Window,
    overlays: Rc<OverlayManager>,
    top: TopViewController,
    studio: Rc<RefCell<Studio>>,
    preferences: Rc<RefCell<Preferences>>,
    data_path: PathBuf,
    hub: Rc<RefCell<Option<MidiHub>>>,
}

impl MelobaseApp {
    /// Loads preferences and the top view. The window is sized from the preferences, or from the
    /// top view’s content size on first launch.
    pub fn new(data_path: &Path, top_view: &Path) -> Result<MelobaseApp, ScriptError> {
        let preferences = Preferences::load(data_path);
        let studio = Rc::new(RefCell::new(Studio::new(preferences.midi_channel)));
        studio.borrow_mut().set_metronome(preferences.is_metronome_on);
        let preferences = Rc::new(RefCell::new(preferences));

        let overlays = OverlayManager::new();
        let top = TopViewController::new(&overlays, Rc::clone(&studio), Rc::clone(&preferences), data_path);
        top.load(top_view)?;

        let size = match preferences.borrow().window_size {
            Some((w, h)) => Vector2::new(w, h),
            None => top.view().frame().size,
        };
        let window = Window::new("MelobaseStation", Rect::from_xywh(0., 0., size.x, size.y));
        window.content_view().add_subview(top.view());
        window.content_view().set_dirty();

        let hub: Rc<RefCell<Option<MidiHub>>> = Rc::new(RefCell::new(None));
        let outgoing = Rc::clone(&hub);
        studio.borrow_mut().set_output_fn(move |message| {
            if let Some(hub) = &*outgoing.borrow() {
                hub.send(message);
            }
        });
        let port_hub = Rc::clone(&hub);
        top.set_port_fn(move |direction, name| {
            if let Some(hub) = &*port_hub.borrow() {
                match direction {
                    PortDirection::Input => hub.set_input(name),
                    PortDirection::Output => hub.set_output(name),
                };
            }
        });

        Ok(MelobaseApp {
            window,
            overlays,
            top,
            studio,
            preferences,
            data_path: data_path.to_path_buf(),
            hub,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn top_view_controller(&self) -> &TopViewController {
        &self.top
    }

    pub fn studio(&self) -> &Rc<RefCell<Studio>> {
        &self.studio
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences.borrow().clone()
    }

    /// Creates the event loop, registers the window and wires quitting and deferred UI errors
    /// through the loop’s invoker.
    pub fn into_event_loop(self, renderer: Box<dyn Renderer>) -> EventLoop<MelobaseApp> {
        let window = self.window.clone();
        let overlays = Rc::clone(&self.overlays);
        let mut event_loop = EventLoop::new(self, renderer);
        let invoker = event_loop.invoker();

        let quitter = invoker.clone();
        event_loop.app().top.set_quit_fn(move || {
            quitter.quit();
        });
        let deferrer = invoker;
        event_loop
            .app()
            .top
            .ui()
            .set_error_deferral(&window, move |message| {
                deferrer.invoke(move |app: &mut MelobaseApp| app.top.ui().error(&message));
            });

        event_loop.set_overlay_manager(overlays);
        event_loop.add_window(window);
        event_loop
    }

    /// Starts the MIDI hub. Its reports are handled on the main thread.
    pub fn start_midi(&mut self, driver: Box<dyn MidiDriver>, invoker: Invoker<MelobaseApp>) {
        let prefs = self.preferences();
        let hub = MidiHub::start(driver, &prefs.midi_input, &prefs.midi_output, move |event| {
            invoker.invoke(move |app: &mut MelobaseApp| app.handle_hub_event(event));
        });
        *self.hub.borrow_mut() = Some(hub);
    }

    pub fn handle_hub_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::PortsChanged { inputs, outputs } => self.top.update_ports(inputs, outputs),
            HubEvent::Message(message) => self.top.handle_midi(&message),
        }
    }

    /// Stops MIDI and saves the preferences, including the window size.
    pub fn shutdown(&mut self) {
        self.hub.borrow_mut().take();
        let size = self.window.frame().size;
        self.preferences.borrow_mut().window_size = Some((size.x, size.y));
        self.preferences.borrow().save(&self.data_path);
        log::info!("shut down");
    }
}
