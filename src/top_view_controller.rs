//! The main window’s controller.
//!
//! Loads `TopView.lua`, binds its actions to the studio and the preferences, and keeps the
//! status line, port menus and the incoming event list up to date.

use crate::midi::MidiMessage;
use crate::preferences::Preferences;
use crate::studio::{Studio, Transport};
use mdstudio::{
    ActionValue, Button, ComboBox, Label, ListView, OverlayManager, ScriptError, ScriptModule,
    ScrollView, Ui, View,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// How many incoming messages the event list keeps.
pub const EVENT_LOG_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

type PortFn = Rc<dyn Fn(PortDirection, &str)>;

struct Inner {
    ui: Ui,
    view: View,
    studio: Rc<RefCell<Studio>>,
    preferences: Rc<RefCell<Preferences>>,
    data_path: PathBuf,
    inputs: RefCell<Vec<String>>,
    outputs: RefCell<Vec<String>>,
    events: RefCell<VecDeque<String>>,
    port_fn: RefCell<Option<PortFn>>,
    quit_fn: RefCell<Option<Rc<dyn Fn()>>>,
}

#[derive(Clone)]
pub struct TopViewController {
    inner: Rc<Inner>,
}

impl TopViewController {
    /// Creates the controller and its (empty) top view.
    pub fn new(
        overlays: &Rc<OverlayManager>,
        studio: Rc<RefCell<Studio>>,
        preferences: Rc<RefCell<Preferences>>,
        data_path: &Path,
    ) -> TopViewController {
        let controller = TopViewController {
            inner: Rc::new(Inner {
                ui: Ui::new(ScriptModule::with_standard_widgets(overlays)),
                view: View::new("topView"),
                studio,
                preferences,
                data_path: data_path.to_path_buf(),
                inputs: RefCell::new(Vec::new()),
                outputs: RefCell::new(Vec::new()),
                events: RefCell::new(VecDeque::new()),
                port_fn: RefCell::new(None),
                quit_fn: RefCell::new(None),
            }),
        };
        controller.bind_actions();
        controller
    }

    pub fn view(&self) -> &View {
        &self.inner.view
    }

    pub fn ui(&self) -> &Ui {
        &self.inner.ui
    }

    /// Loads the top view script and sets the widgets up from the current state.
    pub fn load(&self, path: &Path) -> Result<(), ScriptError> {
        self.inner.ui.load_ui(&self.inner.view, path)?;
        self.did_load();
        Ok(())
    }

    pub fn load_str(&self, source: &str) -> Result<(), ScriptError> {
        self.inner.ui.load_ui_str(&self.inner.view, source)?;
        self.did_load();
        Ok(())
    }

    /// Called with the port the user picked.
    pub fn set_port_fn(&self, f: impl Fn(PortDirection, &str) + 'static) {
        *self.inner.port_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_quit_fn(&self, f: impl Fn() + 'static) {
        *self.inner.quit_fn.borrow_mut() = Some(Rc::new(f));
    }

    fn bind_actions(&self) {
        let ui = &self.inner.ui;
        self.bind("new", |inner, _| {
            inner.studio.borrow_mut().reset();
            inner.events.borrow_mut().clear();
            inner.reload_events();
        });
        self.bind("record", |inner, _| inner.studio.borrow_mut().record());
        self.bind("play", |inner, _| inner.studio.borrow_mut().play());
        self.bind("stop", |inner, _| inner.studio.borrow_mut().stop());
        self.bind("metronome", |inner, value| {
            let is_on = value.as_bool().unwrap_or(false);
            inner.studio.borrow_mut().set_metronome(is_on);
            inner.update_preferences(|prefs| prefs.is_metronome_on = is_on);
        });
        self.bind("channel", |inner, value| {
            if let Some(channel) = value.as_index() {
                let channel = channel.min(15) as u8;
                inner.studio.borrow_mut().set_channel(channel);
                inner.update_preferences(|prefs| prefs.midi_channel = channel);
            }
        });
        self.bind("midiInput", |inner, value| {
            inner.pick_port(PortDirection::Input, value);
        });
        self.bind("midiOutput", |inner, value| {
            inner.pick_port(PortDirection::Output, value);
        });

        let weak = Rc::downgrade(&self.inner);
        ui.bind_action("quit", move |_| {
            let quit = weak
                .upgrade()
                .and_then(|inner| inner.quit_fn.borrow().clone());
            if let Some(quit) = quit {
                quit();
            }
        });
    }

    /// Binds an action that refreshes the view after running.
    fn bind(&self, name: &str, action: impl Fn(&Inner, &ActionValue) + 'static) {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        self.inner.ui.bind_action(name, move |value| {
            if let Some(inner) = weak.upgrade() {
                action(&inner, value);
                inner.refresh();
            }
        });
    }

    fn did_load(&self) {
        let inner = &self.inner;
        let prefs = inner.preferences.borrow().clone();
        if let Some(button) = inner.ui.widget::<Button>("metronome") {
            button.set_on(prefs.is_metronome_on);
        }
        if let Some(combo) = inner.ui.widget::<ComboBox>("channel") {
            combo.set_selected_index(Some(usize::from(prefs.midi_channel)));
        }
        if let Some(list) = inner.ui.widget::<ListView>("events") {
            let weak = Rc::downgrade(inner);
            list.set_nb_rows_fn(move || weak.upgrade().map_or(0, |inner| inner.events.borrow().len()));
            let weak = Rc::downgrade(inner);
            list.set_view_for_row_fn(move |row| {
                let text = weak
                    .upgrade()
                    .and_then(|inner| inner.events.borrow().get(row).cloned())
                    .unwrap_or_default();
                Label::new("event", &text).view().clone()
            });
        }
        self.update_ports(
            inner.inputs.borrow().clone(),
            inner.outputs.borrow().clone(),
        );
        inner.reload_events();
        inner.refresh();
    }

    /// Shows the current port lists, selecting the preferred ports.
    pub fn update_ports(&self, inputs: Vec<String>, outputs: Vec<String>) {
        let inner = &self.inner;
        let prefs = inner.preferences.borrow().clone();
        for (name, ports, preferred) in [
            ("midiInput", &inputs, &prefs.midi_input),
            ("midiOutput", &outputs, &prefs.midi_output),
        ]
        .iter()
        {
            if let Some(combo) = inner.ui.widget::<ComboBox>(name) {
                combo.set_items(ports.to_vec());
                combo.set_selected_index(ports.iter().position(|p| p == *preferred));
            }
        }
        *inner.inputs.borrow_mut() = inputs;
        *inner.outputs.borrow_mut() = outputs;
    }

    /// Feeds an incoming message to the studio and the event list.
    pub fn handle_midi(&self, message: &MidiMessage) {
        let inner = &self.inner;
        inner.studio.borrow_mut().handle_midi(message);
        {
            let mut events = inner.events.borrow_mut();
            if events.len() == EVENT_LOG_LEN {
                events.pop_front();
            }
            events.push_back(describe(message));
        }
        inner.reload_events();
        inner.refresh();
    }

    /// The event list, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.inner.events.borrow().iter().cloned().collect()
    }

    pub fn status_text(&self) -> String {
        self.inner
            .ui
            .widget::<Label>("status")
            .map(|label| label.text())
            .unwrap_or_default()
    }
}

impl Inner {
    fn pick_port(&self, direction: PortDirection, value: &ActionValue) {
        let ports = match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        };
        let name = match value.as_index().and_then(|i| ports.borrow().get(i).cloned()) {
            Some(name) => name,
            None => return,
        };
        log::info!(target: "midi", "picked {:?} port {:?}", direction, name);
        self.update_preferences(|prefs| match direction {
            PortDirection::Input => prefs.midi_input = name.clone(),
            PortDirection::Output => prefs.midi_output = name.clone(),
        });
        let port_fn = self.port_fn.borrow().clone();
        if let Some(port_fn) = port_fn {
            port_fn(direction, &name);
        }
    }

    fn update_preferences(&self, update: impl FnOnce(&mut Preferences)) {
        let prefs = {
            let mut prefs = self.preferences.borrow_mut();
            update(&mut prefs);
            prefs.clone()
        };
        prefs.save(&self.data_path);
    }

    fn reload_events(&self) {
        if let Some(list) = self.ui.widget::<ListView>("events") {
            list.reload();
            if let Some(scroll_view) = self.ui.widget::<ScrollView>("eventsScroll") {
                let last = self.events.borrow().len();
                if last > 0 {
                    scroll_view.scroll_to_visible(list.row_frame(last - 1));
                }
            }
        }
    }

    fn refresh(&self) {
        let studio = self.studio.borrow();
        let transport = studio.transport();
        let notes = studio.sounding_notes();
        let mut status = transport.to_string();
        if !notes.is_empty() {
            let names: Vec<String> = notes.iter().map(|n| note_name(*n)).collect();
            status.push_str(&format!(" · {}", names.join(" ")));
        }
        if studio.pitch_bend() != 0. {
            status.push_str(&format!(" · bend {:+.2}", studio.pitch_bend()));
        }
        drop(studio);

        if let Some(label) = self.ui.widget::<Label>("status") {
            label.set_text(&status);
        }
        if let Some(button) = self.ui.widget::<Button>("record") {
            button.set_title(if transport == Transport::Recording {
                "Recording"
            } else {
                "Record"
            });
        }
    }
}

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Note 60 is C4.
pub fn note_name(note: u8) -> String {
    format!("{}{}", NOTE_NAMES[usize::from(note % 12)], i32::from(note / 12) - 1)
}

fn describe(message: &MidiMessage) -> String {
    let channel = message.channel() + 1;
    let body = match *message {
        MidiMessage::NoteOn { note, velocity, .. } => {
            format!("Note on {} ({:.0}%)", note_name(note), velocity * 100.)
        }
        MidiMessage::NoteOff { note, .. } => format!("Note off {}", note_name(note)),
        MidiMessage::PolyAftertouch { note, pressure, .. } => {
            format!("Aftertouch {} ({:.0}%)", note_name(note), pressure * 100.)
        }
        MidiMessage::ChannelAftertouch { pressure, .. } => {
            format!("Aftertouch ({:.0}%)", pressure * 100.)
        }
        MidiMessage::ProgramChange { program, .. } => format!("Program {}", program),
        MidiMessage::PitchBend { value, .. } => format!("Pitch bend {:+.2}", value),
        MidiMessage::Sustain { value, .. } => format!("Sustain {:.0}%", value * 100.),
        MidiMessage::Modulation { value, .. } => format!("Modulation {:.0}%", value * 100.),
        MidiMessage::Volume { value, .. } => format!("Volume {:.0}%", value * 100.),
        MidiMessage::Pan { value, .. } => format!("Pan {:.0}%", value * 100.),
        MidiMessage::ControlChange {
            controller, value, ..
        } => format!("CC {} = {}", controller, value),
        MidiMessage::TransportStart { .. } => "Start".to_string(),
        MidiMessage::TransportStop { .. } => "Stop".to_string(),
    };
    format!("{:>2}  {}", channel, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOP_VIEW: &str = include_str!("../ui/TopView.lua");

    fn controller(dir: &Path) -> TopViewController {
        let controller = TopViewController::new(
            &OverlayManager::new(),
            Rc::new(RefCell::new(Studio::new(0))),
            Rc::new(RefCell::new(Preferences::default())),
            dir,
        );
        controller.load_str(TOP_VIEW).unwrap();
        controller
    }

    #[test]
    fn note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(69), "A4");
    }

    #[test]
    fn transport_actions_update_the_status() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        assert_eq!(controller.view().frame().size, cgmath::Vector2::new(800., 500.));
        assert_eq!(controller.status_text(), "Stopped");

        controller.ui().trigger("record", ActionValue::None);
        assert_eq!(controller.status_text(), "Recording");
        controller.handle_midi(&MidiMessage::NoteOn {
            channel: 0,
            note: 64,
            velocity: 0.5,
        });
        assert_eq!(controller.status_text(), "Recording · E4");

        controller.ui().trigger("new", ActionValue::None);
        assert_eq!(controller.status_text(), "Stopped");
        assert!(controller.events().is_empty());
        assert!(!controller.ui().is_failed());
    }

    #[test]
    fn picking_ports_saves_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        let picked = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&picked);
        controller.set_port_fn(move |direction, name| log.borrow_mut().push((direction, name.to_string())));

        controller.update_ports(vec!["Keys".into(), "Pads".into()], vec!["Synth".into()]);
        controller.ui().trigger("midiInput", ActionValue::Index(1));
        controller.ui().trigger("midiOutput", ActionValue::Index(3));

        assert_eq!(*picked.borrow(), vec![(PortDirection::Input, "Pads".to_string())]);
        assert_eq!(Preferences::load(dir.path()).midi_input, "Pads");

        controller.update_ports(vec!["Pads".into()], vec![]);
        let combo = controller.ui().widget::<ComboBox>("midiInput");
        assert_eq!(combo.and_then(|c| c.selected_item()), Some("Pads".to_string()));
    }

    #[test]
    fn event_list_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        for program in 0..(EVENT_LOG_LEN as u8 + 5) {
            controller.handle_midi(&MidiMessage::ProgramChange { channel: 9, program });
        }
        let events = controller.events();
        assert_eq!(events.len(), EVENT_LOG_LEN);
        assert_eq!(events[0], "10  Program 5");
    }
}
