//! MelobaseStation, a MIDI sequencer front end built on MDStudio.
//!
//! [`MelobaseApp`](app::MelobaseApp) is the composition root: it owns the main window, the
//! [`Studio`](studio::Studio) that live MIDI input drives, the preferences and the
//! [`MidiHub`](midi_hub::MidiHub) thread. Input comes from the terminal through
//! [`TerminalInputThread`](terminal::TerminalInputThread).

pub mod app;
pub mod midi;
pub mod midi_hub;
pub mod preferences;
pub mod studio;
pub mod terminal;
pub mod top_view_controller;
