//! Live instrument and transport state.
//!
//! Input from the MIDI hub updates the state through [`Studio::handle_midi`]. The `set_*`
//! methods change it from the UI side and send the matching message to the output function.

use crate::midi::MidiMessage;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Playing,
    Recording,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Transport::Stopped => write!(f, "Stopped"),
            Transport::Playing => write!(f, "Playing"),
            Transport::Recording => write!(f, "Recording"),
        }
    }
}

const DEFAULT_VOLUME: f64 = 100. / 127.;
const DEFAULT_PAN: f64 = 64. / 127.;
/// Sustain values at or above this hold released notes.
const SUSTAIN_THRESHOLD: f64 = 0.5;

pub struct Studio {
    /// Output channel. Input is accepted on every channel.
    channel: u8,
    /// Pressed keys and their velocities.
    held_notes: BTreeMap<u8, f64>,
    /// Released keys still sounding because of the sustain pedal.
    sustained_notes: BTreeSet<u8>,
    poly_aftertouch: BTreeMap<u8, f64>,
    sustain: f64,
    modulation: f64,
    volume: f64,
    pan: f64,
    pitch_bend: f64,
    program: u8,
    aftertouch: f64,
    transport: Transport,
    is_metronome_on: bool,
    output_fn: Option<Box<dyn Fn(&MidiMessage)>>,
}

impl Studio {
    pub fn new(channel: u8) -> Studio {
        Studio {
            channel: channel & 0x0f,
            held_notes: BTreeMap::new(),
            sustained_notes: BTreeSet::new(),
            poly_aftertouch: BTreeMap::new(),
            sustain: 0.,
            modulation: 0.,
            volume: DEFAULT_VOLUME,
            pan: DEFAULT_PAN,
            pitch_bend: 0.,
            program: 0,
            aftertouch: 0.,
            transport: Transport::Stopped,
            is_metronome_on: false,
            output_fn: None,
        }
    }

    /// Sets where outgoing messages go.
    pub fn set_output_fn(&mut self, f: impl Fn(&MidiMessage) + 'static) {
        self.output_fn = Some(Box::new(f));
    }

    fn emit(&self, message: MidiMessage) {
        log::trace!(target: "midi", "out {:?}", message);
        if let Some(output) = &self.output_fn {
            output(&message);
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn set_channel(&mut self, channel: u8) {
        self.channel = channel & 0x0f;
    }

    /// Applies an incoming message. Returns whether anything changed.
    pub fn handle_midi(&mut self, message: &MidiMessage) -> bool {
        log::trace!(target: "midi", "in {:?}", message);
        match *message {
            MidiMessage::NoteOn { note, velocity, .. } => {
                self.sustained_notes.remove(&note);
                self.held_notes.insert(note, velocity) != Some(velocity)
            }
            MidiMessage::NoteOff { note, .. } => self.release(note),
            MidiMessage::PolyAftertouch { note, pressure, .. } => {
                self.poly_aftertouch.insert(note, pressure) != Some(pressure)
            }
            MidiMessage::ChannelAftertouch { pressure, .. } => replace(&mut self.aftertouch, pressure),
            MidiMessage::ProgramChange { program, .. } => {
                let did_change = self.program != program;
                self.program = program;
                did_change
            }
            MidiMessage::PitchBend { value, .. } => replace(&mut self.pitch_bend, value),
            MidiMessage::Sustain { value, .. } => self.apply_sustain(value),
            MidiMessage::Modulation { value, .. } => replace(&mut self.modulation, value),
            MidiMessage::Volume { value, .. } => replace(&mut self.volume, value),
            MidiMessage::Pan { value, .. } => replace(&mut self.pan, value),
            MidiMessage::ControlChange { .. } => false,
            MidiMessage::TransportStart { .. } => self.set_transport(Transport::Playing),
            MidiMessage::TransportStop { .. } => self.set_transport(Transport::Stopped),
        }
    }

    fn release(&mut self, note: u8) -> bool {
        self.poly_aftertouch.remove(&note);
        if self.held_notes.remove(&note).is_none() {
            return false;
        }
        if self.sustain >= SUSTAIN_THRESHOLD {
            self.sustained_notes.insert(note);
        }
        true
    }

    fn apply_sustain(&mut self, value: f64) -> bool {
        let did_change = replace(&mut self.sustain, value);
        if value < SUSTAIN_THRESHOLD {
            self.sustained_notes.clear();
        }
        did_change
    }

    fn set_transport(&mut self, transport: Transport) -> bool {
        if self.transport == transport {
            return false;
        }
        log::debug!("transport: {} -> {}", self.transport, transport);
        self.transport = transport;
        true
    }

    // state

    /// Notes that are pressed or sustained, ascending.
    pub fn sounding_notes(&self) -> Vec<u8> {
        let notes: BTreeSet<u8> = self
            .held_notes
            .keys()
            .chain(self.sustained_notes.iter())
            .copied()
            .collect();
        notes.into_iter().collect()
    }

    pub fn velocity(&self, note: u8) -> Option<f64> {
        self.held_notes.get(&note).copied()
    }

    pub fn poly_aftertouch(&self, note: u8) -> Option<f64> {
        self.poly_aftertouch.get(&note).copied()
    }

    pub fn sustain(&self) -> f64 {
        self.sustain
    }

    pub fn modulation(&self) -> f64 {
        self.modulation
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn pan(&self) -> f64 {
        self.pan
    }

    pub fn pitch_bend(&self) -> f64 {
        self.pitch_bend
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    pub fn aftertouch(&self) -> f64 {
        self.aftertouch
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_metronome_on(&self) -> bool {
        self.is_metronome_on
    }

    // outgoing

    pub fn note_on(&mut self, note: u8, velocity: f64) {
        let note = note & 0x7f;
        self.held_notes.insert(note, velocity);
        self.emit(MidiMessage::NoteOn {
            channel: self.channel,
            note,
            velocity,
        });
    }

    pub fn note_off(&mut self, note: u8) {
        let note = note & 0x7f;
        self.release(note);
        self.emit(MidiMessage::NoteOff {
            channel: self.channel,
            note,
            velocity: 0.,
        });
    }

    pub fn set_sustain(&mut self, value: f64) {
        self.apply_sustain(value);
        self.emit(MidiMessage::Sustain {
            channel: self.channel,
            value,
        });
    }

    pub fn set_modulation(&mut self, value: f64) {
        self.modulation = value;
        self.emit(MidiMessage::Modulation {
            channel: self.channel,
            value,
        });
    }

    pub fn set_volume(&mut self, value: f64) {
        self.volume = value;
        self.emit(MidiMessage::Volume {
            channel: self.channel,
            value,
        });
    }

    pub fn set_pan(&mut self, value: f64) {
        self.pan = value;
        self.emit(MidiMessage::Pan {
            channel: self.channel,
            value,
        });
    }

    /// Bends by `value` semitones, clamped to ±2.
    pub fn set_pitch_bend(&mut self, value: f64) {
        let value = value.max(-2.).min(2.);
        self.pitch_bend = value;
        self.emit(MidiMessage::PitchBend {
            channel: self.channel,
            value,
        });
    }

    pub fn set_program(&mut self, program: u8) {
        self.program = program & 0x7f;
        self.emit(MidiMessage::ProgramChange {
            channel: self.channel,
            program: self.program,
        });
    }

    pub fn set_aftertouch(&mut self, pressure: f64) {
        self.aftertouch = pressure;
        self.emit(MidiMessage::ChannelAftertouch {
            channel: self.channel,
            pressure,
        });
    }

    // transport

    pub fn play(&mut self) {
        if self.set_transport(Transport::Playing) {
            self.emit(MidiMessage::TransportStart { channel: self.channel });
        }
    }

    pub fn record(&mut self) {
        if self.set_transport(Transport::Recording) {
            self.emit(MidiMessage::TransportStart { channel: self.channel });
        }
    }

    pub fn stop(&mut self) {
        if self.set_transport(Transport::Stopped) {
            self.emit(MidiMessage::TransportStop { channel: self.channel });
        }
    }

    pub fn set_metronome(&mut self, is_on: bool) {
        self.is_metronome_on = is_on;
    }

    /// Stops, releases every sounding note and resets the controllers.
    pub fn reset(&mut self) {
        self.stop();
        for note in self.sounding_notes() {
            self.emit(MidiMessage::NoteOff {
                channel: self.channel,
                note,
                velocity: 0.,
            });
        }
        self.held_notes.clear();
        self.sustained_notes.clear();
        self.poly_aftertouch.clear();
        if self.sustain > 0. {
            self.set_sustain(0.);
        }
        if self.pitch_bend != 0. {
            self.set_pitch_bend(0.);
        }
        self.modulation = 0.;
        self.aftertouch = 0.;
    }
}

/// Stores `value`, returning whether it differed.
fn replace(slot: &mut f64, value: f64) -> bool {
    let did_change = (*slot - value).abs() > std::f64::EPSILON;
    *slot = value;
    did_change
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn note_on(note: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            channel: 0,
            note,
            velocity: 0.5,
        }
    }

    fn note_off(note: u8) -> MidiMessage {
        MidiMessage::NoteOff {
            channel: 0,
            note,
            velocity: 0.,
        }
    }

    fn sustain(value: f64) -> MidiMessage {
        MidiMessage::Sustain { channel: 0, value }
    }

    #[test]
    fn sustain_holds_released_notes() {
        let mut studio = Studio::new(0);
        assert!(studio.handle_midi(&note_on(60)));
        assert!(studio.handle_midi(&note_on(64)));
        studio.handle_midi(&sustain(1.));
        studio.handle_midi(&note_off(60));
        assert_eq!(studio.sounding_notes(), vec![60, 64]);
        assert_eq!(studio.velocity(60), None);

        studio.handle_midi(&sustain(0.));
        assert_eq!(studio.sounding_notes(), vec![64]);
        assert!(!studio.handle_midi(&note_off(60)), "already released");
    }

    #[test]
    fn transport_from_midi() {
        let mut studio = Studio::new(0);
        assert!(studio.handle_midi(&MidiMessage::TransportStart { channel: 3 }));
        assert_eq!(studio.transport(), Transport::Playing);
        assert!(!studio.handle_midi(&MidiMessage::TransportStart { channel: 3 }));
        studio.handle_midi(&MidiMessage::TransportStop { channel: 3 });
        assert_eq!(studio.transport(), Transport::Stopped);
    }

    #[test]
    fn outgoing_messages_use_the_output_channel() {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let mut studio = Studio::new(2);
        let log = Rc::clone(&sent);
        studio.set_output_fn(move |message| log.borrow_mut().push(*message));

        studio.set_pitch_bend(3.);
        studio.note_on(60, 1.);
        studio.record();
        studio.record();
        studio.reset();

        assert_eq!(
            *sent.borrow(),
            vec![
                MidiMessage::PitchBend { channel: 2, value: 2. },
                MidiMessage::NoteOn {
                    channel: 2,
                    note: 60,
                    velocity: 1.
                },
                MidiMessage::TransportStart { channel: 2 },
                MidiMessage::TransportStop { channel: 2 },
                MidiMessage::NoteOff {
                    channel: 2,
                    note: 60,
                    velocity: 0.
                },
                MidiMessage::PitchBend { channel: 2, value: 0. },
            ]
        );
        assert!(studio.sounding_notes().is_empty());
    }
}
