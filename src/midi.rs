//! MIDI 1.0 channel messages.
//!
//! Controller values, velocities and pressures are scaled linearly between the 0 to 127 wire
//! range and 0.0 to 1.0. Pitch bend is scaled to −2.0 to 2.0.

use std::fmt;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_AFTERTOUCH: u8 = 0xa0;
pub const CONTROL_CHANGE: u8 = 0xb0;
pub const PROGRAM_CHANGE: u8 = 0xc0;
pub const CHANNEL_AFTERTOUCH: u8 = 0xd0;
pub const PITCH_BEND: u8 = 0xe0;

pub const CC_MODULATION: u8 = 0x01;
pub const CC_VOLUME: u8 = 0x07;
pub const CC_PAN: u8 = 0x0a;
pub const CC_SUSTAIN: u8 = 0x40;
pub const CC_TRANSPORT_START: u8 = 0x72;
pub const CC_TRANSPORT_STOP: u8 = 0x73;

const PITCH_BEND_CENTER: f64 = 8192.;
const PITCH_BEND_RANGE: f64 = 2.;

/// A decoded message. Channels are 0 to 15.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: f64 },
    NoteOff { channel: u8, note: u8, velocity: f64 },
    PolyAftertouch { channel: u8, note: u8, pressure: f64 },
    ChannelAftertouch { channel: u8, pressure: f64 },
    ProgramChange { channel: u8, program: u8 },
    PitchBend { channel: u8, value: f64 },
    Sustain { channel: u8, value: f64 },
    Modulation { channel: u8, value: f64 },
    Volume { channel: u8, value: f64 },
    Pan { channel: u8, value: f64 },
    /// Any other controller, with the raw value.
    ControlChange { channel: u8, controller: u8, value: u8 },
    TransportStart { channel: u8 },
    TransportStop { channel: u8 },
}

impl MidiMessage {
    pub fn channel(&self) -> u8 {
        match *self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::PolyAftertouch { channel, .. }
            | MidiMessage::ChannelAftertouch { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::PitchBend { channel, .. }
            | MidiMessage::Sustain { channel, .. }
            | MidiMessage::Modulation { channel, .. }
            | MidiMessage::Volume { channel, .. }
            | MidiMessage::Pan { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::TransportStart { channel }
            | MidiMessage::TransportStop { channel } => channel,
        }
    }

    /// Decodes one message. Returns None for system messages, truncated input and anything else
    /// the studio doesn’t care about.
    pub fn decode(bytes: &[u8]) -> Option<MidiMessage> {
        let status = *bytes.first()?;
        let channel = status & 0x0f;
        let data = |i: usize| bytes.get(i).map(|b| b & 0x7f);

        let message = match status & 0xf0 {
            NOTE_ON => {
                let (note, velocity) = (data(1)?, data(2)?);
                if velocity == 0 {
                    MidiMessage::NoteOff {
                        channel,
                        note,
                        velocity: 0.,
                    }
                } else {
                    MidiMessage::NoteOn {
                        channel,
                        note,
                        velocity: to_unit(velocity),
                    }
                }
            }
            NOTE_OFF => MidiMessage::NoteOff {
                channel,
                note: data(1)?,
                velocity: to_unit(data(2)?),
            },
            POLY_AFTERTOUCH => MidiMessage::PolyAftertouch {
                channel,
                note: data(1)?,
                pressure: to_unit(data(2)?),
            },
            CHANNEL_AFTERTOUCH => MidiMessage::ChannelAftertouch {
                channel,
                pressure: to_unit(data(1)?),
            },
            PROGRAM_CHANGE => MidiMessage::ProgramChange {
                channel,
                program: data(1)?,
            },
            PITCH_BEND => {
                let raw = u16::from(data(1)?) | u16::from(data(2)?) << 7;
                MidiMessage::PitchBend {
                    channel,
                    value: (f64::from(raw) - PITCH_BEND_CENTER) / PITCH_BEND_CENTER * PITCH_BEND_RANGE,
                }
            }
            CONTROL_CHANGE => {
                let (controller, value) = (data(1)?, data(2)?);
                match controller {
                    CC_SUSTAIN => MidiMessage::Sustain {
                        channel,
                        value: to_unit(value),
                    },
                    CC_MODULATION => MidiMessage::Modulation {
                        channel,
                        value: to_unit(value),
                    },
                    CC_VOLUME => MidiMessage::Volume {
                        channel,
                        value: to_unit(value),
                    },
                    CC_PAN => MidiMessage::Pan {
                        channel,
                        value: to_unit(value),
                    },
                    CC_TRANSPORT_START => MidiMessage::TransportStart { channel },
                    CC_TRANSPORT_STOP => MidiMessage::TransportStop { channel },
                    _ => MidiMessage::ControlChange {
                        channel,
                        controller,
                        value,
                    },
                }
            }
            _ => return None,
        };
        Some(message)
    }

    /// Encodes the message as it goes on the wire.
    pub fn encode(&self) -> Vec<u8> {
        let ch = self.channel() & 0x0f;
        match *self {
            MidiMessage::NoteOn { note, velocity, .. } => {
                vec![NOTE_ON | ch, note & 0x7f, from_unit(velocity)]
            }
            MidiMessage::NoteOff { note, velocity, .. } => {
                vec![NOTE_OFF | ch, note & 0x7f, from_unit(velocity)]
            }
            MidiMessage::PolyAftertouch { note, pressure, .. } => {
                vec![POLY_AFTERTOUCH | ch, note & 0x7f, from_unit(pressure)]
            }
            MidiMessage::ChannelAftertouch { pressure, .. } => {
                vec![CHANNEL_AFTERTOUCH | ch, from_unit(pressure)]
            }
            MidiMessage::ProgramChange { program, .. } => vec![PROGRAM_CHANGE | ch, program & 0x7f],
            MidiMessage::PitchBend { value, .. } => {
                let raw = (value / PITCH_BEND_RANGE * PITCH_BEND_CENTER + PITCH_BEND_CENTER)
                    .round()
                    .max(0.)
                    .min(16383.) as u16;
                vec![PITCH_BEND | ch, (raw & 0x7f) as u8, (raw >> 7) as u8]
            }
            MidiMessage::Sustain { value, .. } => vec![CONTROL_CHANGE | ch, CC_SUSTAIN, from_unit(value)],
            MidiMessage::Modulation { value, .. } => {
                vec![CONTROL_CHANGE | ch, CC_MODULATION, from_unit(value)]
            }
            MidiMessage::Volume { value, .. } => vec![CONTROL_CHANGE | ch, CC_VOLUME, from_unit(value)],
            MidiMessage::Pan { value, .. } => vec![CONTROL_CHANGE | ch, CC_PAN, from_unit(value)],
            MidiMessage::ControlChange {
                controller, value, ..
            } => vec![CONTROL_CHANGE | ch, controller & 0x7f, value & 0x7f],
            MidiMessage::TransportStart { .. } => vec![CONTROL_CHANGE | ch, CC_TRANSPORT_START, 0x7f],
            MidiMessage::TransportStop { .. } => vec![CONTROL_CHANGE | ch, CC_TRANSPORT_STOP, 0x7f],
        }
    }
}

fn to_unit(value: u8) -> f64 {
    f64::from(value) / 127.
}

fn from_unit(value: f64) -> u8 {
    (value * 127.).round().max(0.).min(127.) as u8
}

/// Errors of the MIDI driver.
#[derive(Debug, Clone, PartialEq)]
pub enum MidiError {
    /// The platform MIDI API couldn’t be initialized.
    Init(String),
    /// No port with the given name exists.
    PortNotFound(String),
    /// Opening a port failed.
    Connect(String, String),
    /// Sending failed, or no output is open.
    Send(String),
}

impl fmt::Display for MidiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MidiError::Init(err) => write!(f, "could not initialize MIDI: {}", err),
            MidiError::PortNotFound(name) => write!(f, "no MIDI port named {:?}", name),
            MidiError::Connect(name, err) => write!(f, "could not open {:?}: {}", name, err),
            MidiError::Send(err) => write!(f, "could not send: {}", err),
        }
    }
}

impl std::error::Error for MidiError {}
