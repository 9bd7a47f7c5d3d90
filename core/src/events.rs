//! Events.

use bitflags::bitflags;
use cgmath::{Point2, Vector2, Vector3, Zero};

/// List of event types.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    MouseDown = 0,
    MouseUp = 1,
    MouseMoved = 2,
    RightMouseDown = 3,
    RightMouseUp = 4,
    Scroll = 5,
    KeyDown = 6,
    KeyUp = 7,
    TextInput = 8,
}

impl EventType {
    /// If true, the event has a meaningful location and is dispatched by hit testing.
    pub fn is_pointer(&self) -> bool {
        match self {
            EventType::MouseDown
            | EventType::MouseUp
            | EventType::MouseMoved
            | EventType::RightMouseDown
            | EventType::RightMouseUp
            | EventType::Scroll => true,
            EventType::KeyDown | EventType::KeyUp | EventType::TextInput => false,
        }
    }
}

/// Trackpad gesture phases.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// Not part of a gesture (e.g. a mouse wheel tick).
    None = 0,
    MayBegin = 1,
    Began = 2,
    Changed = 3,
    Ended = 4,
    Cancelled = 5,
}

bitflags! {
    /// Modifier key state.
    pub struct Modifiers: u8 {
        /// Any shift key is pressed.
        const SHIFT = 1;
        /// Any control key is pressed.
        const CONTROL = 1 << 1;
        /// Any option key or alt key is pressed.
        const ALT = 1 << 2;
        /// Any command key or meta key is pressed.
        const COMMAND = 1 << 3;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers::empty()
    }
}

impl Modifiers {
    /// Command on macOS, control elsewhere: either toggles list selection.
    pub fn is_toggle(&self) -> bool {
        self.intersects(Modifiers::COMMAND | Modifiers::CONTROL)
    }
}

/// One input occurrence.
///
/// Events are never mutated after construction; use [`UIEvent::translated`] to get a copy in a
/// different coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct UIEvent {
    event_type: EventType,
    point: Point2<f64>,
    delta: Vector3<f64>,
    key: Option<KeyCode>,
    modifiers: Modifiers,
    phase: EventPhase,
    is_repeat: bool,
    characters: String,
}

impl UIEvent {
    fn new(event_type: EventType, point: Point2<f64>) -> UIEvent {
        UIEvent {
            event_type,
            point,
            delta: Vector3::zero(),
            key: None,
            modifiers: Modifiers::empty(),
            phase: EventPhase::None,
            is_repeat: false,
            characters: String::new(),
        }
    }

    pub fn mouse_down(point: Point2<f64>) -> UIEvent {
        UIEvent::new(EventType::MouseDown, point)
    }

    pub fn mouse_up(point: Point2<f64>) -> UIEvent {
        UIEvent::new(EventType::MouseUp, point)
    }

    pub fn mouse_moved(point: Point2<f64>) -> UIEvent {
        UIEvent::new(EventType::MouseMoved, point)
    }

    pub fn right_mouse_down(point: Point2<f64>) -> UIEvent {
        UIEvent::new(EventType::RightMouseDown, point)
    }

    pub fn right_mouse_up(point: Point2<f64>) -> UIEvent {
        UIEvent::new(EventType::RightMouseUp, point)
    }

    /// A scroll event; positive deltas scroll further down and right into the content.
    pub fn scroll(point: Point2<f64>, delta: Vector2<f64>) -> UIEvent {
        UIEvent {
            delta: Vector3::new(delta.x, delta.y, 0.),
            ..UIEvent::new(EventType::Scroll, point)
        }
    }

    pub fn key_down(key: KeyCode) -> UIEvent {
        UIEvent {
            key: Some(key),
            ..UIEvent::new(EventType::KeyDown, Point2::new(0., 0.))
        }
    }

    pub fn key_up(key: KeyCode) -> UIEvent {
        UIEvent {
            key: Some(key),
            ..UIEvent::new(EventType::KeyUp, Point2::new(0., 0.))
        }
    }

    pub fn text_input(characters: &str) -> UIEvent {
        UIEvent {
            characters: characters.to_string(),
            ..UIEvent::new(EventType::TextInput, Point2::new(0., 0.))
        }
    }

    pub fn with_modifiers(self, modifiers: Modifiers) -> UIEvent {
        UIEvent { modifiers, ..self }
    }

    pub fn with_phase(self, phase: EventPhase) -> UIEvent {
        UIEvent { phase, ..self }
    }

    pub fn with_z_delta(self, z: f64) -> UIEvent {
        UIEvent {
            delta: Vector3::new(self.delta.x, self.delta.y, z),
            ..self
        }
    }

    pub fn repeating(self) -> UIEvent {
        UIEvent {
            is_repeat: true,
            ..self
        }
    }

    /// Returns a copy with the location moved by `offset`.
    pub fn translated(&self, offset: Vector2<f64>) -> UIEvent {
        UIEvent {
            point: self.point + offset,
            ..self.clone()
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Event location in the window coordinate system.
    pub fn point(&self) -> Point2<f64> {
        self.point
    }

    pub fn delta_x(&self) -> f64 {
        self.delta.x
    }

    pub fn delta_y(&self) -> f64 {
        self.delta.y
    }

    pub fn delta_z(&self) -> f64 {
        self.delta.z
    }

    pub fn key(&self) -> Option<KeyCode> {
        self.key
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn is_repeat(&self) -> bool {
        self.is_repeat
    }

    /// Text input characters.
    pub fn characters(&self) -> &str {
        &self.characters
    }
}

/// Cursor glyphs a view may claim for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Arrow,
    IBeam,
    PointingHand,
    Crosshair,
    ResizeLeftRight,
    ResizeUpDown,
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::Arrow
    }
}

/// Keyboard layout-independent identifiers for keyboard keys.
///
/// Some obscure keys may be missing.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    A = 0x1,
    B = 0x2,
    C = 0x3,
    D = 0x4,
    E = 0x5,
    F = 0x6,
    G = 0x7,
    H = 0x8,
    I = 0x9,
    J = 0xA,
    K = 0xB,
    L = 0xC,
    M = 0xD,
    N = 0xE,
    O = 0xF,
    P = 0x10,
    Q = 0x11,
    R = 0x12,
    S = 0x13,
    T = 0x14,
    U = 0x15,
    V = 0x16,
    W = 0x17,
    X = 0x18,
    Y = 0x19,
    Z = 0x1A,
    N0 = 0x20,
    N1 = 0x21,
    N2 = 0x22,
    N3 = 0x23,
    N4 = 0x24,
    N5 = 0x25,
    N6 = 0x26,
    N7 = 0x27,
    N8 = 0x28,
    N9 = 0x29,
    Return = 0x35,
    Tab = 0x36,
    Space = 0x37,
    Backspace = 0x38,
    Escape = 0x39,
    LeftArrow = 0x44,
    DownArrow = 0x45,
    UpArrow = 0x46,
    RightArrow = 0x47,
    ForwardDelete = 0x48,
    Home = 0x4A,
    End = 0x4B,
    PageUp = 0x4C,
    PageDown = 0x4D,
}
