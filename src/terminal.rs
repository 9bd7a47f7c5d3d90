//! Terminal input.
//!
//! Reads keyboard, mouse and resize events from the controlling terminal on a background thread
//! and posts them to the event loop. A terminal cell maps to a fixed-size rectangle of the window,
//! so clicks land on the views drawn there. Control-C and control-Q quit the loop, which lets the
//! app shut down normally.

use cgmath::{Point2, Vector2};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode as TermKey, KeyEvent,
    KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use mdstudio::{Invoker, KeyCode, Modifiers, UIEvent, WindowId};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long a poll waits. Also bounds how long stopping takes.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The window-space size of one terminal cell.
pub const CELL_SIZE: Vector2<f64> = Vector2 { x: 8., y: 16. };

/// What a terminal event turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalInput {
    Event(UIEvent),
    /// The terminal now has this many pixels, in cell units times [`CELL_SIZE`].
    Resize(Vector2<f64>),
    Quit,
}

const LETTERS: [KeyCode; 26] = [
    KeyCode::A,
    KeyCode::B,
    KeyCode::C,
    KeyCode::D,
    KeyCode::E,
    KeyCode::F,
    KeyCode::G,
    KeyCode::H,
    KeyCode::I,
    KeyCode::J,
    KeyCode::K,
    KeyCode::L,
    KeyCode::M,
    KeyCode::N,
    KeyCode::O,
    KeyCode::P,
    KeyCode::Q,
    KeyCode::R,
    KeyCode::S,
    KeyCode::T,
    KeyCode::U,
    KeyCode::V,
    KeyCode::W,
    KeyCode::X,
    KeyCode::Y,
    KeyCode::Z,
];

const DIGITS: [KeyCode; 10] = [
    KeyCode::N0,
    KeyCode::N1,
    KeyCode::N2,
    KeyCode::N3,
    KeyCode::N4,
    KeyCode::N5,
    KeyCode::N6,
    KeyCode::N7,
    KeyCode::N8,
    KeyCode::N9,
];

fn key_code(code: TermKey) -> Option<KeyCode> {
    Some(match code {
        TermKey::Char(c) if c.is_ascii_alphabetic() => {
            LETTERS[(c.to_ascii_lowercase() as u8 - b'a') as usize]
        }
        TermKey::Char(c) if c.is_ascii_digit() => DIGITS[(c as u8 - b'0') as usize],
        TermKey::Char(' ') => KeyCode::Space,
        TermKey::Enter => KeyCode::Return,
        TermKey::Tab => KeyCode::Tab,
        TermKey::Backspace => KeyCode::Backspace,
        TermKey::Esc => KeyCode::Escape,
        TermKey::Left => KeyCode::LeftArrow,
        TermKey::Right => KeyCode::RightArrow,
        TermKey::Up => KeyCode::UpArrow,
        TermKey::Down => KeyCode::DownArrow,
        TermKey::Delete => KeyCode::ForwardDelete,
        TermKey::Home => KeyCode::Home,
        TermKey::End => KeyCode::End,
        TermKey::PageUp => KeyCode::PageUp,
        TermKey::PageDown => KeyCode::PageDown,
        _ => return None,
    })
}

fn modifiers(term: KeyModifiers) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::SHIFT, term.contains(KeyModifiers::SHIFT));
    modifiers.set(Modifiers::CONTROL, term.contains(KeyModifiers::CONTROL));
    modifiers.set(Modifiers::ALT, term.contains(KeyModifiers::ALT));
    modifiers.set(
        Modifiers::COMMAND,
        term.intersects(KeyModifiers::SUPER | KeyModifiers::META),
    );
    modifiers
}

fn is_quit_key(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, TermKey::Char('c') | TermKey::Char('q'))
}

fn translate_key(key: &KeyEvent) -> Vec<TerminalInput> {
    if key.kind == KeyEventKind::Press && is_quit_key(key) {
        return vec![TerminalInput::Quit];
    }
    let modifiers = modifiers(key.modifiers);
    let mut inputs = Vec::new();
    if let Some(code) = key_code(key.code) {
        let event = match key.kind {
            KeyEventKind::Press => UIEvent::key_down(code),
            KeyEventKind::Repeat => UIEvent::key_down(code).repeating(),
            KeyEventKind::Release => UIEvent::key_up(code),
        };
        inputs.push(TerminalInput::Event(event.with_modifiers(modifiers)));
    }
    // text goes to text fields unless a shortcut modifier is held
    if let TermKey::Char(c) = key.code {
        let is_shortcut = modifiers.intersects(Modifiers::CONTROL | Modifiers::COMMAND);
        if key.kind != KeyEventKind::Release && !is_shortcut {
            let event = UIEvent::text_input(&c.to_string()).with_modifiers(modifiers);
            inputs.push(TerminalInput::Event(event));
        }
    }
    inputs
}

/// The window-space center of a cell.
fn cell_center(column: u16, row: u16) -> Point2<f64> {
    Point2::new(
        (f64::from(column) + 0.5) * CELL_SIZE.x,
        (f64::from(row) + 0.5) * CELL_SIZE.y,
    )
}

fn translate_mouse(mouse: &MouseEvent) -> Option<TerminalInput> {
    let point = cell_center(mouse.column, mouse.row);
    let event = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => UIEvent::mouse_down(point),
        MouseEventKind::Up(MouseButton::Left) => UIEvent::mouse_up(point),
        MouseEventKind::Down(MouseButton::Right) => UIEvent::right_mouse_down(point),
        MouseEventKind::Up(MouseButton::Right) => UIEvent::right_mouse_up(point),
        MouseEventKind::Moved | MouseEventKind::Drag(MouseButton::Left) => {
            UIEvent::mouse_moved(point)
        }
        MouseEventKind::ScrollUp => UIEvent::scroll(point, Vector2::new(0., -CELL_SIZE.y)),
        MouseEventKind::ScrollDown => UIEvent::scroll(point, Vector2::new(0., CELL_SIZE.y)),
        MouseEventKind::ScrollLeft => UIEvent::scroll(point, Vector2::new(-CELL_SIZE.x, 0.)),
        MouseEventKind::ScrollRight => UIEvent::scroll(point, Vector2::new(CELL_SIZE.x, 0.)),
        _ => return None,
    };
    Some(TerminalInput::Event(
        event.with_modifiers(modifiers(mouse.modifiers)),
    ))
}

/// Turns a terminal event into window input.
pub fn translate(event: &Event) -> Vec<TerminalInput> {
    match event {
        Event::Key(key) => translate_key(key),
        Event::Mouse(mouse) => translate_mouse(mouse).into_iter().collect(),
        Event::Resize(columns, rows) => vec![TerminalInput::Resize(Vector2::new(
            f64::from(*columns) * CELL_SIZE.x,
            f64::from(*rows) * CELL_SIZE.y,
        ))],
        _ => Vec::new(),
    }
}

/// Posts translated input to the event loop. Returns false if the loop is gone.
pub fn forward<A: 'static>(
    input: TerminalInput,
    window: WindowId,
    invoker: &Invoker<A>,
    resize: &dyn Fn(&Invoker<A>, Vector2<f64>),
) -> bool {
    match input {
        TerminalInput::Event(event) => invoker.post_event(window, event),
        TerminalInput::Resize(size) => {
            resize(invoker, size);
            true
        }
        TerminalInput::Quit => {
            log::info!(target: "terminal", "quit requested");
            invoker.quit()
        }
    }
}

/// Puts the terminal into raw mode and forwards its input to the event loop until dropped.
pub struct TerminalInputThread {
    is_stopping: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TerminalInputThread {
    /// Starts reading. Input goes to `window`; resizes are passed to `resize`.
    pub fn start<A: 'static>(
        window: WindowId,
        invoker: Invoker<A>,
        resize: impl Fn(&Invoker<A>, Vector2<f64>) + Send + 'static,
    ) -> io::Result<TerminalInputThread> {
        enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(err);
        }

        let is_stopping = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&is_stopping);
        let spawned = thread::Builder::new()
            .name("terminal-input".to_string())
            .spawn(move || {
                log::info!(target: "terminal", "input thread started");
                while !stop.load(Ordering::Acquire) {
                    match event::poll(POLL_INTERVAL) {
                        Ok(false) => continue,
                        Ok(true) => (),
                        Err(err) => {
                            log::error!(target: "terminal", "could not poll input: {}", err);
                            break;
                        }
                    }
                    let event = match event::read() {
                        Ok(event) => event,
                        Err(err) => {
                            log::error!(target: "terminal", "could not read input: {}", err);
                            break;
                        }
                    };
                    for input in translate(&event) {
                        if !forward(input, window, &invoker, &resize) {
                            log::debug!(target: "terminal", "event loop is gone");
                            return;
                        }
                    }
                }
                log::info!(target: "terminal", "input thread stopped");
            });

        match spawned {
            Ok(thread) => Ok(TerminalInputThread {
                is_stopping,
                thread: Some(thread),
            }),
            Err(err) => {
                restore_terminal();
                Err(err)
            }
        }
    }
}

fn restore_terminal() {
    if let Err(err) = execute!(io::stdout(), DisableMouseCapture) {
        log::warn!(target: "terminal", "could not disable mouse capture: {}", err);
    }
    if let Err(err) = disable_raw_mode() {
        log::warn!(target: "terminal", "could not leave raw mode: {}", err);
    }
}

impl Drop for TerminalInputThread {
    fn drop(&mut self) {
        self.is_stopping.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!(target: "terminal", "input thread panicked");
            }
        }
        restore_terminal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdstudio::EventType;

    fn key(code: TermKey, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn control_c_and_q_quit() {
        for &c in &['c', 'q'] {
            assert_eq!(
                translate(&key(TermKey::Char(c), KeyModifiers::CONTROL)),
                vec![TerminalInput::Quit]
            );
        }
        assert_ne!(
            translate(&key(TermKey::Char('q'), KeyModifiers::NONE)),
            vec![TerminalInput::Quit]
        );
    }

    #[test]
    fn characters_become_keys_and_text() {
        let inputs = translate(&key(TermKey::Char('R'), KeyModifiers::SHIFT));
        assert_eq!(
            inputs,
            vec![
                TerminalInput::Event(UIEvent::key_down(KeyCode::R).with_modifiers(Modifiers::SHIFT)),
                TerminalInput::Event(UIEvent::text_input("R").with_modifiers(Modifiers::SHIFT)),
            ]
        );

        let inputs = translate(&key(TermKey::Char('7'), KeyModifiers::CONTROL));
        assert_eq!(
            inputs,
            vec![TerminalInput::Event(
                UIEvent::key_down(KeyCode::N7).with_modifiers(Modifiers::CONTROL)
            )]
        );

        assert_eq!(
            translate(&key(TermKey::Up, KeyModifiers::NONE)),
            vec![TerminalInput::Event(UIEvent::key_down(KeyCode::UpArrow))]
        );
        assert!(translate(&key(TermKey::F(5), KeyModifiers::NONE)).is_empty());
    }

    #[test]
    fn mouse_events_land_in_cell_centers() {
        let inputs = translate(&mouse(MouseEventKind::Down(MouseButton::Left), 3, 2));
        assert_eq!(
            inputs,
            vec![TerminalInput::Event(UIEvent::mouse_down(Point2::new(28., 40.)))]
        );

        match &translate(&mouse(MouseEventKind::ScrollDown, 0, 0))[..] {
            [TerminalInput::Event(event)] => {
                assert_eq!(event.event_type(), EventType::Scroll);
                assert_eq!(event.delta_y(), CELL_SIZE.y);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(translate(&mouse(MouseEventKind::Down(MouseButton::Middle), 0, 0)).is_empty());
    }

    #[test]
    fn resizes_are_in_window_space() {
        assert_eq!(
            translate(&Event::Resize(100, 30)),
            vec![TerminalInput::Resize(Vector2::new(800., 480.))]
        );
    }
}
