//! Shared behavior of interactive widgets.

use crate::view::View;
use core::cell::Cell;

/// State every control carries.
#[derive(Debug)]
pub struct ControlState {
    is_enabled: Cell<bool>,
    is_highlighted: Cell<bool>,
}

impl Default for ControlState {
    fn default() -> Self {
        ControlState {
            is_enabled: Cell::new(true),
            is_highlighted: Cell::new(false),
        }
    }
}

impl ControlState {
    pub fn is_enabled(&self) -> bool {
        self.is_enabled.get()
    }

    /// Whether the control is being pressed.
    pub fn is_highlighted(&self) -> bool {
        self.is_highlighted.get()
    }

    /// Returns true if the value changed.
    pub fn set_enabled(&self, is_enabled: bool) -> bool {
        self.is_enabled.replace(is_enabled) != is_enabled
    }

    /// Returns true if the value changed.
    pub fn set_highlighted(&self, is_highlighted: bool) -> bool {
        self.is_highlighted.replace(is_highlighted) != is_highlighted
    }
}

/// An interactive widget.
pub trait Control {
    fn view(&self) -> &View;

    fn control_state(&self) -> &ControlState;

    fn is_enabled(&self) -> bool {
        self.control_state().is_enabled()
    }

    /// Disabled controls ignore input and draw dimmed.
    fn set_enabled(&self, is_enabled: bool) {
        if self.control_state().set_enabled(is_enabled) {
            self.view().set_dirty();
        }
    }
}
