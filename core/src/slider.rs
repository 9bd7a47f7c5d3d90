use crate::color::Color;
use crate::control::{Control, ControlState};
use crate::draw::DrawContext;
use crate::events::{EventType, UIEvent};
use crate::rect::Rect;
use crate::responder::ResponderChain;
use crate::view::{View, ViewDelegate};
use core::cell::{Cell, RefCell};
use std::rc::Rc;

const KNOB_WIDTH: f64 = 10.;

struct SliderState {
    control: ControlState,
    min: Cell<f64>,
    max: Cell<f64>,
    value: Cell<f64>,
    pos_changed_fn: RefCell<Option<Rc<dyn Fn(f64)>>>,
}

impl SliderState {
    fn clamp(&self, value: f64) -> f64 {
        let (min, max) = (self.min.get(), self.max.get());
        if value.is_nan() {
            min
        } else {
            value.max(min).min(max)
        }
    }

    fn value_at(&self, view: &View, x: f64) -> f64 {
        let track = view.bounds().width() - KNOB_WIDTH;
        if track <= 0. {
            return self.min.get();
        }
        let t = (x - KNOB_WIDTH / 2.) / track;
        self.clamp(self.min.get() + t * (self.max.get() - self.min.get()))
    }

    fn knob_rect(&self, view: &View) -> Rect {
        let bounds = view.bounds();
        let span = self.max.get() - self.min.get();
        let t = if span > 0. {
            (self.value.get() - self.min.get()) / span
        } else {
            0.
        };
        Rect::from_xywh(
            t * (bounds.width() - KNOB_WIDTH).max(0.),
            0.,
            KNOB_WIDTH,
            bounds.height(),
        )
    }

    fn drag_to(&self, view: &View, event: &UIEvent) {
        let value = self.value_at(view, view.convert_from_window(event.point()).x);
        if self.value.replace(value) == value {
            return;
        }
        view.set_dirty();
        let pos_changed = self.pos_changed_fn.borrow().clone();
        if let Some(pos_changed) = pos_changed {
            pos_changed(value);
        }
    }
}

impl ViewDelegate for SliderState {
    fn handle_event(&self, view: &View, event: &UIEvent, chain: &ResponderChain) -> bool {
        if !self.control.is_enabled() {
            return false;
        }
        let is_captured = chain.captured_responder().as_ref() == Some(view);
        match event.event_type() {
            EventType::MouseDown => {
                if !chain.capture_responder(view) {
                    return false;
                }
                self.control.set_highlighted(true);
                self.drag_to(view, event);
                view.set_dirty();
                true
            }
            EventType::MouseMoved if is_captured => {
                self.drag_to(view, event);
                true
            }
            EventType::MouseUp if is_captured => {
                self.drag_to(view, event);
                chain.release_responder(view);
                self.control.set_highlighted(false);
                view.set_dirty();
                true
            }
            _ => false,
        }
    }

    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        let bounds = view.bounds();
        let alpha = if self.control.is_enabled() { 1. } else { 0.4 };
        let track = Rect::from_xywh(0., bounds.height() / 2. - 2., bounds.width(), 4.);
        ctx.fill_rect(track, Color::CONTROL.with_alpha(alpha));
        let knob_color = if self.control.is_highlighted() {
            Color::HIGHLIGHT
        } else {
            Color::TEXT
        };
        ctx.fill_rect(self.knob_rect(view), knob_color.with_alpha(alpha));
    }
}

/// A horizontal slider over a value range.
#[derive(Clone)]
pub struct Slider {
    view: View,
    state: Rc<SliderState>,
}

impl Slider {
    pub fn new(name: &str, min: f64, max: f64, value: f64) -> Slider {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let state = Rc::new(SliderState {
            control: ControlState::default(),
            min: Cell::new(min),
            max: Cell::new(max),
            value: Cell::new(min),
            pos_changed_fn: RefCell::new(None),
        });
        state.value.set(state.clamp(value));
        Slider {
            view: View::with_delegate(name, state.clone()),
            state,
        }
    }

    pub fn min(&self) -> f64 {
        self.state.min.get()
    }

    pub fn max(&self) -> f64 {
        self.state.max.get()
    }

    pub fn value(&self) -> f64 {
        self.state.value.get()
    }

    /// Sets the value (clamped to the range) without firing `pos_changed`.
    pub fn set_value(&self, value: f64) {
        let value = self.state.clamp(value);
        if self.state.value.replace(value) != value {
            self.view.set_dirty();
        }
    }

    pub fn set_range(&self, min: f64, max: f64) {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.state.min.set(min);
        self.state.max.set(max);
        self.set_value(self.value());
        self.view.set_dirty();
    }

    pub fn set_pos_changed_fn(&self, f: impl Fn(f64) + 'static) {
        *self.state.pos_changed_fn.borrow_mut() = Some(Rc::new(f));
    }
}

impl Control for Slider {
    fn view(&self) -> &View {
        &self.view
    }

    fn control_state(&self) -> &ControlState {
        &self.state.control
    }
}
