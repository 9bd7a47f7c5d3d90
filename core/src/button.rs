use crate::color::Color;
use crate::control::{Control, ControlState};
use crate::draw::DrawContext;
use crate::events::{EventType, UIEvent};
use crate::path::Path;
use crate::responder::ResponderChain;
use crate::view::{View, ViewDelegate};
use cgmath::Point2;
use core::cell::{Cell, RefCell};
use std::rc::Rc;

/// Button behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    /// Fires `clicked` on release.
    Push,
    /// Flips its state on release and fires `state_did_change`.
    Toggle,
}

struct ButtonState {
    control: ControlState,
    kind: ButtonKind,
    title: RefCell<String>,
    icon: RefCell<Option<Path>>,
    is_on: Cell<bool>,
    clicked_fn: RefCell<Option<Rc<dyn Fn()>>>,
    state_did_change_fn: RefCell<Option<Rc<dyn Fn(bool)>>>,
}

impl ButtonState {
    fn release(&self, view: &View, event: &UIEvent, chain: &ResponderChain) {
        chain.release_responder(view);
        if self.control.set_highlighted(false) {
            view.set_dirty();
        }
        if !view.contains_point(event.point()) {
            return;
        }
        match self.kind {
            ButtonKind::Push => {
                let clicked = self.clicked_fn.borrow().clone();
                if let Some(clicked) = clicked {
                    clicked();
                }
            }
            ButtonKind::Toggle => {
                let is_on = !self.is_on.get();
                self.is_on.set(is_on);
                view.set_dirty();
                let did_change = self.state_did_change_fn.borrow().clone();
                if let Some(did_change) = did_change {
                    did_change(is_on);
                }
            }
        }
    }
}

impl ViewDelegate for ButtonState {
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
                view.set_dirty();
                true
            }
            EventType::MouseMoved if is_captured => {
                if self.control.set_highlighted(view.contains_point(event.point())) {
                    view.set_dirty();
                }
                true
            }
            EventType::MouseUp if is_captured => {
                self.release(view, event, chain);
                true
            }
            _ => false,
        }
    }

    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        let bounds = view.bounds();
        let fill = if self.control.is_highlighted() || self.is_on.get() {
            Color::HIGHLIGHT
        } else {
            Color::CONTROL
        };
        let alpha = if self.control.is_enabled() { 1. } else { 0.4 };
        ctx.fill_rect(bounds, fill.with_alpha(alpha));

        if let Some(icon) = &*self.icon.borrow() {
            let icon_bounds = icon.bounds();
            let origin = Point2::new(
                (bounds.width() - icon_bounds.width()) / 2. - icon_bounds.origin.x,
                (bounds.height() - icon_bounds.height()) / 2. - icon_bounds.origin.y,
            );
            ctx.fill_path(origin, icon, Color::TEXT.with_alpha(alpha));
        } else {
            ctx.draw_text(bounds.inset(4., 2.), &self.title.borrow(), Color::TEXT.with_alpha(alpha));
        }
    }
}

/// A push or toggle button with a title or an icon.
#[derive(Clone)]
pub struct Button {
    view: View,
    state: Rc<ButtonState>,
}

impl Button {
    pub fn new(name: &str, title: &str, kind: ButtonKind) -> Button {
        let state = Rc::new(ButtonState {
            control: ControlState::default(),
            kind,
            title: RefCell::new(title.to_string()),
            icon: RefCell::new(None),
            is_on: Cell::new(false),
            clicked_fn: RefCell::new(None),
            state_did_change_fn: RefCell::new(None),
        });
        Button {
            view: View::with_delegate(name, state.clone()),
            state,
        }
    }

    pub fn kind(&self) -> ButtonKind {
        self.state.kind
    }

    pub fn title(&self) -> String {
        self.state.title.borrow().clone()
    }

    pub fn set_title(&self, title: &str) {
        *self.state.title.borrow_mut() = title.to_string();
        self.view.set_dirty();
    }

    /// Replaces the title with a vector icon.
    pub fn set_icon(&self, icon: Option<Path>) {
        *self.state.icon.borrow_mut() = icon;
        self.view.set_dirty();
    }

    pub fn is_on(&self) -> bool {
        self.state.is_on.get()
    }

    /// Sets the toggle state without firing `state_did_change`.
    pub fn set_on(&self, is_on: bool) {
        if self.state.is_on.replace(is_on) != is_on {
            self.view.set_dirty();
        }
    }

    pub fn set_clicked_fn(&self, f: impl Fn() + 'static) {
        *self.state.clicked_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_state_did_change_fn(&self, f: impl Fn(bool) + 'static) {
        *self.state.state_did_change_fn.borrow_mut() = Some(Rc::new(f));
    }
}

impl Control for Button {
    fn view(&self) -> &View {
        &self.view
    }

    fn control_state(&self) -> &ControlState {
        &self.state.control
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Rect;

    fn pt(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    fn setup(kind: ButtonKind) -> (View, Rc<ResponderChain>, Button) {
        let root = View::new("root");
        root.set_frame(Rect::from_xywh(0., 0., 100., 100.));
        let chain = ResponderChain::new(&root);
        let button = Button::new("button", "OK", kind);
        button.view().set_frame(Rect::from_xywh(10., 10., 40., 20.));
        root.add_subview(button.view());
        (root, chain, button)
    }

    #[test]
    fn click_fires_on_release_inside() {
        let (_root, chain, button) = setup(ButtonKind::Push);
        let clicks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clicks);
        button.set_clicked_fn(move || counter.set(counter.get() + 1));

        chain.send_event(&UIEvent::mouse_down(pt(20., 20.)));
        assert!(button.control_state().is_highlighted());
        assert_eq!(chain.captured_responder().as_ref(), Some(button.view()));
        chain.send_event(&UIEvent::mouse_up(pt(21., 21.)));
        assert_eq!(clicks.get(), 1);
        assert_eq!(chain.captured_responder(), None);

        chain.send_event(&UIEvent::mouse_down(pt(20., 20.)));
        chain.send_event(&UIEvent::mouse_moved(pt(90., 90.)));
        assert!(!button.control_state().is_highlighted());
        chain.send_event(&UIEvent::mouse_up(pt(90., 90.)));
        assert_eq!(clicks.get(), 1, "released outside");
    }

    #[test]
    fn toggle_flips_state() {
        let (_root, chain, button) = setup(ButtonKind::Toggle);
        let states = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&states);
        button.set_state_did_change_fn(move |is_on| recorded.borrow_mut().push(is_on));

        for _ in 0..2 {
            chain.send_event(&UIEvent::mouse_down(pt(20., 20.)));
            chain.send_event(&UIEvent::mouse_up(pt(20., 20.)));
        }
        assert_eq!(*states.borrow(), vec![true, false]);

        button.set_on(true);
        assert!(button.is_on());
        assert_eq!(states.borrow().len(), 2, "set_on is silent");
    }

    #[test]
    fn disabled_buttons_ignore_input() {
        let (_root, chain, button) = setup(ButtonKind::Push);
        button.set_enabled(false);
        assert!(!chain.send_event(&UIEvent::mouse_down(pt(20., 20.))));
        assert_eq!(chain.captured_responder(), None);
    }
}
