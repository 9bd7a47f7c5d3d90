use crate::color::Color;
use crate::control::{Control, ControlState};
use crate::draw::DrawContext;
use crate::events::{Cursor, EventType, KeyCode, UIEvent};
use crate::rect::Rect;
use crate::responder::ResponderChain;
use crate::view::{View, ViewDelegate};
use core::cell::{Cell, RefCell};
use std::rc::Rc;

struct TextFieldState {
    control: ControlState,
    text: RefCell<String>,
    /// Text at the time editing started.
    original: RefCell<String>,
    is_editing: Cell<bool>,
    text_did_change_fn: RefCell<Option<Rc<dyn Fn(&str)>>>,
}

impl TextFieldState {
    fn edit(&self, view: &View, f: impl FnOnce(&mut String)) -> bool {
        f(&mut self.text.borrow_mut());
        view.set_dirty();
        true
    }
}

impl ViewDelegate for TextFieldState {
    fn handle_event(&self, view: &View, event: &UIEvent, chain: &ResponderChain) -> bool {
        if event.event_type() == EventType::MouseMoved {
            if view.contains_point(event.point()) {
                chain.set_cursor_in_rect(view, Cursor::IBeam, view.resolved_rect());
            } else {
                chain.release_cursor(view);
            }
            return false;
        }
        if !self.control.is_enabled() {
            return false;
        }
        if event.event_type() == EventType::MouseDown {
            if !chain.is_first_responder(view) {
                chain.make_first_responder(Some(view));
                *self.original.borrow_mut() = self.text.borrow().clone();
                self.is_editing.set(true);
                view.set_dirty();
            }
            return true;
        }
        if !chain.is_first_responder(view) {
            return false;
        }

        match (event.event_type(), event.key()) {
            (EventType::TextInput, _) => {
                let characters: String = event
                    .characters()
                    .chars()
                    .filter(|c| !c.is_control())
                    .collect();
                self.edit(view, |text| text.push_str(&characters))
            }
            (EventType::KeyDown, Some(KeyCode::Backspace)) => self.edit(view, |text| {
                text.pop();
            }),
            (EventType::KeyDown, Some(KeyCode::Return)) => {
                chain.make_first_responder(None);
                true
            }
            (EventType::KeyDown, Some(KeyCode::Escape)) => {
                let original = self.original.borrow().clone();
                *self.text.borrow_mut() = original;
                chain.make_first_responder(None);
                true
            }
            _ => false,
        }
    }

    fn resign_first_responder(&self, view: &View) {
        if !self.is_editing.replace(false) {
            return;
        }
        view.set_dirty();
        let text = self.text.borrow().clone();
        if text == *self.original.borrow() {
            return;
        }
        log::debug!("{:?} committed {:?}", view, text);
        let did_change = self.text_did_change_fn.borrow().clone();
        if let Some(did_change) = did_change {
            did_change(&text);
        }
    }

    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        let bounds = view.bounds();
        ctx.fill_rect(bounds, Color::BLACK);
        let border = if self.is_editing.get() {
            Color::HIGHLIGHT
        } else {
            Color::CONTROL
        };
        ctx.stroke_rect(bounds, border, 1.);
        let alpha = if self.control.is_enabled() { 1. } else { 0.4 };
        ctx.draw_text(bounds.inset(4., 2.), &self.text.borrow(), Color::TEXT.with_alpha(alpha));
        if self.is_editing.get() {
            let caret = Rect::from_xywh(bounds.max_x() - 5., 3., 1., bounds.height() - 6.);
            ctx.fill_rect(caret, Color::TEXT);
        }
    }
}

/// A single-line editable text field.
///
/// Clicking makes it the first responder; return commits, escape reverts, and losing focus
/// commits as well. `text_did_change` fires once per commit that changed the text.
#[derive(Clone)]
pub struct TextField {
    view: View,
    state: Rc<TextFieldState>,
}

impl TextField {
    pub fn new(name: &str, text: &str) -> TextField {
        let state = Rc::new(TextFieldState {
            control: ControlState::default(),
            text: RefCell::new(text.to_string()),
            original: RefCell::new(text.to_string()),
            is_editing: Cell::new(false),
            text_did_change_fn: RefCell::new(None),
        });
        TextField {
            view: View::with_delegate(name, state.clone()),
            state,
        }
    }

    pub fn text(&self) -> String {
        self.state.text.borrow().clone()
    }

    /// Replaces the text. Doesn’t fire `text_did_change`.
    pub fn set_text(&self, text: &str) {
        *self.state.text.borrow_mut() = text.to_string();
        *self.state.original.borrow_mut() = text.to_string();
        self.view.set_dirty();
    }

    pub fn is_editing(&self) -> bool {
        self.state.is_editing.get()
    }

    pub fn set_text_did_change_fn(&self, f: impl Fn(&str) + 'static) {
        *self.state.text_did_change_fn.borrow_mut() = Some(Rc::new(f));
    }
}

impl Control for TextField {
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
    use cgmath::Point2;

    fn setup() -> (View, Rc<ResponderChain>, TextField, Rc<RefCell<Vec<String>>>) {
        let root = View::new("root");
        root.set_frame(Rect::from_xywh(0., 0., 200., 100.));
        let chain = ResponderChain::new(&root);
        let field = TextField::new("name", "Piano");
        field.view().set_frame(Rect::from_xywh(10., 10., 100., 20.));
        root.add_subview(field.view());

        let commits = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&commits);
        field.set_text_did_change_fn(move |text| recorded.borrow_mut().push(text.to_string()));
        (root, chain, field, commits)
    }

    #[test]
    fn typing_and_committing() {
        let (_root, chain, field, commits) = setup();
        chain.send_event(&UIEvent::key_down(KeyCode::Backspace));
        assert_eq!(field.text(), "Piano", "not focused yet");

        chain.send_event(&UIEvent::mouse_down(Point2::new(20., 20.)));
        assert!(field.is_editing());
        chain.send_event(&UIEvent::key_down(KeyCode::Backspace));
        chain.send_event(&UIEvent::text_input("a 2"));
        chain.send_event(&UIEvent::key_down(KeyCode::Return));

        assert_eq!(field.text(), "Piana 2");
        assert!(!field.is_editing());
        assert_eq!(*commits.borrow(), vec!["Piana 2".to_string()]);
        assert_eq!(chain.first_responder(), None);
    }

    #[test]
    fn escape_reverts() {
        let (_root, chain, field, commits) = setup();
        chain.send_event(&UIEvent::mouse_down(Point2::new(20., 20.)));
        chain.send_event(&UIEvent::text_input("forte"));
        chain.send_event(&UIEvent::key_down(KeyCode::Escape));
        assert_eq!(field.text(), "Piano");
        assert!(commits.borrow().is_empty());
    }

    #[test]
    fn losing_focus_commits() {
        let (root, chain, _field, commits) = setup();
        let other = TextField::new("other", "");
        other.view().set_frame(Rect::from_xywh(10., 50., 100., 20.));
        root.add_subview(other.view());

        chain.send_event(&UIEvent::mouse_down(Point2::new(20., 20.)));
        chain.send_event(&UIEvent::text_input("!"));
        chain.send_event(&UIEvent::mouse_down(Point2::new(20., 60.)));
        assert_eq!(*commits.borrow(), vec!["Piano!".to_string()]);
        assert!(other.is_editing());
    }

    #[test]
    fn hovering_claims_the_ibeam() {
        let (_root, chain, field, _) = setup();
        chain.send_event(&UIEvent::mouse_moved(Point2::new(20., 20.)));
        assert_eq!(chain.cursor_at(Point2::new(20., 20.)), Cursor::IBeam);
        assert_eq!(chain.cursor_at(Point2::new(150., 80.)), Cursor::Arrow);
        chain.release_cursor(field.view());
        assert_eq!(chain.cursor_at(Point2::new(20., 20.)), Cursor::Arrow);
    }
}
