use crate::color::Color;
use crate::draw::DrawContext;
use crate::view::{View, ViewDelegate};
use core::cell::{Cell, RefCell};
use std::rc::Rc;

struct LabelState {
    text: RefCell<String>,
    color: Cell<Color>,
}

impl ViewDelegate for LabelState {
    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        ctx.draw_text(view.bounds(), &self.text.borrow(), self.color.get());
    }
}

/// Static text.
#[derive(Clone)]
pub struct Label {
    view: View,
    state: Rc<LabelState>,
}

impl Label {
    pub fn new(name: &str, text: &str) -> Label {
        let state = Rc::new(LabelState {
            text: RefCell::new(text.to_string()),
            color: Cell::new(Color::TEXT),
        });
        Label {
            view: View::with_delegate(name, state.clone()),
            state,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn text(&self) -> String {
        self.state.text.borrow().clone()
    }

    pub fn set_text(&self, text: &str) {
        if *self.state.text.borrow() == text {
            return;
        }
        *self.state.text.borrow_mut() = text.to_string();
        self.view.set_dirty();
    }

    pub fn set_color(&self, color: Color) {
        self.state.color.set(color);
        self.view.set_dirty();
    }
}
