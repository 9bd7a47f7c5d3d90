use crate::color::Color;
use crate::draw::DrawContext;
use crate::events::{EventType, UIEvent};
use crate::rect::Rect;
use crate::responder::ResponderChain;
use crate::scroll_view::{ScrollView, ScrollViewState};
use crate::view::{View, ViewDelegate, WeakView};
use cgmath::Vector2;
use core::cell::Cell;
use std::rc::{Rc, Weak};

const MIN_KNOB_LENGTH: f64 = 16.;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

struct ScrollBarState {
    orientation: Orientation,
    scroll_view: WeakView,
    scroll_state: Weak<ScrollViewState>,
    /// Where the knob was grabbed, relative to the knob start.
    grab: Cell<Option<f64>>,
}

/// Knob geometry along the bar’s axis.
struct Metrics {
    knob_start: f64,
    knob_length: f64,
    /// Distance the knob can travel.
    travel: f64,
    /// Maximum scroll position along the axis.
    max_pos: f64,
    pos: f64,
}

impl ScrollBarState {
    fn axis(&self, v: Vector2<f64>) -> f64 {
        match self.orientation {
            Orientation::Horizontal => v.x,
            Orientation::Vertical => v.y,
        }
    }

    fn scroll_view(&self) -> Option<(View, Rc<ScrollViewState>)> {
        Some((self.scroll_view.upgrade()?, self.scroll_state.upgrade()?))
    }

    fn metrics(&self, bar: &View) -> Option<Metrics> {
        let (scroll_view, state) = self.scroll_view()?;
        let length = self.axis(bar.frame().size);
        let viewport = self.axis(scroll_view.frame().size);
        let max_pos = self.axis(state.max_pos(&scroll_view));
        if max_pos <= 0. || length <= 0. {
            return None;
        }
        let content = viewport + max_pos;
        let knob_length = (length * viewport / content).max(MIN_KNOB_LENGTH).min(length);
        let travel = length - knob_length;
        let pos = self.axis(state.pos());
        Some(Metrics {
            knob_start: travel * pos / max_pos,
            knob_length,
            travel,
            max_pos,
            pos,
        })
    }

    fn knob_rect(&self, bar: &View, metrics: &Metrics) -> Rect {
        let size = bar.frame().size;
        match self.orientation {
            Orientation::Horizontal => {
                Rect::from_xywh(metrics.knob_start, 0., metrics.knob_length, size.y)
            }
            Orientation::Vertical => {
                Rect::from_xywh(0., metrics.knob_start, size.x, metrics.knob_length)
            }
        }
    }

    fn scroll_to(&self, axis_pos: f64) {
        if let Some((scroll_view, state)) = self.scroll_view() {
            let pos = state.pos();
            let pos = match self.orientation {
                Orientation::Horizontal => Vector2::new(axis_pos, pos.y),
                Orientation::Vertical => Vector2::new(pos.x, axis_pos),
            };
            state.set_pos(&scroll_view, pos);
        }
    }
}

impl ViewDelegate for ScrollBarState {
    fn handle_event(&self, view: &View, event: &UIEvent, chain: &ResponderChain) -> bool {
        let local = view.convert_from_window(event.point());
        let local = self.axis(Vector2::new(local.x, local.y));
        match event.event_type() {
            EventType::MouseDown => {
                let metrics = match self.metrics(view) {
                    Some(metrics) => metrics,
                    None => return false,
                };
                let knob_end = metrics.knob_start + metrics.knob_length;
                if local >= metrics.knob_start && local < knob_end {
                    if !chain.capture_responder(view) {
                        return false;
                    }
                    self.grab.set(Some(local - metrics.knob_start));
                } else {
                    // page towards the click
                    let page = metrics.max_pos * metrics.knob_length / metrics.travel.max(1.);
                    let direction = if local < metrics.knob_start { -1. } else { 1. };
                    self.scroll_to(metrics.pos + direction * page);
                }
                true
            }
            EventType::MouseMoved => match (self.grab.get(), self.metrics(view)) {
                (Some(grab), Some(metrics)) => {
                    if metrics.travel > 0. {
                        self.scroll_to((local - grab) / metrics.travel * metrics.max_pos);
                    }
                    true
                }
                _ => false,
            },
            EventType::MouseUp if self.grab.get().is_some() => {
                self.grab.set(None);
                chain.release_responder(view);
                true
            }
            _ => false,
        }
    }

    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        if let Some(metrics) = self.metrics(view) {
            ctx.fill_rect(view.bounds(), Color::BLACK.with_alpha(0.2));
            let knob_color = if self.grab.get().is_some() {
                Color::HIGHLIGHT
            } else {
                Color::CONTROL
            };
            ctx.fill_rect(self.knob_rect(view, &metrics), knob_color);
        }
    }
}

/// A scroll bar controlling a [`ScrollView`]. It draws nothing while the content fits.
#[derive(Clone)]
pub struct ScrollBar {
    view: View,
    state: Rc<ScrollBarState>,
}

impl ScrollBar {
    pub fn new(name: &str, scroll_view: &ScrollView, orientation: Orientation) -> ScrollBar {
        let (weak_view, weak_state) = scroll_view.downgrade();
        let state = Rc::new(ScrollBarState {
            orientation,
            scroll_view: weak_view,
            scroll_state: weak_state,
            grab: Cell::new(None),
        });
        let view = View::with_delegate(name, state.clone());
        scroll_view.add_scroll_bar(&view);
        ScrollBar { view, state }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn orientation(&self) -> Orientation {
        self.state.orientation
    }

    /// The knob in local coordinates, or None while there is nothing to scroll.
    pub fn knob_rect(&self) -> Option<Rect> {
        self.state
            .metrics(&self.view)
            .map(|metrics| self.state.knob_rect(&self.view, &metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point2;

    #[test]
    fn knob_tracks_and_drives_the_scroll_view() {
        let root = View::new("root");
        root.set_frame(Rect::from_xywh(0., 0., 120., 200.));
        let chain = ResponderChain::new(&root);

        let scroll_view = ScrollView::new("scroller");
        scroll_view.view().set_frame(Rect::from_xywh(0., 0., 100., 200.));
        scroll_view.set_content_size(Vector2::new(100., 800.));
        let bar = ScrollBar::new("bar", &scroll_view, Orientation::Vertical);
        bar.view().set_frame(Rect::from_xywh(100., 0., 20., 200.));
        root.add_subview(scroll_view.view());
        root.add_subview(bar.view());

        assert_eq!(bar.knob_rect(), Some(Rect::from_xywh(0., 0., 20., 50.)));
        scroll_view.set_pos(Vector2::new(0., 600.));
        assert_eq!(bar.knob_rect(), Some(Rect::from_xywh(0., 150., 20., 50.)));

        chain.send_event(&UIEvent::mouse_down(Point2::new(110., 160.)));
        assert_eq!(chain.captured_responder().as_ref(), Some(bar.view()));
        chain.send_event(&UIEvent::mouse_moved(Point2::new(110., 85.)));
        assert_eq!(scroll_view.pos(), Vector2::new(0., 300.));
        chain.send_event(&UIEvent::mouse_up(Point2::new(110., 85.)));
        assert_eq!(chain.captured_responder(), None);

        scroll_view.set_content_size(Vector2::new(100., 100.));
        assert_eq!(bar.knob_rect(), None);
    }
}
