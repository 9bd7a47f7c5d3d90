use cgmath::Point2;
use mdstudio::{ComboBox, Control, EventLoop, NullRenderer, OverlayManager, Rect, UIEvent, Window};
use std::cell::RefCell;
use std::rc::Rc;

struct Fixture {
    event_loop: EventLoop<()>,
    window: Window,
    first: ComboBox,
    second: ComboBox,
    chosen: Rc<RefCell<Vec<(&'static str, usize)>>>,
}

impl Fixture {
    fn new() -> Fixture {
        let _ = env_logger::builder().is_test(true).try_init();
        let overlays = OverlayManager::new();
        let mut event_loop = EventLoop::new((), Box::new(NullRenderer::default()));
        event_loop.set_overlay_manager(Rc::clone(&overlays));

        let window = Window::new("main", Rect::from_xywh(0., 0., 300., 300.));
        let chosen = Rc::new(RefCell::new(Vec::new()));
        let make = |name: &'static str, y: f64| {
            let combo = ComboBox::new(name, &overlays);
            combo.view().set_frame(Rect::from_xywh(10., y, 100., 20.));
            combo.set_items(vec!["Piano".into(), "Strings".into(), "Drums".into()]);
            let log = Rc::clone(&chosen);
            combo.set_did_select_fn(move |i| log.borrow_mut().push((name, i)));
            window.content_view().add_subview(combo.view());
            combo
        };
        let first = make("first", 10.);
        let second = make("second", 50.);
        event_loop.add_window(window.clone());

        Fixture {
            event_loop,
            window,
            first,
            second,
            chosen,
        }
    }

    fn click(&mut self, x: f64, y: f64) {
        let invoker = self.event_loop.invoker();
        invoker.post_event(self.window.id(), UIEvent::mouse_down(Point2::new(x, y)));
        invoker.post_event(self.window.id(), UIEvent::mouse_up(Point2::new(x, y)));
        self.event_loop.process_pending();
    }
}

#[test]
fn open_lists_get_input_before_the_window() {
    let mut fx = Fixture::new();

    fx.click(20., 20.);
    assert!(fx.first.is_open());

    // the open list covers the second combo box
    fx.click(20., 55.);
    assert_eq!(*fx.chosen.borrow(), vec![("first", 1)]);
    assert!(!fx.first.is_open());
    assert!(!fx.second.is_open());
    assert_eq!(fx.first.selected_item(), Some("Strings".to_string()));

    fx.click(20., 60.);
    assert!(fx.second.is_open());
}

#[test]
fn only_one_list_is_open_at_a_time() {
    let mut fx = Fixture::new();

    fx.second.open();
    assert!(fx.second.is_open());

    // clicking outside the list only closes it
    fx.click(20., 20.);
    assert!(!fx.second.is_open());
    assert!(!fx.first.is_open());

    fx.click(20., 20.);
    assert!(fx.first.is_open());
    fx.second.open();
    assert!(!fx.first.is_open(), "opening the second closed the first");
    assert!(fx.chosen.borrow().is_empty());
}

#[test]
fn disabled_combo_boxes_stay_closed() {
    let mut fx = Fixture::new();
    fx.first.set_enabled(false);
    fx.click(20., 20.);
    assert!(!fx.first.is_open());
}

#[test]
fn picking_the_current_item_again_closes_the_list() {
    let mut fx = Fixture::new();

    fx.click(20., 20.);
    fx.click(20., 55.);
    assert_eq!(fx.first.selected_index(), Some(1));

    // the reopened list shows row 1 as selected already
    fx.click(20., 20.);
    assert!(fx.first.is_open());
    fx.click(20., 55.);
    assert!(!fx.first.is_open());
    assert_eq!(*fx.chosen.borrow(), vec![("first", 1), ("first", 1)]);
}
