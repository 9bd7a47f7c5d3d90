use cgmath::Vector2;
use mdstudio::{Label, ListView, NullRenderer, Rect, ScrollView, SelectionChange, SelectionMode, Window};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn setup(fetches: &Rc<Cell<usize>>) -> (Window, ScrollView, ListView) {
    let window = Window::new("main", Rect::from_xywh(0., 0., 200., 200.));
    let scroll_view = ScrollView::new("scroller");
    scroll_view.view().set_frame(Rect::from_xywh(0., 0., 200., 200.));
    window.content_view().add_subview(scroll_view.view());

    let list = ListView::new("tracks", 20., SelectionMode::Multiple);
    list.set_nb_rows_fn(|| 100);
    let counter = Rc::clone(fetches);
    list.set_view_for_row_fn(move |row| {
        counter.set(counter.get() + 1);
        Label::new("row", &format!("Track {}", row)).view().clone()
    });
    scroll_view.set_content_view(list.view());
    scroll_view.set_fits_width(true);
    list.reload();
    (window, scroll_view, list)
}

#[test]
fn only_visible_rows_are_materialized() {
    let fetches = Rc::new(Cell::new(0));
    let (window, scroll_view, list) = setup(&fetches);
    let mut renderer = NullRenderer::default();

    assert_eq!(scroll_view.content_size(), Vector2::new(200., 2000.));
    assert_eq!(list.visible_rows(), 0..10);
    assert_eq!(list.cached_rows(), (0..10).collect::<Vec<_>>());
    assert_eq!(fetches.get(), 10);

    scroll_view.set_pos(Vector2::new(0., 500.));
    window.redraw(&mut renderer);
    assert_eq!(list.visible_rows(), 25..35);
    assert_eq!(list.cached_rows(), (25..35).collect::<Vec<_>>());
    assert_eq!(fetches.get(), 20, "rows 0 to 9 were evicted, 25 to 34 fetched");

    // nothing moved, nothing is fetched
    window.content_view().set_dirty();
    window.redraw(&mut renderer);
    assert_eq!(fetches.get(), 20);
    assert_eq!(list.row_view(30).map(|v| v.frame()), Some(Rect::from_xywh(0., 600., 200., 20.)));
}

#[test]
fn selection_survives_scrolling() {
    let fetches = Rc::new(Cell::new(0));
    let (window, scroll_view, list) = setup(&fetches);
    let mut renderer = NullRenderer::default();

    let log = Rc::new(RefCell::new(Vec::new()));
    let selected = Rc::clone(&log);
    list.set_did_select_row_fn(move |row| selected.borrow_mut().push(SelectionChange::Selected(row)));
    let deselected = Rc::clone(&log);
    list.set_did_deselect_row_fn(move |row| deselected.borrow_mut().push(SelectionChange::Deselected(row)));

    list.select_row(3, true);
    list.select_row(4, false);
    scroll_view.set_pos(Vector2::new(0., 1200.));
    window.redraw(&mut renderer);
    list.select_row(70, true);

    assert_eq!(
        *log.borrow(),
        vec![
            SelectionChange::Selected(3),
            SelectionChange::Selected(4),
            SelectionChange::Deselected(3),
            SelectionChange::Deselected(4),
            SelectionChange::Selected(70),
        ]
    );
    assert_eq!(list.selected_rows(), vec![70]);
}
