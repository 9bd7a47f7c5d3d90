//! Virtualized lists.
//!
//! A list view is as tall as all of its rows but only keeps views for the rows that are actually
//! visible through its ancestors’ clipping (normally a [`ScrollView`](crate::ScrollView)). Rows
//! are fetched lazily through `view_for_row_fn` and cached by index.

use crate::color::Color;
use crate::draw::DrawContext;
use crate::events::{EventType, KeyCode, Modifiers, UIEvent};
use crate::rect::Rect;
use crate::responder::ResponderChain;
use crate::selection::{Selection, SelectionChange, SelectionMode};
use crate::view::{View, ViewDelegate, WeakView};
use cgmath::Vector2;
use core::cell::{Cell, RefCell};
use core::ops::Range;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

pub(crate) struct ListViewState {
    row_height: Cell<f64>,
    nb_rows: Cell<usize>,
    rows: RefCell<BTreeMap<usize, View>>,
    selection: RefCell<Selection>,
    /// A reload requested for the next pre-draw pass; the flag is `is_refresh_only`.
    delayed_reload: Cell<Option<bool>>,
    /// The row last clicked or moved to with the arrow keys.
    focused_row: Cell<Option<usize>>,
    highlight: Cell<Color>,
    nb_rows_fn: RefCell<Option<Rc<dyn Fn() -> usize>>>,
    view_for_row_fn: RefCell<Option<Rc<dyn Fn(usize) -> View>>>,
    did_select_row_fn: RefCell<Option<Rc<dyn Fn(usize)>>>,
    did_deselect_row_fn: RefCell<Option<Rc<dyn Fn(usize)>>>,
    did_click_row_fn: RefCell<Option<Rc<dyn Fn(usize)>>>,
}

impl ListViewState {
    fn row_frame(&self, view: &View, row: usize) -> Rect {
        let height = self.row_height.get();
        Rect::from_xywh(0., row as f64 * height, view.frame().width(), height)
    }

    fn visible_rows(&self, view: &View) -> Range<usize> {
        let height = self.row_height.get();
        let clip = match view.resolved_clipped_rect() {
            Some(clip) if height > 0. => clip,
            _ => return 0..0,
        };
        let top = clip.origin.y - view.resolved_rect().origin.y;
        let bottom = top + clip.height();
        let end = ((bottom / height).ceil().max(0.) as usize).min(self.nb_rows.get());
        let start = ((top / height).floor().max(0.) as usize).min(end);
        start..end
    }

    fn cached_range(&self) -> Range<usize> {
        let rows = self.rows.borrow();
        match (rows.keys().next(), rows.keys().next_back()) {
            (Some(&first), Some(&last)) => first..last + 1,
            _ => 0..0,
        }
    }

    fn reload(&self, view: &View) {
        let nb_rows_fn = self.nb_rows_fn.borrow().clone();
        let nb_rows = nb_rows_fn.map_or(0, |f| f());
        self.nb_rows.set(nb_rows);

        let frame = view.frame();
        view.set_frame(frame.with_size(Vector2::new(
            frame.width(),
            nb_rows as f64 * self.row_height.get(),
        )));

        let changes = self.selection.borrow_mut().retain_below(nb_rows);
        self.notify(view, changes);
        self.reload_window(view, false, false);
    }

    fn reload_window(&self, view: &View, is_delayed: bool, is_refresh_only: bool) {
        if is_delayed {
            let pending = self.delayed_reload.get();
            self.delayed_reload
                .set(Some(pending.map_or(is_refresh_only, |p| p && is_refresh_only)));
            view.set_dirty();
            return;
        }
        self.delayed_reload.set(None);

        let range = self.visible_rows(view);
        let evicted: Vec<View> = {
            let mut rows = self.rows.borrow_mut();
            if is_refresh_only {
                let gone: Vec<usize> = rows.keys().copied().filter(|r| !range.contains(r)).collect();
                gone.iter().filter_map(|r| rows.remove(r)).collect()
            } else {
                std::mem::replace(&mut *rows, BTreeMap::new())
                    .into_iter()
                    .map(|(_, row)| row)
                    .collect()
            }
        };
        for row in &evicted {
            row.remove_from_superview();
        }

        let view_for_row = self.view_for_row_fn.borrow().clone();
        let mut fetched = 0;
        if let Some(view_for_row) = view_for_row {
            for row in range.clone() {
                if self.rows.borrow().contains_key(&row) {
                    continue;
                }
                let row_view = view_for_row(row);
                row_view.set_frame(self.row_frame(view, row));
                view.add_subview(&row_view);
                self.rows.borrow_mut().insert(row, row_view);
                fetched += 1;
            }
        }

        log::trace!(
            "{:?}: rows {:?}, fetched {}, evicted {}",
            view,
            range,
            fetched,
            evicted.len()
        );
        if fetched > 0 || !evicted.is_empty() {
            view.set_dirty();
        }
    }

    fn notify(&self, view: &View, changes: Vec<SelectionChange>) {
        if changes.is_empty() {
            return;
        }
        view.set_dirty();
        let did_select = self.did_select_row_fn.borrow().clone();
        let did_deselect = self.did_deselect_row_fn.borrow().clone();
        for change in changes {
            match change {
                SelectionChange::Deselected(row) => {
                    if let Some(did_deselect) = &did_deselect {
                        did_deselect(row);
                    }
                }
                SelectionChange::Selected(row) => {
                    if let Some(did_select) = &did_select {
                        did_select(row);
                    }
                }
            }
        }
    }

    fn row_at(&self, view: &View, event: &UIEvent) -> Option<usize> {
        let height = self.row_height.get();
        let y = view.convert_from_window(event.point()).y;
        if height <= 0. || y < 0. {
            return None;
        }
        let row = (y / height).floor() as usize;
        if row < self.nb_rows.get() {
            Some(row)
        } else {
            None
        }
    }

    fn click(&self, view: &View, row: Option<usize>, modifiers: Modifiers) {
        self.focused_row.set(row);
        let changes = {
            let mut selection = self.selection.borrow_mut();
            let is_multiple = selection.mode() == SelectionMode::Multiple;
            match row {
                Some(row) if is_multiple && modifiers.contains(Modifiers::SHIFT) => {
                    selection.extend_to(row)
                }
                Some(row) if is_multiple && modifiers.is_toggle() => selection.toggle(row),
                Some(row) => selection.select(row, true),
                None => selection.clear(),
            }
        };
        self.notify(view, changes);

        // clicks are reported even when the selection stays the same
        if let Some(row) = row {
            let did_click = self.did_click_row_fn.borrow().clone();
            if let Some(did_click) = did_click {
                did_click(row);
            }
        }
    }

    fn step(&self, view: &View, delta: isize, modifiers: Modifiers) -> bool {
        let nb_rows = self.nb_rows.get();
        if nb_rows == 0 {
            return false;
        }
        let next = match self.focused_row.get() {
            Some(current) => (current as isize + delta).max(0).min(nb_rows as isize - 1) as usize,
            None if delta > 0 => 0,
            None => nb_rows - 1,
        };
        self.focused_row.set(Some(next));
        let changes = {
            let mut selection = self.selection.borrow_mut();
            if modifiers.contains(Modifiers::SHIFT) && selection.mode() == SelectionMode::Multiple {
                selection.extend_to(next)
            } else {
                selection.select(next, true)
            }
        };
        self.notify(view, changes);
        true
    }
}

impl ViewDelegate for ListViewState {
    fn handle_event(&self, view: &View, event: &UIEvent, chain: &ResponderChain) -> bool {
        match event.event_type() {
            EventType::MouseDown => {
                chain.make_first_responder(Some(view));
                self.click(view, self.row_at(view, event), event.modifiers());
                true
            }
            EventType::KeyDown if chain.is_first_responder(view) => match event.key() {
                Some(KeyCode::UpArrow) => self.step(view, -1, event.modifiers()),
                Some(KeyCode::DownArrow) => self.step(view, 1, event.modifiers()),
                _ => false,
            },
            _ => false,
        }
    }

    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        let range = self.visible_rows(view);
        let selection = self.selection.borrow();
        for row in range.filter(|row| selection.is_selected(*row)) {
            ctx.fill_rect(self.row_frame(view, row), self.highlight.get());
        }
    }

    fn layout(&self, view: &View) {
        let rows: Vec<_> = self
            .rows
            .borrow()
            .iter()
            .map(|(row, view)| (*row, view.clone()))
            .collect();
        for (row, row_view) in rows {
            row_view.set_frame(self.row_frame(view, row));
        }
    }

    fn will_draw(&self, view: &View) {
        if let Some(is_refresh_only) = self.delayed_reload.get() {
            self.reload_window(view, false, is_refresh_only);
        } else if self.visible_rows(view) != self.cached_range() {
            self.reload_window(view, false, true);
        }
    }
}

/// A list of uniformly tall rows with lazily fetched row views.
#[derive(Clone)]
pub struct ListView {
    view: View,
    state: Rc<ListViewState>,
}

/// A weak [`ListView`] handle.
#[derive(Clone)]
pub struct WeakListView {
    view: WeakView,
    state: Weak<ListViewState>,
}

impl WeakListView {
    pub fn upgrade(&self) -> Option<ListView> {
        Some(ListView {
            view: self.view.upgrade()?,
            state: self.state.upgrade()?,
        })
    }
}

impl ListView {
    pub fn new(name: &str, row_height: f64, mode: SelectionMode) -> ListView {
        let state = Rc::new(ListViewState {
            row_height: Cell::new(row_height),
            nb_rows: Cell::new(0),
            rows: RefCell::new(BTreeMap::new()),
            selection: RefCell::new(Selection::new(mode)),
            delayed_reload: Cell::new(None),
            focused_row: Cell::new(None),
            highlight: Cell::new(Color::HIGHLIGHT),
            nb_rows_fn: RefCell::new(None),
            view_for_row_fn: RefCell::new(None),
            did_select_row_fn: RefCell::new(None),
            did_deselect_row_fn: RefCell::new(None),
            did_click_row_fn: RefCell::new(None),
        });
        ListView {
            view: View::with_delegate(name, state.clone()),
            state,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn downgrade(&self) -> WeakListView {
        WeakListView {
            view: self.view.downgrade(),
            state: Rc::downgrade(&self.state),
        }
    }

    pub fn row_height(&self) -> f64 {
        self.state.row_height.get()
    }

    pub fn set_row_height(&self, row_height: f64) {
        self.state.row_height.set(row_height);
        self.reload();
    }

    /// The row count as of the last reload.
    pub fn nb_rows(&self) -> usize {
        self.state.nb_rows.get()
    }

    pub fn set_highlight_color(&self, color: Color) {
        self.state.highlight.set(color);
        self.view.set_dirty();
    }

    pub fn set_nb_rows_fn(&self, f: impl Fn() -> usize + 'static) {
        *self.state.nb_rows_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_view_for_row_fn(&self, f: impl Fn(usize) -> View + 'static) {
        *self.state.view_for_row_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_did_select_row_fn(&self, f: impl Fn(usize) + 'static) {
        *self.state.did_select_row_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_did_deselect_row_fn(&self, f: impl Fn(usize) + 'static) {
        *self.state.did_deselect_row_fn.borrow_mut() = Some(Rc::new(f));
    }

    /// Called after a row was clicked, whether or not that changed the selection.
    pub fn set_did_click_row_fn(&self, f: impl Fn(usize) + 'static) {
        *self.state.did_click_row_fn.borrow_mut() = Some(Rc::new(f));
    }

    /// Re-queries the row count, resizes the list to fit all rows and refetches the visible ones.
    /// Selected rows past the new end are deselected.
    pub fn reload(&self) {
        self.state.reload(&self.view);
    }

    /// Brings the row cache in line with the visible window.
    ///
    /// Without `is_refresh_only` every visible row is refetched; with it only rows that just
    /// became visible are fetched and rows that left the window are released. A delayed reload
    /// happens right before the next redraw; several delayed requests collapse into one.
    pub fn reload_window(&self, is_delayed: bool, is_refresh_only: bool) {
        self.state.reload_window(&self.view, is_delayed, is_refresh_only);
    }

    /// Indices of the rows currently visible.
    pub fn visible_rows(&self) -> Range<usize> {
        self.state.visible_rows(&self.view)
    }

    /// Indices of the rows with a cached view, ascending.
    pub fn cached_rows(&self) -> Vec<usize> {
        self.state.rows.borrow().keys().copied().collect()
    }

    pub fn row_view(&self, row: usize) -> Option<View> {
        self.state.rows.borrow().get(&row).cloned()
    }

    /// The frame of a row in the list’s coordinate system.
    pub fn row_frame(&self, row: usize) -> Rect {
        self.state.row_frame(&self.view, row)
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.state.selection.borrow().mode()
    }

    pub fn selected_rows(&self) -> Vec<usize> {
        self.state.selection.borrow().rows()
    }

    /// The first selected row.
    pub fn selected_row(&self) -> Option<usize> {
        self.selected_rows().first().copied()
    }

    pub fn is_row_selected(&self, row: usize) -> bool {
        self.state.selection.borrow().is_selected(row)
    }

    /// Selects a row and fires the selection callbacks. Rows past the end are ignored.
    pub fn select_row(&self, row: usize, is_exclusive: bool) {
        if row >= self.nb_rows() {
            log::debug!("{:?}: row {} out of range", self.view, row);
            return;
        }
        let changes = self.state.selection.borrow_mut().select(row, is_exclusive);
        self.state.notify(&self.view, changes);
    }

    pub fn deselect_row(&self, row: usize) {
        let changes = self.state.selection.borrow_mut().deselect(row);
        self.state.notify(&self.view, changes);
    }

    pub fn clear_selection(&self) {
        let changes = self.state.selection.borrow_mut().clear();
        self.state.notify(&self.view, changes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll_view::ScrollView;
    use cgmath::Point2;

    fn list(nb_rows: usize) -> (ScrollView, ListView, Rc<Cell<usize>>) {
        let scroll_view = ScrollView::new("scroller");
        scroll_view.view().set_frame(Rect::from_xywh(0., 0., 100., 100.));
        let list = ListView::new("list", 10., SelectionMode::Multiple);
        let fetches = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fetches);
        list.set_nb_rows_fn(move || nb_rows);
        list.set_view_for_row_fn(move |row| {
            counter.set(counter.get() + 1);
            View::new(&format!("row {}", row))
        });
        scroll_view.set_content_view(list.view());
        scroll_view.set_fits_width(true);
        list.reload();
        (scroll_view, list, fetches)
    }

    #[test]
    fn reload_sizes_the_list() {
        let (scroll_view, list, fetches) = list(25);
        assert_eq!(list.view().frame(), Rect::from_xywh(0., 0., 100., 250.));
        assert_eq!(scroll_view.max_pos(), Vector2::new(0., 150.));
        assert_eq!(list.cached_rows(), (0..10).collect::<Vec<_>>());
        assert_eq!(fetches.get(), 10);
        assert_eq!(list.row_view(3).map(|v| v.frame()), Some(Rect::from_xywh(0., 30., 100., 10.)));
    }

    #[test]
    fn partial_rows_count_as_visible() {
        let (scroll_view, list, _) = list(25);
        scroll_view.set_pos(Vector2::new(0., 15.));
        assert_eq!(list.visible_rows(), 1..12);
        scroll_view.set_pos(Vector2::new(0., 150.));
        assert_eq!(list.visible_rows(), 15..25);
    }

    #[test]
    fn delayed_reloads_run_before_drawing() {
        let (scroll_view, list, fetches) = list(25);
        list.reload_window(true, true);
        list.reload_window(true, false);
        assert_eq!(fetches.get(), 10, "nothing happens right away");

        crate::window::will_draw(scroll_view.view());
        assert_eq!(fetches.get(), 20, "one full refetch");
        crate::window::will_draw(scroll_view.view());
        assert_eq!(fetches.get(), 20);

        scroll_view.set_pos(Vector2::new(0., 20.));
        crate::window::will_draw(scroll_view.view());
        assert_eq!(list.cached_rows(), (2..12).collect::<Vec<_>>());
        assert_eq!(fetches.get(), 22, "scrolling fetches the newly visible rows");
    }

    #[test]
    fn clicks_and_arrows_select() {
        let (scroll_view, list, _) = list(25);
        let chain = ResponderChain::new(scroll_view.view());
        let log = Rc::new(RefCell::new(Vec::new()));
        let selected = Rc::clone(&log);
        list.set_did_select_row_fn(move |row| selected.borrow_mut().push(format!("+{}", row)));
        let deselected = Rc::clone(&log);
        list.set_did_deselect_row_fn(move |row| deselected.borrow_mut().push(format!("-{}", row)));

        chain.send_event(&UIEvent::mouse_down(Point2::new(50., 25.)));
        chain.send_event(
            &UIEvent::mouse_down(Point2::new(50., 45.)).with_modifiers(Modifiers::SHIFT),
        );
        chain.send_event(
            &UIEvent::mouse_down(Point2::new(50., 35.)).with_modifiers(Modifiers::COMMAND),
        );
        assert_eq!(list.selected_rows(), vec![2, 4]);

        chain.send_event(&UIEvent::key_down(KeyCode::DownArrow));
        assert_eq!(list.selected_rows(), vec![4]);
        assert_eq!(*log.borrow(), vec!["+2", "+3", "+4", "-3", "-2"]);
    }

    #[test]
    fn clicks_are_reported_without_a_selection_change() {
        let (scroll_view, list, _) = list(25);
        let chain = ResponderChain::new(scroll_view.view());
        let clicked = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&clicked);
        list.set_did_click_row_fn(move |row| log.borrow_mut().push(row));

        list.select_row(3, true);
        chain.send_event(&UIEvent::mouse_down(Point2::new(50., 35.)));
        chain.send_event(&UIEvent::mouse_down(Point2::new(50., 35.)));
        chain.send_event(&UIEvent::key_down(KeyCode::DownArrow));
        assert_eq!(*clicked.borrow(), vec![3, 3]);
        assert_eq!(list.selected_rows(), vec![4]);
    }

    #[test]
    fn shrinking_deselects_missing_rows() {
        let nb_rows = Rc::new(Cell::new(25));
        let (_scroll_view, list, _) = list(0);
        let count = Rc::clone(&nb_rows);
        list.set_nb_rows_fn(move || count.get());
        list.reload();
        list.select_row(20, true);
        nb_rows.set(10);
        list.reload();
        assert_eq!(list.selected_rows(), Vec::<usize>::new());
        list.select_row(12, true);
        assert_eq!(list.selected_row(), None, "out of range");
    }
}
