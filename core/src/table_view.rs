use crate::color::Color;
use crate::draw::DrawContext;
use crate::list_view::ListView;
use crate::rect::Rect;
use crate::selection::SelectionMode;
use crate::view::{View, ViewDelegate};
use core::cell::RefCell;
use std::rc::Rc;

/// A table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub title: String,
    /// Width in points; the last column takes whatever is left.
    pub width: f64,
}

impl Column {
    pub fn new(title: &str, width: f64) -> Column {
        Column {
            title: title.to_string(),
            width,
        }
    }
}

/// Lays out one cell per column.
struct TableRow {
    widths: Rc<RefCell<Vec<f64>>>,
}

impl ViewDelegate for TableRow {
    fn layout(&self, view: &View) {
        let widths = self.widths.borrow();
        let size = view.frame().size;
        let cells = view.subviews();
        let mut x = 0.;
        for (i, cell) in cells.iter().enumerate() {
            let width = if i + 1 == cells.len() {
                (size.x - x).max(0.)
            } else {
                widths.get(i).copied().unwrap_or(0.)
            };
            cell.set_frame(Rect::from_xywh(x, 0., width, size.y));
            x += width;
        }
    }
}

struct TableHeader {
    columns: Rc<RefCell<Vec<Column>>>,
}

impl ViewDelegate for TableHeader {
    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        let height = view.frame().height();
        ctx.fill_rect(view.bounds(), Color::CONTROL);
        let mut x = 0.;
        for column in self.columns.borrow().iter() {
            ctx.draw_text(Rect::from_xywh(x + 4., 0., column.width - 8., height), &column.title, Color::TEXT);
            x += column.width;
        }
    }
}

/// A list whose rows are split into columns.
///
/// Cells come from `view_for_cell_fn(row, column)`; selection and virtualization are the list’s.
#[derive(Clone)]
pub struct TableView {
    list: ListView,
    header: View,
    columns: Rc<RefCell<Vec<Column>>>,
    view_for_cell_fn: Rc<RefCell<Option<Rc<dyn Fn(usize, usize) -> View>>>>,
}

impl TableView {
    pub fn new(name: &str, row_height: f64, mode: SelectionMode, columns: Vec<Column>) -> TableView {
        let list = ListView::new(name, row_height, mode);
        let columns = Rc::new(RefCell::new(columns));
        let widths = Rc::new(RefCell::new(
            columns.borrow().iter().map(|c| c.width).collect::<Vec<_>>(),
        ));
        let view_for_cell_fn: Rc<RefCell<Option<Rc<dyn Fn(usize, usize) -> View>>>> =
            Rc::new(RefCell::new(None));

        let cell_fn = Rc::clone(&view_for_cell_fn);
        let row_columns = Rc::clone(&columns);
        list.set_view_for_row_fn(move |row| {
            let row_view = View::with_delegate(
                "tableRow",
                Rc::new(TableRow {
                    widths: Rc::clone(&widths),
                }),
            );
            let view_for_cell = cell_fn.borrow().clone();
            if let Some(view_for_cell) = view_for_cell {
                for column in 0..row_columns.borrow().len() {
                    row_view.add_subview(&view_for_cell(row, column));
                }
            }
            row_view
        });

        let header = View::with_delegate(
            "tableHeader",
            Rc::new(TableHeader {
                columns: Rc::clone(&columns),
            }),
        );

        TableView {
            list,
            header,
            columns,
            view_for_cell_fn,
        }
    }

    pub fn view(&self) -> &View {
        self.list.view()
    }

    pub fn list(&self) -> &ListView {
        &self.list
    }

    /// A view drawing the column titles, to be placed above the scroll view.
    pub fn header_view(&self) -> &View {
        &self.header
    }

    pub fn columns(&self) -> Vec<Column> {
        self.columns.borrow().clone()
    }

    pub fn set_nb_rows_fn(&self, f: impl Fn() -> usize + 'static) {
        self.list.set_nb_rows_fn(f);
    }

    pub fn set_view_for_cell_fn(&self, f: impl Fn(usize, usize) -> View + 'static) {
        *self.view_for_cell_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub fn reload(&self) {
        self.list.reload();
        self.header.set_dirty();
    }

    /// The cell view of a visible row.
    pub fn cell_view(&self, row: usize, column: usize) -> Option<View> {
        self.list
            .row_view(row)
            .and_then(|row| row.subviews().get(column).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll_view::ScrollView;

    #[test]
    fn cells_follow_column_widths() {
        let scroll_view = ScrollView::new("scroller");
        scroll_view.view().set_frame(Rect::from_xywh(0., 0., 300., 100.));
        let table = TableView::new(
            "table",
            20.,
            SelectionMode::Single,
            vec![Column::new("#", 40.), Column::new("Name", 160.), Column::new("Length", 0.)],
        );
        table.set_nb_rows_fn(|| 50);
        table.set_view_for_cell_fn(|row, column| View::new(&format!("{}:{}", row, column)));
        scroll_view.set_content_view(table.view());
        scroll_view.set_fits_width(true);
        table.reload();

        assert_eq!(table.list().cached_rows().len(), 5);
        let frames: Vec<_> = (0..3)
            .filter_map(|c| table.cell_view(4, c))
            .map(|v| (v.name(), v.frame()))
            .collect();
        assert_eq!(
            frames,
            vec![
                ("4:0".to_string(), Rect::from_xywh(0., 0., 40., 20.)),
                ("4:1".to_string(), Rect::from_xywh(40., 0., 160., 20.)),
                ("4:2".to_string(), Rect::from_xywh(200., 0., 100., 20.)),
            ]
        );
        assert_eq!(table.cell_view(10, 0), None, "not visible");
    }
}
