//! Trees flattened into a list.
//!
//! Nodes are addressed by index paths: `[2, 0]` is the first child of the third top-level node.
//! Only expanded nodes contribute their children to the flattened list.

use crate::color::Color;
use crate::draw::DrawContext;
use crate::events::{EventType, UIEvent};
use crate::list_view::{ListView, WeakListView};
use crate::path::{Path, Segment};
use crate::rect::Rect;
use crate::responder::ResponderChain;
use crate::selection::SelectionMode;
use crate::view::{View, ViewDelegate};
use cgmath::Point2;
use core::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

/// Location of a node.
pub type IndexPath = Vec<usize>;

const INDENT: f64 = 14.;

struct TreeViewState {
    list: WeakListView,
    flattened: RefCell<Vec<IndexPath>>,
    expanded: RefCell<BTreeSet<IndexPath>>,
    nb_children_fn: RefCell<Option<Rc<dyn Fn(&[usize]) -> usize>>>,
    view_for_node_fn: RefCell<Option<Rc<dyn Fn(&[usize]) -> View>>>,
    did_select_node_fn: RefCell<Option<Rc<dyn Fn(&[usize])>>>,
    did_deselect_node_fn: RefCell<Option<Rc<dyn Fn(&[usize])>>>,
}

impl TreeViewState {
    fn nb_children(&self, path: &[usize]) -> usize {
        let nb_children = self.nb_children_fn.borrow().clone();
        nb_children.map_or(0, |f| f(path))
    }

    fn flatten(&self) {
        let mut flattened = Vec::new();
        let mut stack: Vec<IndexPath> = (0..self.nb_children(&[]))
            .rev()
            .map(|i| vec![i])
            .collect();
        while let Some(path) = stack.pop() {
            if self.expanded.borrow().contains(&path) {
                for i in (0..self.nb_children(&path)).rev() {
                    let mut child = path.clone();
                    child.push(i);
                    stack.push(child);
                }
            }
            flattened.push(path);
        }
        *self.flattened.borrow_mut() = flattened;
    }

    fn path(&self, row: usize) -> Option<IndexPath> {
        self.flattened.borrow().get(row).cloned()
    }

    fn rebuild(&self) {
        if let Some(list) = self.list.upgrade() {
            list.clear_selection();
            self.flatten();
            list.reload();
        }
    }

    fn set_expanded(&self, path: &[usize], is_expanded: bool) {
        let changed = if is_expanded {
            self.expanded.borrow_mut().insert(path.to_vec())
        } else {
            self.expanded.borrow_mut().remove(path)
        };
        if changed {
            log::debug!("{} {:?}", if is_expanded { "expanded" } else { "collapsed" }, path);
            self.rebuild();
        }
    }

    fn toggle(&self, path: &[usize]) {
        let is_expanded = self.expanded.borrow().contains(path);
        self.set_expanded(path, !is_expanded);
    }
}

/// Row container: indents the node view and draws the disclosure triangle.
struct TreeRow {
    tree: Weak<TreeViewState>,
    path: IndexPath,
    has_children: bool,
    is_expanded: bool,
}

impl TreeRow {
    fn disclosure_rect(&self, height: f64) -> Rect {
        Rect::from_xywh((self.path.len() - 1) as f64 * INDENT, 0., INDENT, height)
    }

    fn triangle(&self) -> Path {
        if self.is_expanded {
            Path::from_segments(vec![
                Segment::MoveTo(Point2::new(0., 0.)),
                Segment::LineTo(Point2::new(8., 0.)),
                Segment::LineTo(Point2::new(4., 6.)),
                Segment::Close,
            ])
        } else {
            Path::from_segments(vec![
                Segment::MoveTo(Point2::new(0., 0.)),
                Segment::LineTo(Point2::new(6., 4.)),
                Segment::LineTo(Point2::new(0., 8.)),
                Segment::Close,
            ])
        }
    }
}

impl ViewDelegate for TreeRow {
    fn handle_event(&self, view: &View, event: &UIEvent, _chain: &ResponderChain) -> bool {
        if event.event_type() != EventType::MouseDown || !self.has_children {
            return false;
        }
        let point = view.convert_from_window(event.point());
        if !self.disclosure_rect(view.frame().height()).contains(point) {
            return false;
        }
        match self.tree.upgrade() {
            Some(tree) => {
                tree.toggle(&self.path);
                true
            }
            None => false,
        }
    }

    fn draw(&self, view: &View, ctx: &mut DrawContext) {
        if !self.has_children {
            return;
        }
        let rect = self.disclosure_rect(view.frame().height());
        let center = rect.center();
        ctx.fill_path(Point2::new(center.x - 4., center.y - 4.), &self.triangle(), Color::TEXT);
    }

    fn layout(&self, view: &View) {
        let x = self.path.len() as f64 * INDENT;
        let size = view.frame().size;
        for subview in view.subviews() {
            subview.set_frame(Rect::from_xywh(x, 0., (size.x - x).max(0.), size.y));
        }
    }
}

/// An expandable tree of rows.
#[derive(Clone)]
pub struct TreeView {
    list: ListView,
    state: Rc<TreeViewState>,
}

impl TreeView {
    pub fn new(name: &str, row_height: f64, mode: SelectionMode) -> TreeView {
        let list = ListView::new(name, row_height, mode);
        let state = Rc::new(TreeViewState {
            list: list.downgrade(),
            flattened: RefCell::new(Vec::new()),
            expanded: RefCell::new(BTreeSet::new()),
            nb_children_fn: RefCell::new(None),
            view_for_node_fn: RefCell::new(None),
            did_select_node_fn: RefCell::new(None),
            did_deselect_node_fn: RefCell::new(None),
        });

        // the list owns the tree state through its callbacks
        let tree = Rc::clone(&state);
        list.set_nb_rows_fn(move || tree.flattened.borrow().len());

        let tree = Rc::clone(&state);
        list.set_view_for_row_fn(move |row| {
            let path = tree.path(row).unwrap_or_default();
            let has_children = tree.nb_children(&path) > 0;
            let row_view = View::with_delegate(
                "treeRow",
                Rc::new(TreeRow {
                    tree: Rc::downgrade(&tree),
                    is_expanded: tree.expanded.borrow().contains(&path),
                    path: path.clone(),
                    has_children,
                }),
            );
            let view_for_node = tree.view_for_node_fn.borrow().clone();
            if let Some(view_for_node) = view_for_node {
                row_view.add_subview(&view_for_node(&path));
            }
            row_view
        });

        let tree = Rc::clone(&state);
        list.set_did_select_row_fn(move |row| {
            let did_select = tree.did_select_node_fn.borrow().clone();
            if let (Some(did_select), Some(path)) = (did_select, tree.path(row)) {
                did_select(&path);
            }
        });

        let tree = Rc::clone(&state);
        list.set_did_deselect_row_fn(move |row| {
            let did_deselect = tree.did_deselect_node_fn.borrow().clone();
            if let (Some(did_deselect), Some(path)) = (did_deselect, tree.path(row)) {
                did_deselect(&path);
            }
        });

        TreeView { list, state }
    }

    pub fn view(&self) -> &View {
        self.list.view()
    }

    /// The underlying flattened list.
    pub fn list(&self) -> &ListView {
        &self.list
    }

    /// Sets the function returning the number of children of a node; the empty path is the root.
    pub fn set_nb_children_fn(&self, f: impl Fn(&[usize]) -> usize + 'static) {
        *self.state.nb_children_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_view_for_node_fn(&self, f: impl Fn(&[usize]) -> View + 'static) {
        *self.state.view_for_node_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_did_select_node_fn(&self, f: impl Fn(&[usize]) + 'static) {
        *self.state.did_select_node_fn.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_did_deselect_node_fn(&self, f: impl Fn(&[usize]) + 'static) {
        *self.state.did_deselect_node_fn.borrow_mut() = Some(Rc::new(f));
    }

    /// Rebuilds the flattened rows from the data source. The selection is cleared.
    pub fn reload(&self) {
        self.state.rebuild();
    }

    pub fn expand(&self, path: &[usize]) {
        self.state.set_expanded(path, true);
    }

    pub fn collapse(&self, path: &[usize]) {
        self.state.set_expanded(path, false);
    }

    pub fn toggle(&self, path: &[usize]) {
        self.state.toggle(path);
    }

    pub fn is_expanded(&self, path: &[usize]) -> bool {
        self.state.expanded.borrow().contains(path)
    }

    /// Paths of every visible node in display order.
    pub fn visible_paths(&self) -> Vec<IndexPath> {
        self.state.flattened.borrow().clone()
    }

    pub fn row_for_path(&self, path: &[usize]) -> Option<usize> {
        self.state
            .flattened
            .borrow()
            .iter()
            .position(|p| p.as_slice() == path)
    }

    /// Selects a visible node. Hidden nodes (with a collapsed ancestor) are ignored.
    pub fn select_path(&self, path: &[usize], is_exclusive: bool) {
        if let Some(row) = self.row_for_path(path) {
            self.list.select_row(row, is_exclusive);
        }
    }

    pub fn selected_paths(&self) -> Vec<IndexPath> {
        self.list
            .selected_rows()
            .into_iter()
            .filter_map(|row| self.state.path(row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll_view::ScrollView;

    /// Two top-level nodes; the first has three children, the second child has one child.
    fn nb_children(path: &[usize]) -> usize {
        match path {
            [] => 2,
            [0] => 3,
            [0, 1] => 1,
            _ => 0,
        }
    }

    fn tree() -> (ScrollView, TreeView) {
        let scroll_view = ScrollView::new("scroller");
        scroll_view.view().set_frame(Rect::from_xywh(0., 0., 200., 200.));
        let tree = TreeView::new("tree", 20., SelectionMode::Single);
        tree.set_nb_children_fn(nb_children);
        tree.set_view_for_node_fn(|path| View::new(&format!("{:?}", path)));
        scroll_view.set_content_view(tree.view());
        scroll_view.set_fits_width(true);
        tree.reload();
        (scroll_view, tree)
    }

    #[test]
    fn expanding_and_collapsing() {
        let (_scroll_view, tree) = tree();
        assert_eq!(tree.visible_paths(), vec![vec![0], vec![1]]);

        tree.expand(&[0]);
        tree.expand(&[0, 1]);
        assert_eq!(
            tree.visible_paths(),
            vec![
                vec![0],
                vec![0, 0],
                vec![0, 1],
                vec![0, 1, 0],
                vec![0, 2],
                vec![1]
            ]
        );
        assert_eq!(tree.list().nb_rows(), 6);
        assert_eq!(tree.list().cached_rows(), (0..6).collect::<Vec<_>>());

        let row = tree.list().row_view(3).and_then(|row| row.subviews().first().cloned());
        assert_eq!(
            row.map(|v| (v.name(), v.frame())),
            Some(("[0, 1, 0]".to_string(), Rect::from_xywh(42., 0., 158., 20.)))
        );

        tree.collapse(&[0]);
        assert_eq!(tree.visible_paths(), vec![vec![0], vec![1]]);
        assert!(tree.is_expanded(&[0, 1]), "nested state survives collapsing the parent");
    }

    #[test]
    fn selection_is_reported_as_paths() {
        let (_scroll_view, tree) = tree();
        let selected = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&selected);
        tree.set_did_select_node_fn(move |path| recorded.borrow_mut().push(path.to_vec()));

        tree.expand(&[0]);
        tree.select_path(&[0, 2], true);
        assert_eq!(tree.selected_paths(), vec![vec![0, 2]]);
        assert_eq!(*selected.borrow(), vec![vec![0, 2]]);

        tree.select_path(&[0, 1, 0], true);
        assert_eq!(tree.selected_paths(), vec![vec![0, 2]], "hidden node");

        tree.collapse(&[0]);
        assert!(tree.selected_paths().is_empty());
    }

    #[test]
    fn clicking_the_disclosure_toggles() {
        let (scroll_view, tree) = tree();
        let chain = ResponderChain::new(scroll_view.view());
        chain.send_event(&UIEvent::mouse_down(Point2::new(5., 5.)));
        assert!(tree.is_expanded(&[0]));
        assert_eq!(tree.list().nb_rows(), 5);
        assert!(tree.list().selected_rows().is_empty(), "disclosure clicks don’t select");
    }
}
