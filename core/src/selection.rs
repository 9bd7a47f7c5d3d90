//! Row selection model shared by list, tree and table views.

use std::collections::BTreeSet;

/// Whether more than one row may be selected. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Single,
    Multiple,
}

/// One change to the selection. Every mutation returns its changes in the order they must be
/// reported: all deselections come before any selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Deselected(usize),
    Selected(usize),
}

#[derive(Debug, Clone)]
pub struct Selection {
    mode: SelectionMode,
    rows: BTreeSet<usize>,
    /// Where shift-extension starts.
    anchor: Option<usize>,
}

impl Selection {
    pub fn new(mode: SelectionMode) -> Selection {
        Selection {
            mode,
            rows: BTreeSet::new(),
            anchor: None,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.rows.contains(&row)
    }

    /// Selected rows in ascending order.
    pub fn rows(&self) -> Vec<usize> {
        self.rows.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    /// Deselects every row in `keep`’s complement, then selects `select`.
    fn replace_with(&mut self, keep: impl Fn(usize) -> bool, select: &[usize]) -> Vec<SelectionChange> {
        let mut changes = Vec::new();
        let removed: Vec<_> = self.rows.iter().copied().filter(|r| !keep(*r)).collect();
        for row in removed {
            self.rows.remove(&row);
            changes.push(SelectionChange::Deselected(row));
        }
        for &row in select {
            if self.rows.insert(row) {
                changes.push(SelectionChange::Selected(row));
            }
        }
        changes
    }

    /// Selects a row. Exclusive selection (always the case in single mode) deselects everything
    /// else first.
    pub fn select(&mut self, row: usize, is_exclusive: bool) -> Vec<SelectionChange> {
        self.anchor = Some(row);
        if is_exclusive || self.mode == SelectionMode::Single {
            self.replace_with(|r| r == row, &[row])
        } else {
            self.replace_with(|_| true, &[row])
        }
    }

    pub fn deselect(&mut self, row: usize) -> Vec<SelectionChange> {
        if self.rows.remove(&row) {
            vec![SelectionChange::Deselected(row)]
        } else {
            Vec::new()
        }
    }

    /// Command/control-click: flips one row, leaving the others in multiple mode.
    pub fn toggle(&mut self, row: usize) -> Vec<SelectionChange> {
        if self.is_selected(row) {
            self.anchor = Some(row);
            self.deselect(row)
        } else {
            self.select(row, false)
        }
    }

    /// Shift-click: selects the range between the anchor and `row`, replacing the rest.
    pub fn extend_to(&mut self, row: usize) -> Vec<SelectionChange> {
        let anchor = match (self.mode, self.anchor) {
            (SelectionMode::Multiple, Some(anchor)) => anchor,
            _ => return self.select(row, true),
        };
        let (start, end) = if anchor <= row { (anchor, row) } else { (row, anchor) };
        let range: Vec<_> = (start..=end).collect();
        self.replace_with(|r| r >= start && r <= end, &range)
    }

    pub fn clear(&mut self) -> Vec<SelectionChange> {
        self.anchor = None;
        self.replace_with(|_| false, &[])
    }

    /// Drops rows that no longer exist after the row count shrank to `count`.
    pub fn retain_below(&mut self, count: usize) -> Vec<SelectionChange> {
        if self.anchor.map_or(false, |a| a >= count) {
            self.anchor = None;
        }
        self.replace_with(|r| r < count, &[])
    }
}
