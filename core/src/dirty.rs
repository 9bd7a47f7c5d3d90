//! Redraw scheduling.

use crate::rect::Rect;
use std::mem;

/// Whether a redraw has been requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawState {
    /// Nothing to redraw.
    Clean,
    /// A redraw has been scheduled but hasn’t run yet.
    Pending,
}

/// Accumulates dirty rectangles of one window root between redraws.
#[derive(Debug)]
pub struct DirtyRegion {
    state: RedrawState,
    rect: Rect,
}

impl Default for DirtyRegion {
    fn default() -> Self {
        DirtyRegion::new()
    }
}

impl DirtyRegion {
    pub fn new() -> DirtyRegion {
        DirtyRegion {
            state: RedrawState::Clean,
            rect: Rect::zero(),
        }
    }

    pub fn state(&self) -> RedrawState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == RedrawState::Pending
    }

    /// The union of everything marked since the last redraw.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Adds a dirty rect.
    ///
    /// Returns true exactly when this transitions the region from clean to pending, i.e. when the
    /// caller has to schedule a redraw. Empty rects are ignored.
    pub fn mark(&mut self, rect: Rect) -> bool {
        if rect.is_empty() {
            return false;
        }
        self.rect = self.rect.union(rect);
        match self.state {
            RedrawState::Clean => {
                self.state = RedrawState::Pending;
                true
            }
            RedrawState::Pending => false,
        }
    }

    /// Starts a redraw: returns the accumulated rect and goes back to clean.
    pub fn take(&mut self) -> Option<Rect> {
        match self.state {
            RedrawState::Clean => None,
            RedrawState::Pending => {
                self.state = RedrawState::Clean;
                Some(mem::replace(&mut self.rect, Rect::zero()))
            }
        }
    }
}

#[test]
fn test_dirty_region_coalesces() {
    let mut region = DirtyRegion::new();
    let rects = [
        Rect::from_xywh(0., 0., 10., 10.),
        Rect::from_xywh(50., 50., 10., 10.),
        Rect::from_xywh(5., 20., 10., 10.),
    ];

    let scheduled = rects.iter().filter(|r| region.mark(**r)).count();
    assert_eq!(scheduled, 1, "only the first mark schedules a redraw");
    assert_eq!(region.state(), RedrawState::Pending);
    assert_eq!(
        region.take(),
        Some(Rect::from_xywh(0., 0., 60., 60.)),
        "accumulated rect is the union"
    );

    assert_eq!(region.state(), RedrawState::Clean);
    assert_eq!(region.take(), None);
    assert!(!region.mark(Rect::zero()), "empty rects don’t schedule");
    assert!(region.mark(rects[0]), "after a redraw the next mark schedules again");
}
