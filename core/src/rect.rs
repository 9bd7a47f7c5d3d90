//! Rectangles.

use cgmath::{Point2, Vector2, Zero};
use std::{f64, ops};

/// A rectangle.
///
/// The y axis points down; `origin` is the top left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Rectangle origin.
    pub origin: Point2<f64>,

    /// Rectangle size.
    pub size: Vector2<f64>,
}

impl Default for Rect {
    fn default() -> Self {
        Rect::zero()
    }
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(origin: Point2<f64>, size: Vector2<f64>) -> Rect {
        Rect { origin, size }
    }

    /// Creates a new rectangle from its components.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect {
            origin: Point2::new(x, y),
            size: Vector2::new(width, height),
        }
    }

    /// Returns a zero-sized rectangle at the origin.
    pub fn zero() -> Rect {
        Rect {
            origin: Point2::new(0., 0.),
            size: Vector2::zero(),
        }
    }

    pub fn width(&self) -> f64 {
        self.size.x
    }

    pub fn height(&self) -> f64 {
        self.size.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.x
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.y
    }

    /// Returns true if the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        !(self.size.x > 0. && self.size.y > 0.)
    }

    /// Returns the center point.
    pub fn center(&self) -> Point2<f64> {
        self.origin + self.size / 2.
    }

    /// Returns true if the point is inside the rectangle.
    pub fn contains(&self, point: Point2<f64>) -> bool {
        point.x >= self.origin.x
            && point.y >= self.origin.y
            && point.x < self.origin.x + self.size.x
            && point.y < self.origin.y + self.size.y
    }

    /// Returns true if the two rectangles intersect.
    pub fn intersects(&self, rect: Rect) -> bool {
        let own_opposite = self.origin + self.size;
        let rect_opposite = rect.origin + rect.size;

        self.origin.x < rect_opposite.x
            && self.origin.y < rect_opposite.y
            && rect.origin.x < own_opposite.x
            && rect.origin.y < own_opposite.y
    }

    /// Returns the intersection rectangle.
    pub fn intersect(&self, rect: Rect) -> Option<Rect> {
        if !self.intersects(rect) {
            return None;
        }

        let min_x = self.origin.x.max(rect.origin.x);
        let min_y = self.origin.y.max(rect.origin.y);
        let max_x = self.max_x().min(rect.max_x());
        let max_y = self.max_y().min(rect.max_y());

        Some(Rect::from_xywh(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Returns the smallest rectangle containing both rectangles.
    ///
    /// Empty rectangles don’t contribute to the union.
    pub fn union(&self, rect: Rect) -> Rect {
        if rect.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return rect;
        }

        let min_x = self.origin.x.min(rect.origin.x);
        let min_y = self.origin.y.min(rect.origin.y);
        let max_x = self.max_x().max(rect.max_x());
        let max_y = self.max_y().max(rect.max_y());

        Rect::from_xywh(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Returns a new rectangle inset by the specified amount.
    pub fn inset(&self, horiz: f64, vert: f64) -> Rect {
        Rect {
            origin: (self.origin.x + horiz, self.origin.y + vert).into(),
            size: (self.size.x - 2. * horiz, self.size.y - 2. * vert).into(),
        }
    }

    /// Returns a new rectangle with the given origin.
    pub fn with_origin(&self, origin: Point2<f64>) -> Rect {
        Rect {
            origin,
            size: self.size,
        }
    }

    /// Returns a new rectangle with the given size.
    pub fn with_size(&self, size: Vector2<f64>) -> Rect {
        Rect {
            origin: self.origin,
            size,
        }
    }
}

impl ops::Add<Vector2<f64>> for Rect {
    type Output = Rect;
    fn add(self, offset: Vector2<f64>) -> Rect {
        Rect {
            origin: self.origin + offset,
            size: self.size,
        }
    }
}

impl ops::Sub<Vector2<f64>> for Rect {
    type Output = Rect;
    fn sub(self, offset: Vector2<f64>) -> Rect {
        Rect {
            origin: self.origin - offset,
            size: self.size,
        }
    }
}

#[test]
fn test_rect_union_and_intersection() {
    let a = Rect::from_xywh(0., 0., 10., 10.);
    let b = Rect::from_xywh(5., 5., 10., 10.);

    assert_eq!(a.intersect(b), Some(Rect::from_xywh(5., 5., 5., 5.)));
    assert_eq!(a.union(b), Rect::from_xywh(0., 0., 15., 15.));

    let far = Rect::from_xywh(20., 0., 5., 5.);
    assert_eq!(a.intersect(far), None, "touching nothing yields no intersection");

    let edge = Rect::from_xywh(10., 0., 5., 5.);
    assert!(!a.intersects(edge), "shared edges don’t count as intersecting");

    assert_eq!(a.union(Rect::zero()), a, "empty rects don’t grow a union");
    assert_eq!(Rect::zero().union(b), b);
}

#[test]
fn test_rect_contains_is_half_open() {
    let r = Rect::from_xywh(0., 0., 20., 20.);
    assert!(r.contains(Point2::new(0., 0.)));
    assert!(r.contains(Point2::new(19.9, 19.9)));
    assert!(!r.contains(Point2::new(20., 10.)));
    assert!(!r.contains(Point2::new(10., 20.)));
}
