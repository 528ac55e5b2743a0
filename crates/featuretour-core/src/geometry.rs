#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Coordinates are device-independent units with the origin at the top-left
//! corner. Offsets may be negative: a popup placed above its target has a
//! negative vertical offset relative to the target's origin.

/// A point or offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by another point.
    #[inline]
    pub fn offset(&self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

/// A measured width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Check if the size has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An axis-aligned rectangle used for anchors, popups, and viewports.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: f64,
    /// Top edge (inclusive).
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle at `origin` with the given size.
    #[inline]
    pub const fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Top-left corner.
    #[inline]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Width and height.
    #[inline]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if the rectangle has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size().is_empty()
    }

    /// Check whether `other` lies completely inside this rectangle.
    #[inline]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Compute the intersection with another rectangle, returning `None` if no overlap.
    pub fn intersection_opt(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Area of the overlap with another rectangle (zero if disjoint).
    pub fn overlap_area(&self, other: &Rect) -> f64 {
        self.intersection_opt(other)
            .map(|r| r.width * r.height)
            .unwrap_or(0.0)
    }

    /// Translate the rectangle by an offset.
    #[inline]
    pub fn translate(&self, by: Point) -> Rect {
        Rect::from_origin(self.origin().offset(by), self.size())
    }
}

#[cfg(test)]
mod tests {
    use super::{Point, Rect, Size};

    #[test]
    fn rect_edges() {
        let rect = Rect::new(2.0, 3.0, 4.0, 5.0);
        assert_eq!(rect.right(), 6.0);
        assert_eq!(rect.bottom(), 8.0);
        assert_eq!(rect.origin(), Point::new(2.0, 3.0));
        assert_eq!(rect.size(), Size::new(4.0, 5.0));
    }

    #[test]
    fn rect_contains_rect_edges() {
        let outer = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains_rect(&Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(outer.contains_rect(&Rect::new(2.0, 2.0, 3.0, 3.0)));
        assert!(!outer.contains_rect(&Rect::new(-1.0, 2.0, 3.0, 3.0)));
        assert!(!outer.contains_rect(&Rect::new(8.0, 8.0, 3.0, 3.0)));
    }

    #[test]
    fn rect_intersection_overlaps() {
        let a = Rect::new(0.0, 0.0, 4.0, 4.0);
        let b = Rect::new(2.0, 2.0, 4.0, 4.0);
        assert_eq!(a.intersection_opt(&b), Some(Rect::new(2.0, 2.0, 2.0, 2.0)));
        assert_eq!(a.overlap_area(&b), 4.0);
    }

    #[test]
    fn rect_intersection_no_overlap() {
        let a = Rect::new(0.0, 0.0, 2.0, 2.0);
        let b = Rect::new(3.0, 3.0, 2.0, 2.0);
        assert_eq!(a.intersection_opt(&b), None);
        assert_eq!(a.overlap_area(&b), 0.0);
    }

    #[test]
    fn rect_translate_keeps_size() {
        let rect = Rect::new(1.0, 1.0, 5.0, 2.0).translate(Point::new(-3.0, 4.0));
        assert_eq!(rect, Rect::new(-2.0, 5.0, 5.0, 2.0));
    }

    #[test]
    fn size_empty() {
        assert!(Size::new(0.0, 3.0).is_empty());
        assert!(Size::new(3.0, -1.0).is_empty());
        assert!(!Size::new(1.0, 1.0).is_empty());
    }
}
