//! Virtual and physical coordinates.
//!
//! Everything the layout code produces lives in *virtual* space: the full,
//! unscrolled content plane. What the surface shows is *physical* space,
//! `physical = virtual - viewport offset`. The wrappers in this module keep
//! the two apart so a scrolled coordinate is never tested against unscrolled
//! geometry by accident.

use kurbo::{Line, Point, Rect, Vec2};

/// Scroll offset of virtual space relative to the drawing surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    /// Horizontal scroll in pixels.
    pub x_offset: f64,
    /// Vertical scroll in pixels.
    pub y_offset: f64,
}

impl Viewport {
    /// Creates a viewport with the given offsets.
    pub const fn new(x_offset: f64, y_offset: f64) -> Self {
        Self { x_offset, y_offset }
    }

    /// Returns the offset as a vector.
    #[inline]
    pub const fn offset(&self) -> Vec2 {
        Vec2::new(self.x_offset, self.y_offset)
    }

    /// Maps a physical surface point into virtual space.
    #[inline]
    pub fn physical_to_virtual(&self, point: Point) -> VirtualPoint {
        VirtualPoint(point + self.offset())
    }

    /// Maps a virtual point onto the physical surface.
    #[inline]
    pub fn virtual_to_physical(&self, point: VirtualPoint) -> Point {
        point.0 - self.offset()
    }

    /// Keeps the vertical offset within `[0, content - surface + row]` and
    /// snaps it down to a whole number of rows.
    pub fn clamp_vertical(&mut self, content_height: f64, surface_height: f64, row_height: f64) {
        let mut y = self
            .y_offset
            .min(content_height - surface_height + row_height)
            .max(0.0);
        if row_height > 0.0 {
            y -= y % row_height;
        }
        self.y_offset = y;
    }
}

/// A point in virtual (unscrolled) space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VirtualPoint(Point);

impl VirtualPoint {
    /// Creates a virtual point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self(Point::new(x, y))
    }

    /// Horizontal position, unaffected by scrolling.
    #[inline]
    pub const fn x(&self) -> f64 {
        self.0.x
    }

    /// Vertical position from the top of the content, not of the surface.
    #[inline]
    pub const fn y(&self) -> f64 {
        self.0.y
    }

    /// Returns the raw kurbo point in virtual space.
    #[inline]
    pub const fn point(&self) -> Point {
        self.0
    }

    /// Euclidean distance to another virtual point.
    #[inline]
    pub fn distance(&self, other: Self) -> f64 {
        self.0.distance(other.0)
    }

    /// Returns this point in physical space for the given viewport.
    #[inline]
    pub fn to_physical(&self, viewport: &Viewport) -> Point {
        viewport.virtual_to_physical(*self)
    }
}

impl From<Point> for VirtualPoint {
    fn from(point: Point) -> Self {
        Self(point)
    }
}

/// An axis-aligned rectangle in virtual space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualRect(Rect);

impl Default for VirtualRect {
    fn default() -> Self {
        Self::ZERO
    }
}

impl VirtualRect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self(Rect::ZERO);

    /// Creates a rectangle from its top-left corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self(Rect::new(x, y, x + width, y + height))
    }

    #[inline]
    pub const fn left(&self) -> f64 {
        self.0.x0
    }

    #[inline]
    pub const fn top(&self) -> f64 {
        self.0.y0
    }

    #[inline]
    pub const fn right(&self) -> f64 {
        self.0.x1
    }

    #[inline]
    pub const fn bottom(&self) -> f64 {
        self.0.y1
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.0.width()
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.0.height()
    }

    #[inline]
    pub fn center_x(&self) -> f64 {
        self.0.center().x
    }

    #[inline]
    pub fn center_y(&self) -> f64 {
        self.0.center().y
    }

    /// Returns the raw kurbo rectangle in virtual space.
    #[inline]
    pub const fn rect(&self) -> Rect {
        self.0
    }

    /// Returns the rectangle translated into physical space.
    #[inline]
    pub fn to_physical(&self, viewport: &Viewport) -> Rect {
        self.0 - viewport.offset()
    }

    /// Grows the rectangle by `dx` on the left and right and `dy` on top and bottom.
    pub fn inflate(&self, dx: f64, dy: f64) -> Self {
        Self(self.0.inflate(dx, dy))
    }

    /// Returns `true` if the point lies inside or on the edge of the rectangle.
    #[inline]
    pub fn contains(&self, point: VirtualPoint) -> bool {
        self.contains_fuzzy(point, 0.0)
    }

    /// Like [`Self::contains`], with every edge pushed outwards by `fuzz`.
    pub fn contains_fuzzy(&self, point: VirtualPoint, fuzz: f64) -> bool {
        point.x() >= self.left() - fuzz
            && point.x() <= self.right() + fuzz
            && point.y() >= self.top() - fuzz
            && point.y() <= self.bottom() + fuzz
    }
}

/// A line segment in virtual space.
///
/// The extent accessors (`left`, `right`, `top`, `bottom`) are independent of
/// the order the end points were given in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualLine(Line);

impl Default for VirtualLine {
    fn default() -> Self {
        Self::ZERO
    }
}

impl VirtualLine {
    /// A degenerate line at the origin.
    pub const ZERO: Self = Self(Line {
        p0: Point::ZERO,
        p1: Point::ZERO,
    });

    /// Creates a segment between two virtual points.
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        Self(Line::new(p0, p1))
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.0.p0.x.min(self.0.p1.x)
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.0.p0.x.max(self.0.p1.x)
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.0.p0.y.min(self.0.p1.y)
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.0.p0.y.max(self.0.p1.y)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.right() - self.left()
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom() - self.top()
    }

    /// Returns the raw kurbo line in virtual space.
    #[inline]
    pub const fn line(&self) -> Line {
        self.0
    }

    /// Returns the segment translated into physical space.
    pub fn to_physical(&self, viewport: &Viewport) -> Line {
        let offset = viewport.offset();
        Line::new(self.0.p0 - offset, self.0.p1 - offset)
    }
}

/// Snaps a coordinate onto the centre of a device pixel so one pixel wide
/// strokes stay crisp.
#[inline]
pub fn snap(value: f64) -> f64 {
    value.round() - 0.5
}
