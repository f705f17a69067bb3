//! Logical coordinate space shared by the layout algorithm and its observers.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle; `top` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn from_size(top_left: Point, size: Size) -> Self {
        Self::new(top_left.x, top_left.y, size.width, size.height)
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.top + self.height / 2.0
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.left += dx;
        self.top += dy;
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }
}

/// An edge in the diagram logical coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: Point,
    pub to: Point,
}

impl Edge {
    pub fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Edge {
        Edge::new(
            Point::new(self.from.x + dx, self.from.y + dy),
            Point::new(self.to.x + dx, self.to.y + dy),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both_rects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(-5.0, 20.0, 10.0, 5.0);
        let u = a.union(&b);
        assert_eq!(u.left, -5.0);
        assert_eq!(u.top, 0.0);
        assert_eq!(u.right(), 10.0);
        assert_eq!(u.bottom(), 25.0);
    }

    #[test]
    fn translated_edge_keeps_length() {
        let edge = Edge::new(Point::new(1.0, 2.0), Point::new(4.0, 6.0));
        let moved = edge.translate(10.0, -2.0);
        assert_eq!(moved.from, Point::new(11.0, 0.0));
        assert_eq!(moved.to.x - moved.from.x, edge.to.x - edge.from.x);
        assert_eq!(moved.to.y - moved.from.y, edge.to.y - edge.from.y);
    }
}
