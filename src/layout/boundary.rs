use crate::chart_box::BoxId;
use crate::geometry::Rect;

/// One vertical run of a boundary profile: the edge sits at `x` between
/// `top` and `bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryStep {
    pub node: BoxId,
    pub x: f32,
    pub top: f32,
    pub bottom: f32,
}

impl BoundaryStep {
    fn overlaps(&self, other: &BoundaryStep) -> bool {
        self.top < other.bottom && other.top < self.bottom
    }
}

/// Left and right outline of a laid-out branch, used to keep sibling
/// branches from colliding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundary {
    pub left: Vec<BoundaryStep>,
    pub right: Vec<BoundaryStep>,
}

impl Boundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(node: BoxId, rect: &Rect) -> Self {
        let mut boundary = Self::new();
        boundary.add_rect(node, rect);
        boundary
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Zero-height rectangles occupy no vertical range and are skipped.
    pub fn add_rect(&mut self, node: BoxId, rect: &Rect) {
        if rect.height <= 0.0 {
            return;
        }
        self.left.push(BoundaryStep {
            node,
            x: rect.left,
            top: rect.top,
            bottom: rect.bottom(),
        });
        self.right.push(BoundaryStep {
            node,
            x: rect.right(),
            top: rect.top,
            bottom: rect.bottom(),
        });
    }

    pub fn merge(&mut self, other: &Boundary) {
        self.left.extend_from_slice(&other.left);
        self.right.extend_from_slice(&other.right);
    }

    pub fn translate(&mut self, dx: f32) {
        for step in self.left.iter_mut().chain(self.right.iter_mut()) {
            step.x += dx;
        }
    }

    /// Horizontal shift that puts `other` exactly `spacing` to the right of
    /// this boundary wherever the two share a vertical range.
    ///
    /// Returns `None` if they never overlap vertically.
    pub fn required_shift(&self, other: &Boundary, spacing: f32) -> Option<f32> {
        let mut shift: Option<f32> = None;
        for right in &self.right {
            for left in &other.left {
                if right.overlaps(left) {
                    let needed = right.x + spacing - left.x;
                    shift = Some(shift.map_or(needed, |s| s.max(needed)));
                }
            }
        }
        shift
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        let mut steps = self.left.iter().chain(self.right.iter());
        let first = steps.next()?;
        let mut rect = Rect::new(first.x, first.top, 0.0, first.bottom - first.top);
        for step in steps {
            rect = rect.union(&Rect::new(step.x, step.top, 0.0, step.bottom - step.top));
        }
        Some(rect)
    }
}
