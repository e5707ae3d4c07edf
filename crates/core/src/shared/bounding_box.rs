/// Axis-aligned face rectangle in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from corner coordinates `[x1, y1, x2, y2]`.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, (x2 - x1).max(0.0), (y2 - y1).max(0.0))
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Maps the box from one surface size to another.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    /// Intersection with the `[0, width) x [0, height)` surface.
    pub fn clamped(&self, width: f64, height: f64) -> Self {
        let x1 = self.x.clamp(0.0, width);
        let y1 = self.y.clamp(0.0, height);
        let x2 = self.right().clamp(0.0, width);
        let y2 = self.bottom().clamp(0.0, height);
        Self::from_corners(x1, y1, x2, y2)
    }

    /// Intersection-over-union. Degenerate boxes yield 0.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_from_corners() {
        let b = BoundingBox::from_corners(10.0, 20.0, 40.0, 80.0);
        assert_eq!(b, BoundingBox::new(10.0, 20.0, 30.0, 60.0));
    }

    #[test]
    fn test_scaled() {
        let b = BoundingBox::new(10.0, 10.0, 20.0, 40.0).scaled(2.0, 0.5);
        assert_eq!(b, BoundingBox::new(20.0, 5.0, 40.0, 20.0));
    }

    #[test]
    fn test_clamped_to_surface() {
        let b = BoundingBox::new(-10.0, 90.0, 30.0, 30.0).clamped(100.0, 100.0);
        assert_eq!(b, BoundingBox::new(0.0, 90.0, 20.0, 10.0));
    }

    #[test]
    fn test_iou_identical() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert_relative_eq!(b.iou(&b), 1.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);
        // inter = 50, union = 150
        assert_relative_eq!(a.iou(&b), 1.0 / 3.0);
    }

    #[rstest]
    #[case::disjoint(BoundingBox::new(20.0, 20.0, 5.0, 5.0))]
    #[case::zero_width(BoundingBox::new(0.0, 0.0, 0.0, 10.0))]
    #[case::touching_edge(BoundingBox::new(10.0, 0.0, 10.0, 10.0))]
    fn test_iou_no_overlap(#[case] other: BoundingBox) {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&other), 0.0);
    }
}
