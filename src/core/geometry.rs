use serde::{Deserialize, Serialize};

/// Default pixel tolerance when matching detected marks against a
/// template's reference positions.
pub const DEFAULT_TOLERANCE: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self {
            x0: self.x0 * factor,
            y0: self.y0 * factor,
            x1: self.x1 * factor,
            y1: self.y1 * factor,
        }
    }
}

/// Pixel rectangle on a rendered page, `(x, y)` being the top-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    fn within(&self, other: &Point, tolerance: u32) -> bool {
        self.x.abs_diff(other.x) <= tolerance && self.y.abs_diff(other.y) <= tolerance
    }
}

/// Indices of `reference` points that have no detected point within
/// `tolerance` on both axes, in reference order.
pub fn find_missing_reference(reference: &[Point], detected: &[Point], tolerance: u32) -> Vec<usize> {
    reference
        .iter()
        .enumerate()
        .filter(|(_, r)| !detected.iter().any(|d| d.within(r, tolerance)))
        .map(|(idx, _)| idx)
        .collect()
}

/// Single-axis variant of [`find_missing_reference`].
pub fn find_missing_positions(reference: &[u32], detected: &[u32], tolerance: u32) -> Vec<usize> {
    reference
        .iter()
        .enumerate()
        .filter(|(_, r)| !detected.iter().any(|d| d.abs_diff(**r) <= tolerance))
        .map(|(idx, _)| idx)
        .collect()
}

/// Picks the selected option of an exclusive checkbox group.
///
/// Marked boxes are not reported by the box detector, so the selected
/// option is the first reference position with no detection near it. If the
/// detector ever starts reporting marked boxes instead, this silently picks
/// an unmarked option.
pub fn resolve_exclusive_choice(reference: &[Point], detected: &[Point], tolerance: u32) -> Option<usize> {
    find_missing_reference(reference, detected, tolerance)
        .first()
        .copied()
}

/// Single-axis variant of [`resolve_exclusive_choice`].
pub fn resolve_exclusive_position(reference: &[u32], detected: &[u32], tolerance: u32) -> Option<usize> {
    find_missing_positions(reference, detected, tolerance)
        .first()
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid() -> Vec<Point> {
        vec![
            Point::new(76, 149),
            Point::new(175, 149),
            Point::new(76, 194),
            Point::new(76, 240),
        ]
    }

    #[test]
    fn nothing_missing_when_all_detected() {
        let reference = grid();
        assert!(find_missing_reference(&reference, &reference, DEFAULT_TOLERANCE).is_empty());
    }

    #[test]
    fn everything_missing_without_detections() {
        let reference = grid();
        assert_eq!(
            find_missing_reference(&reference, &[], DEFAULT_TOLERANCE),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn tolerance_applies_to_both_axes() {
        let reference = grid();
        let detected = vec![
            Point::new(79, 146),
            Point::new(175, 154),
            Point::new(72, 194),
            Point::new(76, 240),
        ];
        assert_eq!(
            find_missing_reference(&reference, &detected, DEFAULT_TOLERANCE),
            vec![1]
        );
    }

    #[test]
    fn exclusive_choice_is_first_unmatched() {
        let reference = grid();
        let detected = vec![Point::new(76, 149), Point::new(76, 240)];
        assert_eq!(
            resolve_exclusive_choice(&reference, &detected, DEFAULT_TOLERANCE),
            Some(1)
        );
        assert_eq!(
            resolve_exclusive_choice(&reference, &reference, DEFAULT_TOLERANCE),
            None
        );
    }

    #[test]
    fn single_axis_choice() {
        let reference = [98, 145, 190, 235, 281];
        let detected = [97, 146, 236, 283];
        assert_eq!(
            resolve_exclusive_position(&reference, &detected, DEFAULT_TOLERANCE),
            Some(2)
        );
    }
}
