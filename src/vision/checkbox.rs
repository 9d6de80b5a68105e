use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use serde::{Deserialize, Serialize};

use crate::core::geometry::Rect;

/// Pixels skipped inside a hole's traced edge when measuring its ink.
const INTERIOR_INSET: u32 = 1;

/// Size and shape limits for checkbox candidates, in crop pixels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoxDetectorConfig {
    pub width_range: (u32, u32),
    pub height_range: (u32, u32),
    pub scaling_factors: Vec<f32>,
    pub wh_ratio_range: (f32, f32),
    /// Pixels darker than this are ink.
    pub ink_threshold: u8,
    /// Minimum interior-to-box area ratio for a box to count as empty.
    pub min_hollowness: f32,
    /// Ink fraction inside the interior above which a box counts as marked.
    pub max_interior_ink: f32,
}

impl Default for BoxDetectorConfig {
    fn default() -> Self {
        Self {
            width_range: (10, 20),
            height_range: (10, 20),
            scaling_factors: vec![0.7, 1.0, 1.3],
            wh_ratio_range: (0.8, 1.2),
            ink_threshold: 160,
            min_hollowness: 0.5,
            max_interior_ink: 0.04,
        }
    }
}

impl BoxDetectorConfig {
    fn scale_bounds(&self) -> (f32, f32) {
        let min = self
            .scaling_factors
            .iter()
            .copied()
            .fold(f32::INFINITY, f32::min);
        let max = self
            .scaling_factors
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        if min.is_finite() && max.is_finite() {
            (min, max)
        } else {
            (1.0, 1.0)
        }
    }

    fn accepts(&self, rect: &Rect) -> bool {
        let (min_scale, max_scale) = self.scale_bounds();
        let within = |value: u32, (lo, hi): (u32, u32)| {
            let value = value as f32;
            value >= lo as f32 * min_scale && value <= hi as f32 * max_scale
        };
        if !within(rect.width, self.width_range) || !within(rect.height, self.height_range) {
            return false;
        }
        let ratio = rect.width as f32 / rect.height.max(1) as f32;
        ratio >= self.wh_ratio_range.0 && ratio <= self.wh_ratio_range.1
    }
}

/// Finds empty checkboxes in a rendered crop.
pub trait BoxDetector {
    /// Empty boxes in reading order (top to bottom, then left to right).
    fn detect(&self, crop: &GrayImage) -> Vec<Rect>;
}

#[derive(Debug, Clone, Default)]
pub struct ContourBoxDetector {
    config: BoxDetectorConfig,
}

impl ContourBoxDetector {
    pub fn new(config: BoxDetectorConfig) -> Self {
        Self { config }
    }

    fn binarize(&self, crop: &GrayImage) -> GrayImage {
        let threshold = self.config.ink_threshold;
        GrayImage::from_fn(crop.width(), crop.height(), |x, y| {
            if crop.get_pixel(x, y)[0] < threshold {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    fn is_empty_box(
        &self,
        binary: &GrayImage,
        contours: &[Contour<u32>],
        outer_idx: usize,
        outer: &Rect,
    ) -> bool {
        let outer_area = (outer.width * outer.height) as f32;
        contours
            .iter()
            .filter(|c| c.parent == Some(outer_idx) && c.border_type == BorderType::Hole)
            .filter_map(|c| bounds(c))
            .filter(|hole| (hole.width * hole.height) as f32 >= self.config.min_hollowness * outer_area)
            .any(|hole| interior_ink(binary, &hole) <= self.config.max_interior_ink)
    }
}

/// Fraction of ink pixels strictly inside a hole's traced edge.
fn interior_ink(binary: &GrayImage, hole: &Rect) -> f32 {
    let inset = INTERIOR_INSET + 1;
    if hole.width <= 2 * inset || hole.height <= 2 * inset {
        return 0.0;
    }
    let (x0, y0) = (hole.x + inset, hole.y + inset);
    let (x1, y1) = (hole.x + hole.width - inset, hole.y + hole.height - inset);
    let total = (x1 - x0) * (y1 - y0);
    let ink = (y0..y1)
        .flat_map(|y| (x0..x1).map(move |x| (x, y)))
        .filter(|&(x, y)| binary.get_pixel(x, y)[0] > 0)
        .count();
    ink as f32 / total as f32
}

impl BoxDetector for ContourBoxDetector {
    fn detect(&self, crop: &GrayImage) -> Vec<Rect> {
        let binary = self.binarize(crop);
        let contours = find_contours::<u32>(&binary);

        let mut boxes: Vec<Rect> = contours
            .iter()
            .enumerate()
            .filter(|(_, c)| c.border_type == BorderType::Outer)
            .filter_map(|(idx, c)| bounds(c).map(|rect| (idx, rect)))
            .filter(|(_, rect)| self.config.accepts(rect))
            .filter(|(idx, rect)| self.is_empty_box(&binary, &contours, *idx, rect))
            .map(|(_, rect)| rect)
            .collect();

        boxes.sort_by_key(|rect| (rect.y, rect.x));
        boxes
    }
}

fn bounds(contour: &Contour<u32>) -> Option<Rect> {
    let first = contour.points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for point in &contour.points {
        x0 = x0.min(point.x);
        y0 = y0.min(point.y);
        x1 = x1.max(point.x);
        y1 = y1.max(point.y);
    }
    Some(Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}
