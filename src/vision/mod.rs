pub mod checkbox;
pub mod template;

pub use checkbox::{BoxDetector, BoxDetectorConfig, ContourBoxDetector};
pub use template::{best_match, TemplateMatch};

use image::{imageops, GrayImage, RgbImage};

use crate::core::geometry::Rect;

/// Copies `rect` out of `page`, clamped to the page bounds.
pub fn crop(page: &RgbImage, rect: &Rect) -> RgbImage {
    imageops::crop_imm(page, rect.x, rect.y, rect.width, rect.height).to_image()
}

pub fn crop_gray(page: &RgbImage, rect: &Rect) -> GrayImage {
    imageops::grayscale(&crop(page, rect))
}
