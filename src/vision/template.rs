use image::GrayImage;

use crate::core::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    /// Zero-mean normalized cross-correlation in `[-1, 1]`.
    pub score: f32,
    /// Top-left corner of the best window.
    pub location: Point,
}

/// Slides `template` over `image` and returns the window with the highest
/// zero-mean normalized cross-correlation.
///
/// Returns `None` when the template does not fit inside the image or has no
/// contrast. Flat image windows score zero.
pub fn best_match(image: &GrayImage, template: &GrayImage) -> Option<TemplateMatch> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }

    let n = f64::from(tw * th);
    let t_mean = template.pixels().map(|p| f64::from(p[0])).sum::<f64>() / n;
    let centered: Vec<f64> = template.pixels().map(|p| f64::from(p[0]) - t_mean).collect();
    let t_norm = centered.iter().map(|v| v * v).sum::<f64>().sqrt();
    if t_norm == 0.0 {
        return None;
    }

    let sums = IntegralImage::new(image);
    let mut best: Option<TemplateMatch> = None;

    for y in 0..=(ih - th) {
        for x in 0..=(iw - tw) {
            let (sum, sum_sq) = sums.window(x, y, tw, th);
            let variance = sum_sq - sum * sum / n;
            let score = if variance <= f64::EPSILON {
                0.0
            } else {
                let mut cross = 0.0;
                for ty in 0..th {
                    let row = (ty * tw) as usize;
                    for tx in 0..tw {
                        let pixel = f64::from(image.get_pixel(x + tx, y + ty)[0]);
                        cross += pixel * centered[row + tx as usize];
                    }
                }
                cross / (variance.sqrt() * t_norm)
            };

            let score = score as f32;
            if best.map_or(true, |b| score > b.score) {
                best = Some(TemplateMatch {
                    score,
                    location: Point::new(x, y),
                });
            }
        }
    }

    best
}

/// Summed-area tables of pixel values and squared pixel values.
struct IntegralImage {
    width: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl IntegralImage {
    fn new(image: &GrayImage) -> Self {
        let width = image.width() as usize + 1;
        let height = image.height() as usize + 1;
        let mut sum = vec![0.0; width * height];
        let mut sum_sq = vec![0.0; width * height];

        for y in 1..height {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 1..width {
                let v = f64::from(image.get_pixel(x as u32 - 1, y as u32 - 1)[0]);
                row += v;
                row_sq += v * v;
                sum[y * width + x] = sum[(y - 1) * width + x] + row;
                sum_sq[y * width + x] = sum_sq[(y - 1) * width + x] + row_sq;
            }
        }

        Self { width, sum, sum_sq }
    }

    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let at = |table: &[f64], xx: usize, yy: usize| table[yy * self.width + xx];
        let area = |table: &[f64]| at(table, x1, y1) - at(table, x0, y1) - at(table, x1, y0) + at(table, x0, y0);
        (area(&self.sum), area(&self.sum_sq))
    }
}
