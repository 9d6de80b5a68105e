use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use image::RgbImage;

use crate::core::ExtractError;

/// PDF pages render at 72 DPI at zoom 1.0.
const BASE_DPI: f32 = 72.0;

/// Renders PDF pages to RGB rasters.
pub trait Rasterizer {
    fn render_page(&self, pdf_path: &Path, page_idx: usize, zoom: f32) -> Result<RgbImage>;
}

/// Renders through poppler's `pdftoppm` into a scoped temporary directory.
#[derive(Debug, Clone, Default)]
pub struct PageRenderer;

impl PageRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Rasterizer for PageRenderer {
    fn render_page(&self, pdf_path: &Path, page_idx: usize, zoom: f32) -> Result<RgbImage> {
        let out_dir = tempfile::Builder::new().prefix("eicr-render-").tempdir()?;

        // pdftoppm uses 1-based page indices
        let page_number = page_idx + 1;
        let prefix = out_dir.path().join(format!("page_{page_number:03}"));
        let dpi = (BASE_DPI * zoom).round().max(1.0) as u32;

        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .with_context(|| "failed to invoke pdftoppm; is poppler-utils installed?")?;

        let render_error = |message: String| ExtractError::Render {
            path: pdf_path.to_path_buf(),
            page: page_idx,
            message,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(render_error(format!("pdftoppm exited with {}: {stderr}", output.status)).into());
        }

        // -singlefile writes `<prefix>.png`
        let image_path = prefix.with_extension("png");
        if !image_path.exists() {
            return Err(render_error(format!(
                "expected rendered image not found: {}",
                image_path.display()
            ))
            .into());
        }

        let image = image::open(&image_path)
            .with_context(|| format!("failed to decode {}", image_path.display()))?
            .to_rgb8();
        tracing::debug!(
            page = page_idx,
            dpi,
            width = image.width(),
            height = image.height(),
            "rendered page"
        );
        Ok(image)
    }
}
