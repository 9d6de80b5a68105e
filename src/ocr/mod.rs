pub mod bridge;
pub mod layout_builder;
pub mod renderer;

pub use bridge::{BridgeOcrEngine, OcrSettings};
pub use layout_builder::TextLine;
pub use renderer::{PageRenderer, Rasterizer};

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::core::confidence::round2;

/// Recognizes text in a raster image.
pub trait OcrEngine {
    fn recognize(&self, image: &RgbImage) -> Result<OcrPage>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OcrPage {
    #[serde(default)]
    pub blocks: Vec<OcrBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OcrBlock {
    #[serde(default)]
    pub lines: Vec<OcrLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OcrLine {
    #[serde(default)]
    pub words: Vec<OcrWord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrWord {
    pub value: String,
    pub confidence: f32,
    /// Relative `[x0, y0, x1, y1]` page geometry.
    #[serde(default)]
    pub bbox: Option<[f32; 4]>,
}

impl OcrPage {
    /// Non-empty text lines in block order.
    pub fn lines(&self) -> Vec<TextLine> {
        layout_builder::build_lines(self)
    }

    /// Confidence of the first word whose text equals `word`.
    pub fn word_confidence(&self, word: &str) -> Option<f32> {
        self.blocks
            .iter()
            .flat_map(|block| block.lines.iter())
            .flat_map(|line| line.words.iter())
            .find(|w| w.value.trim() == word)
            .map(|w| round2(w.confidence))
    }
}
