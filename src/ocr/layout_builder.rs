use crate::core::confidence::mean_confidence;
use crate::ocr::OcrPage;

/// One OCR line flattened to text, keeping its word confidences.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub word_confidences: Vec<f32>,
}

impl TextLine {
    pub fn confidence(&self) -> Option<f32> {
        mean_confidence(&self.word_confidences)
    }
}

pub fn build_lines(page: &OcrPage) -> Vec<TextLine> {
    page.blocks
        .iter()
        .flat_map(|block| block.lines.iter())
        .filter_map(|line| {
            let text = line
                .words
                .iter()
                .map(|w| w.value.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();
            if text.is_empty() {
                return None;
            }
            Some(TextLine {
                text,
                word_confidences: line.words.iter().map(|w| w.confidence).collect(),
            })
        })
        .collect()
}

/// Text of each line, for the token helpers.
pub fn line_texts(lines: &[TextLine]) -> Vec<String> {
    lines.iter().map(|line| line.text.clone()).collect()
}
