use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::geometry::BBox;
use crate::core::ExtractError;

static WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<word xMin="([\d.]+)" yMin="([\d.]+)" xMax="([\d.]+)" yMax="([\d.]+)">(.*?)</word>"#)
        .expect("valid regex")
});

/// A word of embedded PDF text, in PDF points from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub bbox: BBox,
}

/// Words and their boxes on a 0-based page, via `pdftotext -bbox`.
pub fn extract_words(pdf_path: &Path, page_idx: usize) -> Result<Vec<Word>> {
    let page_number = (page_idx + 1).to_string();
    let output = Command::new("pdftotext")
        .arg("-bbox")
        .arg("-f")
        .arg(&page_number)
        .arg("-l")
        .arg(&page_number)
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to invoke pdftotext -bbox on {}", pdf_path.display()))?;

    if !output.status.success() {
        return Err(ExtractError::Tool {
            tool: "pdftotext",
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }

    Ok(parse_bbox_document(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_bbox_document(xhtml: &str) -> Vec<Word> {
    WORD_RE
        .captures_iter(xhtml)
        .map(|caps| Word {
            text: unescape(&caps[5]),
            bbox: BBox::new(
                number(&caps[1]),
                number(&caps[2]),
                number(&caps[3]),
                number(&caps[4]),
            ),
        })
        .filter(|word| !word.text.trim().is_empty())
        .collect()
}

fn number(text: &str) -> f32 {
    text.parse().unwrap_or(0.0)
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
