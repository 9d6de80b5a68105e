use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

use crate::core::ExtractError;

/// Text access to a document's pages.
pub trait PageSource {
    fn page_count(&self) -> Result<usize>;

    /// Plain text of a 0-based page.
    fn page_text(&self, page_idx: usize) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct PdfReader {
    path: PathBuf,
}

impl PdfReader {
    pub fn new(path: PathBuf) -> Result<Self> {
        if !path.is_file() {
            return Err(ExtractError::NotFound(path).into());
        }
        Ok(Self { path })
    }
}

impl PageSource for PdfReader {
    fn page_count(&self) -> Result<usize> {
        get_page_count(&self.path)
    }

    fn page_text(&self, page_idx: usize) -> Result<String> {
        let page_number = (page_idx + 1).to_string();
        let output = Command::new("pdftotext")
            .arg("-f")
            .arg(&page_number)
            .arg("-l")
            .arg(&page_number)
            .arg("-enc")
            .arg("UTF-8")
            .arg(&self.path)
            .arg("-")
            .output()
            .with_context(|| format!("failed to invoke pdftotext on {}", self.path.display()))?;

        if !output.status.success() {
            return Err(ExtractError::Tool {
                tool: "pdftotext",
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn get_page_count(pdf_path: &Path) -> Result<usize> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to invoke pdfinfo on {}", pdf_path.display()))?;

    if !output.status.success() {
        return Err(ExtractError::Tool {
            tool: "pdfinfo",
            message: format!(
                "{} ({})",
                String::from_utf8_lossy(&output.stderr).trim(),
                output.status
            ),
        }
        .into());
    }

    parse_page_count(&String::from_utf8_lossy(&output.stdout)).with_context(|| {
        format!(
            "pdfinfo output did not contain a 'Pages:' line for {}",
            pdf_path.display()
        )
    })
}

fn parse_page_count(info: &str) -> Result<usize> {
    for line in info.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            let num_str = rest.trim();
            let pages: usize = num_str.parse().with_context(|| {
                format!("failed to parse page count from 'Pages:' line: {num_str}")
            })?;
            return Ok(pages);
        }
    }
    anyhow::bail!("no 'Pages:' line")
}
