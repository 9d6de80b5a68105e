use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{tool} failed: {message}")]
    Tool { tool: &'static str, message: String },

    #[error("failed to render page {page} of {path}: {message}")]
    Render {
        path: PathBuf,
        page: usize,
        message: String,
    },

    #[error("no suitable header row found")]
    NoHeaderFound,

    #[error("table index {index} out of range ({count} table(s) detected)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("invalid layout file {path}: {message}")]
    Layout { path: PathBuf, message: String },

    #[error("OCR engine unavailable: {0}")]
    Ocr(String),
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
