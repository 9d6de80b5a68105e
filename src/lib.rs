pub mod core;
pub mod export;
pub mod extract;
pub mod layout;
pub mod ocr;
pub mod parser;
pub mod pipeline;
pub mod table;
pub mod vision;

pub use core::model::{BoardRecord, EicrRecord, MainRecord};
pub use core::{ExtractError, ExtractResult};
pub use pipeline::{Extractor, ExtractorSettings};
