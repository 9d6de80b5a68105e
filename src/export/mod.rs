pub mod json_export;

use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::EicrRecord;

pub use json_export::JsonExporter;

pub trait Exporter {
    /// Writes `record` under `name` and returns the written path.
    fn export(&self, record: &EicrRecord, name: &str) -> Result<PathBuf>;
}
