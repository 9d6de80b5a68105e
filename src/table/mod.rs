pub mod clean;
pub mod lattice;

pub use clean::{clean_table, make_unique, RawTable, Table};
pub use lattice::LatticeTableDetector;

use std::path::Path;

use anyhow::Result;

use crate::core::ExtractError;

/// Locates tables on a PDF page.
pub trait TableDetector {
    /// Raw cell grids of every table on a 1-based page, top to bottom.
    fn detect(&self, pdf_path: &Path, page_number: usize) -> Result<Vec<RawTable>>;
}

/// Detects and cleans table `table_index` of a 1-based page.
///
/// `Ok(None)` means the page has no tables at all; a table without a usable
/// header row is [`ExtractError::NoHeaderFound`] and an index past the last
/// table is [`ExtractError::IndexOutOfRange`].
pub fn extract_table(
    detector: &dyn TableDetector,
    pdf_path: &Path,
    page_number: usize,
    table_index: usize,
    footer_marker: &str,
) -> Result<Option<Table>> {
    let tables = detector.detect(pdf_path, page_number)?;
    if tables.is_empty() {
        return Ok(None);
    }
    let raw = tables.get(table_index).ok_or(ExtractError::IndexOutOfRange {
        index: table_index,
        count: tables.len(),
    })?;
    Ok(Some(clean_table(raw, footer_marker)?))
}
