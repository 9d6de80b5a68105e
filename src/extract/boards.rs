//! Distribution boards: section pairing, circuit/test tables per board and
//! the OCR'd board header.

use std::path::Path;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::model::{BoardRecord, TableRow, UNKNOWN};
use crate::layout::{SectionMarkers, TableSettings};
use crate::ocr::layout_builder::line_texts;
use crate::ocr::{OcrEngine, Rasterizer};
use crate::parser::{scan_sections, BoardSection, PageSource};
use crate::table::{extract_table, TableDetector};

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("valid regex"));

const DB_NAME: &str = "DB name";
const LOCATION: &str = "Location";
const PHASE_SEQUENCE: &str = "Phase sequence confirmed";
const SUPPLY_POLARITY: &str = "Supply polarity confirmed";

/// Board header values read from the circuit-details page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardMetadata {
    pub name: Option<String>,
    pub location: Option<String>,
    pub phases: Option<String>,
    pub supplied_from: Option<String>,
}

pub struct BoardProcessor<'a> {
    pages: &'a dyn PageSource,
    tables: &'a dyn TableDetector,
    renderer: &'a dyn Rasterizer,
    ocr: Option<&'a dyn OcrEngine>,
    markers: &'a SectionMarkers,
    settings: &'a TableSettings,
}

impl<'a> BoardProcessor<'a> {
    pub fn new(
        pages: &'a dyn PageSource,
        tables: &'a dyn TableDetector,
        renderer: &'a dyn Rasterizer,
        ocr: Option<&'a dyn OcrEngine>,
        markers: &'a SectionMarkers,
        settings: &'a TableSettings,
    ) -> Self {
        Self {
            pages,
            tables,
            renderer,
            ocr,
            markers,
            settings,
        }
    }

    /// Every board with a complete circuit/test section pair, in document
    /// order. Only a failing page scan is an error.
    pub fn process(&self, pdf_path: &Path) -> Result<Vec<BoardRecord>> {
        let sections = scan_sections(self.pages, self.markers)?.sections();
        if sections.is_empty() {
            tracing::info!("no complete board sections found");
            return Ok(Vec::new());
        }
        tracing::info!(boards = sections.len(), "extracting boards");

        Ok(sections
            .iter()
            .map(|section| self.process_board(pdf_path, section))
            .collect())
    }

    fn process_board(&self, pdf_path: &Path, section: &BoardSection) -> BoardRecord {
        let (cd, tr) = (section.circuit_page, section.test_page);
        tracing::debug!(board = %section.name, circuit_page = cd, test_page = tr, "processing board");

        let circuit_details = self.collect_rows(pdf_path, &circuit_pages(cd, tr));
        let test_results = self.collect_rows(pdf_path, &test_pages(cd, tr));
        let metadata = self.read_metadata(pdf_path, cd);

        BoardRecord {
            name: metadata.name.unwrap_or_else(|| section.name.clone()),
            location: or_unknown(metadata.location),
            phases: or_unknown(metadata.phases),
            supplied_from: or_unknown(metadata.supplied_from),
            circuit_details,
            test_results,
        }
    }

    /// Rows of the first table on each page, concatenated. Pages without a
    /// usable table are skipped.
    fn collect_rows(&self, pdf_path: &Path, pages: &[usize]) -> Vec<TableRow> {
        let mut rows = Vec::new();
        for &page in pages {
            match extract_table(self.tables, pdf_path, page, 0, &self.settings.footer_marker) {
                Ok(Some(table)) => rows.extend(table.records()),
                Ok(None) => tracing::debug!(page, "no table on page"),
                Err(err) => tracing::debug!(page, error = %format!("{err:#}"), "skipping page"),
            }
        }
        rows
    }

    fn read_metadata(&self, pdf_path: &Path, page_number: usize) -> BoardMetadata {
        let Some(ocr) = self.ocr else {
            return BoardMetadata::default();
        };
        let recognized = self
            .renderer
            .render_page(pdf_path, page_number.saturating_sub(1), self.settings.zoom)
            .and_then(|image| ocr.recognize(&image));
        match recognized {
            Ok(page) => parse_board_metadata(&line_texts(&page.lines())),
            Err(err) => {
                tracing::warn!(page = page_number, error = %format!("{err:#}"), "board metadata unavailable");
                BoardMetadata::default()
            }
        }
    }
}

/// 1-based circuit-details pages of a board: every page up to its
/// test-results page.
pub fn circuit_pages(circuit_page: usize, test_page: usize) -> Vec<usize> {
    if test_page > circuit_page {
        (circuit_page..test_page).collect()
    } else {
        vec![circuit_page]
    }
}

/// 1-based test-results pages of a board, assumed to span as many pages as
/// its circuit details.
pub fn test_pages(circuit_page: usize, test_page: usize) -> Vec<usize> {
    if test_page > circuit_page {
        (test_page..test_page + (test_page - circuit_page)).collect()
    } else {
        vec![test_page]
    }
}

/// Reads the board header from OCR lines. Later matches overwrite earlier
/// ones; empty values count as missing.
pub fn parse_board_metadata<S: AsRef<str>>(lines: &[S]) -> BoardMetadata {
    let mut meta = BoardMetadata::default();

    for (idx, line) in lines.iter().enumerate() {
        let text = line.as_ref().trim();
        let previous = idx.checked_sub(1).map(|prev| lines[prev].as_ref());

        if text.starts_with(DB_NAME) {
            meta.name = non_empty(text.replace(DB_NAME, ""));
        }
        if text.starts_with(LOCATION) {
            meta.location = non_empty(text.replace(LOCATION, ""));
        }
        if text.contains(PHASE_SEQUENCE) {
            if let Some(caps) = previous.and_then(|prev| DIGITS.captures(prev)) {
                meta.phases = Some(caps[1].to_string());
            }
        }
        if text == SUPPLY_POLARITY {
            if let Some(prev) = previous {
                meta.supplied_from = non_empty(prev.to_string());
            }
        }
    }

    meta
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN.to_string())
}
