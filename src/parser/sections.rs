use anyhow::Result;
use regex::Regex;

use crate::core::model::UNKNOWN_BOARD;
use crate::layout::SectionMarkers;
use crate::parser::pdf_reader::PageSource;

/// Marker positions found by a full-document scan. Page numbers are 1-based.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionScan {
    pub circuit_pages: Vec<usize>,
    pub test_pages: Vec<usize>,
    /// One name per test-results page, in the same order.
    pub board_names: Vec<String>,
}

/// A board's circuit-details and test-results pages (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSection {
    pub name: String,
    pub circuit_page: usize,
    pub test_page: usize,
}

impl SectionScan {
    /// Pairs the i-th circuit page, test page and board name.
    ///
    /// Pairing stops at the shortest of the three sequences; surplus
    /// markers are dropped rather than reported as an error.
    pub fn sections(&self) -> Vec<BoardSection> {
        let count = self
            .board_names
            .len()
            .min(self.circuit_pages.len())
            .min(self.test_pages.len());

        if count < self.circuit_pages.len().max(self.test_pages.len()) {
            tracing::warn!(
                circuit_pages = self.circuit_pages.len(),
                test_pages = self.test_pages.len(),
                paired = count,
                "section markers do not pair up; unpaired boards are dropped"
            );
        }

        (0..count)
            .map(|idx| BoardSection {
                name: self.board_names[idx].clone(),
                circuit_page: self.circuit_pages[idx],
                test_page: self.test_pages[idx],
            })
            .collect()
    }
}

pub fn scan_sections(pages: &dyn PageSource, markers: &SectionMarkers) -> Result<SectionScan> {
    let name_re = board_name_regex(&markers.test_results)?;
    let mut scan = SectionScan::default();

    for page_idx in 0..pages.page_count()? {
        let text = pages.page_text(page_idx)?;
        if text.contains(&markers.circuit_details) {
            scan.circuit_pages.push(page_idx + 1);
        }
        if text.contains(&markers.test_results) {
            scan.test_pages.push(page_idx + 1);
            scan.board_names
                .push(board_name(&text, &markers.test_results, &name_re));
        }
    }

    tracing::info!(
        circuit_pages = ?scan.circuit_pages,
        test_pages = ?scan.test_pages,
        "scanned board sections"
    );
    Ok(scan)
}

fn board_name_regex(marker: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("(?i){}(.*)", regex::escape(marker)))?)
}

/// Text after the marker on the first marker line that has any.
fn board_name(page_text: &str, marker: &str, name_re: &Regex) -> String {
    page_text
        .lines()
        .filter(|line| line.contains(marker))
        .filter_map(|line| name_re.captures(line))
        .map(|caps| caps[1].trim().to_string())
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_else(|| UNKNOWN_BOARD.to_string())
}

/// First 0-based page containing every one of `markers`.
pub fn find_page_with_all(pages: &dyn PageSource, markers: &[String]) -> Result<Option<usize>> {
    for page_idx in 0..pages.page_count()? {
        let text = pages.page_text(page_idx)?;
        if markers.iter().all(|marker| text.contains(marker.as_str())) {
            return Ok(Some(page_idx));
        }
    }
    Ok(None)
}
