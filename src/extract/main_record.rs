//! Report header fields from the first pages, read by declarative
//! anchor/offset rules over OCR lines.

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

use regex::Regex;

use crate::core::model::{FieldRecord, MainField, MainRecord};
use crate::layout::{MainRecordRules, Zone, ZoneMarkers};
use crate::ocr::{OcrEngine, OcrPage, Rasterizer, TextLine};

pub struct MainRecordParser<'a> {
    renderer: &'a dyn Rasterizer,
    ocr: Option<&'a dyn OcrEngine>,
    rules: &'a MainRecordRules,
}

impl<'a> MainRecordParser<'a> {
    pub fn new(
        renderer: &'a dyn Rasterizer,
        ocr: Option<&'a dyn OcrEngine>,
        rules: &'a MainRecordRules,
    ) -> Self {
        Self {
            renderer,
            ocr,
            rules,
        }
    }

    /// OCRs the pages the rules refer to and applies the rules. Pages that
    /// cannot be rendered or recognized leave their fields empty.
    pub fn parse(&self, pdf_path: &Path) -> MainRecord {
        let Some(ocr) = self.ocr else {
            tracing::warn!("OCR disabled; main record fields left empty");
            return MainRecord::default();
        };

        let mut pages = HashMap::new();
        for page_idx in self.rules.pages() {
            let recognized = self
                .renderer
                .render_page(pdf_path, page_idx, self.rules.zoom)
                .and_then(|image| ocr.recognize(&image));
            match recognized {
                Ok(page) => {
                    pages.insert(page_idx, page);
                }
                Err(err) => {
                    tracing::warn!(page = page_idx, error = %format!("{err:#}"), "main record page unavailable");
                }
            }
        }

        parse_main_record(&pages, self.rules)
    }
}

struct PageLines {
    lines: Vec<TextLine>,
    zones: HashMap<Zone, Range<usize>>,
}

pub fn parse_main_record(pages: &HashMap<usize, OcrPage>, rules: &MainRecordRules) -> MainRecord {
    let mut record = MainRecord::default();

    let prepared: HashMap<usize, PageLines> = pages
        .iter()
        .map(|(idx, page)| {
            let lines = page.lines();
            let zones = locate_zones(&lines, &rules.zone_markers);
            (*idx, PageLines { lines, zones })
        })
        .collect();

    if let Some(page) = pages.get(&rules.report.page) {
        match Regex::new(&rules.report.pattern) {
            Ok(pattern) => {
                if let Some(field) = read_report_number(page, &prepared[&rules.report.page].lines, &pattern) {
                    record.set(MainField::ReportNumber, field);
                }
            }
            Err(err) => tracing::warn!(error = %err, "invalid report number pattern"),
        }
    }

    for rule in &rules.rules {
        let Some(page) = prepared.get(&rule.page) else {
            continue;
        };
        let range = match rule.zone {
            None => 0..page.lines.len(),
            Some(zone) => match page.zones.get(&zone) {
                Some(range) => range.clone(),
                None => continue,
            },
        };

        for idx in range {
            if !rule.matches(&page.lines[idx].text) {
                continue;
            }
            if let Some(target) = page.lines.get(idx + rule.offset) {
                record.set(
                    rule.field,
                    FieldRecord::new(target.text.clone(), target.confidence()),
                );
            }
        }
    }

    record
}

/// Last report-number match on the page; its confidence is that of the
/// first OCR word equal to the number's first token.
fn read_report_number(page: &OcrPage, lines: &[TextLine], pattern: &Regex) -> Option<FieldRecord> {
    lines
        .iter()
        .filter_map(|line| pattern.captures(&line.text))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .last()
        .map(|value| {
            let confidence = value
                .split_whitespace()
                .next()
                .and_then(|first| page.word_confidence(first));
            FieldRecord::new(value, confidence)
        })
}

/// Line ranges of each zone. A zone runs from the last line containing its
/// marker to the next zone's marker; both must be present. The final zone
/// runs to the end of the page.
fn locate_zones(lines: &[TextLine], markers: &ZoneMarkers) -> HashMap<Zone, Range<usize>> {
    let starts: Vec<Option<usize>> = Zone::ALL
        .iter()
        .map(|zone| {
            let marker = markers.marker(*zone).to_uppercase();
            lines
                .iter()
                .rposition(|line| line.text.to_uppercase().contains(&marker))
        })
        .collect();

    let mut zones = HashMap::new();
    for (idx, zone) in Zone::ALL.iter().enumerate() {
        let Some(start) = starts[idx] else {
            continue;
        };
        let end = match starts.get(idx + 1) {
            Some(Some(next)) => *next,
            Some(None) => continue,
            None => lines.len(),
        };
        zones.insert(*zone, start..end.max(start));
    }
    zones
}
