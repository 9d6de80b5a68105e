mod common;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use image::{Rgb, RgbImage};
use pretty_assertions::assert_eq;

use eicr_extract::core::model::{MainField, UNKNOWN, UNKNOWN_BOARD};
use eicr_extract::layout::TemplateLayout;
use eicr_extract::ocr::{OcrBlock, OcrEngine, OcrLine, OcrPage, OcrWord, Rasterizer};
use eicr_extract::parser::PageSource;
use eicr_extract::pipeline::{export_record, Extractor, ExtractorSettings, PipelineConfig};
use eicr_extract::table::{RawTable, TableDetector};
use eicr_extract::vision::ContourBoxDetector;

use common::FixturePage;

struct Pages(Vec<&'static str>);

impl PageSource for Pages {
    fn page_count(&self) -> Result<usize> {
        Ok(self.0.len())
    }

    fn page_text(&self, page_idx: usize) -> Result<String> {
        Ok(self.0[page_idx].to_string())
    }
}

/// At most one table per 1-based page.
#[derive(Default)]
struct Tables {
    pages: HashMap<usize, RawTable>,
}

impl Tables {
    fn with(mut self, page: usize, rows: &[&[&str]]) -> Self {
        self.pages.insert(
            page,
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        self
    }
}

impl TableDetector for Tables {
    fn detect(&self, _pdf_path: &Path, page_number: usize) -> Result<Vec<RawTable>> {
        Ok(self.pages.get(&page_number).cloned().into_iter().collect())
    }
}

/// Blank pages whose width encodes the page index, so the OCR double can
/// tell pages apart.
struct IndexedRenderer;

impl Rasterizer for IndexedRenderer {
    fn render_page(&self, _pdf_path: &Path, page_idx: usize, _zoom: f32) -> Result<RgbImage> {
        Ok(RgbImage::from_pixel(1000 + page_idx as u32, 1100, Rgb([255, 255, 255])))
    }
}

/// Fixed OCR lines per page index; other images read as empty.
struct ScriptedOcr(HashMap<usize, Vec<&'static str>>);

impl OcrEngine for ScriptedOcr {
    fn recognize(&self, image: &RgbImage) -> Result<OcrPage> {
        let page_idx = image.width().saturating_sub(1000) as usize;
        let lines = self.0.get(&page_idx).cloned().unwrap_or_default();
        Ok(OcrPage {
            blocks: vec![OcrBlock {
                lines: lines
                    .iter()
                    .map(|line| OcrLine {
                        words: line
                            .split_whitespace()
                            .map(|value| OcrWord {
                                value: value.to_string(),
                                confidence: 0.95,
                                bbox: None,
                            })
                            .collect(),
                    })
                    .collect(),
            }],
        })
    }
}

fn extractor(tables: Tables, ocr: Option<ScriptedOcr>) -> Extractor {
    Extractor::with_capabilities(
        TemplateLayout::default(),
        None,
        Box::new(IndexedRenderer),
        Box::new(tables),
        Box::new(ContourBoxDetector::default()),
        ocr.map(|ocr| Box::new(ocr) as Box<dyn OcrEngine>),
    )
}

#[test]
fn test_three_page_document_yields_one_board() -> Result<()> {
    let pages = Pages(vec![
        "SCHEDULE OF CIRCUIT DETAILS\nDB1",
        "SCHEDULE OF TEST RESULTS BoardX\n",
        "Observations and recommendations",
    ]);
    let tables = Tables::default()
        .with(1, &[&["Circuit number", "Circuit description"], &["1", "Lighting"], &["2", "Ring final"]])
        .with(2, &[&["Circuit number", "Zs (Ω)"], &["1", "0.62"], &["2", "0.48"], &["ENGINEER AND TEST INSTRUMENTS FOR DB1", ""]]);

    let record = extractor(tables, None).process_document(Path::new("report.pdf"), &pages)?;

    assert_eq!(record.boards.len(), 1);
    let board = &record.boards[0];
    assert_eq!(board.name, "BoardX");
    assert_eq!(board.supplied_from, UNKNOWN);
    let descriptions: Vec<_> = board
        .circuit_details
        .iter()
        .map(|row| row.get("Circuit description").unwrap_or_default())
        .collect();
    assert_eq!(descriptions, vec!["Lighting", "Ring final"]);
    assert_eq!(board.test_results.len(), 2);
    assert_eq!(board.test_results[1].get("Zs (Ω)"), Some("0.48"));

    Ok(())
}

#[test]
fn test_extra_circuit_page_still_yields_one_board() -> Result<()> {
    let pages = Pages(vec![
        "CIRCUIT DETAILS",
        "CIRCUIT DETAILS (continued)",
        "TEST RESULTS",
    ]);
    let tables = Tables::default();
    let extractor = extractor(tables, None);

    let record = extractor.process_document(Path::new("report.pdf"), &pages)?;

    assert_eq!(record.boards.len(), 1);
    assert_eq!(record.boards[0].name, UNKNOWN_BOARD);
    assert!(record.boards[0].circuit_details.is_empty());
    Ok(())
}

#[test]
fn test_multi_page_board_reads_every_page() -> Result<()> {
    let pages = Pages(vec![
        "cover",
        "CIRCUIT DETAILS",
        "more circuits",
        "TEST RESULTS Main CU",
        "more results",
    ]);
    let tables = Tables::default()
        .with(2, &[&["Ref", "Type"], &["1", "B"]])
        .with(3, &[&["Ref", "Type"], &["2", "C"]])
        .with(4, &[&["Ref", "Zs"], &["1", "0.3"]])
        .with(5, &[&["Ref", "Zs"], &["2", "0.4"]]);

    let record = extractor(tables, None).process_document(Path::new("report.pdf"), &pages)?;

    let board = &record.boards[0];
    assert_eq!(board.name, "Main CU");
    assert_eq!(board.circuit_details.len(), 2);
    assert_eq!(board.test_results.len(), 2);
    assert_eq!(board.test_results[1].get("Zs"), Some("0.4"));
    Ok(())
}

#[test]
fn test_ocr_fills_main_record_and_board_header() -> Result<()> {
    let pages = Pages(vec!["cover", "part 1", "CIRCUIT DETAILS", "TEST RESULTS DB-A"]);
    let mut ocr = HashMap::new();
    ocr.insert(
        0,
        vec![
            "REPORT No: EICR-0099",
            "And was deemed to be:",
            "UNSATISFACTORY",
            "Issued on",
            "02/02/2024",
        ],
    );
    ocr.insert(
        1,
        vec![
            "DETAILS OF THE CLIENT",
            "Client name",
            ":",
            "Acme Lettings",
            "REASONS FOR PRODUCING THIS REPORT",
            "Reasons for producing this report",
            ":",
            "Periodic inspection",
            "DETAILS OF THE INSTALLATION",
        ],
    );
    ocr.insert(
        2,
        vec![
            "DB name Garage CU",
            "Location Garage",
            "1",
            "Phase sequence confirmed",
            "House consumer unit",
            "Supply polarity confirmed",
        ],
    );

    let record = extractor(Tables::default(), Some(ScriptedOcr(ocr)))
        .process_document(Path::new("report.pdf"), &pages)?;

    let main = &record.eicr_main_record;
    assert_eq!(main.report_number(), Some("EICR-0099"));
    assert_eq!(main.value(MainField::OverallCondition), Some("UNSATISFACTORY"));
    assert_eq!(main.value(MainField::CreatedAt), Some("02/02/2024"));
    assert_eq!(main.value(MainField::ClientName), Some("Acme Lettings"));
    assert_eq!(main.get(MainField::ClientName).confidence, Some(0.95));
    assert_eq!(main.value(MainField::ReportReason), Some("Periodic inspection"));
    assert_eq!(main.value(MainField::InstallationPostcode), None);

    let board = &record.boards[0];
    assert_eq!(board.name, "Garage CU");
    assert_eq!(board.location, "Garage");
    assert_eq!(board.phases, "1");
    assert_eq!(board.supplied_from, "House consumer unit");
    Ok(())
}

#[test]
fn test_record_exports_under_report_number() -> Result<()> {
    let pages = Pages(vec!["cover"]);
    let mut ocr = HashMap::new();
    ocr.insert(0, vec!["REPORT No: EICR-1234"]);
    let record = extractor(Tables::default(), Some(ScriptedOcr(ocr)))
        .process_document(Path::new("visit.pdf"), &pages)?;

    let out = tempfile::tempdir()?;
    let config = PipelineConfig::new(PathBuf::from("visit.pdf"), out.path().to_path_buf(), true);
    let path = export_record(&record, &config)?;
    assert_eq!(path, out.path().join("EICR-1234_output.json"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(json["eicr_main_record"]["Report Number"]["value"], "EICR-1234");
    assert_eq!(json["eicr_main_record"]["Report Number"]["confidence"], 0.95);
    assert_eq!(json["Boards"], serde_json::json!([]));
    assert!(json["supply_characteristics"]["Earthing Arrangement"].is_null());
    Ok(())
}

fn poppler_available() -> bool {
    ["pdfinfo", "pdftotext", "pdftoppm"]
        .iter()
        .all(|tool| Command::new(tool).arg("-v").output().is_ok())
}

/// Integration test: synthetic ruled report through poppler, without OCR
#[test]
fn test_synthetic_report_with_poppler() -> Result<()> {
    // Skip if poppler is unavailable (CI environment)
    if !poppler_available() {
        eprintln!("Skipping test: poppler-utils not installed");
        return Ok(());
    }

    let dir = tempfile::tempdir()?;
    let pdf = dir.path().join("synthetic.pdf");
    common::create_report_pdf(
        &pdf,
        &[
            FixturePage {
                title: "SCHEDULE OF CIRCUIT DETAILS",
                table: &[&["Circuit number", "Description"], &["1", "Lighting"], &["2", "Sockets"]],
            },
            FixturePage {
                title: "SCHEDULE OF TEST RESULTS BoardX",
                table: &[&["Circuit number", "Zs"], &["1", "0.45"], &["2", "0.52"]],
            },
            FixturePage {
                title: "Observations and recommendations",
                table: &[],
            },
        ],
    )
    .expect("PDF fixture should be created");

    let record = Extractor::new(ExtractorSettings::default()).process(&pdf)?;

    assert_eq!(record.boards.len(), 1);
    let board = &record.boards[0];
    assert_eq!(board.name, "BoardX");
    assert_eq!(board.location, UNKNOWN);
    let descriptions: Vec<_> = board
        .circuit_details
        .iter()
        .map(|row| row.get("Description").unwrap_or_default())
        .collect();
    assert_eq!(descriptions, vec!["Lighting", "Sockets"]);
    assert_eq!(board.circuit_details[0].get("Circuit number"), Some("1"));
    let zs: Vec<_> = board
        .test_results
        .iter()
        .map(|row| row.get("Zs").unwrap_or_default())
        .collect();
    assert_eq!(zs, vec!["0.45", "0.52"]);
    assert!(record.eicr_main_record.report_number().is_none());
    assert!(record.supply_characteristics.earthing_arrangement.is_none());
    Ok(())
}
