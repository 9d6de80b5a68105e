use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use image::GrayImage;

use crate::core::model::EicrRecord;
use crate::export::{Exporter, JsonExporter};
use crate::extract::{BoardProcessor, MainRecordParser, SupplyExtractor};
use crate::layout::TemplateLayout;
use crate::ocr::{BridgeOcrEngine, OcrEngine, OcrSettings, PageRenderer, Rasterizer};
use crate::parser::{find_page_with_all, PageSource, PdfReader};
use crate::table::{LatticeTableDetector, TableDetector};
use crate::vision::{BoxDetector, ContourBoxDetector};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub quiet: bool,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output: PathBuf, quiet: bool) -> Self {
        Self {
            input,
            output,
            quiet,
        }
    }
}

/// Everything an [`Extractor`] needs besides the document itself.
#[derive(Debug, Clone, Default)]
pub struct ExtractorSettings {
    pub layout: TemplateLayout,
    /// Tick image for the polarity and means-of-earthing matches.
    pub template_image: Option<PathBuf>,
    /// `None` disables OCR; OCR-derived fields are then left empty.
    pub ocr: Option<OcrSettings>,
}

impl ExtractorSettings {
    /// Default layout, optionally overridden from a JSON file.
    pub fn load(
        layout_path: Option<&Path>,
        template_image: Option<PathBuf>,
        ocr: Option<OcrSettings>,
    ) -> Result<Self> {
        let layout = match layout_path {
            Some(path) => TemplateLayout::from_file(path)
                .with_context(|| format!("failed to load layout: {}", path.display()))?,
            None => TemplateLayout::default(),
        };
        Ok(Self {
            layout,
            template_image,
            ocr,
        })
    }
}

/// Extracts [`EicrRecord`]s from report PDFs.
///
/// One extractor can process many documents; its OCR engine is started on
/// first use and shared by all of them.
pub struct Extractor {
    layout: TemplateLayout,
    template: Option<GrayImage>,
    renderer: Box<dyn Rasterizer>,
    tables: Box<dyn TableDetector>,
    boxes: Box<dyn BoxDetector>,
    ocr: Option<Box<dyn OcrEngine>>,
}

impl Extractor {
    pub fn new(settings: ExtractorSettings) -> Self {
        let layout = settings.layout;
        let template = settings.template_image.as_deref().and_then(load_template);
        let tables = LatticeTableDetector::new(PageRenderer::new(), layout.table.zoom, layout.table.line_scale);
        let boxes = ContourBoxDetector::new(layout.supply.boxes.clone());
        let ocr = settings
            .ocr
            .map(|ocr| Box::new(BridgeOcrEngine::new(ocr)) as Box<dyn OcrEngine>);

        Self::with_capabilities(
            layout,
            template,
            Box::new(PageRenderer::new()),
            Box::new(tables),
            Box::new(boxes),
            ocr,
        )
    }

    pub fn with_capabilities(
        layout: TemplateLayout,
        template: Option<GrayImage>,
        renderer: Box<dyn Rasterizer>,
        tables: Box<dyn TableDetector>,
        boxes: Box<dyn BoxDetector>,
        ocr: Option<Box<dyn OcrEngine>>,
    ) -> Self {
        Self {
            layout,
            template,
            renderer,
            tables,
            boxes,
            ocr,
        }
    }

    /// Opens `pdf_path` with poppler and extracts its record. A missing or
    /// unreadable document is an error; anything else degrades to empty
    /// fields.
    pub fn process(&self, pdf_path: &Path) -> Result<EicrRecord> {
        let started = Instant::now();
        let reader = PdfReader::new(pdf_path.to_path_buf())?;
        let page_count = reader
            .page_count()
            .with_context(|| format!("failed to read {}", pdf_path.display()))?;
        tracing::info!(path = %pdf_path.display(), pages = page_count, "processing document");
        let record = self.process_document(pdf_path, &reader)?;
        tracing::info!(
            boards = record.boards.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "document processed"
        );
        Ok(record)
    }

    pub fn process_document(&self, pdf_path: &Path, pages: &dyn PageSource) -> Result<EicrRecord> {
        let ocr = self.ocr.as_deref();

        tracing::info!("reading main record");
        let eicr_main_record =
            MainRecordParser::new(self.renderer.as_ref(), ocr, &self.layout.main_record).parse(pdf_path);

        tracing::info!("reading supply characteristics");
        let (supply_characteristics, particulars_of_installation) =
            match find_page_with_all(pages, &self.layout.sections.supply_page)? {
                Some(page_idx) => {
                    tracing::debug!(page = page_idx + 1, "found supply characteristics page");
                    SupplyExtractor::new(
                        self.renderer.as_ref(),
                        ocr,
                        self.boxes.as_ref(),
                        self.template.as_ref(),
                        &self.layout.supply,
                    )
                    .extract(pdf_path, page_idx)
                }
                None => {
                    tracing::warn!("supply characteristics page not found");
                    Default::default()
                }
            };

        let boards = BoardProcessor::new(
            pages,
            self.tables.as_ref(),
            self.renderer.as_ref(),
            ocr,
            &self.layout.sections,
            &self.layout.table,
        )
        .process(pdf_path)?;

        Ok(EicrRecord {
            eicr_main_record,
            supply_characteristics,
            particulars_of_installation,
            boards,
        })
    }
}

fn load_template(path: &Path) -> Option<GrayImage> {
    match image::open(path) {
        Ok(image) => Some(image.to_luma8()),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "tick template unavailable; polarity and earthing means left empty");
            None
        }
    }
}

/// Output file stem: `<report number>_output`, or `final_output` when no
/// report number was read.
pub fn output_name(record: &EicrRecord) -> String {
    match record.eicr_main_record.report_number() {
        Some(number) => format!("{number}_output"),
        None => "final_output".to_string(),
    }
}

pub fn export_record(record: &EicrRecord, config: &PipelineConfig) -> Result<PathBuf> {
    let exporter = JsonExporter::new(config.output.clone());
    exporter.export(record, &output_name(record))
}
