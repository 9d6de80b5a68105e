//! Template layout: every anchor phrase, pixel crop, reference position
//! and threshold the extractors rely on.
//!
//! The defaults describe the report template the extractors were tuned
//! against. A JSON file can override any subset of keys; missing keys keep
//! their default values.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::geometry::{Point, Rect, DEFAULT_TOLERANCE};
use crate::core::model::MainField;
use crate::core::{ExtractError, ExtractResult};
use crate::vision::checkbox::BoxDetectorConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateLayout {
    pub sections: SectionMarkers,
    pub table: TableSettings,
    pub supply: SupplyLayout,
    pub main_record: MainRecordRules,
}

impl TemplateLayout {
    pub fn from_file(path: &Path) -> ExtractResult<Self> {
        let data = fs::read_to_string(path)?;
        let layout: TemplateLayout =
            serde_json::from_str(&data).map_err(|err| ExtractError::Layout {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        layout.validate().map_err(|message| ExtractError::Layout {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), String> {
        let supply = &self.supply;
        if supply.earthing.positions.len() != supply.earthing.labels.len() {
            return Err("earthing positions and labels differ in length".to_string());
        }
        if supply.supply_type.current_positions.len() != supply.supply_type.current_labels.len() {
            return Err("current-type positions and labels differ in length".to_string());
        }
        if supply.supply_type.conductor_grid.len() != supply.supply_type.conductor_labels.len() {
            return Err("conductor grid and labels differ in length".to_string());
        }
        regex::Regex::new(&self.main_record.report.pattern)
            .map_err(|err| format!("invalid report pattern: {err}"))?;
        Ok(())
    }
}

/// Page-scan markers for board sections and the supply page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SectionMarkers {
    pub circuit_details: String,
    pub test_results: String,
    /// All of these must appear on the supply characteristics page.
    pub supply_page: Vec<String>,
}

impl Default for SectionMarkers {
    fn default() -> Self {
        Self {
            circuit_details: "CIRCUIT DETAILS".to_string(),
            test_results: "TEST RESULTS".to_string(),
            supply_page: vec![
                "DETAILS OF THE COMPANY".to_string(),
                "SUPPLY CHARACTERISTICS AND EARTHING ARRANGEMENTS".to_string(),
                "PARTICULARS OF INSTALLATION".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableSettings {
    /// Rows at or after the first row containing this text are dropped.
    pub footer_marker: String,
    /// Minimum ruling length as a fraction (1/n) of the page dimension.
    pub line_scale: u32,
    pub zoom: f32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            footer_marker: "ENGINEER AND TEST".to_string(),
            line_scale: 30,
            zoom: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupplyLayout {
    pub zoom: f32,
    pub tolerance: u32,
    pub earthing: EarthingLayout,
    pub supply_type: SupplyTypeLayout,
    pub numeric_crop: Rect,
    pub polarity: PolarityLayout,
    pub means_of_earthing: MeansOfEarthingLayout,
    pub boxes: BoxDetectorConfig,
}

impl Default for SupplyLayout {
    fn default() -> Self {
        Self {
            zoom: 2.0,
            tolerance: DEFAULT_TOLERANCE,
            earthing: EarthingLayout::default(),
            supply_type: SupplyTypeLayout::default(),
            numeric_crop: Rect::new(535, 394, 390, 353),
            polarity: PolarityLayout::default(),
            means_of_earthing: MeansOfEarthingLayout::default(),
            boxes: BoxDetectorConfig::default(),
        }
    }
}

/// Earthing arrangement boxes form a single column; positions are y
/// offsets inside the crop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EarthingLayout {
    pub crop: Rect,
    pub positions: Vec<u32>,
    pub labels: Vec<String>,
}

impl Default for EarthingLayout {
    fn default() -> Self {
        Self {
            crop: Rect::new(60, 394, 140, 353),
            positions: vec![98, 145, 190, 235, 281],
            labels: strings(&["TN-S", "TN-C-S", "TN-C", "TT", "IT"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupplyTypeLayout {
    pub crop: Rect,
    /// x offsets of the a.c./d.c. boxes.
    pub current_positions: Vec<u32>,
    pub current_labels: Vec<String>,
    pub conductor_grid: Vec<Point>,
    pub conductor_labels: Vec<String>,
}

impl Default for SupplyTypeLayout {
    fn default() -> Self {
        Self {
            crop: Rect::new(205, 394, 300, 353),
            current_positions: vec![76, 260],
            current_labels: strings(&["a.c.", "d.c."]),
            conductor_grid: vec![
                Point::new(76, 149),
                Point::new(175, 149),
                Point::new(76, 194),
                Point::new(76, 240),
                Point::new(175, 240),
                Point::new(260, 149),
                Point::new(260, 194),
                Point::new(260, 240),
            ],
            conductor_labels: strings(&[
                "1-phase (2 wire)",
                "1-phase (3 wire)",
                "2-phase (3 wire)",
                "3-phase (3 wire)",
                "3-phase (4 wire)",
                "2 pole",
                "3 pole",
                "Other",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolarityLayout {
    pub crop: Rect,
    pub threshold: f32,
}

impl Default for PolarityLayout {
    fn default() -> Self {
        Self {
            crop: Rect::new(535, 394, 390, 353),
            threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeansOfEarthingLayout {
    pub crop: Rect,
    /// Tick matches above this row (crop coordinates) select `upper_label`.
    pub split_row: u32,
    pub upper_label: String,
    pub lower_label: String,
}

impl Default for MeansOfEarthingLayout {
    fn default() -> Self {
        Self {
            crop: Rect::new(60, 770, 140, 200),
            split_row: 100,
            upper_label: "Distributor's facility".to_string(),
            lower_label: "Earth electrode".to_string(),
        }
    }
}

/// Bounded line ranges on a page, delimited by section headings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Client,
    Reason,
    Installation,
    Extent,
    Declaration,
}

impl Zone {
    pub const ALL: [Zone; 5] = [
        Zone::Client,
        Zone::Reason,
        Zone::Installation,
        Zone::Extent,
        Zone::Declaration,
    ];
}

/// Section headings that start each zone, in page order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoneMarkers {
    pub client: String,
    pub reason: String,
    pub installation: String,
    pub extent: String,
    pub declaration: String,
}

impl ZoneMarkers {
    pub fn marker(&self, zone: Zone) -> &str {
        match zone {
            Zone::Client => &self.client,
            Zone::Reason => &self.reason,
            Zone::Installation => &self.installation,
            Zone::Extent => &self.extent,
            Zone::Declaration => &self.declaration,
        }
    }
}

impl Default for ZoneMarkers {
    fn default() -> Self {
        Self {
            client: "DETAILS OF THE CLIENT".to_string(),
            reason: "REASONS FOR PRODUCING THIS REPORT".to_string(),
            installation: "DETAILS OF THE INSTALLATION".to_string(),
            extent: "EXTENT AND LIMITATIONS".to_string(),
            declaration: "DECLARATION".to_string(),
        }
    }
}

/// Reads the line `offset` lines after each line matching `anchor`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldRule {
    pub field: MainField,
    pub page: usize,
    #[serde(default)]
    pub zone: Option<Zone>,
    pub anchor: String,
    #[serde(default)]
    pub ignore_case: bool,
    pub offset: usize,
}

impl FieldRule {
    fn new(field: MainField, page: usize, zone: Option<Zone>, anchor: &str, offset: usize) -> Self {
        Self {
            field,
            page,
            zone,
            anchor: anchor.to_string(),
            ignore_case: false,
            offset,
        }
    }

    fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn matches(&self, line: &str) -> bool {
        if self.ignore_case {
            line.to_lowercase().contains(&self.anchor.to_lowercase())
        } else {
            line.contains(&self.anchor)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportNumberRule {
    pub page: usize,
    /// Capture group 1 is the report number.
    pub pattern: String,
}

impl Default for ReportNumberRule {
    fn default() -> Self {
        Self {
            page: 0,
            pattern: r"REPORT No:\s*(EICR-[\dA-Za-z\-]+)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MainRecordRules {
    pub zoom: f32,
    pub report: ReportNumberRule,
    pub zone_markers: ZoneMarkers,
    pub rules: Vec<FieldRule>,
}

impl MainRecordRules {
    /// Document pages the rules read from, ascending.
    pub fn pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self
            .rules
            .iter()
            .map(|rule| rule.page)
            .chain(std::iter::once(self.report.page))
            .collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

impl Default for MainRecordRules {
    fn default() -> Self {
        use MainField::*;

        let rules = vec![
            FieldRule::new(OverallCondition, 0, None, "And was deemed to be:", 1).ignoring_case(),
            FieldRule::new(InstallationAddress, 0, None, "BS7671:2018+A3:2024", 1),
            FieldRule::new(InstallationTown, 0, None, "BS7671:2018+A3:2024", 2),
            FieldRule::new(InstallationCounty, 0, None, "BS7671:2018+A3:2024", 3),
            FieldRule::new(InstallationPostcode, 0, None, "BS7671:2018+A3:2024", 4),
            FieldRule::new(CreatedAt, 0, None, "Issued on", 1),
            FieldRule::new(ClientName, 1, Some(Zone::Client), "Client name", 2),
            FieldRule::new(ClientAddress, 1, Some(Zone::Client), "Address", 2),
            FieldRule::new(ClientTown, 1, Some(Zone::Client), "Town", 2),
            FieldRule::new(ClientCounty, 1, Some(Zone::Client), "County", 2),
            FieldRule::new(ClientPostcode, 1, Some(Zone::Client), "Postcode", 4),
            FieldRule::new(
                ReportReason,
                1,
                Some(Zone::Reason),
                "Reasons for producing this report",
                2,
            ),
            FieldRule::new(
                InspectionDate,
                1,
                Some(Zone::Reason),
                "Date inspection carried out",
                2,
            ),
            FieldRule::new(
                InstallationOccupier,
                1,
                Some(Zone::Installation),
                "Occupier name",
                4,
            ),
            FieldRule::new(ExtentOfInstallation, 1, None, "EXTENT AND LIMITATIONS", 2)
                .ignoring_case(),
        ];

        Self {
            zoom: 2.0,
            report: ReportNumberRule::default(),
            zone_markers: ZoneMarkers::default(),
            rules,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
