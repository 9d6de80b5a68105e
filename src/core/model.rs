use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One extracted metadata value. `confidence` is only set for values read
/// from OCR output.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FieldRecord {
    pub value: Option<String>,
    pub confidence: Option<f32>,
}

impl FieldRecord {
    pub fn new(value: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            value: Some(value.into()),
            confidence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MainField {
    #[serde(rename = "Report Number")]
    ReportNumber,
    #[serde(rename = "Client Name")]
    ClientName,
    #[serde(rename = "Client Address")]
    ClientAddress,
    #[serde(rename = "Client Town")]
    ClientTown,
    #[serde(rename = "Client County")]
    ClientCounty,
    #[serde(rename = "Client Postcode")]
    ClientPostcode,
    #[serde(rename = "Report Reason")]
    ReportReason,
    #[serde(rename = "Inspection Date")]
    InspectionDate,
    #[serde(rename = "Installation Occupier")]
    InstallationOccupier,
    #[serde(rename = "Installation Address")]
    InstallationAddress,
    #[serde(rename = "Installation Town")]
    InstallationTown,
    #[serde(rename = "Installation County")]
    InstallationCounty,
    #[serde(rename = "Installation Postcode")]
    InstallationPostcode,
    #[serde(rename = "Extent of Installation")]
    ExtentOfInstallation,
    #[serde(rename = "Overall Condition")]
    OverallCondition,
    #[serde(rename = "Created at")]
    CreatedAt,
}

impl MainField {
    pub const ALL: [MainField; 16] = [
        MainField::ReportNumber,
        MainField::ClientName,
        MainField::ClientAddress,
        MainField::ClientTown,
        MainField::ClientCounty,
        MainField::ClientPostcode,
        MainField::ReportReason,
        MainField::InspectionDate,
        MainField::InstallationOccupier,
        MainField::InstallationAddress,
        MainField::InstallationTown,
        MainField::InstallationCounty,
        MainField::InstallationPostcode,
        MainField::ExtentOfInstallation,
        MainField::OverallCondition,
        MainField::CreatedAt,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MainField::ReportNumber => "Report Number",
            MainField::ClientName => "Client Name",
            MainField::ClientAddress => "Client Address",
            MainField::ClientTown => "Client Town",
            MainField::ClientCounty => "Client County",
            MainField::ClientPostcode => "Client Postcode",
            MainField::ReportReason => "Report Reason",
            MainField::InspectionDate => "Inspection Date",
            MainField::InstallationOccupier => "Installation Occupier",
            MainField::InstallationAddress => "Installation Address",
            MainField::InstallationTown => "Installation Town",
            MainField::InstallationCounty => "Installation County",
            MainField::InstallationPostcode => "Installation Postcode",
            MainField::ExtentOfInstallation => "Extent of Installation",
            MainField::OverallCondition => "Overall Condition",
            MainField::CreatedAt => "Created at",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Report header fields read from the first two pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainRecord {
    fields: [FieldRecord; 16],
}

impl MainRecord {
    pub fn get(&self, field: MainField) -> &FieldRecord {
        &self.fields[field.index()]
    }

    pub fn set(&mut self, field: MainField, record: FieldRecord) {
        self.fields[field.index()] = record;
    }

    pub fn value(&self, field: MainField) -> Option<&str> {
        self.get(field).value.as_deref()
    }

    pub fn report_number(&self) -> Option<&str> {
        self.value(MainField::ReportNumber)
    }
}

impl Serialize for MainRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(MainField::ALL.len()))?;
        for field in MainField::ALL {
            map.serialize_entry(field.label(), self.get(field))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SupplyCharacteristics {
    #[serde(rename = "Earthing Arrangement")]
    pub earthing_arrangement: Option<String>,
    #[serde(rename = "Current Type")]
    pub current_type: Option<String>,
    #[serde(rename = "Conductor Type")]
    pub conductor_type: Option<String>,
    #[serde(rename = "Nominal Voltage")]
    pub nominal_voltage: Option<i64>,
    #[serde(rename = "Uo Voltage")]
    pub uo_voltage: Option<i64>,
    #[serde(rename = "Frequency")]
    pub frequency: Option<i64>,
    #[serde(rename = "PFC")]
    pub pfc: Option<f64>,
    #[serde(rename = "Earth Loop Impedance")]
    pub earth_loop_impedance: Option<f64>,
    #[serde(rename = "Number of Supplies")]
    pub number_of_supplies: Option<i64>,
    #[serde(rename = "Supply Polarity Confirmed")]
    pub supply_polarity_confirmed: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct InstallationParticulars {
    #[serde(rename = "Means of Earthing")]
    pub means_of_earthing: Option<String>,
}

/// A table row: column name to cell text, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<(String, String)>,
}

impl TableRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

pub const UNKNOWN_BOARD: &str = "Unknown Board";
pub const UNKNOWN: &str = "Unknown";

/// One electrical distribution board with its circuit and test tables.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BoardRecord {
    #[serde(rename = "DB name")]
    pub name: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "No of phases")]
    pub phases: String,
    #[serde(rename = "Supplied from")]
    pub supplied_from: String,
    #[serde(rename = "Circuit Details")]
    pub circuit_details: Vec<TableRow>,
    #[serde(rename = "Test Results")]
    pub test_results: Vec<TableRow>,
}

/// The aggregate output of one processing run.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EicrRecord {
    pub eicr_main_record: MainRecord,
    pub supply_characteristics: SupplyCharacteristics,
    pub particulars_of_installation: InstallationParticulars,
    #[serde(rename = "Boards")]
    pub boards: Vec<BoardRecord>,
}
