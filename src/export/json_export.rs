use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::EicrRecord;
use crate::export::Exporter;

#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, record: &EicrRecord, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;
        let path = self.out_dir.join(format!("{name}.json"));
        let data = serde_json::to_string_pretty(record)?;
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "wrote JSON record");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{FieldRecord, MainField};
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_pretty_json_with_top_level_sections() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut record = EicrRecord::default();
        record
            .eicr_main_record
            .set(MainField::ReportNumber, FieldRecord::new("EICR-7", Some(0.93)));

        let path = JsonExporter::new(dir.path().join("out")).export(&record, "EICR-7")?;
        assert_eq!(path, dir.path().join("out").join("EICR-7.json"));

        let text = fs::read_to_string(&path)?;
        let offsets: Vec<usize> = [
            "\"eicr_main_record\"",
            "\"supply_characteristics\"",
            "\"particulars_of_installation\"",
            "\"Boards\"",
        ]
        .iter()
        .map(|key| text.find(key).unwrap())
        .collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]), "sections out of order");

        let json: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(json["eicr_main_record"]["Report Number"]["value"], "EICR-7");
        assert!(json["supply_characteristics"]["PFC"].is_null());
        Ok(())
    }
}
