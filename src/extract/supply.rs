//! Supply characteristics and earthing arrangements, read from fixed crops
//! of one rendered page: checkbox groups, OCR'd numeric values and tick
//! template matches.

use std::path::Path;

use image::{GrayImage, RgbImage};

use crate::core::geometry::{resolve_exclusive_choice, resolve_exclusive_position, Point};
use crate::core::model::{InstallationParticulars, SupplyCharacteristics};
use crate::core::tokens::{value_after_token, value_before_token};
use crate::layout::SupplyLayout;
use crate::ocr::layout_builder::line_texts;
use crate::ocr::{OcrEngine, Rasterizer};
use crate::vision::{best_match, crop, crop_gray, BoxDetector};

pub struct SupplyExtractor<'a> {
    renderer: &'a dyn Rasterizer,
    ocr: Option<&'a dyn OcrEngine>,
    boxes: &'a dyn BoxDetector,
    template: Option<&'a GrayImage>,
    layout: &'a SupplyLayout,
}

impl<'a> SupplyExtractor<'a> {
    pub fn new(
        renderer: &'a dyn Rasterizer,
        ocr: Option<&'a dyn OcrEngine>,
        boxes: &'a dyn BoxDetector,
        template: Option<&'a GrayImage>,
        layout: &'a SupplyLayout,
    ) -> Self {
        Self {
            renderer,
            ocr,
            boxes,
            template,
            layout,
        }
    }

    /// Renders the 0-based page and reads every field from it. A page that
    /// cannot be rendered yields all-null records.
    pub fn extract(
        &self,
        pdf_path: &Path,
        page_idx: usize,
    ) -> (SupplyCharacteristics, InstallationParticulars) {
        match self.renderer.render_page(pdf_path, page_idx, self.layout.zoom) {
            Ok(page) => self.extract_from_image(&page),
            Err(err) => {
                tracing::warn!(page = page_idx, error = %format!("{err:#}"), "supply page could not be rendered");
                Default::default()
            }
        }
    }

    pub fn extract_from_image(
        &self,
        page: &RgbImage,
    ) -> (SupplyCharacteristics, InstallationParticulars) {
        let mut supply = SupplyCharacteristics {
            earthing_arrangement: self.earthing_arrangement(page),
            ..Default::default()
        };

        let (current, conductor) = self.supply_type(page);
        supply.current_type = current;
        supply.conductor_type = conductor;

        if let Some(lines) = self.numeric_lines(page) {
            let numeric = parse_numeric_lines(&lines);
            supply.nominal_voltage = numeric.nominal_voltage;
            supply.uo_voltage = numeric.uo_voltage;
            supply.frequency = numeric.frequency;
            supply.pfc = numeric.pfc;
            supply.earth_loop_impedance = numeric.earth_loop_impedance;
            supply.number_of_supplies = numeric.number_of_supplies;
        }

        supply.supply_polarity_confirmed = self.polarity(page);

        let particulars = InstallationParticulars {
            means_of_earthing: self.means_of_earthing(page),
        };

        tracing::debug!(?supply, ?particulars, "read supply characteristics");
        (supply, particulars)
    }

    fn earthing_arrangement(&self, page: &RgbImage) -> Option<String> {
        let layout = &self.layout.earthing;
        let detected: Vec<u32> = self
            .boxes
            .detect(&crop_gray(page, &layout.crop))
            .iter()
            .map(|rect| rect.y)
            .collect();
        resolve_exclusive_position(&layout.positions, &detected, self.layout.tolerance)
            .and_then(|idx| layout.labels.get(idx).cloned())
    }

    /// The first detected box belongs to the a.c./d.c. pair; the rest form
    /// the conductor grid.
    fn supply_type(&self, page: &RgbImage) -> (Option<String>, Option<String>) {
        let layout = &self.layout.supply_type;
        let tolerance = self.layout.tolerance;
        let detected = self.boxes.detect(&crop_gray(page, &layout.crop));

        let (current, rest) = match detected.split_first() {
            Some((first, rest)) => {
                let current = resolve_exclusive_position(&layout.current_positions, &[first.x], tolerance)
                    .and_then(|idx| layout.current_labels.get(idx).cloned());
                (current, rest)
            }
            None => (None, &detected[..]),
        };

        let points: Vec<Point> = rest.iter().map(|rect| rect.origin()).collect();
        let conductor = resolve_exclusive_choice(&layout.conductor_grid, &points, tolerance)
            .and_then(|idx| layout.conductor_labels.get(idx).cloned());

        (current, conductor)
    }

    fn numeric_lines(&self, page: &RgbImage) -> Option<Vec<String>> {
        let ocr = self.ocr?;
        match ocr.recognize(&crop(page, &self.layout.numeric_crop)) {
            Ok(result) => Some(line_texts(&result.lines())),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "numeric supply data not recognized");
                None
            }
        }
    }

    fn polarity(&self, page: &RgbImage) -> Option<String> {
        let template = self.template?;
        let polarity = &self.layout.polarity;
        let score = best_match(&crop_gray(page, &polarity.crop), template)
            .map(|m| m.score)
            .unwrap_or(f32::NEG_INFINITY);
        let confirmed = if score >= polarity.threshold { "Yes" } else { "No" };
        Some(confirmed.to_string())
    }

    fn means_of_earthing(&self, page: &RgbImage) -> Option<String> {
        let template = self.template?;
        let layout = &self.layout.means_of_earthing;
        let found = best_match(&crop_gray(page, &layout.crop), template)?;
        let label = if found.location.y < layout.split_row {
            &layout.upper_label
        } else {
            &layout.lower_label
        };
        Some(label.clone())
    }
}

/// Values OCR'd from the numeric supply-data crop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericSupply {
    pub nominal_voltage: Option<i64>,
    pub uo_voltage: Option<i64>,
    pub frequency: Option<i64>,
    pub pfc: Option<f64>,
    pub earth_loop_impedance: Option<f64>,
    pub number_of_supplies: Option<i64>,
}

pub fn parse_numeric_lines<S: AsRef<str>>(lines: &[S]) -> NumericSupply {
    let nominal_voltage = lines
        .iter()
        .position(|line| line.as_ref() == "V")
        .and_then(|idx| idx.checked_sub(1))
        .and_then(|idx| lines[idx].as_ref().trim().parse().ok());

    // every "Uo" line overwrites the previous reading
    let uo_voltage = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.as_ref().contains("Uo"))
        .last()
        .and_then(|(idx, _)| lines.get(idx + 1))
        .map(|next| next.as_ref())
        .filter(|next| !next.is_empty() && next.chars().all(|c| c.is_ascii_digit()))
        .and_then(|next| next.parse().ok());

    NumericSupply {
        nominal_voltage,
        uo_voltage,
        frequency: value_before_token(lines, "HZ"),
        pfc: value_before_token(lines, "kA"),
        earth_loop_impedance: value_after_token(lines, "Earth loop"),
        number_of_supplies: value_after_token(lines, "No of"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Rect;
    use crate::ocr::layout_builder::tests::page_of;
    use crate::ocr::OcrPage;
    use image::{imageops, Luma, Rgb};
    use pretty_assertions::assert_eq;

    /// Reports fixed boxes per crop, keyed by crop width.
    struct FixedBoxes {
        earthing: Vec<Rect>,
        supply_type: Vec<Rect>,
    }

    impl BoxDetector for FixedBoxes {
        fn detect(&self, crop: &GrayImage) -> Vec<Rect> {
            match crop.width() {
                140 => self.earthing.clone(),
                300 => self.supply_type.clone(),
                _ => Vec::new(),
            }
        }
    }

    struct FixedOcr(Vec<&'static str>);

    impl OcrEngine for FixedOcr {
        fn recognize(&self, _image: &RgbImage) -> anyhow::Result<OcrPage> {
            Ok(page_of(&self.0, 0.9))
        }
    }

    struct NoRender;

    impl Rasterizer for NoRender {
        fn render_page(&self, _pdf: &Path, _page_idx: usize, _zoom: f32) -> anyhow::Result<RgbImage> {
            anyhow::bail!("no renderer in tests")
        }
    }

    fn square(x: u32, y: u32) -> Rect {
        Rect::new(x, y, 14, 14)
    }

    fn tick() -> GrayImage {
        GrayImage::from_fn(12, 12, |x, y| {
            if x == y || x + y == 11 {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    fn blank_page() -> RgbImage {
        RgbImage::from_pixel(1000, 1100, Rgb([255, 255, 255]))
    }

    fn paste_tick(page: &mut RgbImage, x: u32, y: u32) {
        let rgb = imageops::grayscale(&tick());
        for (tx, ty, p) in rgb.enumerate_pixels() {
            let v = p[0];
            page.put_pixel(x + tx, y + ty, Rgb([v, v, v]));
        }
    }

    #[test]
    fn parses_numeric_supply_lines() {
        let lines = [
            "Nominal voltage",
            "230",
            "V",
            "Uo",
            "230",
            "50",
            "Hz",
            "1.6",
            "kA",
            "Earth loop impedance",
            "0.35",
            "No of supplies",
            "1",
        ];
        assert_eq!(
            parse_numeric_lines(&lines),
            NumericSupply {
                nominal_voltage: Some(230),
                uo_voltage: Some(230),
                frequency: Some(50),
                pfc: Some(1.6),
                earth_loop_impedance: Some(0.35),
                number_of_supplies: Some(1),
            }
        );
    }

    #[test]
    fn uo_reading_must_be_digits_and_last_wins() {
        let lines = ["Uo", "230", "Uo (V)", "N/A"];
        assert_eq!(parse_numeric_lines(&lines).uo_voltage, None);

        let lines = ["Uo", "N/A", "Uo", "240"];
        assert_eq!(parse_numeric_lines(&lines).uo_voltage, Some(240));
    }

    #[test]
    fn voltage_marker_on_first_line_has_no_value() {
        let lines = ["V", "230"];
        assert_eq!(parse_numeric_lines(&lines).nominal_voltage, None);
        assert_eq!(parse_numeric_lines::<&str>(&[]), NumericSupply::default());
    }

    #[test]
    fn unmarked_checkboxes_select_labels() {
        let layout = SupplyLayout::default();
        let boxes = FixedBoxes {
            // TN-C-S (y=145) is ticked, so it is the only one missing
            earthing: vec![square(10, 98), square(10, 190), square(10, 235), square(10, 281)],
            // first box is d.c. (unticked) so a.c. is selected; 3-phase (4 wire) is ticked
            supply_type: vec![
                square(260, 40),
                square(76, 149),
                square(175, 149),
                square(76, 194),
                square(76, 240),
                square(260, 149),
                square(260, 194),
                square(260, 240),
            ],
        };
        let extractor = SupplyExtractor::new(&NoRender, None, &boxes, None, &layout);
        let (supply, particulars) = extractor.extract_from_image(&blank_page());

        assert_eq!(supply.earthing_arrangement.as_deref(), Some("TN-C-S"));
        assert_eq!(supply.current_type.as_deref(), Some("a.c."));
        assert_eq!(supply.conductor_type.as_deref(), Some("3-phase (4 wire)"));
        assert_eq!(supply.nominal_voltage, None);
        assert_eq!(supply.supply_polarity_confirmed, None);
        assert_eq!(particulars.means_of_earthing, None);
    }

    #[test]
    fn numeric_fields_come_from_ocr() {
        let layout = SupplyLayout::default();
        let boxes = FixedBoxes {
            earthing: Vec::new(),
            supply_type: Vec::new(),
        };
        let ocr = FixedOcr(vec!["400", "V", "50", "HZ", "No of supplies", "2"]);
        let extractor = SupplyExtractor::new(&NoRender, Some(&ocr), &boxes, None, &layout);
        let (supply, _) = extractor.extract_from_image(&blank_page());

        assert_eq!(supply.nominal_voltage, Some(400));
        assert_eq!(supply.frequency, Some(50));
        assert_eq!(supply.number_of_supplies, Some(2));
        assert_eq!(supply.pfc, None);
        // nothing detected: the first earthing option is the one missing
        assert_eq!(supply.earthing_arrangement.as_deref(), Some("TN-S"));
        assert_eq!(supply.current_type, None);
    }

    #[test]
    fn tick_template_confirms_polarity_and_earthing_means() {
        let layout = SupplyLayout::default();
        let boxes = FixedBoxes {
            earthing: Vec::new(),
            supply_type: Vec::new(),
        };
        let template = tick();
        let mut page = blank_page();
        // inside the polarity crop
        paste_tick(&mut page, 600, 500);
        // lower half of the means-of-earthing crop
        paste_tick(&mut page, 100, 770 + 150);

        let extractor = SupplyExtractor::new(&NoRender, None, &boxes, Some(&template), &layout);
        let (supply, particulars) = extractor.extract_from_image(&page);
        assert_eq!(supply.supply_polarity_confirmed.as_deref(), Some("Yes"));
        assert_eq!(particulars.means_of_earthing.as_deref(), Some("Earth electrode"));

        let (supply, _) = extractor.extract_from_image(&blank_page());
        assert_eq!(supply.supply_polarity_confirmed.as_deref(), Some("No"));
    }

    #[test]
    fn render_failure_yields_empty_records() {
        let layout = SupplyLayout::default();
        let boxes = FixedBoxes {
            earthing: Vec::new(),
            supply_type: Vec::new(),
        };
        let extractor = SupplyExtractor::new(&NoRender, None, &boxes, None, &layout);
        let (supply, particulars) = extractor.extract(Path::new("report.pdf"), 2);
        assert_eq!(supply, SupplyCharacteristics::default());
        assert_eq!(particulars, InstallationParticulars::default());
    }
}
