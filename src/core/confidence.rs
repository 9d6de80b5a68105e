/// Mean of per-word OCR confidences, rounded to two decimals.
pub fn mean_confidence(confidences: &[f32]) -> Option<f32> {
    if confidences.is_empty() {
        return None;
    }
    let sum: f32 = confidences.iter().sum();
    Some(round2(sum / confidences.len() as f32))
}

pub fn round2(value: f32) -> f32 {
    ((value * 100.0).round() / 100.0).clamp(0.0, 1.0)
}
