//! Client-side estimate of how many output files the server will produce.
//!
//! The server splits the source rows into files of at most `batch_size`
//! rows, so the estimate is a ceiling division. It is advisory only; the
//! authoritative count comes back in the processing response.

use std::fmt;

pub const BATCH_MIN: u32 = 1;
pub const BATCH_MAX: u32 = 100;
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Batch size already clamped into `[BATCH_MIN, BATCH_MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchSize(u32);

impl BatchSize {
    pub fn clamped(value: i64) -> Self {
        let bounded = value.clamp(i64::from(BATCH_MIN), i64::from(BATCH_MAX));
        BatchSize(bounded as u32)
    }

    /// Parses user input; anything non-numeric (or zero) becomes 1 before clamping.
    pub fn from_input(raw: &str) -> Self {
        Self::clamped(coerce_batch_size(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Steps the size by `delta` and clamps again.
    pub fn adjust(self, delta: i64) -> Self {
        Self::clamped(i64::from(self.0).saturating_add(delta))
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        BatchSize(DEFAULT_BATCH_SIZE)
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn coerce_batch_size(raw: &str) -> i64 {
    match parse_number(raw) {
        Some(0) | None => 1,
        Some(value) => value,
    }
}

pub fn coerce_total_rows(raw: &str) -> u64 {
    parse_number(raw)
        .and_then(|value| u64::try_from(value).ok())
        .unwrap_or(0)
}

fn parse_number(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value.trunc() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    /// No rows were counted, so there is nothing to estimate.
    Unavailable,
    Files { file_count: u64, batch_size: BatchSize },
}

impl Prediction {
    pub fn file_count(&self) -> Option<u64> {
        match self {
            Prediction::Unavailable => None,
            Prediction::Files { file_count, .. } => Some(*file_count),
        }
    }

    pub fn describe(&self, action: &str, company: &str) -> String {
        match self {
            Prediction::Unavailable => "No prediction available".to_string(),
            Prediction::Files { file_count, .. } => {
                let mut text = format!("About {file_count} file(s) will be generated");
                if !action.is_empty() || !company.is_empty() {
                    text.push_str(&format!("\nAction: {action} · Company: {company}"));
                }
                text
            }
        }
    }
}

pub fn predict(total_rows: u64, batch_size: i64) -> Prediction {
    let batch_size = BatchSize::clamped(batch_size);
    if total_rows == 0 {
        return Prediction::Unavailable;
    }
    Prediction::Files {
        file_count: total_rows.div_ceil(u64::from(batch_size.get())),
        batch_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_batches_divide_exactly() {
        assert_eq!(predict(6600, 100).file_count(), Some(66));
    }

    #[test]
    fn partial_batch_rounds_up() {
        assert_eq!(predict(250, 37).file_count(), Some(7));
        assert_eq!(predict(1, 100).file_count(), Some(1));
    }

    #[test]
    fn zero_rows_is_not_a_zero_file_prediction() {
        let prediction = predict(0, 100);
        assert_eq!(prediction, Prediction::Unavailable);
        assert_eq!(prediction.file_count(), None);
        assert_eq!(prediction.describe("", ""), "No prediction available");
    }

    #[test]
    fn out_of_range_batch_sizes_are_clamped() {
        assert_eq!(predict(100, 500), predict(100, 100));
        assert_eq!(predict(100, 0), predict(100, 1));
        assert_eq!(predict(100, -20), predict(100, 1));
        assert_eq!(
            predict(100, 500),
            Prediction::Files {
                file_count: 1,
                batch_size: BatchSize::clamped(100)
            }
        );
    }

    #[test]
    fn non_numeric_inputs_fall_back_to_safe_defaults() {
        assert_eq!(BatchSize::from_input("abc").get(), 1);
        assert_eq!(BatchSize::from_input("").get(), 1);
        assert_eq!(BatchSize::from_input(" 250 ").get(), 100);
        assert_eq!(BatchSize::from_input("37.9").get(), 37);
        assert_eq!(coerce_total_rows("n/a"), 0);
        assert_eq!(coerce_total_rows("-4"), 0);
        assert_eq!(coerce_total_rows("6600"), 6600);
    }

    #[test]
    fn adjust_steps_and_stays_in_bounds() {
        let size = BatchSize::clamped(95);
        assert_eq!(size.adjust(10).get(), 100);
        assert_eq!(size.adjust(-10).get(), 85);
        assert_eq!(BatchSize::clamped(1).adjust(-1).get(), 1);
    }

    #[test]
    fn description_mentions_labels_only_when_present() {
        let prediction = predict(6600, 100);
        assert_eq!(
            prediction.describe("", ""),
            "About 66 file(s) will be generated"
        );
        assert_eq!(
            prediction.describe("criar", "SURF"),
            "About 66 file(s) will be generated\nAction: criar · Company: SURF"
        );
    }

    proptest! {
        #[test]
        fn prediction_covers_every_row(total in 1u64..1_000_000, batch in -50i64..500) {
            let prediction = predict(total, batch);
            let size = u64::from(BatchSize::clamped(batch).get());
            let files = prediction.file_count().expect("rows present");
            prop_assert!(files * size >= total);
            prop_assert!((files - 1) * size < total);
        }
    }
}
