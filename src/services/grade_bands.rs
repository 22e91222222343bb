//! Score-to-band resolution and grading scale validation.
//!
//! A [`GradingScale`] is an ordered list of bands, highest rank first, each
//! with an inclusive minimum score. Anything below the lowest threshold falls
//! into the implicit [`FAIL_BAND`].

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

pub(crate) const FAIL_BAND: &str = "fail";
pub(crate) const MIN_SCORE: f64 = 0.0;
pub(crate) const MAX_SCORE: f64 = 100.0;

const DEFAULT_BANDS: &[(&str, f64)] = &[
    ("excellent", 90.0),
    ("veryGood", 80.0),
    ("good", 70.0),
    ("satisfactory", 60.0),
    ("pass", 50.0),
];

#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum ConfigurationError {
    #[error("grading scale must define at least one band")]
    Empty,
    #[error("band label must not be empty")]
    EmptyLabel,
    #[error("band label '{0}' is reserved")]
    ReservedLabel(String),
    #[error("band '{0}' is defined more than once")]
    DuplicateLabel(String),
    #[error("threshold for '{label}' must be within 0..=100, got {value}")]
    OutOfRange { label: String, value: f64 },
    #[error(
        "threshold for '{lower}' ({lower_value}) must be strictly below '{higher}' ({higher_value})"
    )]
    NotDecreasing { higher: String, higher_value: f64, lower: String, lower_value: f64 },
    #[error("unknown band '{0}'")]
    UnknownBand(String),
    #[error("malformed grading scale: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct BandThreshold {
    pub(crate) label: String,
    #[serde(alias = "threshold", alias = "minScore")]
    pub(crate) min_score: f64,
}

impl BandThreshold {
    pub(crate) fn new(label: impl Into<String>, min_score: f64) -> Self {
        Self { label: label.into(), min_score }
    }
}

/// A validated grading scale. Construction always goes through
/// [`validate_scale`], so holding one means the thresholds are usable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradingScale {
    bands: Vec<BandThreshold>,
}

impl GradingScale {
    pub(crate) fn new(bands: Vec<BandThreshold>) -> Result<Self, ConfigurationError> {
        validate_scale(&bands)?;
        Ok(Self { bands })
    }

    pub(crate) fn from_json(raw: &str) -> Result<Self, ConfigurationError> {
        let raw: RawScale = serde_json::from_str(raw)
            .map_err(|err| ConfigurationError::Malformed(err.to_string()))?;
        Self::try_from(raw)
    }

    pub(crate) fn from_value(value: &Value) -> Result<Self, ConfigurationError> {
        match value {
            // Legacy exam records keep the scale as a JSON-encoded string.
            Value::String(raw) => Self::from_json(raw),
            other => {
                let raw: RawScale = serde_json::from_value(other.clone())
                    .map_err(|err| ConfigurationError::Malformed(err.to_string()))?;
                Self::try_from(raw)
            }
        }
    }

    /// Serialized form stored alongside an exam definition.
    pub(crate) fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub(crate) fn bands(&self) -> &[BandThreshold] {
        &self.bands
    }

    /// Rank of the resolved band: 0 for the top band, `bands().len()` for fail.
    pub(crate) fn rank_of(&self, label: &str) -> Option<usize> {
        if label == FAIL_BAND {
            return Some(self.bands.len());
        }
        self.bands.iter().position(|band| band.label == label)
    }
}

impl Default for GradingScale {
    fn default() -> Self {
        Self {
            bands: DEFAULT_BANDS
                .iter()
                .map(|(label, min_score)| BandThreshold::new(*label, *min_score))
                .collect(),
        }
    }
}

/// Checks labels and that thresholds lie in `[0, 100]` and strictly decrease
/// with band rank.
pub(crate) fn validate_scale(bands: &[BandThreshold]) -> Result<(), ConfigurationError> {
    if bands.is_empty() {
        return Err(ConfigurationError::Empty);
    }

    for (index, band) in bands.iter().enumerate() {
        if band.label.trim().is_empty() {
            return Err(ConfigurationError::EmptyLabel);
        }
        if band.label == FAIL_BAND {
            return Err(ConfigurationError::ReservedLabel(band.label.clone()));
        }
        if bands[..index].iter().any(|other| other.label == band.label) {
            return Err(ConfigurationError::DuplicateLabel(band.label.clone()));
        }
        if !(MIN_SCORE..=MAX_SCORE).contains(&band.min_score) {
            return Err(ConfigurationError::OutOfRange {
                label: band.label.clone(),
                value: band.min_score,
            });
        }
    }

    for pair in bands.windows(2) {
        let (higher, lower) = (&pair[0], &pair[1]);
        if lower.min_score >= higher.min_score {
            return Err(ConfigurationError::NotDecreasing {
                higher: higher.label.clone(),
                higher_value: higher.min_score,
                lower: lower.label.clone(),
                lower_value: lower.min_score,
            });
        }
    }

    Ok(())
}

pub(crate) fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Thresholds are inclusive lower bounds: a score equal to a threshold
/// belongs to that band, not the one below it.
pub(crate) fn resolve_band(score: f64, scale: &GradingScale) -> &str {
    let score = clamp_score(score);
    scale
        .bands
        .iter()
        .find(|band| band.min_score <= score)
        .map(|band| band.label.as_str())
        .unwrap_or(FAIL_BAND)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct BandRange {
    pub(crate) label: String,
    pub(crate) min_score: f64,
    /// Exclusive, except for the top band which reaches 100 inclusive.
    pub(crate) max_score: f64,
    pub(crate) display: String,
}

/// Per-band score ranges for the scale editor, derived from adjacent
/// thresholds. Includes the fail range when the lowest threshold is above 0.
pub(crate) fn band_ranges(scale: &GradingScale) -> Vec<BandRange> {
    let mut ranges = Vec::with_capacity(scale.bands.len() + 1);
    let mut upper: Option<f64> = None;

    for band in &scale.bands {
        ranges.push(band_range(&band.label, band.min_score, upper));
        upper = Some(band.min_score);
    }

    if let Some(lowest) = upper.filter(|lowest| *lowest > MIN_SCORE) {
        ranges.push(band_range(FAIL_BAND, MIN_SCORE, Some(lowest)));
    }

    ranges
}

fn band_range(label: &str, min_score: f64, exclusive_upper: Option<f64>) -> BandRange {
    // Scores are fractional, so every upper bound except 100 is shown exclusive.
    let display = match exclusive_upper {
        None => format!("{}–{}%", format_score(min_score), format_score(MAX_SCORE)),
        Some(upper) => format!("{}–<{}%", format_score(min_score), format_score(upper)),
    };

    BandRange {
        label: label.to_string(),
        min_score,
        max_score: exclusive_upper.unwrap_or(MAX_SCORE),
        display,
    }
}

fn is_integral(value: f64) -> bool {
    value.fract() == 0.0
}

fn format_score(value: f64) -> String {
    if is_integral(value) {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Holds the last accepted scale while an instructor edits thresholds one at a
/// time. Rejected edits leave the current scale untouched.
#[derive(Debug, Clone)]
pub(crate) struct ScaleEditor {
    current: GradingScale,
}

impl ScaleEditor {
    pub(crate) fn new(current: GradingScale) -> Self {
        Self { current }
    }

    pub(crate) fn current(&self) -> &GradingScale {
        &self.current
    }

    pub(crate) fn set_threshold(
        &mut self,
        label: &str,
        threshold: f64,
    ) -> Result<&GradingScale, ConfigurationError> {
        let mut candidate = self.current.bands.clone();
        let band = candidate
            .iter_mut()
            .find(|band| band.label == label)
            .ok_or_else(|| ConfigurationError::UnknownBand(label.to_string()))?;
        band.min_score = threshold;

        self.current = GradingScale::new(candidate)?;
        Ok(&self.current)
    }

    pub(crate) fn ranges(&self) -> Vec<BandRange> {
        band_ranges(&self.current)
    }
}

impl Serialize for GradingScale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.bands.len()))?;
        for band in &self.bands {
            if is_integral(band.min_score) {
                map.serialize_entry(&band.label, &(band.min_score as i64))?;
            } else {
                map.serialize_entry(&band.label, &band.min_score)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GradingScale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawScale::deserialize(deserializer)?;
        GradingScale::try_from(raw).map_err(de::Error::custom)
    }
}

impl TryFrom<RawScale> for GradingScale {
    type Error = ConfigurationError;

    fn try_from(raw: RawScale) -> Result<Self, Self::Error> {
        GradingScale::new(raw.0)
    }
}

/// Unvalidated scale in document order. Accepts either a `{label: threshold}`
/// object or a list of `{label, min_score}` entries.
#[derive(Debug)]
pub(crate) struct RawScale(pub(crate) Vec<BandThreshold>);

impl<'de> Deserialize<'de> for RawScale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawScaleVisitor;

        impl<'de> Visitor<'de> for RawScaleVisitor {
            type Value = RawScale;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of band label to threshold or a list of bands")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RawScale, A::Error> {
                let mut bands = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, min_score)) = access.next_entry::<String, f64>()? {
                    bands.push(BandThreshold { label, min_score });
                }
                Ok(RawScale(bands))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<RawScale, A::Error> {
                let mut bands = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(band) = access.next_element::<BandThreshold>()? {
                    bands.push(band);
                }
                Ok(RawScale(bands))
            }
        }

        deserializer.deserialize_any(RawScaleVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scale(entries: &[(&str, f64)]) -> Vec<BandThreshold> {
        entries.iter().map(|(label, value)| BandThreshold::new(*label, *value)).collect()
    }

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        let scale = GradingScale::default();
        assert_eq!(resolve_band(100.0, &scale), "excellent");
        assert_eq!(resolve_band(90.0, &scale), "excellent");
        assert_eq!(resolve_band(89.0, &scale), "veryGood");
        assert_eq!(resolve_band(89.99, &scale), "veryGood");
        assert_eq!(resolve_band(80.0, &scale), "veryGood");
        assert_eq!(resolve_band(70.0, &scale), "good");
        assert_eq!(resolve_band(60.0, &scale), "satisfactory");
        assert_eq!(resolve_band(50.0, &scale), "pass");
        assert_eq!(resolve_band(49.0, &scale), "fail");
        assert_eq!(resolve_band(0.0, &scale), "fail");
    }

    #[test]
    fn every_threshold_maps_to_its_own_band() {
        let scale = GradingScale::default();
        for band in scale.bands() {
            assert_eq!(resolve_band(band.min_score, &scale), band.label);
        }
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let scale = GradingScale::default();
        assert_eq!(resolve_band(140.0, &scale), "excellent");
        assert_eq!(resolve_band(-3.0, &scale), "fail");
        assert_eq!(resolve_band(f64::NAN, &scale), "fail");
    }

    #[test]
    fn resolution_is_monotonic_in_score() {
        let scale = GradingScale::new(scale(&[("A", 90.0), ("B", 72.5), ("C", 40.0), ("D", 0.0)]))
            .expect("valid scale");

        let mut previous_rank = usize::MAX;
        for step in -50..=1050 {
            let score = f64::from(step) / 10.0;
            let rank = scale.rank_of(resolve_band(score, &scale)).expect("known band");
            assert!(rank <= previous_rank, "score {score} resolved to a lower band");
            previous_rank = rank;
        }
    }

    #[test]
    fn zero_threshold_band_leaves_nothing_for_fail() {
        let scale = GradingScale::new(scale(&[("A", 90.0), ("F", 0.0)])).expect("valid scale");
        assert_eq!(resolve_band(0.0, &scale), "F");
        assert!(band_ranges(&scale).iter().all(|range| range.label != FAIL_BAND));
    }

    #[test]
    fn validate_accepts_default_scale() {
        assert_eq!(validate_scale(GradingScale::default().bands()), Ok(()));
    }

    #[test]
    fn validate_rejects_increasing_thresholds() {
        let bands = scale(&[("excellent", 80.0), ("veryGood", 85.0), ("good", 70.0)]);
        assert!(matches!(
            validate_scale(&bands),
            Err(ConfigurationError::NotDecreasing { ref higher, ref lower, .. })
                if higher == "excellent" && lower == "veryGood"
        ));
    }

    #[test]
    fn validate_rejects_equal_thresholds() {
        let bands = scale(&[("excellent", 80.0), ("veryGood", 80.0)]);
        assert!(matches!(validate_scale(&bands), Err(ConfigurationError::NotDecreasing { .. })));
    }

    #[test]
    fn validate_rejects_out_of_range_thresholds() {
        assert!(matches!(
            validate_scale(&scale(&[("excellent", 101.0), ("pass", 50.0)])),
            Err(ConfigurationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_scale(&scale(&[("excellent", 90.0), ("pass", -1.0)])),
            Err(ConfigurationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_scale(&scale(&[("excellent", f64::NAN)])),
            Err(ConfigurationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_labels() {
        assert_eq!(validate_scale(&[]), Err(ConfigurationError::Empty));
        assert_eq!(validate_scale(&scale(&[(" ", 50.0)])), Err(ConfigurationError::EmptyLabel));
        assert!(matches!(
            validate_scale(&scale(&[("pass", 50.0), ("fail", 10.0)])),
            Err(ConfigurationError::ReservedLabel(_))
        ));
        assert!(matches!(
            validate_scale(&scale(&[("pass", 50.0), ("pass", 10.0)])),
            Err(ConfigurationError::DuplicateLabel(_))
        ));
    }

    #[test]
    fn json_object_keeps_rank_order() {
        let scale = GradingScale::from_json(
            r#"{"excellent": 90, "veryGood": 80, "good": 70, "satisfactory": 60, "pass": 50}"#,
        )
        .expect("scale");
        assert_eq!(scale, GradingScale::default());
        assert_eq!(
            scale.to_json(),
            r#"{"excellent":90,"veryGood":80,"good":70,"satisfactory":60,"pass":50}"#
        );
    }

    #[test]
    fn json_list_form_is_accepted() {
        let value = json!([
            {"label": "A", "min_score": 85.5},
            {"label": "B", "threshold": 60}
        ]);
        let scale = GradingScale::from_value(&value).expect("scale");
        assert_eq!(scale.bands()[0], BandThreshold::new("A", 85.5));
        assert_eq!(scale.to_json(), r#"{"A":85.5,"B":60}"#);
    }

    #[test]
    fn json_string_value_is_decoded() {
        let value = json!("{\"A\":90,\"B\":80,\"C\":70,\"D\":60,\"F\":0}");
        let scale = GradingScale::from_value(&value).expect("scale");
        assert_eq!(scale.bands().len(), 5);
        assert_eq!(resolve_band(65.0, &scale), "D");
    }

    #[test]
    fn deserializing_an_invalid_scale_fails() {
        let result: Result<GradingScale, _> =
            serde_json::from_str(r#"{"excellent": 80, "veryGood": 85}"#);
        assert!(result.is_err());
        assert!(matches!(
            GradingScale::from_json("[1, 2]"),
            Err(ConfigurationError::Malformed(_))
        ));
    }

    #[test]
    fn ranges_follow_adjacent_thresholds() {
        let ranges = band_ranges(&GradingScale::default());
        let displays: Vec<(&str, &str)> =
            ranges.iter().map(|range| (range.label.as_str(), range.display.as_str())).collect();
        assert_eq!(
            displays,
            vec![
                ("excellent", "90–100%"),
                ("veryGood", "80–<90%"),
                ("good", "70–<80%"),
                ("satisfactory", "60–<70%"),
                ("pass", "50–<60%"),
                ("fail", "0–<50%"),
            ]
        );
    }

    #[test]
    fn range_display_covers_fractional_scores() {
        let scale = GradingScale::default();
        let ranges = band_ranges(&scale);
        let very_good = &ranges[1];
        assert_eq!(very_good.display, "80–<90%");
        assert_eq!(resolve_band(89.5, &scale), very_good.label);
        assert!(very_good.min_score <= 89.5 && 89.5 < very_good.max_score);
    }

    #[test]
    fn ranges_with_fractional_thresholds_use_exclusive_upper_bound() {
        let scale =
            GradingScale::new(scale(&[("A", 85.5), ("B", 60.0)])).expect("valid scale");
        let ranges = band_ranges(&scale);
        assert_eq!(ranges[0].display, "85.5–100%");
        assert_eq!(ranges[1].display, "60–<85.5%");
        assert_eq!(ranges[2].display, "0–<60%");
    }

    #[test]
    fn editor_applies_valid_edit_and_recomputes_ranges() {
        let mut editor = ScaleEditor::new(GradingScale::default());
        editor.set_threshold("excellent", 95.0).expect("valid edit");

        assert_eq!(editor.current().bands()[0].min_score, 95.0);
        assert_eq!(editor.ranges()[0].display, "95–100%");
        assert_eq!(editor.ranges()[1].display, "80–<95%");
    }

    #[test]
    fn editor_rejects_edit_and_keeps_previous_scale() {
        let mut editor = ScaleEditor::new(GradingScale::default());

        let err = editor.set_threshold("excellent", 75.0).expect_err("must be rejected");
        assert!(matches!(err, ConfigurationError::NotDecreasing { .. }));
        assert_eq!(editor.current(), &GradingScale::default());

        let err = editor.set_threshold("unknown", 10.0).expect_err("unknown band");
        assert_eq!(err, ConfigurationError::UnknownBand("unknown".to_string()));
        assert_eq!(editor.current(), &GradingScale::default());
    }
}
