use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::services::grade_bands::{BandRange, GradingScale};

#[derive(Debug, Deserialize)]
pub(crate) struct ValidateScaleRequest {
    pub(crate) scale: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateScaleResponse {
    pub(crate) scale: GradingScale,
    pub(crate) ranges: Vec<BandRange>,
    /// JSON string persisted alongside an exam definition.
    pub(crate) serialized: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PreviewRequest {
    #[serde(default)]
    pub(crate) scale: Option<Value>,
    #[validate(length(min = 1, max = 1000, message = "scores must contain 1 to 1000 values"))]
    pub(crate) scores: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreBand {
    pub(crate) score: f64,
    pub(crate) band: String,
    /// 0 for the top band; the fail band ranks last.
    pub(crate) rank: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct PreviewResponse {
    pub(crate) results: Vec<ScoreBand>,
    pub(crate) ranges: Vec<BandRange>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EditThresholdRequest {
    pub(crate) scale: Value,
    #[validate(length(min = 1, message = "label must not be empty"))]
    pub(crate) label: String,
    pub(crate) threshold: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct EditThresholdResponse {
    pub(crate) accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    pub(crate) scale: GradingScale,
    pub(crate) ranges: Vec<BandRange>,
}
