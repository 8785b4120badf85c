//! Meter validation request/response DTOs for the v1 API.

use serde::Serialize;

use crate::reading::{Extraction, ExtractionStatus, StrategyAttempt, StrategyKind};

/// The only status the endpoint reports; problems with the reading itself
/// are expressed through `extraction` and `imageValid`.
pub const VALIDATION_STATUS: &str = "VALID";

/// Multipart form accepted by `POST /api/v1/validate-meter`.
///
/// Documentation only: the handler reads the fields straight off the stream.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ValidateMeterForm {
    /// Photo of the meter display (PNG, JPEG, WebP, ...).
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
    /// The reading the user typed in, passed through unchanged.
    pub user_reading: String,
}

/// Response body for `POST /api/v1/validate-meter`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateMeterResponse {
    pub status: String,
    /// Extracted digits, empty when nothing plausible was found.
    pub meter_reading: String,
    pub user_reading: String,
    /// Outcome of the authenticity check after the failure policy.
    pub image_valid: bool,
    /// Strategy that produced `meterReading`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    pub extraction: ExtractionStatus,
    /// Every strategy that ran, in order.
    pub attempts: Vec<StrategyAttempt>,
}

impl ValidateMeterResponse {
    pub fn new(extraction: Extraction, user_reading: String, image_valid: bool) -> Self {
        let status = extraction.status();
        Self {
            status: VALIDATION_STATUS.to_string(),
            meter_reading: extraction.candidate.reading,
            user_reading,
            image_valid,
            strategy: extraction.candidate.strategy,
            extraction: status,
            attempts: extraction.attempts,
        }
    }
}
