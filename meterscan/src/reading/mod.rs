//! Meter-reading extraction.
//!
//! A decoded photo goes through up to three recognition strategies. Each
//! strategy's text is normalized to digits and checked for plausibility, and
//! the first reading that passes wins.

mod contour;
mod normalize;
mod pipeline;
mod strategy;
mod types;
mod validate;

pub use contour::{
    detect_digit_regions, glyph_tile, sweep_thresholds, DigitRegion, ThresholdScan,
    MAX_DIGIT_REGIONS, MIN_DIGIT_REGIONS,
};
pub use normalize::normalize_ocr_text;
pub use pipeline::ReadingPipeline;
pub use strategy::{
    placeholder_digits, ContourFallbackStrategy, EnhancedOcrStrategy, PrimaryOcrStrategy,
    RecognitionStrategy,
};
pub use types::{
    AttemptOutcome, Candidate, Extraction, ExtractionFailure, ExtractionStatus, RejectReason,
    StrategyAttempt, StrategyKind, ValidationVerdict,
};
pub use validate::{is_plausible_reading, validate_reading, MAX_READING_DIGITS, MIN_READING_DIGITS};
