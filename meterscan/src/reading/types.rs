use std::fmt;

use serde::Serialize;

/// The recognition strategies, in the order the pipeline tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// OCR over the grayscale photo.
    Primary,
    /// OCR over the CLAHE-enhanced, binarized photo.
    Enhanced,
    /// Geometric digit-region detection over a threshold sweep.
    Contour,
}

impl StrategyKind {
    pub const ORDER: [StrategyKind; 3] = [Self::Primary, Self::Enhanced, Self::Contour];

    /// Contour output is assembled from already-clean digits.
    pub fn needs_normalization(&self) -> bool {
        !matches!(self, Self::Contour)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Enhanced => write!(f, "enhanced"),
            Self::Contour => write!(f, "contour"),
        }
    }
}

/// A digit-only reading and the strategy that produced it.
///
/// The empty candidate (no reading, no strategy) means "not extracted".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub reading: String,
    pub strategy: Option<StrategyKind>,
}

impl Candidate {
    pub fn empty() -> Self {
        Self {
            reading: String::new(),
            strategy: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reading.is_empty()
    }
}

/// Why a digit string was judged implausible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Empty,
    NonNumeric,
    TooShort,
    TooLong,
    UniformDigits,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::NonNumeric => write!(f, "non-numeric"),
            Self::TooShort => write!(f, "too short"),
            Self::TooLong => write!(f, "too long"),
            Self::UniformDigits => write!(f, "all digits identical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationVerdict {
    Accepted,
    Rejected(RejectReason),
}

impl ValidationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// How a single strategy run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    Rejected(RejectReason),
    Failed(String),
    TimedOut,
}

/// Diagnostic record of one rung of the fallback ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAttempt {
    pub strategy: StrategyKind,
    /// Text as returned by the strategy, before normalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    pub outcome: AttemptOutcome,
}

/// Why an extraction ended without a reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// The upload could not be turned into pixels; ask for a different file.
    DecodeFailure(String),
    /// The image decoded fine but no strategy produced a plausible reading;
    /// ask for a retake.
    NoCandidateFound,
}

/// Caller-facing summary of an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Extracted,
    NoCandidate,
    Undecodable,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub candidate: Candidate,
    pub attempts: Vec<StrategyAttempt>,
    pub failure: Option<ExtractionFailure>,
}

impl Extraction {
    pub fn reading(&self) -> &str {
        &self.candidate.reading
    }

    pub fn status(&self) -> ExtractionStatus {
        match &self.failure {
            None => ExtractionStatus::Extracted,
            Some(ExtractionFailure::NoCandidateFound) => ExtractionStatus::NoCandidate,
            Some(ExtractionFailure::DecodeFailure(_)) => ExtractionStatus::Undecodable,
        }
    }

    /// The strategies that ran, in invocation order.
    pub fn invoked(&self) -> Vec<StrategyKind> {
        self.attempts.iter().map(|a| a.strategy).collect()
    }
}
