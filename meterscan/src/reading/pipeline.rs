use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::config::{Config, OcrConfig};
use crate::error::MeterError;
use crate::ocr::{decode_image, TextRecognizer};

use super::normalize::normalize_ocr_text;
use super::strategy::{
    ContourFallbackStrategy, EnhancedOcrStrategy, PrimaryOcrStrategy, RecognitionStrategy,
};
use super::types::{
    AttemptOutcome, Candidate, Extraction, ExtractionFailure, StrategyAttempt, StrategyKind,
    ValidationVerdict,
};
use super::validate::validate_reading;

/// Position in the fallback ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    NotStarted,
    TriedPrimary,
    TriedEnhanced,
    TriedContour,
    Done,
}

impl PipelineState {
    /// The strategy to run from this state, if any remain.
    fn next_strategy(self) -> Option<StrategyKind> {
        match self {
            Self::NotStarted => Some(StrategyKind::Primary),
            Self::TriedPrimary => Some(StrategyKind::Enhanced),
            Self::TriedEnhanced => Some(StrategyKind::Contour),
            Self::TriedContour | Self::Done => None,
        }
    }

    fn after(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Primary => Self::TriedPrimary,
            StrategyKind::Enhanced => Self::TriedEnhanced,
            StrategyKind::Contour => Self::TriedContour,
        }
    }
}

/// Runs primary OCR, enhanced OCR and the contour fallback in that order and
/// stops at the first plausible reading.
///
/// Extraction never fails: strategy errors and timeouts become attempt
/// records, and exhausting the ladder yields the empty candidate.
pub struct ReadingPipeline {
    primary: Arc<dyn RecognitionStrategy>,
    enhanced: Arc<dyn RecognitionStrategy>,
    contour: Arc<dyn RecognitionStrategy>,
    ocr_config: OcrConfig,
    strategy_timeout: Duration,
}

impl ReadingPipeline {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: &Config) -> Self {
        let pipeline = &config.pipeline;
        Self::with_strategies(
            Arc::new(PrimaryOcrStrategy::new(recognizer.clone(), pipeline)),
            Arc::new(EnhancedOcrStrategy::new(recognizer.clone(), pipeline)),
            Arc::new(ContourFallbackStrategy::new(recognizer, pipeline)),
            config.ocr.clone(),
            Duration::from_secs(pipeline.strategy_timeout_secs),
        )
    }

    pub fn with_strategies(
        primary: Arc<dyn RecognitionStrategy>,
        enhanced: Arc<dyn RecognitionStrategy>,
        contour: Arc<dyn RecognitionStrategy>,
        ocr_config: OcrConfig,
        strategy_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            enhanced,
            contour,
            ocr_config,
            strategy_timeout,
        }
    }

    fn strategy(&self, kind: StrategyKind) -> &Arc<dyn RecognitionStrategy> {
        match kind {
            StrategyKind::Primary => &self.primary,
            StrategyKind::Enhanced => &self.enhanced,
            StrategyKind::Contour => &self.contour,
        }
    }

    /// Decode the upload once, then walk the ladder over the decoded pixels.
    pub async fn extract(&self, bytes: impl Into<Arc<[u8]>>) -> Extraction {
        let bytes: Arc<[u8]> = bytes.into();
        let ocr_config = self.ocr_config.clone();
        let decoded = tokio::task::spawn_blocking(move || decode_image(&bytes, &ocr_config)).await;

        let image = match decoded {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => {
                warn!(error = %e, "Meter image could not be decoded");
                return Self::undecodable(e.to_string());
            }
            Err(e) => {
                warn!(error = %e, "Image decode task panicked");
                return Self::undecodable(format!("Decode task failed: {e}"));
            }
        };

        self.extract_image(Arc::new(image)).await
    }

    fn undecodable(reason: String) -> Extraction {
        Extraction {
            candidate: Candidate::empty(),
            attempts: Vec::new(),
            failure: Some(ExtractionFailure::DecodeFailure(reason)),
        }
    }

    pub async fn extract_image(&self, image: Arc<RgbImage>) -> Extraction {
        let mut state = PipelineState::NotStarted;
        let mut attempts = Vec::with_capacity(StrategyKind::ORDER.len());
        let mut candidate = Candidate::empty();

        while let Some(kind) = state.next_strategy() {
            let attempt = self.attempt(kind, image.clone()).await;
            let accepted = matches!(attempt.outcome, AttemptOutcome::Accepted);

            if accepted {
                candidate = Candidate {
                    reading: attempt.normalized.clone().unwrap_or_default(),
                    strategy: Some(kind),
                };
            }
            attempts.push(attempt);

            state = if accepted {
                PipelineState::Done
            } else {
                PipelineState::after(kind)
            };
        }

        let failure = if candidate.is_empty() {
            info!(attempts = attempts.len(), "No plausible meter reading found");
            Some(ExtractionFailure::NoCandidateFound)
        } else {
            info!(
                reading = %candidate.reading,
                strategy = ?candidate.strategy,
                "Meter reading extracted"
            );
            None
        };

        Extraction {
            candidate,
            attempts,
            failure,
        }
    }

    async fn attempt(&self, kind: StrategyKind, image: Arc<RgbImage>) -> StrategyAttempt {
        let strategy = self.strategy(kind);
        debug!(strategy = %kind, "Running recognition strategy");

        let raw = match tokio::time::timeout(self.strategy_timeout, strategy.run(image)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(strategy = %kind, error = %e, "Recognition strategy failed");
                return StrategyAttempt {
                    strategy: kind,
                    raw: None,
                    normalized: None,
                    outcome: AttemptOutcome::Failed(e.to_string()),
                };
            }
            Err(_) => {
                let err = MeterError::Timeout(self.strategy_timeout);
                warn!(strategy = %kind, error = %err, "Recognition strategy abandoned");
                return StrategyAttempt {
                    strategy: kind,
                    raw: None,
                    normalized: None,
                    outcome: AttemptOutcome::TimedOut,
                };
            }
        };

        let normalized = if kind.needs_normalization() {
            normalize_ocr_text(&raw)
        } else {
            raw.clone()
        };

        let outcome = match validate_reading(&normalized) {
            ValidationVerdict::Accepted => AttemptOutcome::Accepted,
            ValidationVerdict::Rejected(reason) => {
                debug!(strategy = %kind, normalized = %normalized, %reason, "Reading rejected");
                AttemptOutcome::Rejected(reason)
            }
        };

        StrategyAttempt {
            strategy: kind,
            raw: Some(raw),
            normalized: Some(normalized),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::reading::types::RejectReason;
    use async_trait::async_trait;

    struct Fixed {
        kind: StrategyKind,
        output: std::result::Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl RecognitionStrategy for Fixed {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        async fn run(&self, _image: Arc<RgbImage>) -> Result<String> {
            self.output
                .map(str::to_string)
                .map_err(|e| MeterError::Ocr(e.to_string()))
        }
    }

    fn fixed(
        kind: StrategyKind,
        output: std::result::Result<&'static str, &'static str>,
    ) -> Arc<dyn RecognitionStrategy> {
        Arc::new(Fixed { kind, output })
    }

    fn pipeline(
        primary: std::result::Result<&'static str, &'static str>,
        enhanced: std::result::Result<&'static str, &'static str>,
        contour: std::result::Result<&'static str, &'static str>,
    ) -> ReadingPipeline {
        ReadingPipeline::with_strategies(
            fixed(StrategyKind::Primary, primary),
            fixed(StrategyKind::Enhanced, enhanced),
            fixed(StrategyKind::Contour, contour),
            Config::default().ocr,
            Duration::from_secs(5),
        )
    }

    fn photo() -> Arc<RgbImage> {
        Arc::new(RgbImage::new(64, 64))
    }

    #[test]
    fn test_state_transitions_follow_fixed_order() {
        let mut state = PipelineState::NotStarted;
        let mut order = Vec::new();
        while let Some(kind) = state.next_strategy() {
            order.push(kind);
            state = PipelineState::after(kind);
        }

        assert_eq!(order, StrategyKind::ORDER.to_vec());
        assert_eq!(state, PipelineState::TriedContour);
        assert_eq!(PipelineState::Done.next_strategy(), None);
    }

    #[tokio::test]
    async fn test_primary_result_is_normalized() {
        let result = pipeline(Ok(" 12O34I "), Ok("9999"), Ok("0123"))
            .extract_image(photo())
            .await;

        assert_eq!(result.reading(), "120341");
        assert_eq!(result.candidate.strategy, Some(StrategyKind::Primary));
        assert_eq!(result.attempts[0].raw.as_deref(), Some(" 12O34I "));
        assert!(result.failure.is_none());
    }

    #[tokio::test]
    async fn test_rejected_reading_advances() {
        let result = pipeline(Ok("1111"), Ok("kWh 4521"), Ok("0123"))
            .extract_image(photo())
            .await;

        assert_eq!(result.reading(), "4521");
        assert_eq!(result.candidate.strategy, Some(StrategyKind::Enhanced));
        assert_eq!(
            result.attempts[0].outcome,
            AttemptOutcome::Rejected(RejectReason::UniformDigits)
        );
    }

    #[tokio::test]
    async fn test_contour_output_skips_normalization() {
        let result = pipeline(Ok(""), Err("engine down"), Ok("12O34"))
            .extract_image(photo())
            .await;

        assert_eq!(result.reading(), "");
        let contour = &result.attempts[2];
        assert_eq!(contour.normalized.as_deref(), Some("12O34"));
        assert_eq!(
            contour.outcome,
            AttemptOutcome::Rejected(RejectReason::NonNumeric)
        );
        assert_eq!(result.failure, Some(ExtractionFailure::NoCandidateFound));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_skip_strategies() {
        let result = pipeline(Ok("1234"), Ok("1234"), Ok("1234"))
            .extract(b"not an image".to_vec())
            .await;

        assert!(result.attempts.is_empty());
        assert_eq!(result.reading(), "");
        assert!(matches!(
            result.failure,
            Some(ExtractionFailure::DecodeFailure(_))
        ));
    }
}
