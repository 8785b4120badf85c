use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;
use tracing::{debug, info};

use crate::config::{ContourDecoding, PipelineConfig};
use crate::error::{MeterError, Result};
use crate::ocr::{PageSegMode, Preprocessor, TextRecognizer};

use super::contour::{glyph_tile, sweep_thresholds, ThresholdScan};
use super::normalize::normalize_ocr_text;
use super::types::StrategyKind;

/// White border added around each cropped glyph before recognition.
const GLYPH_PADDING: u32 = 4;

/// One rung of the fallback ladder.
///
/// `run` returns the strategy's raw text. Errors stay inside the strategy
/// boundary: the pipeline records them and moves on.
#[async_trait]
pub trait RecognitionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn run(&self, image: Arc<RgbImage>) -> Result<String>;
}

/// Run CPU-bound image work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| MeterError::Internal(format!("Image task panicked: {e}")))
}

pub struct PrimaryOcrStrategy {
    recognizer: Arc<dyn TextRecognizer>,
    preprocessor: Preprocessor,
}

impl PrimaryOcrStrategy {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: &PipelineConfig) -> Self {
        Self {
            recognizer,
            preprocessor: Preprocessor::new(config),
        }
    }
}

#[async_trait]
impl RecognitionStrategy for PrimaryOcrStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Primary
    }

    async fn run(&self, image: Arc<RgbImage>) -> Result<String> {
        let pre = self.preprocessor.clone();
        let variant = blocking(move || pre.grayscale(&image)).await?;

        self.recognizer
            .recognize(&variant.image, PageSegMode::SingleBlock)
            .await
    }
}

pub struct EnhancedOcrStrategy {
    recognizer: Arc<dyn TextRecognizer>,
    preprocessor: Preprocessor,
    threshold: u8,
}

impl EnhancedOcrStrategy {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: &PipelineConfig) -> Self {
        Self {
            recognizer,
            preprocessor: Preprocessor::new(config),
            threshold: config.enhanced_threshold,
        }
    }
}

#[async_trait]
impl RecognitionStrategy for EnhancedOcrStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Enhanced
    }

    async fn run(&self, image: Arc<RgbImage>) -> Result<String> {
        let pre = self.preprocessor.clone();
        let threshold = self.threshold;
        let variant = blocking(move || {
            let enhanced = pre.enhanced(&image);
            pre.binarized(&enhanced.image, threshold)
        })
        .await?;

        self.recognizer
            .recognize(&variant.image, PageSegMode::SingleBlock)
            .await
    }
}

pub struct ContourFallbackStrategy {
    recognizer: Arc<dyn TextRecognizer>,
    preprocessor: Preprocessor,
    thresholds: Vec<u8>,
    decoding: ContourDecoding,
}

impl ContourFallbackStrategy {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: &PipelineConfig) -> Self {
        Self {
            recognizer,
            preprocessor: Preprocessor::new(config),
            thresholds: config.contour_thresholds.clone(),
            decoding: config.contour_decoding,
        }
    }

    /// Recognize each region on its own and require exactly one digit apiece.
    async fn decode_glyphs(&self, scan: &ThresholdScan) -> Result<String> {
        let mut digits = String::with_capacity(scan.regions.len());

        for (index, region) in scan.regions.iter().enumerate() {
            let tile = glyph_tile(&scan.mask, region, GLYPH_PADDING);
            let raw = self
                .recognizer
                .recognize(&tile, PageSegMode::SingleChar)
                .await?;
            let glyph = normalize_ocr_text(&raw);

            if glyph.len() != 1 {
                return Err(MeterError::Processing(format!(
                    "Region {index} at x={} decoded to '{glyph}', expected one digit",
                    region.x
                )));
            }
            digits.push_str(&glyph);
        }

        Ok(digits)
    }
}

/// Legacy stand-in output: `0123...` with one character per region.
pub fn placeholder_digits(count: usize) -> String {
    (0..count)
        .map(|i| char::from(b'0' + (i % 10) as u8))
        .collect()
}

#[async_trait]
impl RecognitionStrategy for ContourFallbackStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Contour
    }

    async fn run(&self, image: Arc<RgbImage>) -> Result<String> {
        let pre = self.preprocessor.clone();
        let thresholds = self.thresholds.clone();
        let scan = blocking(move || {
            let enhanced = pre.enhanced(&image);
            sweep_thresholds(&enhanced.image, &thresholds, &pre)
        })
        .await?
        .ok_or_else(|| {
            MeterError::Processing("No threshold produced 4-7 digit-like regions".to_string())
        })?;

        info!(
            threshold = scan.threshold,
            regions = scan.regions.len(),
            decoding = %self.decoding,
            "Best contour detection"
        );

        match self.decoding {
            ContourDecoding::Placeholder => Ok(placeholder_digits(scan.regions.len())),
            ContourDecoding::Glyph => {
                let digits = self.decode_glyphs(&scan).await?;
                debug!(digits = %digits, "Decoded contour glyphs");
                Ok(digits)
            }
        }
    }
}
