mod common;

use std::sync::Arc;

use async_trait::async_trait;
use image::{GrayImage, ImageFormat};

use common::{encode, meter_photo, OfflineRecognizer};
use meterscan::config::{Config, ContourDecoding};
use meterscan::error::Result;
use meterscan::ocr::{PageSegMode, TextRecognizer};
use meterscan::reading::{AttemptOutcome, ExtractionStatus, ReadingPipeline, StrategyKind};

fn config_with(decoding: ContourDecoding) -> Config {
    let mut config = Config::default();
    config.pipeline.contour_decoding = decoding;
    config
}

/// Reads nothing from whole images but recognizes single glyphs.
struct GlyphOnly {
    glyphs: std::sync::Mutex<Vec<&'static str>>,
}

#[async_trait]
impl TextRecognizer for GlyphOnly {
    async fn recognize(&self, _image: &GrayImage, mode: PageSegMode) -> Result<String> {
        match mode {
            PageSegMode::SingleBlock => Ok("~~".to_string()),
            PageSegMode::SingleChar => Ok(self.glyphs.lock().unwrap().remove(0).to_string()),
        }
    }
}

#[tokio::test]
async fn placeholder_mode_counts_regions_when_ocr_is_offline() {
    let pipeline = ReadingPipeline::new(
        Arc::new(OfflineRecognizer),
        &config_with(ContourDecoding::Placeholder),
    );

    let result = pipeline
        .extract(encode(&meter_photo(5), ImageFormat::Png))
        .await;

    assert_eq!(result.reading(), "01234");
    assert_eq!(result.candidate.strategy, Some(StrategyKind::Contour));
    assert!(matches!(result.attempts[0].outcome, AttemptOutcome::Failed(_)));
    assert!(matches!(result.attempts[1].outcome, AttemptOutcome::Failed(_)));
}

#[tokio::test]
async fn glyph_mode_needs_a_working_engine() {
    let pipeline = ReadingPipeline::new(
        Arc::new(OfflineRecognizer),
        &config_with(ContourDecoding::Glyph),
    );

    let result = pipeline
        .extract(encode(&meter_photo(5), ImageFormat::Png))
        .await;

    assert_eq!(result.reading(), "");
    assert_eq!(result.status(), ExtractionStatus::NoCandidate);
    assert_eq!(result.attempts.len(), 3);
}

#[tokio::test]
async fn glyph_mode_reads_each_cell() {
    let recognizer = GlyphOnly {
        glyphs: std::sync::Mutex::new(vec!["3", "0", "7", "I", "5"]),
    };
    let pipeline = ReadingPipeline::new(Arc::new(recognizer), &config_with(ContourDecoding::Glyph));

    let result = pipeline
        .extract(encode(&meter_photo(5), ImageFormat::Png))
        .await;

    assert_eq!(result.reading(), "30715");
    assert_eq!(result.candidate.strategy, Some(StrategyKind::Contour));
    assert_eq!(result.invoked().len(), 3);
}

#[tokio::test]
async fn too_few_cells_leave_reading_empty() {
    let pipeline = ReadingPipeline::new(
        Arc::new(OfflineRecognizer),
        &config_with(ContourDecoding::Placeholder),
    );

    let result = pipeline
        .extract(encode(&meter_photo(3), ImageFormat::Png))
        .await;

    assert_eq!(result.reading(), "");
    match &result.attempts[2].outcome {
        AttemptOutcome::Failed(reason) => assert!(reason.contains("No threshold")),
        other => panic!("unexpected contour outcome: {other:?}"),
    }
}
