mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{create_test_png, new_trace, stub_pipeline, Behavior};
use meterscan::reading::{
    AttemptOutcome, ExtractionFailure, ExtractionStatus, RejectReason, StrategyKind,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn photo() -> Arc<image::RgbImage> {
    Arc::new(image::RgbImage::new(64, 64))
}

#[tokio::test]
async fn valid_primary_short_circuits() {
    let trace = new_trace();
    let pipeline = stub_pipeline(
        Behavior::Text("04521"),
        Behavior::Text("9876"),
        Behavior::Text("1234"),
        &trace,
        TIMEOUT,
    );

    let result = pipeline.extract_image(photo()).await;

    assert_eq!(result.reading(), "04521");
    assert_eq!(result.candidate.strategy, Some(StrategyKind::Primary));
    assert_eq!(*trace.lock().unwrap(), vec![StrategyKind::Primary]);
    assert_eq!(result.status(), ExtractionStatus::Extracted);
}

#[tokio::test]
async fn primary_error_does_not_stop_the_ladder() {
    let trace = new_trace();
    let pipeline = stub_pipeline(
        Behavior::Fail("tesseract crashed"),
        Behavior::Text("7 3 2 1"),
        Behavior::Text("1234"),
        &trace,
        TIMEOUT,
    );

    let result = pipeline.extract_image(photo()).await;

    assert_eq!(result.reading(), "7321");
    assert_eq!(result.candidate.strategy, Some(StrategyKind::Enhanced));
    assert_eq!(
        *trace.lock().unwrap(),
        vec![StrategyKind::Primary, StrategyKind::Enhanced]
    );
    assert!(matches!(
        result.attempts[0].outcome,
        AttemptOutcome::Failed(ref msg) if msg.contains("tesseract crashed")
    ));
}

#[tokio::test]
async fn nothing_valid_yields_empty_reading() {
    let trace = new_trace();
    let pipeline = stub_pipeline(
        Behavior::Text("1111"),
        Behavior::Text("12"),
        Behavior::Fail("no threshold"),
        &trace,
        TIMEOUT,
    );

    let result = pipeline.extract_image(photo()).await;

    assert_eq!(result.reading(), "");
    assert_eq!(result.candidate.strategy, None);
    assert_eq!(result.failure, Some(ExtractionFailure::NoCandidateFound));
    assert_eq!(result.status(), ExtractionStatus::NoCandidate);

    let outcomes: Vec<AttemptOutcome> = result.attempts.iter().map(|a| a.outcome.clone()).collect();
    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::Rejected(RejectReason::UniformDigits),
            AttemptOutcome::Rejected(RejectReason::TooShort),
            AttemptOutcome::Failed("OCR error: no threshold".to_string()),
        ]
    );
}

#[tokio::test]
async fn strategies_run_in_fixed_order() {
    let trace = new_trace();
    let pipeline = stub_pipeline(
        Behavior::Text(""),
        Behavior::Text(""),
        Behavior::Text(""),
        &trace,
        TIMEOUT,
    );

    let result = pipeline.extract_image(photo()).await;

    let expected = vec![
        StrategyKind::Primary,
        StrategyKind::Enhanced,
        StrategyKind::Contour,
    ];
    assert_eq!(*trace.lock().unwrap(), expected);
    assert_eq!(result.invoked(), expected);
}

#[tokio::test]
async fn hanging_strategy_is_cut_off() {
    let trace = new_trace();
    let pipeline = stub_pipeline(
        Behavior::Hang,
        Behavior::Text("4052"),
        Behavior::Text("1234"),
        &trace,
        Duration::from_millis(50),
    );

    let result = pipeline.extract_image(photo()).await;

    assert_eq!(result.reading(), "4052");
    assert_eq!(result.attempts[0].outcome, AttemptOutcome::TimedOut);
    assert_eq!(result.attempts[0].raw, None);
}

#[tokio::test]
async fn contour_result_is_validated_too() {
    let trace = new_trace();
    let pipeline = stub_pipeline(
        Behavior::Text(""),
        Behavior::Text(""),
        Behavior::Text("0000"),
        &trace,
        TIMEOUT,
    );

    let result = pipeline.extract_image(photo()).await;

    assert_eq!(result.reading(), "");
    assert_eq!(
        result.attempts[2].outcome,
        AttemptOutcome::Rejected(RejectReason::UniformDigits)
    );
}

#[tokio::test]
async fn decode_failure_is_reported_distinctly() {
    let trace = new_trace();
    let pipeline = stub_pipeline(
        Behavior::Text("4052"),
        Behavior::Text("4052"),
        Behavior::Text("4052"),
        &trace,
        TIMEOUT,
    );

    let result = pipeline.extract(b"\x89PNG truncated".to_vec()).await;

    assert!(trace.lock().unwrap().is_empty());
    assert_eq!(result.status(), ExtractionStatus::Undecodable);
    assert!(matches!(
        result.failure,
        Some(ExtractionFailure::DecodeFailure(_))
    ));
}

#[tokio::test]
async fn tiny_image_is_undecodable() {
    let trace = new_trace();
    let pipeline = stub_pipeline(
        Behavior::Text("4052"),
        Behavior::Text("4052"),
        Behavior::Text("4052"),
        &trace,
        TIMEOUT,
    );

    let result = pipeline.extract(create_test_png(4, 4)).await;

    match result.failure {
        Some(ExtractionFailure::DecodeFailure(reason)) => {
            assert!(reason.contains("too small"), "{reason}")
        }
        other => panic!("expected decode failure, got {other:?}"),
    }
}

#[tokio::test]
async fn encoded_photo_reaches_strategies() {
    let trace = new_trace();
    let pipeline = stub_pipeline(
        Behavior::Text("12O34I"),
        Behavior::Text("9876"),
        Behavior::Text("1234"),
        &trace,
        TIMEOUT,
    );

    let result = pipeline.extract(create_test_png(100, 50)).await;

    assert_eq!(result.reading(), "120341");
    assert_eq!(result.attempts[0].raw.as_deref(), Some("12O34I"));
}
