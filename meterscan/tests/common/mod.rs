#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{GrayImage, ImageFormat, Rgb, RgbImage};

use meterscan::config::Config;
use meterscan::error::{MeterError, Result};
use meterscan::ocr::{PageSegMode, TextRecognizer};
use meterscan::reading::{ReadingPipeline, RecognitionStrategy, StrategyKind};

/// Shared record of which strategies ran, in order.
pub type Trace = Arc<Mutex<Vec<StrategyKind>>>;

pub fn new_trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

/// What a stub strategy does when invoked.
#[derive(Clone)]
pub enum Behavior {
    Text(&'static str),
    Fail(&'static str),
    Hang,
}

pub struct StubStrategy {
    kind: StrategyKind,
    behavior: Behavior,
    trace: Trace,
}

impl StubStrategy {
    pub fn new(kind: StrategyKind, behavior: Behavior, trace: &Trace) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior,
            trace: trace.clone(),
        })
    }
}

#[async_trait]
impl RecognitionStrategy for StubStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn run(&self, _image: Arc<RgbImage>) -> Result<String> {
        self.trace.lock().unwrap().push(self.kind);
        match &self.behavior {
            Behavior::Text(text) => Ok(text.to_string()),
            Behavior::Fail(msg) => Err(MeterError::Ocr(msg.to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

/// Pipeline over three stubs sharing one trace.
pub fn stub_pipeline(
    primary: Behavior,
    enhanced: Behavior,
    contour: Behavior,
    trace: &Trace,
    timeout: Duration,
) -> ReadingPipeline {
    ReadingPipeline::with_strategies(
        StubStrategy::new(StrategyKind::Primary, primary, trace),
        StubStrategy::new(StrategyKind::Enhanced, enhanced, trace),
        StubStrategy::new(StrategyKind::Contour, contour, trace),
        Config::default().ocr,
        timeout,
    )
}

/// Recognizer whose engine is never available.
pub struct OfflineRecognizer;

#[async_trait]
impl TextRecognizer for OfflineRecognizer {
    async fn recognize(&self, _image: &GrayImage, _mode: PageSegMode) -> Result<String> {
        Err(MeterError::OcrUnavailable("engine offline".to_string()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Dark photo with `digits` bright digit-sized cells, like a drum counter.
pub fn meter_photo(digits: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(60 + digits * 30, 80, Rgb([12, 12, 12]));
    for i in 0..digits {
        for y in 30..50 {
            for x in (30 + i * 30)..(42 + i * 30) {
                img.put_pixel(x, y, Rgb([235, 235, 235]));
            }
        }
    }
    img
}

pub fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode test image");
    buf
}

pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    encode(&RgbImage::new(width, height), ImageFormat::Png)
}
