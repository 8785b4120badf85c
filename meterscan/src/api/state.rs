use std::sync::Arc;

use crate::classifier::{AuthenticityClassifier, HeuristicClassifier};
use crate::config::Config;
use crate::ocr::TextRecognizer;
use crate::reading::ReadingPipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<ReadingPipeline>,
    pub classifier: Arc<dyn AuthenticityClassifier>,
    /// Whether the recognition engine started; reported by health checks.
    pub ocr_available: bool,
}

impl AppState {
    pub fn new(config: Config, recognizer: Arc<dyn TextRecognizer>) -> Self {
        let ocr_available = recognizer.is_available();
        let pipeline = ReadingPipeline::new(recognizer, &config);
        let classifier = HeuristicClassifier::new(&config.classifier);

        Self::with_components(
            config,
            Arc::new(pipeline),
            Arc::new(classifier),
            ocr_available,
        )
    }

    pub fn with_components(
        config: Config,
        pipeline: Arc<ReadingPipeline>,
        classifier: Arc<dyn AuthenticityClassifier>,
        ocr_available: bool,
    ) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            classifier,
            ocr_available,
        }
    }
}
