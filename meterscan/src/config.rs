use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T
where
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Parse a comma-separated list of thresholds, e.g. `100,127,150,180`.
///
/// Any unparseable entry invalidates the whole list so that a typo never
/// silently shrinks the sweep.
fn parse_thresholds(var: &str, default: &[u8]) -> Vec<u8> {
    match env::var(var) {
        Ok(val) if !val.trim().is_empty() => {
            let parsed: std::result::Result<Vec<u8>, _> =
                val.split(',').map(|s| s.trim().parse::<u8>()).collect();
            match parsed {
                Ok(list) if !list.is_empty() => list,
                Ok(_) => default.to_vec(),
                Err(e) => {
                    tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                    default.to_vec()
                }
            }
        }
        _ => default.to_vec(),
    }
}

pub const DEFAULT_CONTOUR_THRESHOLDS: [u8; 4] = [100, 127, 150, 180];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub pipeline: PipelineConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for multipart request bodies, in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Directory holding Tesseract's `tessdata`. `None` lets the engine use
    /// its compiled-in default.
    pub tessdata_path: Option<String>,
    pub languages: String,
    pub min_image_dimension: u32,
    pub max_image_dimension: u32,
}

/// How the contour fallback turns detected regions into a digit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourDecoding {
    /// Recognize every region as a single character.
    Glyph,
    /// Emit `0123...` sized to the region count without looking at the glyphs.
    Placeholder,
}

impl FromStr for ContourDecoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "glyph" => Ok(Self::Glyph),
            "placeholder" | "region_count" => Ok(Self::Placeholder),
            other => Err(format!("unknown contour decoding mode '{other}'")),
        }
    }
}

impl fmt::Display for ContourDecoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glyph => write!(f, "glyph"),
            Self::Placeholder => write!(f, "placeholder"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub strategy_timeout_secs: u64,
    pub enhanced_threshold: u8,
    pub contour_thresholds: Vec<u8>,
    pub clahe_clip_limit: f32,
    pub clahe_tile_grid: u32,
    pub contour_decoding: ContourDecoding,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy_timeout_secs: 30,
            enhanced_threshold: 150,
            contour_thresholds: DEFAULT_CONTOUR_THRESHOLDS.to_vec(),
            clahe_clip_limit: 2.0,
            clahe_tile_grid: 8,
            contour_decoding: ContourDecoding::Glyph,
        }
    }
}

/// What the authenticity check reports when the classifier itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierFailurePolicy {
    /// Treat the image as genuine.
    FailOpen,
    /// Treat the image as not genuine.
    FailClosed,
}

impl ClassifierFailurePolicy {
    pub fn verdict_on_failure(&self) -> bool {
        matches!(self, Self::FailOpen)
    }
}

impl FromStr for ClassifierFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Ok(Self::FailOpen),
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            other => Err(format!("unknown classifier failure policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub failure_policy: ClassifierFailurePolicy,
    pub min_dimension: u32,
    /// Minimum grayscale standard deviation; flatter images are rejected.
    pub min_contrast: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            failure_policy: ClassifierFailurePolicy::FailOpen,
            min_dimension: 32,
            min_contrast: 8.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let pipeline_defaults = PipelineConfig::default();
        let classifier_defaults = ClassifierConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("METERSCAN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("METERSCAN_PORT", 8000),
                max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            },
            ocr: OcrConfig {
                tessdata_path: env::var("OCR_TESSDATA_PATH").ok(),
                languages: env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string()),
                min_image_dimension: parse_env_or("OCR_MIN_DIMENSION", 16),
                max_image_dimension: parse_env_or("OCR_MAX_DIMENSION", 4096),
            },
            pipeline: PipelineConfig {
                strategy_timeout_secs: parse_env_or(
                    "OCR_STRATEGY_TIMEOUT",
                    pipeline_defaults.strategy_timeout_secs,
                ),
                enhanced_threshold: parse_env_or(
                    "ENHANCED_THRESHOLD",
                    pipeline_defaults.enhanced_threshold,
                ),
                contour_thresholds: parse_thresholds(
                    "CONTOUR_THRESHOLDS",
                    &DEFAULT_CONTOUR_THRESHOLDS,
                ),
                clahe_clip_limit: parse_env_or("CLAHE_CLIP_LIMIT", pipeline_defaults.clahe_clip_limit),
                clahe_tile_grid: parse_env_or("CLAHE_TILE_GRID", pipeline_defaults.clahe_tile_grid)
                    .max(1),
                contour_decoding: parse_env_or(
                    "CONTOUR_DECODING",
                    pipeline_defaults.contour_decoding,
                ),
            },
            classifier: ClassifierConfig {
                failure_policy: parse_env_or(
                    "CLASSIFIER_FAILURE_POLICY",
                    classifier_defaults.failure_policy,
                ),
                min_dimension: parse_env_or(
                    "CLASSIFIER_MIN_DIMENSION",
                    classifier_defaults.min_dimension,
                ),
                min_contrast: parse_env_or(
                    "CLASSIFIER_MIN_CONTRAST",
                    classifier_defaults.min_contrast,
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
