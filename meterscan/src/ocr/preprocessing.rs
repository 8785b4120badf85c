use crate::config::{OcrConfig, PipelineConfig};
use crate::error::{MeterError, Result};
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// A derived pixel matrix plus the threshold that produced it, if any.
#[derive(Debug, Clone)]
pub struct PreprocessedVariant {
    pub image: GrayImage,
    pub threshold: Option<u8>,
}

/// Builds the image variants consumed by the recognition strategies.
///
/// Every method takes the source by reference and returns a fresh matrix;
/// nothing is modified in place.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    clip_limit: f32,
    tile_grid: u32,
}

impl Preprocessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            clip_limit: config.clahe_clip_limit,
            tile_grid: config.clahe_tile_grid.max(1),
        }
    }

    /// Plain grayscale conversion of the decoded photo.
    pub fn grayscale(&self, img: &RgbImage) -> PreprocessedVariant {
        PreprocessedVariant {
            image: to_grayscale(img),
            threshold: None,
        }
    }

    /// Grayscale followed by CLAHE, not yet binarized.
    pub fn enhanced(&self, img: &RgbImage) -> PreprocessedVariant {
        PreprocessedVariant {
            image: clahe(&to_grayscale(img), self.tile_grid, self.clip_limit),
            threshold: None,
        }
    }

    /// Binarize an already enhanced variant.
    pub fn binarized(&self, enhanced: &GrayImage, threshold: u8) -> PreprocessedVariant {
        PreprocessedVariant {
            image: binarize(enhanced, threshold),
            threshold: Some(threshold),
        }
    }

    /// Binarize, then close and open with a 3x3 square. Used by the contour path.
    pub fn contour_mask(&self, enhanced: &GrayImage, threshold: u8) -> PreprocessedVariant {
        PreprocessedVariant {
            image: close_then_open(&binarize(enhanced, threshold)),
            threshold: Some(threshold),
        }
    }
}

/// Decode raw upload bytes into an RGB matrix.
///
/// 1. Guesses the format from the bytes
/// 2. Rejects images below the minimum dimension
/// 3. Downsizes images above the maximum dimension (aspect preserved)
/// 4. Drops any alpha channel
pub fn decode_image(bytes: &[u8], config: &OcrConfig) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(MeterError::Decode("Empty image buffer".to_string()));
    }

    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MeterError::Decode(format!("Failed to read image: {e}")))?;

    let img = reader
        .decode()
        .map_err(|e| MeterError::Decode(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(MeterError::Decode(format!(
            "Image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    let img = resize_if_needed(img, config.max_image_dimension);

    Ok(img.to_rgb8())
}

/// Resize image if it exceeds maximum dimension while maintaining aspect ratio
///
/// Uses Lanczos3 filter for high-quality downscaling
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Two-level image: strictly brighter than `threshold` becomes 255, the rest 0.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0];
        Luma([if value > threshold { 255 } else { 0 }])
    })
}

/// Closing fills one-pixel gaps in strokes, opening then drops isolated specks.
pub fn close_then_open(binary: &GrayImage) -> GrayImage {
    let closed = morphology::close(binary, Norm::LInf, 1);
    morphology::open(&closed, Norm::LInf, 1)
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `grid x grid` lattice of tiles (fewer when the
/// image is narrower than the grid). Each tile gets its own clipped histogram
/// mapping, and every pixel blends the mappings of the four nearest tile
/// centres bilinearly. `clip_limit <= 0` disables clipping.
pub fn clahe(gray: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let tiles_x = grid.clamp(1, width) as usize;
    let tiles_y = grid.clamp(1, height) as usize;
    let x_bounds = tile_bounds(width, tiles_x);
    let y_bounds = tile_bounds(height, tiles_y);

    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, x1) = x_bounds[tx];
            let (y0, y1) = y_bounds[ty];
            luts[ty * tiles_x + tx] = tile_mapping(gray, x0, x1, y0, y1, clip_limit);
        }
    }

    let columns = interpolation_weights(&x_bounds, width);
    let rows = interpolation_weights(&y_bounds, height);

    GrayImage::from_fn(width, height, |x, y| {
        let v = gray.get_pixel(x, y)[0] as usize;
        let (cx0, cx1, ax) = columns[x as usize];
        let (ry0, ry1, ay) = rows[y as usize];

        let top = (1.0 - ax) * luts[ry0 * tiles_x + cx0][v] as f32
            + ax * luts[ry0 * tiles_x + cx1][v] as f32;
        let bottom = (1.0 - ax) * luts[ry1 * tiles_x + cx0][v] as f32
            + ax * luts[ry1 * tiles_x + cx1][v] as f32;

        Luma([((1.0 - ay) * top + ay * bottom).round().clamp(0.0, 255.0) as u8])
    })
}

/// Half-open `[start, end)` ranges splitting `len` into `count` non-empty tiles.
fn tile_bounds(len: u32, count: usize) -> Vec<(u32, u32)> {
    let len = len as u64;
    let count_u64 = count as u64;
    (0..count_u64)
        .map(|i| ((i * len / count_u64) as u32, ((i + 1) * len / count_u64) as u32))
        .collect()
}

/// For every coordinate along one axis: the two neighbouring tile indices and
/// the weight of the second one.
fn interpolation_weights(bounds: &[(u32, u32)], len: u32) -> Vec<(usize, usize, f32)> {
    let centres: Vec<f32> = bounds
        .iter()
        .map(|&(start, end)| (start + end) as f32 / 2.0 - 0.5)
        .collect();
    let last = centres.len() - 1;

    (0..len)
        .map(|p| {
            let p = p as f32;
            if p <= centres[0] {
                return (0, 0, 0.0);
            }
            if p >= centres[last] {
                return (last, last, 0.0);
            }
            let i = centres
                .windows(2)
                .position(|w| p >= w[0] && p < w[1])
                .unwrap_or(last);
            let i1 = (i + 1).min(last);
            let span = centres[i1] - centres[i];
            let weight = if span > 0.0 { (p - centres[i]) / span } else { 0.0 };
            (i, i1, weight)
        })
        .collect()
}

fn tile_mapping(gray: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let area = (x1 - x0) * (y1 - y0);
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }

        let bonus = excess / 256;
        let residual = (excess % 256) as usize;
        for bin in hist.iter_mut() {
            *bin += bonus;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for bin in hist.iter_mut().step_by(step).take(residual) {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (value, count) in hist.iter().enumerate() {
        cumulative += count;
        lut[value] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Encode a grayscale matrix as PNG bytes for the OCR engine.
pub fn encode_png(gray: &GrayImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    gray.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| MeterError::Processing(format!("Failed to encode image: {e}")))?;
    Ok(output)
}
