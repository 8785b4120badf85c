use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use tracing::debug;

use crate::ocr::Preprocessor;

/// Bounds are exclusive on both ends.
const SIDE_RANGE: (u32, u32) = (8, 200);
const MIN_AREA: f64 = 15.0;
const ASPECT_RANGE: (f64, f64) = (0.3, 3.0);

/// Meter displays carry between 4 and 7 digit wheels or cells.
pub const MIN_DIGIT_REGIONS: usize = 4;
pub const MAX_DIGIT_REGIONS: usize = 7;

/// A bounding box whose size and shape are consistent with a single digit.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Polygon area enclosed by the contour, not the box area.
    pub area: f64,
    pub aspect_ratio: f64,
}

impl DigitRegion {
    fn from_contour(contour: &Contour<u32>) -> Option<Self> {
        let first = contour.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &contour.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let width = max_x - min_x + 1;
        let height = max_y - min_y + 1;

        Some(Self {
            x: min_x,
            y: min_y,
            width,
            height,
            area: polygon_area(contour),
            aspect_ratio: width as f64 / height as f64,
        })
    }

    pub fn is_digit_like(&self) -> bool {
        let (min_side, max_side) = SIDE_RANGE;
        let (min_aspect, max_aspect) = ASPECT_RANGE;

        self.width > min_side
            && self.width < max_side
            && self.height > min_side
            && self.height < max_side
            && self.area > MIN_AREA
            && self.aspect_ratio > min_aspect
            && self.aspect_ratio < max_aspect
    }
}

/// Shoelace area of the traced border.
fn polygon_area(contour: &Contour<u32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64)
        .sum();

    twice_area.abs() / 2.0
}

/// Outermost foreground borders that pass the digit filter, left to right.
pub fn detect_digit_regions(mask: &GrayImage) -> Vec<DigitRegion> {
    let mut regions: Vec<DigitRegion> = find_contours::<u32>(mask)
        .iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter_map(DigitRegion::from_contour)
        .filter(DigitRegion::is_digit_like)
        .collect();

    regions.sort_by_key(|r| r.x);
    regions
}

/// The threshold whose mask yielded the most usable digit regions.
#[derive(Debug, Clone)]
pub struct ThresholdScan {
    pub threshold: u8,
    pub regions: Vec<DigitRegion>,
    /// The filtered binary mask the regions were traced on.
    pub mask: GrayImage,
}

/// Try every threshold in order and keep the best usable one.
///
/// A threshold is usable when its region count lies in
/// `MIN_DIGIT_REGIONS..=MAX_DIGIT_REGIONS`. Ties keep the earlier threshold.
pub fn sweep_thresholds(
    enhanced: &GrayImage,
    thresholds: &[u8],
    preprocessor: &Preprocessor,
) -> Option<ThresholdScan> {
    let mut best: Option<ThresholdScan> = None;

    for &threshold in thresholds {
        let mask = preprocessor.contour_mask(enhanced, threshold).image;
        let regions = detect_digit_regions(&mask);
        let count = regions.len();

        if !(MIN_DIGIT_REGIONS..=MAX_DIGIT_REGIONS).contains(&count) {
            debug!(threshold, regions = count, "Contour threshold unusable");
            continue;
        }

        debug!(threshold, regions = count, "Contour threshold usable");
        if best.as_ref().map_or(true, |b| count > b.regions.len()) {
            best = Some(ThresholdScan {
                threshold,
                regions,
                mask,
            });
        }
    }

    best
}

/// Render one region as dark glyph on a white, padded canvas.
///
/// Only mask pixels inside the region's box are copied, so neighbouring
/// digits never bleed into the tile.
pub fn glyph_tile(mask: &GrayImage, region: &DigitRegion, padding: u32) -> GrayImage {
    let mut tile = GrayImage::from_pixel(
        region.width + 2 * padding,
        region.height + 2 * padding,
        Luma([255]),
    );

    for dy in 0..region.height {
        for dx in 0..region.width {
            let (sx, sy) = (region.x + dx, region.y + dy);
            if sx < mask.width() && sy < mask.height() && mask.get_pixel(sx, sy)[0] > 0 {
                tile.put_pixel(dx + padding, dy + padding, Luma([0]));
            }
        }
    }

    tile
}
