//! Laser stripe profile extraction.
//!
//! Every scan line of a frame is reduced to the column of its brightest
//! stripe pixel. Samples are first thresholded so that only the saturated
//! laser stripe survives, then compared by HLS lightness.

use crate::error::{Result, ScanError};
use crate::geometry::ScanGeometry;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Default per-channel brightness cutoff separating the stripe from the scene.
pub const STRIPE_THRESHOLD: u8 = 240;

/// How samples above the cutoff are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Samples at or below the cutoff become 0, brighter samples are kept.
    #[default]
    ToZero,
    /// Samples at or below the cutoff become 0, brighter samples become 255.
    Binary,
}

/// Preprocessing parameters for [`ProfileExtractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub threshold: u8,
    pub mode: ThresholdMode,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            threshold: STRIPE_THRESHOLD,
            mode: ThresholdMode::ToZero,
        }
    }
}

impl ExtractorConfig {
    fn apply(&self, sample: u8) -> u8 {
        if sample <= self.threshold {
            0
        } else {
            match self.mode {
                ThresholdMode::ToZero => sample,
                ThresholdMode::Binary => u8::MAX,
            }
        }
    }

    /// HLS lightness of a thresholded RGB sample, `round((max + min) / 2)`.
    pub fn lightness(&self, rgb: [u8; 3]) -> u8 {
        let [r, g, b] = rgb.map(|c| self.apply(c));
        let max = r.max(g).max(b) as u16;
        let min = r.min(g).min(b) as u16;
        ((max + min + 1) / 2) as u8
    }
}

/// Brightest stripe column per scan line.
///
/// The length always equals the scan height of the geometry it was
/// extracted with. Lines outside the active rows hold the region's left edge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    columns: Vec<u32>,
}

impl Profile {
    /// Profile of `height` lines, all at column `fill`.
    pub fn filled(height: usize, fill: u32) -> Self {
        Self {
            columns: vec![fill; height],
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.columns.iter().copied()
    }
}

impl From<Vec<u32>> for Profile {
    fn from(columns: Vec<u32>) -> Self {
        Self { columns }
    }
}

impl Index<usize> for Profile {
    type Output = u32;

    fn index(&self, line: usize) -> &u32 {
        &self.columns[line]
    }
}

/// Reusable extractor owning the profile buffer overwritten on every frame.
#[derive(Debug, Clone, Default)]
pub struct ProfileExtractor {
    config: ExtractorConfig,
    profile: Profile,
}

impl ProfileExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            profile: Profile::default(),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Profile produced by the last successful extraction.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Extract the stripe profile of `frame`.
    ///
    /// Within each active line the column with the greatest lightness wins,
    /// and a candidate replaces the current best on `>=`, so equal maxima
    /// resolve to the rightmost column. A line with no bright sample at all
    /// therefore lands on `xf - 1`.
    pub fn extract(&mut self, frame: &RgbImage, geometry: &ScanGeometry) -> Result<&Profile> {
        let size = geometry.frame();
        let (width, height) = frame.dimensions();
        if width != size.width || height != size.height {
            return Err(ScanError::InvalidFrameGeometry(format!(
                "frame is {}x{}, expected {}x{}",
                width, height, size.width, size.height
            )));
        }

        let region = geometry.region();
        region.validate(size)?;

        let scan_height = geometry.scan_height();
        if self.profile.len() != scan_height {
            self.profile = Profile::filled(scan_height, region.x0);
        } else {
            self.profile.columns.fill(region.x0);
        }

        for line in region.rows() {
            let mut best = region.x0;
            let mut best_lightness = self.lightness_at(frame, best, line);
            for column in region.columns() {
                let lightness = self.lightness_at(frame, column, line);
                if lightness >= best_lightness {
                    best = column;
                    best_lightness = lightness;
                }
            }
            self.profile.columns[line as usize] = best;
        }

        Ok(&self.profile)
    }

    fn lightness_at(&self, frame: &RgbImage, column: u32, line: u32) -> u8 {
        self.config.lightness(frame.get_pixel(column, line).0)
    }
}

/// One-shot extraction with the default threshold.
pub fn extract_profile(frame: &RgbImage, geometry: &ScanGeometry) -> Result<Profile> {
    let mut extractor = ProfileExtractor::default();
    extractor.extract(frame, geometry)?;
    Ok(extractor.profile)
}
