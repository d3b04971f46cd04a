//! Replay of a recorded scan from numbered image files.

use crate::source::{CaptureError, FrameData, FrameSource};
use std::ops::Range;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Placeholder replaced by the frame number in a file pattern.
const INDEX_PLACEHOLDER: &str = "{}";

/// Decodes a fixed sequence of image files, one per frame.
pub struct ReplaySource {
    paths: Vec<PathBuf>,
    cursor: usize,
    start_time: Instant,
    active: bool,
    resolution: (u32, u32),
}

impl ReplaySource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        info!("Replay source with {} frames", paths.len());
        Self {
            paths,
            cursor: 0,
            start_time: Instant::now(),
            active: true,
            resolution: (0, 0),
        }
    }

    /// Build the sequence from a pattern such as `output/scan{}.jpg`.
    pub fn from_pattern(pattern: &str, indices: Range<u32>) -> Result<Self, CaptureError> {
        if !pattern.contains(INDEX_PLACEHOLDER) {
            return Err(CaptureError::UnsupportedFormat(format!(
                "replay pattern '{}' has no '{}' placeholder",
                pattern, INDEX_PLACEHOLDER
            )));
        }
        let paths = indices
            .map(|i| PathBuf::from(pattern.replace(INDEX_PLACEHOLDER, &i.to_string())))
            .collect();
        Ok(Self::new(paths))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError> {
        if !self.active {
            return Ok(None);
        }
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };

        let image = image::open(path)?.to_rgb8();
        self.resolution = image.dimensions();
        self.cursor += 1;
        debug!("Replayed frame {} from {}", self.cursor, path.display());

        Ok(Some(FrameData::new(
            image,
            self.start_time.elapsed().as_secs_f64(),
            self.cursor as u64,
        )))
    }

    fn frame_rate(&self) -> Option<f32> {
        None
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn is_active(&self) -> bool {
        self.active && self.cursor < self.paths.len()
    }

    fn stop(&mut self) {
        self.active = false;
        info!("Replay stopped after {} frames", self.cursor);
    }

    /// Rewind, and learn the frame size from the first file's header.
    fn restart(&mut self) -> Result<(), CaptureError> {
        if let Some(first) = self.paths.first() {
            self.resolution = image::image_dimensions(first)?;
        }
        self.cursor = 0;
        self.active = true;
        self.start_time = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_pattern_expansion() {
        let source = ReplaySource::from_pattern("output/scan{}.jpg", 5..8).unwrap();
        assert_eq!(
            source.paths(),
            &[
                PathBuf::from("output/scan5.jpg"),
                PathBuf::from("output/scan6.jpg"),
                PathBuf::from("output/scan7.jpg"),
            ]
        );
    }

    #[test]
    fn test_pattern_without_placeholder() {
        assert!(matches!(
            ReplaySource::from_pattern("output/scan.jpg", 0..3),
            Err(CaptureError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_replays_files_then_ends() {
        let dir = tempdir().unwrap();
        for i in 0..2u8 {
            let image = RgbImage::from_pixel(3, 2, Rgb([i * 100, 0, 0]));
            image.save(dir.path().join(format!("frame{}.png", i))).unwrap();
        }
        let pattern = dir.path().join("frame{}.png");
        let mut source = ReplaySource::from_pattern(pattern.to_str().unwrap(), 0..2).unwrap();

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.dimensions(), (3, 2));
        assert_eq!(source.resolution(), (3, 2));
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.image.get_pixel(0, 0), &Rgb([100, 0, 0]));
        assert!(source.next_frame().unwrap().is_none());

        source.restart().unwrap();
        assert_eq!(source.next_frame().unwrap().unwrap().frame_number, 1);
    }

    #[test]
    fn test_restart_reads_frame_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame0.png");
        RgbImage::new(5, 4).save(&path).unwrap();

        let mut source = ReplaySource::new(vec![path]);
        assert_eq!(source.resolution(), (0, 0));
        source.restart().unwrap();
        assert_eq!(source.resolution(), (5, 4));
        assert_eq!(source.next_frame().unwrap().unwrap().frame_number, 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let mut source = ReplaySource::new(vec![dir.path().join("absent.png")]);
        assert!(source.next_frame().is_err());
        assert!(source.restart().is_err());
    }
}
