//! Common frame source types and traits.

use image::RgbImage;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur in capture devices and command channels.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Failed to capture frame: {0}")]
    CaptureFailed(String),

    #[error("Stream ended")]
    StreamEnded,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Command channel not connected: {0}")]
    NotConnected(String),

    #[error("Image decoding error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw frame data from a frame source.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// RGB image data.
    pub image: RgbImage,
    /// Frame timestamp in seconds (relative to stream start).
    pub timestamp: f64,
    /// Frame number, starting at 1.
    pub frame_number: u64,
}

impl FrameData {
    pub fn new(image: RgbImage, timestamp: f64, frame_number: u64) -> Self {
        Self {
            image,
            timestamp,
            frame_number,
        }
    }

    /// Get image dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Anything that yields one color frame per request.
pub trait FrameSource {
    /// Get the next frame, blocking until it is available.
    ///
    /// `Ok(None)` means the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError>;

    /// Get the frame rate, if known.
    fn frame_rate(&self) -> Option<f32>;

    /// Get the resolution (width, height), `(0, 0)` until known.
    fn resolution(&self) -> (u32, u32);

    /// Check if the source is still active.
    fn is_active(&self) -> bool;

    /// Stop capturing.
    fn stop(&mut self);

    /// Prepare for a new capture session. Replayable sources rewind.
    fn restart(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}

/// Frames held in memory, replayed in order.
pub struct MemorySource {
    frames: Vec<RgbImage>,
    cursor: usize,
    start_time: Instant,
    active: bool,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames,
            cursor: 0,
            start_time: Instant::now(),
            active: true,
        }
    }

    /// The same frame `count` times.
    pub fn repeat(frame: RgbImage, count: usize) -> Self {
        Self::new(vec![frame; count])
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames handed out since the last restart.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError> {
        if !self.active {
            return Ok(None);
        }
        let Some(image) = self.frames.get(self.cursor) else {
            return Ok(None);
        };

        self.cursor += 1;
        debug!("Memory frame {} of {}", self.cursor, self.frames.len());
        Ok(Some(FrameData::new(
            image.clone(),
            self.start_time.elapsed().as_secs_f64(),
            self.cursor as u64,
        )))
    }

    fn frame_rate(&self) -> Option<f32> {
        None
    }

    fn resolution(&self) -> (u32, u32) {
        self.frames.first().map_or((0, 0), |f| f.dimensions())
    }

    fn is_active(&self) -> bool {
        self.active && self.cursor < self.frames.len()
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn restart(&mut self) -> Result<(), CaptureError> {
        self.cursor = 0;
        self.active = true;
        self.start_time = Instant::now();
        Ok(())
    }
}
