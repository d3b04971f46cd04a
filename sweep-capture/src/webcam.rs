//! Live camera frames using nokhwa.
//!
//! The nokhwa camera handle is not `Send`, so it lives on a dedicated
//! thread that grabs one frame per request. This keeps `WebcamCapture`
//! usable from the sequencer's ticker thread.

use crate::source::{CaptureError, FrameData, FrameSource};
use image::RgbImage;
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

type FrameResult = Result<RgbImage, CaptureError>;

/// Webcam frame source.
pub struct WebcamCapture {
    requests: Option<Sender<()>>,
    frames: Receiver<FrameResult>,
    worker: Option<JoinHandle<()>>,
    start_time: Instant,
    frame_count: u64,
    resolution: (u32, u32),
    frame_rate: u32,
}

impl WebcamCapture {
    /// Open webcam `index` at the highest resolution up to `width` x `height`.
    pub fn with_resolution(index: u32, width: u32, height: u32) -> Result<Self, CaptureError> {
        info!("Opening webcam {} at {}x{}", index, width, height);

        let (request_tx, request_rx) = mpsc::channel::<()>();
        let (frame_tx, frame_rx) = mpsc::channel::<FrameResult>();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name(format!("webcam-{}", index))
            .spawn(move || {
                let mut camera = match open_camera(index, width, height) {
                    Ok(camera) => camera,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let resolution = camera.resolution();
                let _ = ready_tx.send(Ok((
                    (resolution.width(), resolution.height()),
                    camera.frame_rate(),
                )));

                while request_rx.recv().is_ok() {
                    if frame_tx.send(grab_frame(&mut camera)).is_err() {
                        break;
                    }
                }
                if let Err(e) = camera.stop_stream() {
                    warn!("Failed to stop webcam stream: {}", e);
                }
            })?;

        let (resolution, frame_rate) = ready_rx
            .recv()
            .map_err(|_| CaptureError::OpenFailed("webcam thread exited".to_string()))??;
        info!(
            "Webcam opened: {}x{} @ {} fps",
            resolution.0, resolution.1, frame_rate
        );

        Ok(Self {
            requests: Some(request_tx),
            frames: frame_rx,
            worker: Some(worker),
            start_time: Instant::now(),
            frame_count: 0,
            resolution,
            frame_rate,
        })
    }

    /// List available webcam devices.
    pub fn list_devices() -> Result<Vec<String>, CaptureError> {
        let devices = nokhwa::query(nokhwa::utils::ApiBackend::Auto)
            .map_err(|e| CaptureError::DeviceNotFound(e.to_string()))?;

        Ok(devices
            .into_iter()
            .map(|info| format!("{}: {}", info.index(), info.human_name()))
            .collect())
    }
}

fn open_camera(index: u32, width: u32, height: u32) -> Result<Camera, CaptureError> {
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
        Resolution::new(width, height),
    ));
    let mut camera = Camera::new(CameraIndex::Index(index), requested)
        .map_err(|e| CaptureError::OpenFailed(e.to_string()))?;
    camera
        .open_stream()
        .map_err(|e| CaptureError::OpenFailed(e.to_string()))?;
    Ok(camera)
}

fn grab_frame(camera: &mut Camera) -> FrameResult {
    let frame = camera
        .frame()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
    let decoded = frame
        .decode_image::<RgbFormat>()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

    let (width, height) = (decoded.width(), decoded.height());
    RgbImage::from_raw(width, height, decoded.into_raw())
        .ok_or_else(|| CaptureError::CaptureFailed("Failed to create RGB image".to_string()))
}

impl FrameSource for WebcamCapture {
    fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError> {
        let Some(requests) = &self.requests else {
            return Ok(None);
        };
        requests
            .send(())
            .map_err(|_| CaptureError::CaptureFailed("webcam thread exited".to_string()))?;
        let image = self
            .frames
            .recv()
            .map_err(|_| CaptureError::CaptureFailed("webcam thread exited".to_string()))??;

        let timestamp = self.start_time.elapsed().as_secs_f64();
        self.frame_count += 1;
        debug!("Captured frame {} at {:.3}s", self.frame_count, timestamp);

        Ok(Some(FrameData::new(image, timestamp, self.frame_count)))
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.frame_rate as f32)
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn is_active(&self) -> bool {
        self.requests.is_some()
    }

    fn stop(&mut self) {
        if self.requests.take().is_some() {
            if let Some(worker) = self.worker.take() {
                if worker.join().is_err() {
                    error!("Webcam thread panicked");
                }
            }
            info!("Webcam capture stopped after {} frames", self.frame_count);
        }
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
