//! Sweep Capture - frame sources and controller channels
//!
//! This crate provides the device side of the scanner:
//!
//! - [`FrameSource`] implementations: recorded image sequences
//!   ([`ReplaySource`]), in-memory frames ([`MemorySource`]) and webcams
//!   (via nokhwa, requires `webcam` feature)
//! - [`MotorChannel`] implementations: a serial link to the turntable and
//!   laser controller (requires `serial` feature), a disconnected stand-in
//!   and a recording channel for tests
//!
//! ## Example
//!
//! ```ignore
//! use sweep_capture::{FrameSource, ReplaySource};
//!
//! let mut source = ReplaySource::from_pattern("output/scan{}.jpg", 5..72)?;
//! while let Some(frame) = source.next_frame()? {
//!     // Process frame...
//! }
//! ```

mod motor;
mod replay;
mod source;

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "webcam")]
mod webcam;

pub use motor::{
    DEFAULT_BAUD_RATE, DEFAULT_PORT, DisconnectedChannel, MotorChannel, MotorCommands,
    RecordingChannel, START_ROTATION, TURN_ON_LASER,
};
pub use replay::ReplaySource;
pub use source::{CaptureError, FrameData, FrameSource, MemorySource};

#[cfg(feature = "serial")]
pub use serial::SerialChannel;

#[cfg(feature = "webcam")]
pub use webcam::WebcamCapture;
