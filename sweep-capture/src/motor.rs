//! Command channel to the turntable and laser controller.
//!
//! The controller accepts short opaque byte payloads and never
//! acknowledges them, so a successful send only means the bytes left.

use crate::source::CaptureError;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Default controller port.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
/// Default controller baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default payload that starts the turntable rotating.
pub const START_ROTATION: &[u8] = b"s";
/// Default payload that switches the laser on.
pub const TURN_ON_LASER: &[u8] = b"r%1";

/// Channel delivering command payloads to the controller.
pub trait MotorChannel: Send {
    /// Write one payload to the controller.
    fn send_command(&mut self, payload: &[u8]) -> Result<(), CaptureError>;

    /// Whether the channel currently has a device behind it.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Payloads for the logical commands the scanner issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotorCommands {
    pub start_rotation: Vec<u8>,
    pub turn_on_laser: Vec<u8>,
}

impl Default for MotorCommands {
    fn default() -> Self {
        Self {
            start_rotation: START_ROTATION.to_vec(),
            turn_on_laser: TURN_ON_LASER.to_vec(),
        }
    }
}

/// Stand-in used when no controller is attached; every send fails.
#[derive(Debug, Clone)]
pub struct DisconnectedChannel {
    reason: String,
}

impl DisconnectedChannel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl MotorChannel for DisconnectedChannel {
    fn send_command(&mut self, _payload: &[u8]) -> Result<(), CaptureError> {
        Err(CaptureError::NotConnected(self.reason.clone()))
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Channel that records every payload, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    inner: Arc<Mutex<RecordingInner>>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    sent: Vec<Vec<u8>>,
    failing: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (without recording) until reset.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// All payloads sent so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    pub fn clear(&self) {
        self.lock().sent.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MotorChannel for RecordingChannel {
    fn send_command(&mut self, payload: &[u8]) -> Result<(), CaptureError> {
        let mut inner = self.lock();
        if inner.failing {
            return Err(CaptureError::NotConnected("recording channel set to fail".to_string()));
        }
        debug!("Recorded command {:?}", String::from_utf8_lossy(payload));
        inner.sent.push(payload.to_vec());
        Ok(())
    }
}
