//! Error taxonomy shared by the scanner pipeline.

use thiserror::Error;

/// Errors raised while configuring or running a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan region does not fit the frame, or a frame does not match the
    /// configured frame size.
    #[error("Invalid frame geometry: {0}")]
    InvalidFrameGeometry(String),

    /// The laser-plane angle makes triangulation degenerate.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid capture parameters: {0}")]
    InvalidCaptureParameters(String),

    /// The operation does not apply to the sequencer's current session.
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// A motor or laser command could not be delivered. Never fatal.
    #[error("Hardware command failed: {0}")]
    HardwareCommandFailed(String),

    /// The frame source is exhausted or the camera failed.
    #[error("No frame available: {0}")]
    NoFrameAvailable(String),

    #[error("Mesh not ready: {received} of {expected} points accumulated")]
    MeshNotReady { expected: usize, received: usize },

    #[error("Mesh already finalized for this session")]
    MeshAlreadyFinalized,

    #[error("PLY error: {0}")]
    Ply(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Whether the error must end the current capture session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScanError::HardwareCommandFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
