//! Capture session state.

use std::fmt;
use std::time::Duration;

/// Phase of the capture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    /// No active session.
    #[default]
    Idle,
    /// Frames are being pulled and processed.
    Capturing,
    /// The last frame is in; the mesh is being assembled.
    Finalizing,
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequencerState::Idle => "idle",
            SequencerState::Capturing => "capturing",
            SequencerState::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// Mutable state of one capture, from `start` to completion or cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSession {
    /// Frames processed so far; also the index of the next frame.
    pub frame_index: usize,
    /// Frames requested for the whole rotation.
    pub frame_count: usize,
    /// Tick period, zero when the session is stepped manually.
    pub period: Duration,
    /// Controller commands that could not be delivered during the session.
    pub hardware_warnings: usize,
}

impl CaptureSession {
    pub fn new(frame_count: usize, period: Duration) -> Self {
        Self {
            frame_index: 0,
            frame_count,
            period,
            hardware_warnings: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.frame_index >= self.frame_count
    }

    pub fn remaining(&self) -> usize {
        self.frame_count.saturating_sub(self.frame_index)
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// All frames processed and the mesh handed off.
    Completed { frames: usize },
    /// Stopped on request; no mesh was assembled.
    Cancelled { frames: usize },
    /// Ended by a frame or processing error; points so far are kept.
    Aborted { frames: usize, reason: String },
}

impl SessionOutcome {
    /// Frames accumulated before the session ended.
    pub fn frames(&self) -> usize {
        match self {
            SessionOutcome::Completed { frames }
            | SessionOutcome::Cancelled { frames }
            | SessionOutcome::Aborted { frames, .. } => *frames,
        }
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was processed and more are expected.
    Captured { frame_index: usize },
    /// The last frame was processed and the mesh was finalized.
    Finished { frames: usize },
    /// No session is capturing; the tick did nothing.
    Idle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_progress() {
        let mut session = CaptureSession::new(3, Duration::from_millis(50));
        assert_eq!(session.remaining(), 3);
        assert_eq!(session.hardware_warnings, 0);
        assert!(!session.is_complete());

        session.frame_index = 3;
        assert!(session.is_complete());
        assert_eq!(session.remaining(), 0);
    }

    #[test]
    fn test_outcome_frames() {
        assert_eq!(SessionOutcome::Completed { frames: 4 }.frames(), 4);
        assert_eq!(SessionOutcome::Cancelled { frames: 2 }.frames(), 2);
        let aborted = SessionOutcome::Aborted {
            frames: 1,
            reason: "camera unplugged".to_string(),
        };
        assert_eq!(aborted.frames(), 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SequencerState::Capturing.to_string(), "capturing");
        assert_eq!(SequencerState::default(), SequencerState::Idle);
    }
}
