//! Sweep Scan - capture sequencing
//!
//! Drives a scanning session end to end: a timer (or manual stepping) pulls
//! one frame per rotation step, the laser profile is extracted and
//! triangulated, the points are appended to the shared cloud, and once the
//! last frame is in the mesh is assembled and handed to a [`MeshConsumer`].
//!
//! ## Modules
//!
//! - [`sequencer`]: the `Idle -> Capturing -> Finalizing` state machine
//! - [`session`]: session bookkeeping and outcomes
//! - [`consumer`]: mesh hand-off

pub mod consumer;
pub mod sequencer;
pub mod session;
mod ticker;

pub use consumer::{DiscardMesh, MeshConsumer};
pub use sequencer::{CaptureSequencer, SequencerBuilder};
pub use session::{CaptureSession, SequencerState, SessionOutcome, TickOutcome};
