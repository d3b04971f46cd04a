//! Capture state machine: `Idle -> Capturing -> Finalizing -> Idle`.
//!
//! All session state lives in one [`Core`] behind a mutex. The ticker
//! thread, `stop`, `start_*` and `turn_on_laser` each take that lock, so a
//! tick in progress always completes before a stop or restart is applied,
//! and no tick runs once the state has left `Capturing`.

use crate::consumer::{DiscardMesh, MeshConsumer};
use crate::session::{CaptureSession, SequencerState, SessionOutcome, TickOutcome};
use crate::ticker::Ticker;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use sweep_capture::{DisconnectedChannel, FrameSource, MotorChannel, MotorCommands};
use sweep_data::{
    CloudReader, ExtractorConfig, MeshStrategy, Point3D, PointCloudAccumulator, ProfileExtractor,
    Result, ScanError, ScanGeometry, triangulate_into,
};
use tracing::{debug, info, warn};

pub(crate) fn lock(shared: &Mutex<Core>) -> MutexGuard<'_, Core> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a tick touches.
pub(crate) struct Core {
    state: SequencerState,
    session: Option<CaptureSession>,
    geometry: ScanGeometry,
    extractor: ProfileExtractor,
    accumulator: PointCloudAccumulator,
    points: Vec<Point3D>,
    source: Box<dyn FrameSource + Send>,
    motor: Box<dyn MotorChannel>,
    commands: MotorCommands,
    consumer: Box<dyn MeshConsumer>,
    last_outcome: Option<SessionOutcome>,
    last_error: Option<ScanError>,
}

impl Core {
    pub(crate) fn state(&self) -> SequencerState {
        self.state
    }

    pub(crate) fn record_error(&mut self, error: ScanError) {
        self.last_error = Some(error);
    }

    fn frames_processed(&self) -> usize {
        self.session.map_or(0, |s| s.frame_index)
    }

    /// Send a payload, downgrading failure to a warning-level error.
    ///
    /// Failures during a capture are counted on the session.
    fn send_command(&mut self, name: &str, payload: &[u8]) -> Result<()> {
        match self.motor.send_command(payload) {
            Ok(()) => {
                debug!("{}: command sent", name);
                Ok(())
            }
            Err(e) => {
                warn!("{}: couldn't send command: {}", name, e);
                if self.state == SequencerState::Capturing {
                    if let Some(session) = self.session.as_mut() {
                        session.hardware_warnings += 1;
                    }
                }
                Err(ScanError::HardwareCommandFailed(format!("{}: {}", name, e)))
            }
        }
    }

    /// Reject a source whose reported resolution differs from the geometry.
    ///
    /// Sources that only learn their size from the first frame report
    /// `(0, 0)` and are checked per frame instead.
    fn check_source_resolution(&self) -> Result<()> {
        let frame = self.geometry.frame();
        let (width, height) = self.source.resolution();
        if (width, height) == (0, 0) || (width, height) == (frame.width, frame.height) {
            return Ok(());
        }
        Err(ScanError::InvalidFrameGeometry(format!(
            "source delivers {}x{} frames, geometry expects {}x{}",
            width, height, frame.width, frame.height
        )))
    }

    fn cancel(&mut self) -> Option<SessionOutcome> {
        if self.state != SequencerState::Capturing {
            return None;
        }
        let frames = self.frames_processed();
        self.state = SequencerState::Idle;
        let outcome = SessionOutcome::Cancelled { frames };
        info!("Capture cancelled after {} frames", frames);
        self.last_outcome = Some(outcome.clone());
        Some(outcome)
    }

    fn begin(&mut self, frame_count: usize, period: Duration) -> Result<()> {
        if self.cancel().is_some() {
            info!("Restarting capture");
        }

        self.source
            .restart()
            .map_err(|e| ScanError::NoFrameAvailable(e.to_string()))?;
        self.check_source_resolution()?;
        self.accumulator
            .configure(frame_count, self.geometry.scan_height())?;

        self.session = Some(CaptureSession::new(frame_count, period));
        self.last_error = None;
        self.last_outcome = None;

        let region = self.geometry.region();
        info!(
            "Will capture {} frames at {} ms, range ({}, {}) -> ({}, {})",
            frame_count,
            period.as_millis(),
            region.x0,
            region.y0,
            region.xf,
            region.yf
        );

        self.state = SequencerState::Capturing;
        let payload = self.commands.start_rotation.clone();
        // Capture proceeds whether or not the turntable heard us; a failure
        // is logged and counted on the session.
        let _ = self.send_command("ROTATION", &payload);
        Ok(())
    }

    /// End the session because of `error`, keeping the points so far.
    fn abort(&mut self, error: ScanError) -> ScanError {
        let frames = self.frames_processed();
        self.state = SequencerState::Idle;
        warn!("Capture aborted after {} frames: {}", frames, error);
        self.last_outcome = Some(SessionOutcome::Aborted {
            frames,
            reason: error.to_string(),
        });
        error
    }

    pub(crate) fn tick(&mut self) -> Result<TickOutcome> {
        if self.state != SequencerState::Capturing {
            return Ok(TickOutcome::Idle);
        }
        let Some(mut session) = self.session else {
            return Ok(TickOutcome::Idle);
        };

        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                return Err(self.abort(ScanError::NoFrameAvailable(
                    "frame source exhausted".to_string(),
                )));
            }
            Err(e) => return Err(self.abort(ScanError::NoFrameAvailable(e.to_string()))),
        };

        let extracted = self
            .extractor
            .extract(&frame.image, &self.geometry)
            .map(|_| ());
        if let Err(e) = extracted {
            return Err(self.abort(e));
        }

        self.points.clear();
        triangulate_into(
            self.extractor.profile(),
            self.geometry.step_angle(),
            session.frame_index,
            &self.geometry,
            self.geometry.scan_height(),
            &mut self.points,
        );
        self.accumulator.append(&self.points);

        session.frame_index += 1;
        self.session = Some(session);
        debug!(
            "Processed frame {} of {}",
            session.frame_index, session.frame_count
        );

        if !session.is_complete() {
            return Ok(TickOutcome::Captured {
                frame_index: session.frame_index - 1,
            });
        }
        self.finish(session.frame_index)
    }

    fn finish(&mut self, frames: usize) -> Result<TickOutcome> {
        self.state = SequencerState::Finalizing;
        info!("All {} frames captured, finalizing mesh", frames);

        match self.accumulator.finalize_mesh() {
            Ok(mesh) => {
                self.consumer.consume(mesh);
                self.state = SequencerState::Idle;
                self.last_outcome = Some(SessionOutcome::Completed { frames });
                Ok(TickOutcome::Finished { frames })
            }
            Err(e) => Err(self.abort(e)),
        }
    }
}

/// Builder for [`CaptureSequencer`].
pub struct SequencerBuilder {
    geometry: ScanGeometry,
    source: Box<dyn FrameSource + Send>,
    motor: Box<dyn MotorChannel>,
    commands: MotorCommands,
    consumer: Box<dyn MeshConsumer>,
    extractor: ExtractorConfig,
    strategy: MeshStrategy,
}

impl SequencerBuilder {
    /// Controller channel; defaults to a disconnected one.
    pub fn motor(mut self, motor: impl MotorChannel + 'static) -> Self {
        self.motor = Box::new(motor);
        self
    }

    pub fn boxed_motor(mut self, motor: Box<dyn MotorChannel>) -> Self {
        self.motor = motor;
        self
    }

    pub fn commands(mut self, commands: MotorCommands) -> Self {
        self.commands = commands;
        self
    }

    /// Receiver of finalized meshes; defaults to [`DiscardMesh`].
    pub fn mesh_consumer(mut self, consumer: impl MeshConsumer + 'static) -> Self {
        self.consumer = Box::new(consumer);
        self
    }

    pub fn extractor(mut self, config: ExtractorConfig) -> Self {
        self.extractor = config;
        self
    }

    pub fn mesh_strategy(mut self, strategy: MeshStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn build(self) -> CaptureSequencer {
        let accumulator = PointCloudAccumulator::new(self.strategy);
        let reader = accumulator.reader();
        let core = Core {
            state: SequencerState::Idle,
            session: None,
            geometry: self.geometry,
            extractor: ProfileExtractor::new(self.extractor),
            accumulator,
            points: Vec::with_capacity(self.geometry.scan_height()),
            source: self.source,
            motor: self.motor,
            commands: self.commands,
            consumer: self.consumer,
            last_outcome: None,
            last_error: None,
        };

        CaptureSequencer {
            shared: Arc::new(Mutex::new(core)),
            reader,
            ticker: None,
        }
    }
}

/// Drives a capture session: pulls frames, extracts, triangulates,
/// accumulates and finally hands the mesh to the consumer.
pub struct CaptureSequencer {
    shared: Arc<Mutex<Core>>,
    reader: CloudReader,
    ticker: Option<Ticker>,
}

fn validate_frame_count(frame_count: usize, scan_height: usize) -> Result<()> {
    if frame_count == 0 {
        return Err(ScanError::InvalidCaptureParameters(
            "frame count must be positive".to_string(),
        ));
    }
    if frame_count.checked_mul(scan_height).is_none() {
        return Err(ScanError::InvalidCaptureParameters(format!(
            "{} frames of {} lines overflow the point count",
            frame_count, scan_height
        )));
    }
    Ok(())
}

impl CaptureSequencer {
    pub fn builder(
        geometry: ScanGeometry,
        source: impl FrameSource + Send + 'static,
    ) -> SequencerBuilder {
        Self::boxed_builder(geometry, Box::new(source))
    }

    pub fn boxed_builder(
        geometry: ScanGeometry,
        source: Box<dyn FrameSource + Send>,
    ) -> SequencerBuilder {
        SequencerBuilder {
            geometry,
            source,
            motor: Box::new(DisconnectedChannel::new("no controller attached")),
            commands: MotorCommands::default(),
            consumer: Box::new(DiscardMesh),
            extractor: ExtractorConfig::default(),
            strategy: MeshStrategy::default(),
        }
    }

    /// Start a timed session of `frame_count` frames, one every `period_ms`.
    ///
    /// A session already capturing is cancelled first. The start-rotation
    /// command is best effort: failing to send it only logs a warning.
    pub fn start_capture(&mut self, frame_count: usize, period_ms: u64) -> Result<()> {
        validate_frame_count(frame_count, self.geometry().scan_height())?;
        if period_ms == 0 {
            return Err(ScanError::InvalidCaptureParameters(
                "tick period must be positive".to_string(),
            ));
        }
        let period = Duration::from_millis(period_ms);

        self.stop();
        lock(&self.shared).begin(frame_count, period)?;

        match Ticker::spawn(Arc::clone(&self.shared), period) {
            Ok(ticker) => {
                self.ticker = Some(ticker);
                Ok(())
            }
            Err(e) => Err(lock(&self.shared).abort(e.into())),
        }
    }

    /// Start a session without arming the timer; drive it with [`tick`](Self::tick).
    pub fn start_manual(&mut self, frame_count: usize) -> Result<()> {
        validate_frame_count(frame_count, self.geometry().scan_height())?;
        self.stop();
        lock(&self.shared).begin(frame_count, Duration::ZERO)
    }

    /// Process one frame of the current session.
    ///
    /// Frame and processing errors abort the session and are returned.
    pub fn tick(&self) -> Result<TickOutcome> {
        lock(&self.shared).tick()
    }

    /// Capture `frame_count` frames back to back, without a timer.
    pub fn run_to_completion(&mut self, frame_count: usize) -> Result<SessionOutcome> {
        self.start_manual(frame_count)?;
        loop {
            match self.tick()? {
                TickOutcome::Captured { .. } => continue,
                TickOutcome::Finished { frames } => return Ok(SessionOutcome::Completed { frames }),
                TickOutcome::Idle => {
                    let outcome = lock(&self.shared).last_outcome.clone();
                    return outcome.ok_or_else(|| {
                        ScanError::InvalidSessionState("session ended unexpectedly".to_string())
                    });
                }
            }
        }
    }

    /// Cancel the current session without finalizing the mesh.
    ///
    /// Accumulated points stay readable. Returns the outcome when a session
    /// was actually capturing.
    pub fn stop(&mut self) -> Option<SessionOutcome> {
        let outcome = lock(&self.shared).cancel();
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        outcome
    }

    /// Block until the timed session ends and report how it ended.
    pub fn wait(&mut self) -> Result<SessionOutcome> {
        if let Some(ticker) = self.ticker.take() {
            ticker.join();
        }

        let mut core = lock(&self.shared);
        if core.state == SequencerState::Capturing {
            return Err(ScanError::InvalidSessionState(
                "session is stepped manually; call tick()".to_string(),
            ));
        }
        if let Some(error) = core.last_error.take() {
            return Err(error);
        }
        core.last_outcome.clone().ok_or_else(|| {
            ScanError::InvalidSessionState("no capture session has run".to_string())
        })
    }

    /// Switch the laser on. Works in any state; failure is never fatal.
    pub fn turn_on_laser(&self) -> Result<()> {
        let mut core = lock(&self.shared);
        let payload = core.commands.turn_on_laser.clone();
        core.send_command("LASER", &payload)
    }

    pub fn state(&self) -> SequencerState {
        lock(&self.shared).state
    }

    pub fn session(&self) -> Option<CaptureSession> {
        lock(&self.shared).session
    }

    pub fn frames_processed(&self) -> usize {
        lock(&self.shared).frames_processed()
    }

    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        lock(&self.shared).last_outcome.clone()
    }

    pub fn geometry(&self) -> ScanGeometry {
        lock(&self.shared).geometry
    }

    /// Read-only handle on the accumulated points.
    pub fn cloud(&self) -> CloudReader {
        self.reader.clone()
    }
}

impl Drop for CaptureSequencer {
    fn drop(&mut self) {
        self.stop();
    }
}
