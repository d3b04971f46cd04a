//! Wiring of configuration, devices and the capture sequencer.

use crate::config::{ScannerConfig, SourceConfig};
use crate::error::{AppError, Result};
use std::path::Path;
use std::sync::mpsc;
use sweep_capture::{DisconnectedChannel, FrameSource, MotorChannel, MotorCommands, ReplaySource};
use sweep_data::{
    MeshStrategy, PointCloud, assemble_mesh, load_points_from_ply, write_obj, write_ply,
};
use sweep_scan::{CaptureSequencer, SessionOutcome};
use tracing::{info, warn};

pub fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

fn open_source(config: &ScannerConfig) -> Result<Box<dyn FrameSource + Send>> {
    match &config.source {
        SourceConfig::Replay { .. } => {
            let Some((pattern, range)) = config.replay_range() else {
                return Err(AppError::InvalidConfig("replay source expected".to_string()));
            };
            let source = ReplaySource::from_pattern(&pattern, range)?;
            info!("Replaying {} frames from {}", source.len(), pattern);
            Ok(Box::new(source))
        }
        #[cfg(feature = "webcam")]
        SourceConfig::Webcam { device } => {
            let source = sweep_capture::WebcamCapture::with_resolution(
                *device,
                config.frame.width,
                config.frame.height,
            )?;
            info!("Capturing from camera {}", device);
            Ok(Box::new(source))
        }
        #[cfg(not(feature = "webcam"))]
        SourceConfig::Webcam { .. } => Err(AppError::InvalidConfig(
            "webcam source requires the `webcam` feature".to_string(),
        )),
    }
}

/// Controller channel for the configured port, or a disconnected stand-in.
///
/// A missing or unreachable controller is not an error: scans still run,
/// the turntable just has to be turned some other way.
fn open_motor(config: &ScannerConfig) -> Box<dyn MotorChannel> {
    let Some(port) = config.hardware.port.as_deref() else {
        info!("No controller port configured");
        return Box::new(DisconnectedChannel::new("no controller port configured"));
    };

    #[cfg(feature = "serial")]
    {
        match sweep_capture::SerialChannel::open(port, config.hardware.baud_rate) {
            Ok(channel) => {
                info!("Controller connected on {}", port);
                Box::new(channel)
            }
            Err(e) => {
                warn!("Couldn't open controller port {}: {}", port, e);
                Box::new(DisconnectedChannel::new(format!("{}: {}", port, e)))
            }
        }
    }

    #[cfg(not(feature = "serial"))]
    {
        warn!("Built without serial support, ignoring controller port {}", port);
        Box::new(DisconnectedChannel::new("built without serial support"))
    }
}

fn motor_commands(config: &ScannerConfig) -> MotorCommands {
    MotorCommands {
        start_rotation: config.hardware.start_rotation.as_bytes().to_vec(),
        turn_on_laser: config.hardware.turn_on_laser.as_bytes().to_vec(),
    }
}

fn export_cloud(cloud: &PointCloud, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        write_ply(path, cloud.points())?;
    }
    Ok(())
}

/// Run one full scanning session and export its results.
pub fn run_scan(config: &ScannerConfig) -> Result<SessionOutcome> {
    config.validate()?;
    let geometry = config.scan_geometry()?;
    let source = open_source(config)?;
    let motor = open_motor(config);
    let (mesh_tx, mesh_rx) = mpsc::channel();

    let mut sequencer = CaptureSequencer::boxed_builder(geometry, source)
        .boxed_motor(motor)
        .commands(motor_commands(config))
        .extractor(config.extraction)
        .mesh_strategy(config.mesh)
        .mesh_consumer(mesh_tx)
        .build();

    if config.hardware.laser_on_start {
        // Failure is already logged; the scan goes ahead regardless.
        let _ = sequencer.turn_on_laser();
    }

    let capture = &config.capture;
    let result = if capture.free_run {
        sequencer.run_to_completion(capture.frame_count)
    } else {
        sequencer
            .start_capture(capture.frame_count, capture.period_ms)
            .and_then(|()| sequencer.wait())
    };

    // Points gathered before a failure are still worth keeping.
    let cloud = sequencer.cloud().snapshot();
    export_cloud(&cloud, config.output.cloud_ply.as_deref())?;
    let outcome = result?;

    match mesh_rx.try_recv() {
        Ok(mesh) => {
            if let Some(path) = &config.output.mesh_obj {
                write_obj(path, &mesh)?;
            }
        }
        Err(_) => warn!("Session ended without a mesh"),
    }

    info!("Scan finished: {:?}", outcome);
    Ok(outcome)
}

/// Send the laser-on command once.
pub fn run_laser(config: &ScannerConfig) -> Result<()> {
    let mut motor = open_motor(config);
    let commands = motor_commands(config);
    match motor.send_command(&commands.turn_on_laser) {
        Ok(()) => {
            info!("Laser on");
            Ok(())
        }
        Err(e) => {
            warn!("LASER: couldn't turn on laser: {}", e);
            Err(e.into())
        }
    }
}

/// Mesh a previously exported point cloud.
pub fn run_mesh(
    input: &Path,
    output: &Path,
    scan_height: usize,
    strategy: MeshStrategy,
) -> Result<()> {
    let points = load_points_from_ply(input)?;
    if scan_height == 0 || points.len() % scan_height != 0 {
        warn!(
            "{} points is not a whole number of {}-line frames",
            points.len(),
            scan_height
        );
    }
    let mesh = assemble_mesh(&points, scan_height, strategy);
    write_obj(output, &mesh)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;
    use image::Rgb;
    use sweep_data::{FrameSize, RgbImage, ScanError, ScanRegion};

    fn stripe_frame() -> RgbImage {
        let mut frame = RgbImage::from_pixel(6, 4, Rgb([10, 10, 10]));
        for line in 0..4 {
            frame.put_pixel(2 + line, line, Rgb([255, 255, 255]));
        }
        frame
    }

    fn replay_config(dir: &Path, frames: u32) -> ScannerConfig {
        for i in 0..frames {
            stripe_frame()
                .save(dir.join(format!("scan{}.png", i)))
                .unwrap();
        }

        let mut config = ScannerConfig::default();
        config.frame = FrameSize::new(6, 4);
        config.region = Some(ScanRegion::new(0, 0, 5, 4));
        config.geometry.laser_angle_deg = 90.0;
        config.geometry.step_angle_deg = 10.0;
        config.geometry.center_column = Some(2);
        config.source = SourceConfig::Replay {
            pattern: dir.join("scan{}.png").to_string_lossy().into_owned(),
            first: 0,
            end: frames,
        };
        config.hardware.port = None;
        config.output.cloud_ply = Some(dir.join("cloud.ply"));
        config.output.mesh_obj = Some(dir.join("mesh.obj"));
        config
    }

    #[test]
    fn test_free_run_scan_exports_cloud_and_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = replay_config(dir.path(), 3);
        config.capture = CaptureConfig {
            frame_count: 3,
            period_ms: 50,
            free_run: true,
        };

        let outcome = run_scan(&config).unwrap();
        assert_eq!(outcome, SessionOutcome::Completed { frames: 3 });

        let points = load_points_from_ply(dir.path().join("cloud.ply")).unwrap();
        assert_eq!(points.len(), 12);
        assert!(dir.path().join("mesh.obj").exists());
    }

    #[test]
    fn test_timed_scan() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = replay_config(dir.path(), 2);
        config.capture = CaptureConfig {
            frame_count: 2,
            period_ms: 5,
            free_run: false,
        };
        config.output.mesh_obj = None;

        let outcome = run_scan(&config).unwrap();
        assert_eq!(outcome.frames(), 2);
        assert!(!dir.path().join("mesh.obj").exists());
    }

    #[test]
    fn test_short_replay_keeps_partial_cloud() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = replay_config(dir.path(), 3);
        std::fs::remove_file(dir.path().join("scan2.png")).unwrap();
        config.capture.frame_count = 3;
        config.capture.free_run = true;

        assert!(matches!(run_scan(&config), Err(AppError::Scan(_))));
        let points = load_points_from_ply(dir.path().join("cloud.ply")).unwrap();
        assert_eq!(points.len(), 8);
        assert!(!dir.path().join("mesh.obj").exists());
    }

    #[test]
    fn test_replay_shorter_than_capture_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = replay_config(dir.path(), 2);
        config.capture.frame_count = 3;

        assert!(matches!(run_scan(&config), Err(AppError::InvalidConfig(_))));
        assert!(!dir.path().join("cloud.ply").exists());
    }

    #[test]
    fn test_frame_size_mismatch_rejected_before_capture() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = replay_config(dir.path(), 2);
        config.frame = FrameSize::new(8, 4);
        config.capture.frame_count = 2;
        config.capture.free_run = true;

        assert!(matches!(
            run_scan(&config),
            Err(AppError::Scan(ScanError::InvalidFrameGeometry(_)))
        ));
        let ply = std::fs::read_to_string(dir.path().join("cloud.ply")).unwrap();
        assert!(ply.contains("element vertex 0"));
        assert!(!dir.path().join("mesh.obj").exists());
    }

    #[test]
    fn test_laser_without_controller_fails() {
        let mut config = ScannerConfig::default();
        config.hardware.port = None;
        assert!(matches!(run_laser(&config), Err(AppError::Capture(_))));
    }

    #[test]
    fn test_mesh_from_exported_cloud() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = replay_config(dir.path(), 3);
        config.capture.frame_count = 3;
        config.capture.free_run = true;
        config.output.mesh_obj = None;
        run_scan(&config).unwrap();

        let obj = dir.path().join("offline.obj");
        run_mesh(
            &dir.path().join("cloud.ply"),
            &obj,
            4,
            MeshStrategy::Grid { close_loop: false },
        )
        .unwrap();
        let contents = std::fs::read_to_string(obj).unwrap();
        assert_eq!(contents.lines().filter(|l| l.starts_with("v ")).count(), 12);
        assert!(contents.lines().any(|l| l.starts_with("f ")));
    }
}
