//! Scanner configuration
//!
//! Loaded from a TOML file; every table is optional and falls back to the
//! defaults below. Command-line flags override individual values.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use sweep_capture::{DEFAULT_BAUD_RATE, DEFAULT_PORT, START_ROTATION, TURN_ON_LASER};
use sweep_data::{ExtractorConfig, FrameSize, MeshStrategy, ScanGeometry, ScanRegion};

/// Top-level scanner configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub frame: FrameSize,
    /// Scan region; the whole frame when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<ScanRegion>,
    pub geometry: GeometryConfig,
    pub capture: CaptureConfig,
    pub source: SourceConfig,
    pub hardware: HardwareConfig,
    pub extraction: ExtractorConfig,
    pub mesh: MeshStrategy,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            frame: FrameSize::new(640, 480),
            region: None,
            geometry: GeometryConfig::default(),
            capture: CaptureConfig::default(),
            source: SourceConfig::default(),
            hardware: HardwareConfig::default(),
            extraction: ExtractorConfig::default(),
            mesh: MeshStrategy::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Laser and turntable geometry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Angle between the laser plane and the camera axis, in degrees
    pub laser_angle_deg: f32,
    /// Turntable rotation between two frames, in degrees
    pub step_angle_deg: f32,
    /// Column of the rotation axis; `width / 2` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_column: Option<u32>,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            laser_angle_deg: 30.0,
            step_angle_deg: 1.8,
            center_column: None,
        }
    }
}

/// Session length and pacing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub frame_count: usize,
    pub period_ms: u64,
    /// Process frames back to back instead of on the timer
    pub free_run: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            // One frame per file of the default replay range.
            frame_count: 67,
            period_ms: 100,
            free_run: false,
        }
    }
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Numbered image files; `{}` in the pattern is replaced by the index
    Replay {
        pattern: String,
        first: u32,
        /// One past the last index
        end: u32,
    },
    /// Live camera (requires the `webcam` feature)
    Webcam {
        #[serde(default)]
        device: u32,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Replay {
            pattern: "output/scan{}.jpg".to_string(),
            first: 5,
            end: 72,
        }
    }
}

/// Turntable and laser controller link
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Serial device; capture runs without a controller when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub baud_rate: u32,
    pub start_rotation: String,
    pub turn_on_laser: String,
    /// Send the laser command before every scan
    pub laser_on_start: bool,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT.to_string()),
            baud_rate: DEFAULT_BAUD_RATE,
            start_rotation: String::from_utf8_lossy(START_ROTATION).into_owned(),
            turn_on_laser: String::from_utf8_lossy(TURN_ON_LASER).into_owned(),
            laser_on_start: false,
        }
    }
}

/// Export locations; nothing is written for an absent path
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_ply: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_obj: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cloud_ply: Some(PathBuf::from("scan.ply")),
            mesh_obj: Some(PathBuf::from("scan.obj")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: ScannerConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validated scan geometry for this configuration.
    pub fn scan_geometry(&self) -> Result<ScanGeometry> {
        let region = self.region.unwrap_or_else(|| ScanRegion::full(self.frame));
        let center = self.geometry.center_column.unwrap_or(self.frame.width / 2);
        let geometry = ScanGeometry::from_degrees(
            self.frame,
            region,
            self.geometry.laser_angle_deg,
            self.geometry.step_angle_deg,
            center,
        )?;
        Ok(geometry)
    }

    /// Pattern and index range of a replay source.
    pub fn replay_range(&self) -> Option<(String, std::ops::Range<u32>)> {
        match &self.source {
            SourceConfig::Replay {
                pattern,
                first,
                end,
            } => Some((pattern.clone(), *first..*end)),
            SourceConfig::Webcam { .. } => None,
        }
    }

    /// Check the values that cannot be caught by parsing.
    pub fn validate(&self) -> Result<()> {
        self.scan_geometry()?;
        if let Some((pattern, range)) = self.replay_range() {
            if !pattern.contains("{}") {
                return Err(AppError::InvalidConfig(format!(
                    "replay pattern '{}' has no '{{}}' placeholder",
                    pattern
                )));
            }
            if range.is_empty() {
                return Err(AppError::InvalidConfig(
                    "replay range is empty".to_string(),
                ));
            }
            if range.len() < self.capture.frame_count {
                return Err(AppError::InvalidConfig(format!(
                    "replay range {}..{} holds {} frames, capture needs {}",
                    range.start,
                    range.end,
                    range.len(),
                    self.capture.frame_count
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.frame, FrameSize::new(640, 480));
        assert_eq!(config.hardware.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.hardware.baud_rate, 9600);
        assert_eq!(config.mesh, MeshStrategy::Grid { close_loop: true });
        let (_, range) = config.replay_range().unwrap();
        assert_eq!(range.len(), config.capture.frame_count);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_geometry_centers_on_frame() {
        let geometry = ScannerConfig::default().scan_geometry().unwrap();
        assert_eq!(geometry.center_column(), 320);
        assert_eq!(geometry.region(), ScanRegion::full(FrameSize::new(640, 480)));
        assert_eq!(geometry.scan_height(), 480);
    }

    #[test]
    fn test_toml_serialization() {
        let config = ScannerConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[frame]"));
        assert!(toml_string.contains("[geometry]"));
        assert!(toml_string.contains("[capture]"));
        assert!(toml_string.contains("[source]"));
        assert!(toml_string.contains("[hardware]"));
        assert!(toml_string.contains("[mesh]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("kind = \"replay\""));

        let parsed: ScannerConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [frame]
            width = 6
            height = 4

            [region]
            x0 = 0
            y0 = 0
            xf = 5
            yf = 4

            [geometry]
            laser_angle_deg = 90.0
            step_angle_deg = 10.0
            center_column = 2

            [mesh]
            strategy = "delaunay"
            "#,
        )
        .unwrap();

        assert_eq!(config.capture, CaptureConfig::default());
        assert_eq!(config.mesh, MeshStrategy::Delaunay);
        let geometry = config.scan_geometry().unwrap();
        assert_eq!(geometry.region(), ScanRegion::new(0, 0, 5, 4));
        assert_eq!(geometry.center_column(), 2);
    }

    #[test]
    fn test_webcam_source() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [source]
            kind = "webcam"
            "#,
        )
        .unwrap();
        assert_eq!(config.source, SourceConfig::Webcam { device: 0 });
        assert!(config.replay_range().is_none());
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let mut config = ScannerConfig::default();
        config.geometry.laser_angle_deg = 0.0;
        assert!(matches!(config.validate(), Err(AppError::Scan(_))));

        let mut config = ScannerConfig::default();
        config.region = Some(ScanRegion::new(0, 0, 700, 480));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_replay_pattern_needs_placeholder() {
        let mut config = ScannerConfig::default();
        config.source = SourceConfig::Replay {
            pattern: "scan.jpg".to_string(),
            first: 0,
            end: 3,
        };
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn test_replay_range_must_cover_capture() {
        let mut config = ScannerConfig::default();
        config.capture.frame_count = 200;
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));

        config.capture.frame_count = 10;
        assert!(config.validate().is_ok());

        config.source = SourceConfig::Webcam { device: 0 };
        config.capture.frame_count = 200;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        let mut config = ScannerConfig::default();
        config.capture.frame_count = 40;
        config.to_file(&path).unwrap();

        let loaded = ScannerConfig::from_file(&path).unwrap();
        assert_eq!(loaded.capture.frame_count, 40);
        assert!(loaded.validate().is_ok());
    }
}
