//! Fixed scanner geometry: frame size, scan region and the laser/turntable angles.

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Smallest |sin(laser angle)| accepted before triangulation is considered degenerate.
const MIN_LASER_SINE: f32 = 1e-6;

/// Dimensions of the frames delivered by the video source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Rectangular pixel region scanned for the laser stripe, `[x0, xf) x [y0, yf)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRegion {
    pub x0: u32,
    pub y0: u32,
    pub xf: u32,
    pub yf: u32,
}

impl ScanRegion {
    pub fn new(x0: u32, y0: u32, xf: u32, yf: u32) -> Self {
        Self { x0, y0, xf, yf }
    }

    /// Region covering the whole frame.
    pub fn full(frame: FrameSize) -> Self {
        Self::new(0, 0, frame.width, frame.height)
    }

    pub fn columns(&self) -> Range<u32> {
        self.x0..self.xf
    }

    pub fn rows(&self) -> Range<u32> {
        self.y0..self.yf
    }

    /// Check `0 <= x0 < xf <= width` and `0 <= y0 < yf <= height`.
    pub fn validate(&self, frame: FrameSize) -> Result<()> {
        if self.x0 >= self.xf || self.xf > frame.width {
            return Err(ScanError::InvalidFrameGeometry(format!(
                "columns [{}, {}) do not fit a frame {} pixels wide",
                self.x0, self.xf, frame.width
            )));
        }
        if self.y0 >= self.yf || self.yf > frame.height {
            return Err(ScanError::InvalidFrameGeometry(format!(
                "rows [{}, {}) do not fit a frame {} pixels high",
                self.y0, self.yf, frame.height
            )));
        }
        Ok(())
    }
}

/// Immutable per-session scanner parameters.
///
/// Angles are stored in radians. Construction validates the scan region
/// against the frame and rejects laser-plane angles whose sine vanishes,
/// so every `ScanGeometry` in circulation triangulates to finite points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanGeometry {
    frame: FrameSize,
    region: ScanRegion,
    laser_angle: f32,
    step_angle: f32,
    center_column: u32,
}

impl ScanGeometry {
    /// Create a geometry from angles in radians.
    pub fn new(
        frame: FrameSize,
        region: ScanRegion,
        laser_angle: f32,
        step_angle: f32,
        center_column: u32,
    ) -> Result<Self> {
        if frame.width == 0 || frame.height == 0 {
            return Err(ScanError::InvalidFrameGeometry(format!(
                "frame size {}x{} is empty",
                frame.width, frame.height
            )));
        }
        region.validate(frame)?;
        if center_column >= frame.width {
            return Err(ScanError::InvalidFrameGeometry(format!(
                "center column {} lies outside a frame {} pixels wide",
                center_column, frame.width
            )));
        }
        if !laser_angle.is_finite() || laser_angle.sin().abs() < MIN_LASER_SINE {
            return Err(ScanError::InvalidGeometry(format!(
                "laser-plane angle {} rad is parallel to the camera axis",
                laser_angle
            )));
        }
        if !step_angle.is_finite() {
            return Err(ScanError::InvalidGeometry(format!(
                "rotation step {} rad is not finite",
                step_angle
            )));
        }

        Ok(Self {
            frame,
            region,
            laser_angle,
            step_angle,
            center_column,
        })
    }

    /// Create a geometry from angles in degrees.
    pub fn from_degrees(
        frame: FrameSize,
        region: ScanRegion,
        laser_angle_deg: f32,
        step_angle_deg: f32,
        center_column: u32,
    ) -> Result<Self> {
        Self::new(
            frame,
            region,
            laser_angle_deg.to_radians(),
            step_angle_deg.to_radians(),
            center_column,
        )
    }

    /// Geometry scanning the whole frame around its middle column.
    pub fn for_frame(frame: FrameSize, laser_angle_deg: f32, step_angle_deg: f32) -> Result<Self> {
        Self::from_degrees(
            frame,
            ScanRegion::full(frame),
            laser_angle_deg,
            step_angle_deg,
            frame.width / 2,
        )
    }

    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    pub fn region(&self) -> ScanRegion {
        self.region
    }

    pub fn laser_angle(&self) -> f32 {
        self.laser_angle
    }

    pub fn step_angle(&self) -> f32 {
        self.step_angle
    }

    pub fn center_column(&self) -> u32 {
        self.center_column
    }

    /// Number of scan lines, one profile entry and one point per line.
    pub fn scan_height(&self) -> usize {
        self.frame.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn frame() -> FrameSize {
        FrameSize::new(640, 480)
    }

    #[test]
    fn test_full_region_is_valid() {
        let region = ScanRegion::full(frame());
        assert!(region.validate(frame()).is_ok());
        assert_eq!(region.columns(), 0..640);
        assert_eq!(region.rows(), 0..480);
    }

    #[test]
    fn test_region_outside_frame_is_rejected() {
        let region = ScanRegion::new(0, 0, 641, 480);
        assert!(matches!(
            region.validate(frame()),
            Err(ScanError::InvalidFrameGeometry(_))
        ));

        let region = ScanRegion::new(0, 10, 640, 10);
        assert!(matches!(
            region.validate(frame()),
            Err(ScanError::InvalidFrameGeometry(_))
        ));
    }

    #[test]
    fn test_degenerate_laser_angle_is_rejected() {
        let region = ScanRegion::full(frame());
        for angle in [0.0, PI, -PI, 2.0 * PI] {
            let result = ScanGeometry::new(frame(), region, angle, 0.1, 320);
            assert!(
                matches!(result, Err(ScanError::InvalidGeometry(_))),
                "angle {} should be rejected",
                angle
            );
        }
        assert!(matches!(
            ScanGeometry::from_degrees(frame(), region, 180.0, 1.0, 320),
            Err(ScanError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_non_finite_angles_are_rejected() {
        let region = ScanRegion::full(frame());
        assert!(ScanGeometry::new(frame(), region, f32::NAN, 0.1, 320).is_err());
        assert!(ScanGeometry::new(frame(), region, 1.0, f32::INFINITY, 320).is_err());
    }

    #[test]
    fn test_for_frame_defaults() {
        let geometry = ScanGeometry::for_frame(frame(), 30.0, 1.8).unwrap();
        assert_eq!(geometry.center_column(), 320);
        assert_eq!(geometry.region(), ScanRegion::full(frame()));
        assert_eq!(geometry.scan_height(), 480);
        assert!((geometry.laser_angle() - 30f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_center_column_outside_frame() {
        let region = ScanRegion::full(frame());
        assert!(matches!(
            ScanGeometry::new(frame(), region, 1.0, 0.1, 640),
            Err(ScanError::InvalidFrameGeometry(_))
        ));
    }
}
