//! Core value types of the scanner.

use glam::Vec3;

/// A reconstructed point in scanner space.
///
/// `y` runs up the rotation axis; `x` and `z` span the turntable plane.
pub type Point3D = Vec3;
