//! Laser-plane triangulation of stripe profiles.

use crate::geometry::ScanGeometry;
use crate::profile::Profile;
use crate::types::Point3D;

/// Turntable angle, in radians, at which frame `frame_index` was captured.
pub fn rotation_angle(angle_step: f32, frame_index: usize) -> f32 {
    angle_step * frame_index as f32
}

/// Convert one stripe profile into exactly `scan_height` points, one per line.
///
/// The horizontal offset of the stripe from the center column is projected
/// onto the laser plane (`dz = dx / sin(laser)`) and rotated by the
/// turntable angle of the frame. Line `i` maps to height `scan_height - i`,
/// so line 0 is the top of the object in every frame.
///
/// Lines missing from a short profile are treated as lying on the center
/// column.
pub fn triangulate(
    profile: &Profile,
    angle_step: f32,
    frame_index: usize,
    geometry: &ScanGeometry,
    scan_height: usize,
) -> Vec<Point3D> {
    let mut points = Vec::with_capacity(scan_height);
    triangulate_into(profile, angle_step, frame_index, geometry, scan_height, &mut points);
    points
}

/// Same as [`triangulate`], appending to an existing buffer.
pub fn triangulate_into(
    profile: &Profile,
    angle_step: f32,
    frame_index: usize,
    geometry: &ScanGeometry,
    scan_height: usize,
    points: &mut Vec<Point3D>,
) {
    let angle = rotation_angle(angle_step, frame_index);
    let (sin_angle, cos_angle) = angle.sin_cos();
    let laser_sine = geometry.laser_angle().sin();
    let center = geometry.center_column() as f32;

    points.reserve(scan_height);
    for line in 0..scan_height {
        let column = profile.as_slice().get(line).map_or(center, |&c| c as f32);
        let dx = column - center;
        let dz = dx / laser_sine;
        points.push(Point3D::new(
            dz * cos_angle,
            (scan_height - line) as f32,
            dz * sin_angle,
        ));
    }
}
