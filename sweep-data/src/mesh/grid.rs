//! Structured meshing of a turntable scan.
//!
//! A complete scan stores its points frame-major, one point per scan line,
//! so point `frame * scan_height + line` has natural neighbours on the next
//! line of the same frame and on the same line of the next frame. Each such
//! quad is split into two triangles.

use crate::types::Point3D;
use tracing::{debug, warn};

/// Squared cross-product length below which a triangle counts as collapsed.
const MIN_DOUBLE_AREA_SQ: f32 = 1e-12;

/// Triangulate a frame-major point grid.
///
/// With `close_loop` the last frame is stitched back to the first one, which
/// suits a full turntable revolution. Triangles collapsed to zero area (for
/// example where consecutive lines hit the same spot) are dropped.
pub fn grid_triangles(points: &[Point3D], scan_height: usize, close_loop: bool) -> Vec<[usize; 3]> {
    if scan_height < 2 {
        warn!("Grid meshing needs at least two scan lines, got {}", scan_height);
        return Vec::new();
    }
    let frames = points.len() / scan_height;
    if frames < 2 {
        warn!("Grid meshing needs at least two frames, got {}", frames);
        return Vec::new();
    }

    let strips = if close_loop && frames > 2 {
        frames
    } else {
        frames - 1
    };

    let mut triangles = Vec::with_capacity(strips * (scan_height - 1) * 2);
    let mut collapsed = 0usize;
    for frame in 0..strips {
        let next = (frame + 1) % frames;
        for line in 0..scan_height - 1 {
            let a = frame * scan_height + line;
            let b = next * scan_height + line;
            for triangle in [[a, b, a + 1], [b, b + 1, a + 1]] {
                if is_collapsed(points, triangle) {
                    collapsed += 1;
                } else {
                    triangles.push(triangle);
                }
            }
        }
    }

    debug!(
        "Grid mesh: {} frames x {} lines -> {} triangles ({} collapsed)",
        frames,
        scan_height,
        triangles.len(),
        collapsed
    );
    triangles
}

fn is_collapsed(points: &[Point3D], [a, b, c]: [usize; 3]) -> bool {
    let normal = (points[b] - points[a]).cross(points[c] - points[a]);
    normal.length_squared() < MIN_DOUBLE_AREA_SQ
}
