//! Delaunay meshing of unstructured point clouds.
//!
//! Points are projected onto the axis plane with the largest spread and
//! triangulated in 2D; the triangles index the original 3D points.

use crate::types::Point3D;
use delaunator::{Point, triangulate};
use tracing::{debug, info, warn};

/// Axis plane used to flatten a cloud before triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionPlane {
    XY,
    XZ,
    YZ,
}

impl ProjectionPlane {
    fn project(self, p: &Point3D) -> Point {
        let (x, y) = match self {
            ProjectionPlane::XY => (p.x, p.y),
            ProjectionPlane::XZ => (p.x, p.z),
            ProjectionPlane::YZ => (p.y, p.z),
        };
        Point {
            x: x as f64,
            y: y as f64,
        }
    }
}

/// Pick the projection plane that drops the axis with the smallest extent.
pub fn best_projection_plane(positions: &[Point3D]) -> ProjectionPlane {
    if positions.is_empty() {
        return ProjectionPlane::XY;
    }

    let mut min = Point3D::splat(f32::MAX);
    let mut max = Point3D::splat(f32::MIN);
    for pos in positions {
        min = min.min(*pos);
        max = max.max(*pos);
    }

    let extent = max - min;
    if extent.z <= extent.x && extent.z <= extent.y {
        ProjectionPlane::XY
    } else if extent.y <= extent.x && extent.y <= extent.z {
        ProjectionPlane::XZ
    } else {
        ProjectionPlane::YZ
    }
}

/// Triangulate `positions` on an explicit projection plane.
pub fn triangulate_on_plane(positions: &[Point3D], plane: ProjectionPlane) -> Vec<[usize; 3]> {
    if positions.len() < 3 {
        warn!("Not enough points for triangulation (need at least 3)");
        return Vec::new();
    }

    let points: Vec<Point> = positions.iter().map(|p| plane.project(p)).collect();
    let result = triangulate(&points);

    let triangles: Vec<[usize; 3]> = result
        .triangles
        .chunks_exact(3)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect();

    debug!(
        "Triangulated {} points into {} triangles (plane: {:?})",
        positions.len(),
        triangles.len(),
        plane
    );
    triangles
}

/// Triangulate `positions` on the plane chosen by [`best_projection_plane`].
pub fn triangulate_points(positions: &[Point3D]) -> Vec<[usize; 3]> {
    let plane = best_projection_plane(positions);
    let triangles = triangulate_on_plane(positions, plane);
    info!(
        "Delaunay mesh: {} points, {} triangles (plane: {:?})",
        positions.len(),
        triangles.len(),
        plane
    );
    triangles
}
