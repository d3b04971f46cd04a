//! Mesh assembly from accumulated scan points.

mod delaunay;
mod grid;

pub use delaunay::{ProjectionPlane, best_projection_plane, triangulate_on_plane, triangulate_points};
pub use grid::grid_triangles;

use crate::types::Point3D;
use serde::{Deserialize, Serialize};
use tracing::info;

/// How accumulated points are connected into triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "strategy")]
pub enum MeshStrategy {
    /// Connect neighbouring lines of neighbouring frames.
    Grid {
        #[serde(default = "default_close_loop")]
        close_loop: bool,
    },
    /// Projected 2D Delaunay triangulation, ignoring scan order.
    Delaunay,
}

fn default_close_loop() -> bool {
    true
}

impl Default for MeshStrategy {
    fn default() -> Self {
        MeshStrategy::Grid { close_loop: true }
    }
}

/// Triangle mesh over the ordered scan points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Point3D>,
    pub triangles: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Build a mesh from points stored frame-major with `scan_height` points per frame.
///
/// Vertices are the input points in their original order.
pub fn assemble_mesh(points: &[Point3D], scan_height: usize, strategy: MeshStrategy) -> Mesh {
    let triangles = match strategy {
        MeshStrategy::Grid { close_loop } => grid_triangles(points, scan_height, close_loop),
        MeshStrategy::Delaunay => triangulate_points(points),
    };

    info!(
        "Assembled mesh: {} vertices, {} triangles ({:?})",
        points.len(),
        triangles.len(),
        strategy
    );

    Mesh {
        vertices: points.to_vec(),
        triangles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_keeps_vertex_order() {
        let points: Vec<Point3D> = (0..6)
            .map(|i| Point3D::new((i / 3) as f32, (3 - i % 3) as f32, (i % 2) as f32))
            .collect();

        let mesh = assemble_mesh(&points, 3, MeshStrategy::Grid { close_loop: false });
        assert_eq!(mesh.vertices, points);
        assert_eq!(mesh.vertex_count(), 6);
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_strategy_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            mesh: MeshStrategy,
        }

        let grid: Wrapper = serde_json::from_str(r#"{"mesh": {"strategy": "grid"}}"#).unwrap();
        assert_eq!(grid.mesh, MeshStrategy::Grid { close_loop: true });

        let open: Wrapper =
            serde_json::from_str(r#"{"mesh": {"strategy": "grid", "close_loop": false}}"#).unwrap();
        assert_eq!(open.mesh, MeshStrategy::Grid { close_loop: false });

        let delaunay: Wrapper =
            serde_json::from_str(r#"{"mesh": {"strategy": "delaunay"}}"#).unwrap();
        assert_eq!(delaunay.mesh, MeshStrategy::Delaunay);
    }
}
