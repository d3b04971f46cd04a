//! Hand-off of finalized meshes.

use std::sync::mpsc::Sender;
use sweep_data::Mesh;
use tracing::{info, warn};

/// Receives the mesh assembled at the end of every completed session.
pub trait MeshConsumer: Send {
    fn consume(&mut self, mesh: Mesh);
}

impl MeshConsumer for Sender<Mesh> {
    fn consume(&mut self, mesh: Mesh) {
        if self.send(mesh).is_err() {
            warn!("Mesh receiver dropped, finalized mesh discarded");
        }
    }
}

/// Consumer that only logs the mesh size.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardMesh;

impl MeshConsumer for DiscardMesh {
    fn consume(&mut self, mesh: Mesh) {
        info!(
            "Discarding mesh with {} vertices and {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
    }
}
