//! Wavefront OBJ export of assembled meshes.

use crate::error::Result;
use crate::mesh::Mesh;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub fn write_obj_to<W: Write>(mut writer: W, mesh: &Mesh) -> Result<()> {
    for v in &mesh.vertices {
        writeln!(writer, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z)?;
    }
    for f in &mesh.triangles {
        // Note: Indexing starts at 1.
        writeln!(writer, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_obj(path: impl AsRef<Path>, mesh: &Mesh) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_obj_to(BufWriter::new(file), mesh)?;
    info!(
        "Wrote mesh with {} vertices and {} triangles to {}",
        mesh.vertex_count(),
        mesh.triangle_count(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3D;

    #[test]
    fn test_faces_are_one_based() {
        let mesh = Mesh {
            vertices: vec![Point3D::ZERO, Point3D::X, Point3D::Y],
            triangles: vec![[0, 1, 2]],
        };
        let mut out = Vec::new();
        write_obj_to(&mut out, &mesh).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "v 0.000000 0.000000 0.000000\n\
             v 1.000000 0.000000 0.000000\n\
             v 0.000000 1.000000 0.000000\n\
             f 1 2 3\n"
        );
    }
}
