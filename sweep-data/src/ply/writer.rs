//! ASCII PLY export of point clouds.

use crate::error::Result;
use crate::types::Point3D;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write `points` as an ASCII PLY vertex list.
pub fn write_ply_to<W: Write>(mut writer: W, points: &[Point3D]) -> Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", points.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "end_header")?;
    for p in points {
        writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `points` to a PLY file at `path`.
pub fn write_ply(path: impl AsRef<Path>, points: &[Point3D]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_ply_to(BufWriter::new(file), points)?;
    info!("Wrote {} points to {}", points.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_header_and_body() {
        let points = [Point3D::new(0.0, 4.0, 0.0), Point3D::new(1.5, 3.0, -2.25)];
        let mut out = Vec::new();
        write_ply_to(&mut out, &points).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ply");
        assert_eq!(lines[2], "element vertex 2");
        assert_eq!(lines[6], "end_header");
        assert_eq!(lines[7], "0 4 0");
        assert_eq!(lines[8], "1.5 3 -2.25");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_write_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.ply");
        write_ply(&path, &[Point3D::ONE]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ply\n"));
        assert!(text.ends_with("1 1 1\n"));
    }
}
