//! PLY point cloud loading.

use crate::error::{Result, ScanError};
use crate::types::Point3D;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
}

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

/// Load vertex positions from a PLY file, in file order.
///
/// Extra vertex properties and any face elements are ignored.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_points_from_ply(path: impl AsRef<Path>) -> Result<Vec<Point3D>> {
    let path = path.as_ref();
    debug!("Loading PLY points from: {}", path.display());
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let ply_data: PlyFile = serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        ScanError::Ply(format!("PLY parsing error: {}", e))
    })?;

    let mut points = Vec::with_capacity(ply_data.vertex.len());
    for (i, vertex) in ply_data.vertex.iter().enumerate() {
        let coord = |name: &str| {
            get_f32(vertex.get(name))
                .ok_or_else(|| ScanError::Ply(format!("Missing '{}' at vertex {}", name, i)))
        };
        points.push(Point3D::new(coord("x")?, coord("y")?, coord("z")?));
    }

    info!("PLY file parsed: {} points", points.len());
    Ok(points)
}
