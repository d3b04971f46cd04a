//! Sweep Data Crate
//!
//! The reconstruction core of the sweep laser-line scanner: stripe profile
//! extraction, laser-plane triangulation, point cloud accumulation and mesh
//! assembly, plus PLY/OBJ export. This crate performs no device I/O.

pub mod error;
pub mod geometry;
pub mod mesh;
pub mod obj;
pub mod ply;
pub mod point_cloud;
pub mod profile;
pub mod triangulator;
pub mod types;

pub use error::{Result, ScanError};
pub use geometry::{FrameSize, ScanGeometry, ScanRegion};
pub use mesh::{Mesh, MeshStrategy, assemble_mesh};
pub use obj::write_obj;
pub use ply::{load_points_from_ply, write_ply};
pub use point_cloud::{CloudReader, PointCloud, PointCloudAccumulator};
pub use profile::{ExtractorConfig, Profile, ProfileExtractor, STRIPE_THRESHOLD, ThresholdMode, extract_profile};
pub use triangulator::{rotation_angle, triangulate, triangulate_into};
pub use types::Point3D;

pub use image::RgbImage;
