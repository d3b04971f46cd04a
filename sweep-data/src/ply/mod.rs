//! PLY point cloud files.

mod loader;
mod writer;

pub use loader::load_points_from_ply;
pub use writer::{write_ply, write_ply_to};
