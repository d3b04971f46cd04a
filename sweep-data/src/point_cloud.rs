//! Point cloud accumulation across one capture session.
//!
//! The accumulator is the only writer. Viewers and exporters hold a
//! [`CloudReader`], which copies the cloud under a read lock so that a
//! snapshot never observes a half-finished append. A version counter lets
//! readers skip copying when nothing changed.

use crate::error::{Result, ScanError};
use crate::mesh::{Mesh, MeshStrategy, assemble_mesh};
use crate::types::Point3D;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Ordered, append-only points of one scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<Point3D>,
    expected_frames: usize,
    scan_height: usize,
}

impl PointCloud {
    /// Empty cloud with room for `expected_frames * scan_height` points.
    ///
    /// Fails with `InvalidCaptureParameters` when that many points cannot
    /// be addressed or allocated.
    pub fn try_with_capacity(expected_frames: usize, scan_height: usize) -> Result<Self> {
        let expected = expected_frames.checked_mul(scan_height).ok_or_else(|| {
            ScanError::InvalidCaptureParameters(format!(
                "{} frames of {} lines overflow the point count",
                expected_frames, scan_height
            ))
        })?;

        let mut points = Vec::new();
        points.try_reserve_exact(expected).map_err(|e| {
            ScanError::InvalidCaptureParameters(format!(
                "cannot reserve {} points: {}",
                expected, e
            ))
        })?;

        Ok(Self {
            points,
            expected_frames,
            scan_height,
        })
    }

    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn expected_frames(&self) -> usize {
        self.expected_frames
    }

    pub fn scan_height(&self) -> usize {
        self.scan_height
    }

    /// Number of points a complete session produces.
    pub fn expected_len(&self) -> usize {
        self.expected_frames.saturating_mul(self.scan_height)
    }

    /// Number of whole frames accumulated so far.
    pub fn frame_count(&self) -> usize {
        if self.scan_height == 0 {
            0
        } else {
            self.points.len() / self.scan_height
        }
    }

    /// Points of frame `index`, if it has been fully accumulated.
    pub fn frame(&self, index: usize) -> Option<&[Point3D]> {
        if index >= self.frame_count() {
            return None;
        }
        let start = index * self.scan_height;
        Some(&self.points[start..start + self.scan_height])
    }
}

#[derive(Debug, Default)]
struct SharedCloud {
    cloud: RwLock<PointCloud>,
    version: AtomicU64,
}

impl SharedCloud {
    fn read(&self) -> RwLockReadGuard<'_, PointCloud> {
        self.cloud.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PointCloud> {
        self.cloud.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read-only handle on the cloud being accumulated.
#[derive(Debug, Clone)]
pub struct CloudReader {
    shared: Arc<SharedCloud>,
}

impl CloudReader {
    /// Copy of the cloud as of the last completed append.
    pub fn snapshot(&self) -> PointCloud {
        self.shared.read().clone()
    }

    /// Incremented on every append or reconfiguration.
    pub fn version(&self) -> u64 {
        self.shared.version.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.shared.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.read().is_empty()
    }

    /// Run `f` against the cloud while holding the read lock.
    pub fn with_cloud<R>(&self, f: impl FnOnce(&PointCloud) -> R) -> R {
        f(&self.shared.read())
    }
}

/// Owns the growing point cloud and triggers mesh assembly exactly once.
#[derive(Debug)]
pub struct PointCloudAccumulator {
    shared: Arc<SharedCloud>,
    strategy: MeshStrategy,
    finalized: bool,
}

impl PointCloudAccumulator {
    pub fn new(strategy: MeshStrategy) -> Self {
        Self {
            shared: Arc::default(),
            strategy,
            finalized: false,
        }
    }

    /// Drop all points and prepare for `expected_frames` frames of `scan_height` lines.
    pub fn configure(&mut self, expected_frames: usize, scan_height: usize) -> Result<()> {
        let cloud = PointCloud::try_with_capacity(expected_frames, scan_height)?;
        *self.shared.write() = cloud;
        self.shared.version.fetch_add(1, Ordering::AcqRel);
        self.finalized = false;
        debug!(
            "Point cloud configured for {} frames x {} lines",
            expected_frames, scan_height
        );
        Ok(())
    }

    /// Append points at the end, in submission order.
    pub fn append(&mut self, points: &[Point3D]) {
        self.shared.write().points.extend_from_slice(points);
        self.shared.version.fetch_add(1, Ordering::AcqRel);
    }

    pub fn reader(&self) -> CloudReader {
        CloudReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn len(&self) -> usize {
        self.shared.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.read().is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn strategy(&self) -> MeshStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: MeshStrategy) {
        self.strategy = strategy;
    }

    /// Assemble the mesh from every accumulated point.
    ///
    /// Fails until all expected frames have been appended, and fails on any
    /// call after the first successful one until the next `configure`.
    pub fn finalize_mesh(&mut self) -> Result<Mesh> {
        if self.finalized {
            return Err(ScanError::MeshAlreadyFinalized);
        }

        let cloud = self.shared.read();
        if cloud.len() < cloud.expected_len() {
            return Err(ScanError::MeshNotReady {
                expected: cloud.expected_len(),
                received: cloud.len(),
            });
        }

        let mesh = assemble_mesh(cloud.points(), cloud.scan_height(), self.strategy);
        drop(cloud);

        self.finalized = true;
        info!(
            "Mesh finalized: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }
}

impl Default for PointCloudAccumulator {
    fn default() -> Self {
        Self::new(MeshStrategy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_points(frame: usize, lines: usize) -> Vec<Point3D> {
        let angle = frame as f32 * 0.5;
        (0..lines)
            .map(|line| Point3D::new(angle.cos(), (lines - line) as f32, angle.sin()))
            .collect()
    }

    #[test]
    fn test_append_preserves_order() {
        let mut acc = PointCloudAccumulator::default();
        acc.configure(2, 3).unwrap();
        let first = frame_points(0, 3);
        let second = frame_points(1, 3);
        acc.append(&first);
        acc.append(&second);

        let cloud = acc.reader().snapshot();
        assert_eq!(cloud.len(), 6);
        assert_eq!(cloud.frame(0), Some(first.as_slice()));
        assert_eq!(cloud.frame(1), Some(second.as_slice()));
        assert_eq!(cloud.frame(2), None);
    }

    #[test]
    fn test_configure_clears_points() {
        let mut acc = PointCloudAccumulator::default();
        acc.configure(1, 3).unwrap();
        acc.append(&frame_points(0, 3));
        assert_eq!(acc.len(), 3);

        acc.configure(4, 2).unwrap();
        assert!(acc.is_empty());
        let cloud = acc.reader().snapshot();
        assert_eq!(cloud.expected_frames(), 4);
        assert_eq!(cloud.scan_height(), 2);
        assert_eq!(cloud.expected_len(), 8);
    }

    #[test]
    fn test_finalize_requires_all_frames() {
        let mut acc = PointCloudAccumulator::default();
        acc.configure(3, 4).unwrap();
        acc.append(&frame_points(0, 4));

        match acc.finalize_mesh() {
            Err(ScanError::MeshNotReady { expected, received }) => {
                assert_eq!(expected, 12);
                assert_eq!(received, 4);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!acc.is_finalized());
    }

    #[test]
    fn test_finalize_exactly_once() {
        let mut acc = PointCloudAccumulator::default();
        acc.configure(3, 4).unwrap();
        for frame in 0..3 {
            acc.append(&frame_points(frame, 4));
        }

        let mesh = acc.finalize_mesh().unwrap();
        assert_eq!(mesh.vertex_count(), 12);
        assert!(!mesh.is_empty());
        assert!(acc.is_finalized());
        assert!(matches!(acc.finalize_mesh(), Err(ScanError::MeshAlreadyFinalized)));

        acc.configure(3, 4).unwrap();
        assert!(!acc.is_finalized());
    }

    #[test]
    fn test_reader_version_tracks_writes() {
        let mut acc = PointCloudAccumulator::default();
        let reader = acc.reader();
        let v0 = reader.version();

        acc.configure(2, 2).unwrap();
        let v1 = reader.version();
        assert!(v1 > v0);

        acc.append(&frame_points(0, 2));
        assert!(reader.version() > v1);
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.with_cloud(|cloud| cloud.frame_count()), 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut acc = PointCloudAccumulator::default();
        acc.configure(2, 2).unwrap();
        acc.append(&frame_points(0, 2));
        let snapshot = acc.reader().snapshot();

        acc.append(&frame_points(1, 2));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(acc.len(), 4);
    }

    #[test]
    fn test_oversized_session_is_rejected() {
        let mut acc = PointCloudAccumulator::default();
        acc.configure(2, 2).unwrap();
        acc.append(&frame_points(0, 2));

        assert!(matches!(
            acc.configure(usize::MAX / 2, 4),
            Err(ScanError::InvalidCaptureParameters(_))
        ));
        assert!(matches!(
            acc.configure(usize::MAX / 64, 4),
            Err(ScanError::InvalidCaptureParameters(_))
        ));
        // A rejected configure leaves the previous cloud untouched.
        assert_eq!(acc.len(), 2);
    }
}
