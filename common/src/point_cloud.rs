use crate::geometry::Vec3;

/// How a point cloud's points relate to sensor viewpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudKind {
    /// Built up from multiple registered scans; no single sensor origin.
    Fused,
    /// A single scan, stored unordered.
    SingleOrigin,
    /// A single scan, stored in acquisition order (row-major by scan line),
    /// so that `line_width` is meaningful.
    SingleOriginScan,
}

/// The point cloud record threaded through every module in this crate.
///
/// Organized-cloud filters (the ordered median denoise) rely on `line_width`
/// being set to the number of points per scan line; `0` means the cloud has
/// no known scan-line structure.
#[derive(Debug, Clone)]
pub struct PointCloud {
    pub kind: CloudKind,
    pub positions: Vec<Vec3>,
    pub colors: Option<Vec<[f32; 3]>>,
    pub normals: Option<Vec<Vec3>>,
    pub line_width: usize,
}

impl PointCloud {
    pub fn new(kind: CloudKind, positions: Vec<Vec3>) -> Self {
        PointCloud {
            kind,
            positions,
            colors: None,
            normals: None,
            line_width: 0,
        }
    }

    pub fn with_line_width(mut self, line_width: usize) -> Self {
        self.line_width = line_width;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// The axis-aligned bounding box of `positions`, or `None` if empty or if
    /// any coordinate is non-finite.
    pub fn finite_bound(&self) -> Option<(Vec3, Vec3)> {
        if self.positions.is_empty() {
            return None;
        }
        let mut min = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        let mut max = Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in &self.positions {
            if !p.iter().all(|c| c.is_finite()) {
                return None;
            }
            min = min.inf(p);
            max = max.sup(p);
        }
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cloud_has_no_bound() {
        let cloud = PointCloud::new(CloudKind::Fused, vec![]);
        assert!(cloud.finite_bound().is_none());
    }

    #[test]
    fn bound_covers_all_points() {
        let cloud = PointCloud::new(
            CloudKind::Fused,
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, -1.0, 2.0),
                Vec3::new(-1.0, 1.0, -2.0),
            ],
        );
        let (min, max) = cloud.finite_bound().unwrap();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -2.0));
        assert_eq!(max, Vec3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn nan_point_rejects_bound() {
        let cloud = PointCloud::new(CloudKind::Fused, vec![Vec3::new(f32::NAN, 0.0, 0.0)]);
        assert!(cloud.finite_bound().is_none());
    }
}
