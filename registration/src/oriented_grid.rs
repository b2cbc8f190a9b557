use coreg_common::{
    geometry::{Pose, Vec3},
    spatial_hash::SpatialHash2D,
};
use coreg_features::find_normal;
use rayon::prelude::*;

/// A spatial index of the main point cloud plus a set of gravity-aligned
/// candidate sensor poses sampled on a regular grid over its footprint.
///
/// Points only ever get appended (`point_cloud_update`); the full history of
/// sampled poses only ever grows (`viewpoint_grid_update`) until `reset_grid`
/// drops everything.
pub struct OrientedGrid {
    voxel_size: f32,
    pts_main: Vec<Vec3>,
    hash: SpatialHash2D<usize>,
    orient: Vec<Pose>,
    bbox_min: Vec3,
    bbox_max: Vec3,
}

impl OrientedGrid {
    pub fn new(voxel_size: f32) -> Self {
        OrientedGrid {
            voxel_size,
            pts_main: Vec::new(),
            hash: SpatialHash2D::new(voxel_size),
            orient: Vec::new(),
            bbox_min: Vec3::zeros(),
            bbox_max: Vec3::zeros(),
        }
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    pub fn pts_main(&self) -> &[Vec3] {
        &self.pts_main
    }

    pub fn hash(&self) -> &SpatialHash2D<usize> {
        &self.hash
    }

    pub fn orient(&self) -> &[Pose] {
        &self.orient
    }

    pub fn bbox(&self) -> (Vec3, Vec3) {
        (self.bbox_min, self.bbox_max)
    }

    pub fn reset_grid(&mut self) {
        self.pts_main.clear();
        self.hash.clear();
        self.orient.clear();
        self.bbox_min = Vec3::zeros();
        self.bbox_max = Vec3::zeros();
    }

    pub fn delete_and_set_voxel_size(&mut self, voxel_size: f32) {
        self.voxel_size = voxel_size;
        self.reset_grid();
        self.hash = SpatialHash2D::new(voxel_size);
    }

    /// Appends `points` to the grid's main cloud. Returns the bounding box of
    /// just the newly added batch, or the grid's last-known bbox if `points`
    /// is empty or contains non-finite coordinates (the update is skipped in
    /// that case, and a warning is logged).
    pub fn point_cloud_update(&mut self, points: &[Vec3]) -> (Vec3, Vec3) {
        if points.is_empty() {
            log::warn!("point_cloud_update called with no points; ignoring");
            return (self.bbox_min, self.bbox_max);
        }

        let mut min = points[0];
        let mut max = points[0];
        for p in points {
            if !p.iter().all(|c| c.is_finite()) {
                log::warn!("point_cloud_update received a non-finite point; ignoring batch");
                return (self.bbox_min, self.bbox_max);
            }
            min = min.inf(p);
            max = max.sup(p);
        }

        for &p in points {
            let idx = self.pts_main.len();
            self.pts_main.push(p);
            self.hash.add(p, idx);
        }

        self.bbox_min = self.bbox_min.inf(&min);
        self.bbox_max = self.bbox_max.sup(&max);

        (min, max)
    }

    /// Samples a new block of gravity-aligned viewpoints on a `d_grid`-pitch
    /// grid spanning `[box_min.xy, box_max.xy]`, lifted `d_sensor` above the
    /// local surface along its normal. Returns the index the new block
    /// starts at.
    pub fn viewpoint_grid_update(
        &mut self,
        d_grid: f32,
        d_sensor: f32,
        box_min: Vec3,
        box_max: Vec3,
    ) -> usize {
        let grid_width = ((box_max.x - box_min.x) / d_grid).ceil().max(0.0) as usize;
        let grid_height = ((box_max.y - box_min.y) / d_grid).ceil().max(0.0) as usize;
        let total = grid_width * grid_height;
        let pre_size = self.orient.len();

        if total == 0 {
            return pre_size;
        }

        let positions: Vec<Vec3> = (0..total)
            .into_par_iter()
            .map(|idx| {
                let x_grid = idx % grid_width;
                let y_grid = idx / grid_width;
                let mut pos = Vec3::new(
                    box_min.x + x_grid as f32 * d_grid,
                    box_min.y + y_grid as f32 * d_grid,
                    0.0,
                );
                pos.z = match self.hash.find_nearest(&pos, d_grid) {
                    Some((closest, _)) => closest.z,
                    None => box_min.z,
                };
                pos
            })
            .collect();

        let max_dist_for_plane = self.voxel_size * 2.0;
        let normals = find_normal(&positions, max_dist_for_plane, &self.hash, true);

        let new_poses: Vec<Pose> = (0..total)
            .into_par_iter()
            .map(|idx| {
                let normal = normals[idx];
                let lifted = positions[idx] + d_sensor * normal;

                let mut x_axis = Vec3::new(1.0, 0.0, 0.0);
                x_axis -= normal * x_axis.dot(&normal);
                let x_axis = if x_axis.norm() > 1e-8 {
                    x_axis.normalize()
                } else {
                    Vec3::new(0.0, 1.0, 0.0)
                };
                let y_axis = normal.cross(&x_axis).normalize();

                Pose::from_basis(x_axis, y_axis, normal, lifted)
            })
            .collect();

        self.orient.extend(new_poses);
        pre_size
    }

    /// `point_cloud_update` followed by `viewpoint_grid_update` over the
    /// newly added batch's bounding box. Returns the index the new viewpoint
    /// block starts at.
    pub fn point_cloud_and_grid_update(
        &mut self,
        points: &[Vec3],
        d_grid: f32,
        d_sensor: f32,
    ) -> usize {
        let (min, max) = self.point_cloud_update(points);
        self.viewpoint_grid_update(d_grid, d_sensor, min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_ground(n: usize, spacing: f32) -> Vec<Vec3> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(Vec3::new(i as f32 * spacing, j as f32 * spacing, 0.0));
            }
        }
        points
    }

    #[test]
    fn empty_update_is_a_noop() {
        let mut grid = OrientedGrid::new(1.0);
        let bbox = grid.point_cloud_update(&[]);
        assert_eq!(bbox, (Vec3::zeros(), Vec3::zeros()));
        assert!(grid.pts_main().is_empty());
    }

    #[test]
    fn bbox_grows_monotonically() {
        let mut grid = OrientedGrid::new(1.0);
        grid.point_cloud_update(&[Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)]);
        let (min1, max1) = grid.bbox();
        grid.point_cloud_update(&[Vec3::new(-1.0, -1.0, -1.0)]);
        let (min2, max2) = grid.bbox();
        assert!(min2.x <= min1.x && min2.y <= min1.y && min2.z <= min1.z);
        assert!(max2.x >= max1.x && max2.y >= max1.y && max2.z >= max1.z);
    }

    #[test]
    fn viewpoint_poses_are_orthonormal() {
        let mut grid = OrientedGrid::new(1.0);
        let points = flat_ground(10, 1.0);
        grid.point_cloud_and_grid_update(&points, 3.0, 2.0);
        assert!(!grid.orient().is_empty());
        for pose in grid.orient() {
            assert!(pose.is_orthonormal(1e-3), "{pose:?} not orthonormal");
            assert!(pose.z_axis.z > 0.9, "expected near-vertical z axis");
        }
    }

    #[test]
    fn reset_clears_everything_but_keeps_voxel_size() {
        let mut grid = OrientedGrid::new(1.5);
        grid.point_cloud_and_grid_update(&flat_ground(5, 1.0), 3.0, 2.0);
        grid.reset_grid();
        assert!(grid.pts_main().is_empty());
        assert!(grid.orient().is_empty());
        assert_eq!(grid.voxel_size(), 1.5);
    }
}
