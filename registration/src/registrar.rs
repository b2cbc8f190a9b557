use coreg_common::{
    geometry::{dist2d, Pose, Vec3},
    point_cloud::PointCloud,
};
use coreg_features::rmse_of_registration;
use coreg_filters::{denoise_range_of_ordered_point_cloud, down_sample_point_cloud};
use rayon::prelude::*;

use crate::{descriptor_cache::DescriptorCache, dft::dft2d, icp::Icp, phase_correlation::search_dictionary, range_image::pcl2descriptor};

/// Tunable parameters for [`CoarseRegistrar`]. Construct via
/// [`CoarseRegistrarOptions::builder`]; every field has a default matching
/// the corpus this crate was grown from.
#[derive(Clone, Debug)]
pub struct CoarseRegistrarOptions {
    pub(crate) voxel_size_global: f32,
    pub(crate) voxel_size_local: f32,
    pub(crate) d_grid: f32,
    pub(crate) d_sensor: f32,
    pub(crate) line_width: usize,
    pub(crate) num_lines: usize,
    pub(crate) search_range: f32,
    pub(crate) med_filt_size_0: isize,
    pub(crate) med_filt_size_1: isize,
    pub(crate) dist_from_median_thresh: f32,
    pub(crate) r_max: f32,
    pub(crate) r_min: f32,
    pub(crate) f_num_of_cand_wanted: usize,
}

impl CoarseRegistrarOptions {
    pub fn builder() -> CoarseRegistrarOptionsBuilder {
        CoarseRegistrarOptionsBuilder {
            _internal: CoarseRegistrarOptions {
                voxel_size_global: 2.0,
                voxel_size_local: 2.0,
                d_grid: 3.0,
                d_sensor: 2.0,
                line_width: 128,
                num_lines: 64,
                search_range: 50.0,
                med_filt_size_0: 7,
                med_filt_size_1: 5,
                dist_from_median_thresh: 0.03,
                r_max: 60.0,
                r_min: 2.0,
                f_num_of_cand_wanted: 10,
            },
        }
    }
}

impl Default for CoarseRegistrarOptions {
    fn default() -> Self {
        CoarseRegistrarOptions::builder().build()
    }
}

/// A builder-pattern struct for safely constructing a [`CoarseRegistrarOptions`].
#[derive(Clone, Debug)]
pub struct CoarseRegistrarOptionsBuilder {
    _internal: CoarseRegistrarOptions,
}

macro_rules! with_field {
    ($name:ident, $field:ident, $ty:ty) => {
        pub fn $name(mut self, $field: $ty) -> Self {
            self._internal.$field = $field;
            self
        }
    };
}

impl CoarseRegistrarOptionsBuilder {
    with_field!(voxel_size_global, voxel_size_global, f32);
    with_field!(voxel_size_local, voxel_size_local, f32);
    with_field!(d_grid, d_grid, f32);
    with_field!(d_sensor, d_sensor, f32);
    with_field!(line_width, line_width, usize);
    with_field!(num_lines, num_lines, usize);
    with_field!(search_range, search_range, f32);
    with_field!(med_filt_size_0, med_filt_size_0, isize);
    with_field!(med_filt_size_1, med_filt_size_1, isize);
    with_field!(dist_from_median_thresh, dist_from_median_thresh, f32);
    with_field!(r_max, r_max, f32);
    with_field!(r_min, r_min, f32);
    with_field!(f_num_of_cand_wanted, f_num_of_cand_wanted, usize);

    pub fn build(self) -> CoarseRegistrarOptions {
        self._internal
    }
}

/// Orchestrates the coarse point-cloud registration pipeline: preprocess,
/// descriptor extraction, phase-correlation search, RMSE pruning, two-pass
/// ICP refinement.
pub struct CoarseRegistrar {
    options: CoarseRegistrarOptions,
    cache: DescriptorCache,
}

impl CoarseRegistrar {
    pub fn new(options: CoarseRegistrarOptions) -> Self {
        let cache = DescriptorCache::new(
            options.voxel_size_global,
            options.line_width,
            options.num_lines,
            options.r_min,
            options.r_max,
        );
        CoarseRegistrar { options, cache }
    }

    pub fn options(&self) -> &CoarseRegistrarOptions {
        &self.options
    }

    /// Voxel-downsamples `cloud` at `voxel_size_global`, optionally wiping
    /// the dictionary first, then grows it over the new points.
    pub fn main_point_cloud_update(&mut self, cloud: &PointCloud, clean: bool) {
        if clean {
            self.cache.reset_dictionary();
        }
        let down = down_sample_point_cloud(cloud, self.options.voxel_size_global);
        self.cache
            .dictionary_update(&down.positions, self.options.d_grid, self.options.d_sensor);
    }

    /// Registers `cloud` against the bound dictionary. Never fails: an empty
    /// `cloud` degenerates to `(estimated_pose.unwrap_or_default(), f32::MAX)`.
    pub fn secondary_point_cloud_registration(
        &self,
        cloud: &PointCloud,
        estimated_pose: Option<&Pose>,
    ) -> (Pose, f32) {
        if cloud.is_empty() {
            return (estimated_pose.copied().unwrap_or_else(Pose::identity), f32::MAX);
        }

        let denoised = denoise_range_of_ordered_point_cloud(
            cloud,
            self.options.med_filt_size_0,
            self.options.med_filt_size_1,
            self.options.dist_from_median_thresh,
        );
        let down = down_sample_point_cloud(&denoised, self.options.voxel_size_local);
        if down.is_empty() {
            return (estimated_pose.copied().unwrap_or_else(Pose::identity), f32::MAX);
        }

        let query_image = pcl2descriptor(
            &down.positions,
            self.options.line_width,
            self.options.num_lines,
            self.options.r_min,
            self.options.r_max,
        );
        let mut query_dft: Vec<_> = query_image.iter().map(|&r| rustfft::num_complex::Complex32::new(r, 0.0)).collect();
        if let Err(err) = dft2d(self.options.line_width, self.options.num_lines, &mut query_dft, true) {
            log::warn!("secondary registration skipped, query descriptor shape mismatch: {err}");
            return (estimated_pose.copied().unwrap_or_else(Pose::identity), f32::MAX);
        }

        let (search_center, search_radius) = match estimated_pose {
            Some(pose) => (pose.translation(), self.options.search_range),
            None => {
                let (bbox_min, bbox_max) = self.cache.grid().bbox();
                let center = (bbox_min + bbox_max) * 0.5;
                let radius = dist2d(&bbox_min, &bbox_max);
                (center, radius)
            }
        };

        let raw_candidates = search_dictionary(
            &self.cache,
            self.options.f_num_of_cand_wanted,
            search_radius,
            &query_dft,
            search_center,
        );
        if raw_candidates.is_empty() {
            return (estimated_pose.copied().unwrap_or_else(Pose::identity), f32::MAX);
        }

        let inlier_radius = 4.0 * self.options.voxel_size_global;
        let hash = self.cache.grid().hash();
        let mut scored: Vec<(Pose, f32)> = raw_candidates
            .par_iter()
            .map(|candidate| {
                let rmse = rmse_of_registration(hash, &down.positions, inlier_radius, &candidate.pose);
                (candidate.pose, rmse)
            })
            .collect();
        scored.sort_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.options.f_num_of_cand_wanted.min(scored.len()));

        let mut coarse_icp = Icp::new(1.5 * self.options.voxel_size_global);
        coarse_icp.main_point_cloud_update(hash, self.cache.grid().pts_main());

        let best = scored
            .iter()
            .map(|(pose, _)| coarse_icp.secondary_point_cloud_registration(&down.positions, pose))
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let Some((best_pose, _)) = best else {
            return (estimated_pose.copied().unwrap_or_else(Pose::identity), f32::MAX);
        };

        let mut fine_icp = Icp::new(0.5 * self.options.voxel_size_global);
        fine_icp.main_point_cloud_update(hash, self.cache.grid().pts_main());
        fine_icp.secondary_point_cloud_registration(&down.positions, &best_pose)
    }

    /// The maximum distance a secondary cloud's furthest point could lie from
    /// its sensor origin and still be considered by the search — the radius
    /// callers should use when deciding how much of a scene to stream in.
    pub fn range_needed(&self) -> f32 {
        self.options.search_range + self.options.r_max
    }
}
