use coreg_common::geometry::{Pose, Vec3};
use coreg_common::spatial_hash::SpatialHash2D;
use nalgebra::{Matrix3, Rotation3};

use crate::error::RegistrationError;

/// Point-to-point iterated closest point refinement against a fixed target
/// cloud indexed by a [`SpatialHash2D`].
///
/// Each iteration finds, for every source point, its nearest target point
/// within `resolution`, solves the rigid transform that best aligns the
/// resulting correspondences in a least-squares sense (Kabsch's algorithm via
/// the SVD of the cross-covariance matrix), and folds that increment into
/// the running pose estimate. Iteration stops when the mean squared
/// correspondence distance changes by less than `mse_interval_threshold`
/// between two consecutive iterations, or after `max_iterations`.
pub struct Icp {
    resolution: f32,
    max_iterations: usize,
    mse_interval_threshold: f32,
    pts_main: Vec<Vec3>,
    hash: SpatialHash2D<usize>,
}

impl Icp {
    pub fn new(resolution: f32) -> Self {
        Icp {
            resolution,
            max_iterations: 30,
            mse_interval_threshold: 1e-5,
            pts_main: Vec::new(),
            hash: SpatialHash2D::new(resolution),
        }
    }

    pub fn set_registration_resolution(&mut self, resolution: f32) {
        self.resolution = resolution;
        self.hash = SpatialHash2D::new(resolution);
        for (i, p) in self.pts_main.iter().enumerate() {
            self.hash.add(*p, i);
        }
    }

    /// Binds the fixed target cloud for subsequent registrations, indexed by
    /// `hash` (callers typically reuse a [`SpatialHash2D`] already built over
    /// `pts_main` for other purposes, e.g. normal estimation).
    pub fn main_point_cloud_update(&mut self, hash: &SpatialHash2D<usize>, pts_main: &[Vec3]) {
        self.pts_main = pts_main.to_vec();
        self.hash = hash.clone();
    }

    /// Refines `init` against the bound target cloud. Never fails: an empty
    /// `cloud` or target degenerates to `(init, f32::MAX)`.
    pub fn secondary_point_cloud_registration(&self, cloud: &[Vec3], init: &Pose) -> (Pose, f32) {
        self.try_register(cloud, init).unwrap_or((*init, f32::MAX))
    }

    /// Fallible core of [`Self::secondary_point_cloud_registration`]. Returns
    /// [`RegistrationError::SourceEmpty`] / [`RegistrationError::TargetEmpty`]
    /// for the degenerate-input cases the public method collapses to a
    /// sentinel score. Running out of `max_iterations` without meeting the
    /// mse-delta threshold is not itself an error — it's a soft cap on a
    /// normally-converging iteration — but is logged via
    /// [`RegistrationError::IcpDidNotConverge`] for diagnostics.
    fn try_register(&self, cloud: &[Vec3], init: &Pose) -> Result<(Pose, f32), RegistrationError> {
        if cloud.is_empty() {
            return Err(RegistrationError::SourceEmpty);
        }
        if self.pts_main.is_empty() {
            return Err(RegistrationError::TargetEmpty);
        }

        let mut current = *init;
        let mut prev_mse = f32::MAX;

        for _ in 0..self.max_iterations {
            let transformed: Vec<Vec3> = cloud.iter().map(|p| current.transform_point(p)).collect();

            let mut correspondences = Vec::with_capacity(transformed.len());
            for p in &transformed {
                if let Some((target, _)) = self.hash.find_nearest(p, self.resolution) {
                    correspondences.push((*p, target));
                }
            }

            if correspondences.len() < 3 {
                return Ok((current, prev_mse.min(f32::MAX)));
            }

            let mse = correspondences
                .iter()
                .map(|(a, b)| (a - b).norm_squared())
                .sum::<f32>()
                / correspondences.len() as f32;

            let (delta_rotation, mean_a, mean_b) = kabsch(&correspondences);
            current = apply_delta(&current, delta_rotation, mean_a, mean_b);

            if (prev_mse - mse).abs() < self.mse_interval_threshold {
                return Ok((current, mse));
            }
            prev_mse = mse;
        }

        log::warn!("{}", RegistrationError::IcpDidNotConverge(self.max_iterations));
        Ok((current, prev_mse))
    }
}

/// Solves for the rotation that best aligns `a` points onto `b` points (the
/// Kabsch / Umeyama closed-form solution), returning the rotation plus both
/// centroids.
fn kabsch(correspondences: &[(Vec3, Vec3)]) -> (Rotation3<f32>, Vec3, Vec3) {
    let n = correspondences.len() as f32;
    let mean_a = correspondences.iter().map(|(a, _)| a).sum::<Vec3>() / n;
    let mean_b = correspondences.iter().map(|(_, b)| b).sum::<Vec3>() / n;

    let mut cross = Matrix3::zeros();
    for (a, b) in correspondences {
        cross += (a - mean_a) * (b - mean_b).transpose();
    }

    let svd = cross.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return (Rotation3::identity(), mean_a, mean_b),
    };

    let mut d = Matrix3::identity();
    if (v_t.transpose() * u.transpose()).determinant() < 0.0 {
        d[(2, 2)] = -1.0;
    }
    let r = v_t.transpose() * d * u.transpose();

    (
        Rotation3::from_matrix_unchecked(r),
        mean_a,
        mean_b,
    )
}

fn apply_delta(current: &Pose, delta: Rotation3<f32>, mean_a: Vec3, mean_b: Vec3) -> Pose {
    let rotate = |v: &Vec3| delta * v;
    let new_translation = mean_b - rotate(&mean_a) + rotate(&current.translation);
    Pose {
        x_axis: rotate(&current.x_axis),
        y_axis: rotate(&current.y_axis),
        z_axis: rotate(&current.z_axis),
        translation: new_translation,
    }
}
