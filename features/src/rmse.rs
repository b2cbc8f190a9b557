use coreg_common::{geometry::Pose, geometry::Vec3, spatial_hash::SpatialHash2D};

/// Root-mean-square nearest-neighbor distance between `pose`-transformed
/// `cloud` points and the points indexed by `hash`, restricted to inliers
/// within `inlier_radius`. Points with no neighbor in range are excluded from
/// both the sum and the count, so a registration that only explains part of
/// the scan is not penalized for the unexplained part — this mirrors how
/// candidate poses are pruned before the more expensive ICP refinement runs.
///
/// Returns `f32::MAX` if no point has an inlier neighbor.
pub fn rmse_of_registration<T: Copy>(
    hash: &SpatialHash2D<T>,
    cloud: &[Vec3],
    inlier_radius: f32,
    pose: &Pose,
) -> f32 {
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;

    for p in cloud {
        let world = pose.transform_point(p);
        if let Some((nearest, _)) = hash.find_nearest(&world, inlier_radius) {
            let d = (nearest - world).norm();
            sum_sq += (d as f64) * (d as f64);
            count += 1;
        }
    }

    if count == 0 {
        f32::MAX
    } else {
        ((sum_sq / count as f64).sqrt()) as f32
    }
}
