use coreg_common::{geometry::Vec3, spatial_hash::SpatialHash2D};
use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use rayon::prelude::*;

/// Estimates a surface normal at each of `positions` from its neighborhood in
/// `hash`, by fitting a least-squares plane (the eigenvector of the
/// neighborhood's scatter matrix with the smallest eigenvalue).
///
/// Points with fewer than 3 neighbors within `radius` get a zero normal.
/// When `force_up`, normals are flipped into the +Z hemisphere; this is what
/// the viewpoint-grid construction needs (there is no sensor viewpoint to
/// orient against, only "which way is up").
pub fn find_normal<T>(
    positions: &[Vec3],
    radius: f32,
    hash: &SpatialHash2D<T>,
    force_up: bool,
) -> Vec<Vec3>
where
    T: Copy + Sync,
{
    positions
        .par_iter()
        .map(|p| normal_at(*p, radius, hash, force_up))
        .collect()
}

fn normal_at<T: Copy>(p: Vec3, radius: f32, hash: &SpatialHash2D<T>, force_up: bool) -> Vec3 {
    let mut neighbors = Vec::new();
    hash.find_within_radius(&p, radius, &mut neighbors);

    if neighbors.len() < 3 {
        return Vec3::zeros();
    }

    let mut mean = Vector3::zeros();
    let mut cov = Matrix3::zeros();
    let mut n = 0.0f32;
    for &(q, _) in &neighbors {
        n += 1.0;
        cov = (cov * (n - 1.0) + q * q.transpose()) / n;
        mean = (mean * (n - 1.0) + q) / n;
    }
    cov -= mean * mean.transpose();

    let eigen: SymmetricEigen<f32, nalgebra::Const<3>> = cov.symmetric_eigen();
    // nalgebra orders eigenvalues ascending; column 0 is the flattest
    // direction, i.e. the plane normal.
    let normal = eigen.eigenvectors.column(0).into_owned();

    if force_up && normal.z < 0.0 {
        -normal
    } else {
        normal
    }
}
