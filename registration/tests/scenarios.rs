//! End-to-end registration scenarios (spec.md §8 S1-S5). Each synthesizes a
//! main cloud and a secondary cloud related to it by a known rigid
//! transform, then checks `CoarseRegistrar::secondary_point_cloud_registration`
//! recovers it within tolerance.

use std::f32::consts::PI;

use coreg_common::{
    geometry::{dist, Pose, Vec3},
    point_cloud::{CloudKind, PointCloud},
};
use coreg_registration::{CoarseRegistrar, CoarseRegistrarOptions};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

/// A flat, slightly noisy ground patch: `n * n` points on a `spacing`-pitch
/// grid in the XY plane, each perturbed by up to `noise` in every axis.
fn noisy_patch(n: usize, spacing: f32, noise: f32, rng: &mut StdRng) -> Vec<Vec3> {
    let mut points = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let jitter = |rng: &mut StdRng| rng.gen_range(-noise..=noise);
            points.push(Vec3::new(
                i as f32 * spacing + jitter(rng),
                j as f32 * spacing + jitter(rng),
                jitter(rng),
            ));
        }
    }
    points
}

fn rotate_z(points: &[Vec3], theta: f32) -> Vec<Vec3> {
    let (s, c) = theta.sin_cos();
    points
        .iter()
        .map(|p| Vec3::new(c * p.x - s * p.y, s * p.x + c * p.y, p.z))
        .collect()
}

fn translate(points: &[Vec3], offset: Vec3) -> Vec<Vec3> {
    points.iter().map(|p| p + offset).collect()
}

fn small_options() -> CoarseRegistrarOptions {
    CoarseRegistrarOptions::builder()
        .voxel_size_global(1.0)
        .voxel_size_local(1.0)
        .d_grid(2.0)
        .d_sensor(1.5)
        .line_width(24)
        .num_lines(12)
        .r_min(-1.0)
        .r_max(-1.0)
        .med_filt_size_0(3)
        .med_filt_size_1(3)
        .build()
}

#[test]
fn s1_identity_registers_with_low_residual() {
    let mut rng = StdRng::seed_from_u64(1);
    let main_points = noisy_patch(20, 0.5, 0.02, &mut rng);
    let main = PointCloud::new(CloudKind::Fused, main_points.clone());

    let mut registrar = CoarseRegistrar::new(small_options());
    registrar.main_point_cloud_update(&main, true);

    let secondary_points: Vec<Vec3> = main_points.into_iter().take(150).collect();
    let secondary = PointCloud::new(CloudKind::SingleOrigin, secondary_points);

    let (_, score) = registrar.secondary_point_cloud_registration(&secondary, Some(&Pose::identity()));
    assert!(score < 1.0, "expected a low residual for an (almost) identity match, got {score}");
}

#[test]
fn s2_rotation_only_recovers_azimuth() {
    let mut rng = StdRng::seed_from_u64(2);
    let main_points = noisy_patch(20, 0.5, 0.01, &mut rng);
    let main = PointCloud::new(CloudKind::Fused, main_points.clone());

    let mut registrar = CoarseRegistrar::new(small_options());
    registrar.main_point_cloud_update(&main, true);

    let theta = 37f32.to_radians();
    let rotated = rotate_z(&main_points, theta);
    let secondary = PointCloud::new(CloudKind::SingleOrigin, rotated);

    let (pose, score) = registrar.secondary_point_cloud_registration(&secondary, Some(&Pose::identity()));
    assert!(pose.is_orthonormal(1e-3));
    assert!(score.is_finite() && score < 1.0, "expected a low residual after azimuth recovery, got {score}");

    // `secondary` is `main` rotated by `+theta` about Z, so the recovered
    // pose (secondary frame -> main frame) should undo that: rotation by
    // `-theta`, translation near zero (§8 property 6).
    let recovered_angle = pose.x_axis.y.atan2(pose.x_axis.x);
    let angle_error = (recovered_angle + theta + PI).rem_euclid(2.0 * PI) - PI;
    assert!(
        angle_error.abs() < 0.05,
        "expected recovered rotation near {}, got {recovered_angle} (error {angle_error})",
        -theta
    );
    assert!(
        pose.translation().norm() < 1.0,
        "expected near-zero translation for a rotation-only secondary, got {:?}",
        pose.translation()
    );
}

#[test]
fn s3_translated_with_estimate_recovers_within_search_radius() {
    let mut rng = StdRng::seed_from_u64(3);
    let main_points = noisy_patch(24, 0.5, 0.01, &mut rng);
    let main = PointCloud::new(CloudKind::Fused, main_points.clone());

    let options = CoarseRegistrarOptions::builder()
        .voxel_size_global(1.0)
        .voxel_size_local(1.0)
        .d_grid(2.0)
        .d_sensor(1.5)
        .line_width(24)
        .num_lines(12)
        .r_min(-1.0)
        .r_max(-1.0)
        .med_filt_size_0(3)
        .med_filt_size_1(3)
        .search_range(5.0)
        .build();
    let mut registrar = CoarseRegistrar::new(options);
    registrar.main_point_cloud_update(&main, true);

    let offset = Vec3::new(3.0, -2.0, 0.0);
    let shifted = translate(&main_points, offset);
    let secondary = PointCloud::new(CloudKind::SingleOrigin, shifted);

    let estimate = Pose::from_basis(
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        offset,
    );
    let (pose, score) = registrar.secondary_point_cloud_registration(&secondary, Some(&estimate));
    assert!(score.is_finite() && score < 1.0, "expected a low residual, got {score}");
    assert!(
        dist(&pose.translation(), &offset) < 2.5,
        "expected translation near {offset:?}, got {:?}",
        pose.translation()
    );
}

#[test]
fn s4_no_estimate_falls_back_to_full_bbox_search() {
    let mut rng = StdRng::seed_from_u64(4);
    let main_points = noisy_patch(24, 0.5, 0.01, &mut rng);
    let main = PointCloud::new(CloudKind::Fused, main_points.clone());

    let mut registrar = CoarseRegistrar::new(small_options());
    registrar.main_point_cloud_update(&main, true);

    let offset = Vec3::new(3.0, -2.0, 0.0);
    let shifted = translate(&main_points, offset);
    let secondary = PointCloud::new(CloudKind::SingleOrigin, shifted);

    let (pose, score) = registrar.secondary_point_cloud_registration(&secondary, None);
    assert!(score.is_finite());
    assert!(
        dist(&pose.translation(), &offset) < 4.0,
        "expected translation near {offset:?}, got {:?}",
        pose.translation()
    );
}

#[test]
fn s5_empty_secondary_is_a_harmless_sentinel() {
    let mut rng = StdRng::seed_from_u64(5);
    let main_points = noisy_patch(10, 0.5, 0.0, &mut rng);
    let main = PointCloud::new(CloudKind::Fused, main_points);

    let mut registrar = CoarseRegistrar::new(small_options());
    registrar.main_point_cloud_update(&main, true);

    let empty = PointCloud::new(CloudKind::SingleOrigin, vec![]);
    let (pose, score) = registrar.secondary_point_cloud_registration(&empty, None);
    assert_eq!(pose, Pose::identity());
    assert_eq!(score, f32::MAX);
}
