use std::f32::consts::PI;

use coreg_common::geometry::Vec3;

/// Builds a polar range image: a `desc_width` (azimuth) by `desc_height`
/// (elevation) grid where each cell holds the range of the closest point
/// that projects into it, zero if none do. `points` are assumed already
/// expressed in the frame the image is centered on.
///
/// `r_min`/`r_max` of `-1.0` disable the corresponding cutoff.
pub fn pcl2descriptor(
    points: &[Vec3],
    desc_width: usize,
    desc_height: usize,
    r_min: f32,
    r_max: f32,
) -> Vec<f32> {
    let mut image = vec![0.0f32; desc_width * desc_height];
    if desc_width == 0 || desc_height == 0 {
        return image;
    }

    let azimuth_res = desc_width as f32 / (2.0 * PI);
    let elevation_res = desc_height as f32 / PI;
    let check_min = r_min != -1.0;
    let check_max = r_max != -1.0;

    // Serial: multiple points can map to the same cell, and the update is a
    // shared "keep the minimum" write that can't be split across threads
    // without per-cell synchronization.
    for p in points {
        let azimuth = p.y.atan2(p.x);
        let elevation = p.z.atan2((p.x * p.x + p.y * p.y).sqrt());
        let r = p.norm();

        if check_min && r < r_min {
            continue;
        }
        if check_max && r > r_max {
            continue;
        }

        let azimuth_idx = (((azimuth + PI) * azimuth_res).floor() as isize)
            .clamp(0, desc_width as isize - 1) as usize;
        let elevation_idx = (desc_height as isize
            - 1
            - ((elevation + PI / 2.0) * elevation_res).floor() as isize)
            .clamp(0, desc_height as isize - 1) as usize;

        let index = elevation_idx * desc_width + azimuth_idx;
        if image[index] == 0.0 || r < image[index] {
            image[index] = r;
        }
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_lands_in_one_cell() {
        let points = [Vec3::new(5.0, 0.0, 0.0)];
        let image = pcl2descriptor(&points, 16, 8, -1.0, -1.0);
        assert_eq!(image.iter().filter(|&&r| r > 0.0).count(), 1);
        let r = image.iter().cloned().find(|&r| r > 0.0).unwrap();
        assert!((r - 5.0).abs() < 1e-4);
    }

    #[test]
    fn range_cutoffs_drop_points() {
        let points = [Vec3::new(1.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 0.0)];
        let image = pcl2descriptor(&points, 16, 8, 2.0, 60.0);
        assert!(image.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn closer_point_wins_the_cell() {
        let points = [Vec3::new(10.0, 0.0, 0.0), Vec3::new(3.0, 0.01, 0.0)];
        let image = pcl2descriptor(&points, 4, 4, -1.0, -1.0);
        let min_nonzero = image.iter().cloned().filter(|&r| r > 0.0).fold(f32::MAX, f32::min);
        assert!((min_nonzero - 3.0).abs() < 0.1);
    }
}
