use coreg_common::point_cloud::PointCloud;

/// Downsamples `cloud` by averaging every point that falls in the same
/// `voxel`-sided cube into a single centroid. Deterministic: voxels are
/// visited in sorted cell-index order regardless of input order.
pub fn down_sample_point_cloud(cloud: &PointCloud, voxel: f32) -> PointCloud {
    assert!(voxel > 0.0, "voxel size must be positive");

    let Some((min, _)) = cloud.finite_bound() else {
        return PointCloud::new(cloud.kind, Vec::new());
    };

    let cell_of = |p: &coreg_common::geometry::Vec3| {
        [
            ((p.x - min.x) / voxel).floor() as i64,
            ((p.y - min.y) / voxel).floor() as i64,
            ((p.z - min.z) / voxel).floor() as i64,
        ]
    };

    let mut indexed: Vec<([i64; 3], usize)> = cloud
        .positions
        .iter()
        .enumerate()
        .map(|(i, p)| (cell_of(p), i))
        .collect();
    indexed.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut positions = Vec::with_capacity(indexed.len());
    let mut colors = cloud.colors.as_ref().map(|_| Vec::with_capacity(indexed.len()));
    let mut normals = cloud.normals.as_ref().map(|_| Vec::with_capacity(indexed.len()));

    let mut i = 0;
    while i < indexed.len() {
        let cell = indexed[i].0;
        let mut j = i;
        let mut pos_sum = coreg_common::geometry::Vec3::zeros();
        let mut color_sum = [0.0f32; 3];
        let mut normal_sum = coreg_common::geometry::Vec3::zeros();
        let mut count = 0.0f32;

        while j < indexed.len() && indexed[j].0 == cell {
            let idx = indexed[j].1;
            pos_sum += cloud.positions[idx];
            if let Some(cs) = &cloud.colors {
                for k in 0..3 {
                    color_sum[k] += cs[idx][k];
                }
            }
            if let Some(ns) = &cloud.normals {
                normal_sum += ns[idx];
            }
            count += 1.0;
            j += 1;
        }

        positions.push(pos_sum / count);
        if let Some(out) = &mut colors {
            out.push([color_sum[0] / count, color_sum[1] / count, color_sum[2] / count]);
        }
        if let Some(out) = &mut normals {
            let n = normal_sum / count;
            out.push(if n.norm() > 1e-8 { n.normalize() } else { n });
        }

        i = j;
    }

    PointCloud {
        kind: cloud.kind,
        positions,
        colors,
        normals,
        line_width: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coreg_common::{geometry::Vec3, point_cloud::CloudKind};

    #[test]
    fn merges_points_in_the_same_voxel() {
        let cloud = PointCloud::new(
            CloudKind::SingleOrigin,
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.1, 0.1, 0.0),
                Vec3::new(5.0, 5.0, 5.0),
            ],
        );
        let down = down_sample_point_cloud(&cloud, 1.0);
        assert_eq!(down.len(), 2);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let cloud = PointCloud::new(CloudKind::SingleOrigin, vec![]);
        let down = down_sample_point_cloud(&cloud, 1.0);
        assert!(down.is_empty());
    }

    #[test]
    fn downsampling_never_grows_the_point_count() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let positions: Vec<_> = (0..200)
            .map(|_| Vec3::new(rng.gen_range(0.0..5.0), rng.gen_range(0.0..5.0), rng.gen_range(0.0..5.0)))
            .collect();
        let cloud = PointCloud::new(CloudKind::SingleOrigin, positions);
        let down = down_sample_point_cloud(&cloud, 0.5);
        assert!(down.len() <= cloud.len());
        assert!(!down.is_empty());
    }
}
