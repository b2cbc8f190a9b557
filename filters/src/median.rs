use coreg_common::point_cloud::PointCloud;

/// Two-pass ordered-median range denoise for an organized scan
/// (`cloud.line_width` must be nonzero and evenly divide the point count).
///
/// Each point's range (distance from the origin of its own scan, i.e. the
/// point's own norm — the cloud is assumed already expressed in sensor-local
/// coordinates) is replaced by the median range within a `window`-wide
/// square neighborhood in scan-line/row space; if the point's own range
/// differs from that median by more than `dist_thresh`, it is instead nudged
/// towards the median by at most `dist_thresh`, so a genuine edge is
/// softened rather than erased. The filter is run twice, with `window_0`
/// then `window_1`, as the original two-pass design calls for.
pub fn denoise_range_of_ordered_point_cloud(
    cloud: &PointCloud,
    window_0: isize,
    window_1: isize,
    dist_thresh: f32,
) -> PointCloud {
    let mut working = cloud.clone();
    apply_pass(&mut working, window_0, dist_thresh);
    apply_pass(&mut working, window_1, dist_thresh);
    working
}

fn apply_pass(cloud: &mut PointCloud, window: isize, dist_thresh: f32) {
    let width = cloud.line_width;
    if width == 0 || cloud.positions.is_empty() || cloud.positions.len() % width != 0 {
        return;
    }
    let height = cloud.positions.len() / width;

    let ranges: Vec<f32> = cloud.positions.iter().map(|p| p.norm()).collect();
    let mut scaled = ranges.clone();

    let mut window_values = Vec::with_capacity((window.max(1) as usize + 1).pow(2));
    for y in 0..height {
        for x in 0..width {
            window_values.clear();
            for dy in -(window / 2)..=(window / 2) {
                for dx in -(window / 2)..=(window / 2) {
                    let nx = x as isize + dx;
                    let ny = y as isize + dy;
                    if nx >= 0 && (nx as usize) < width && ny >= 0 && (ny as usize) < height {
                        let r = ranges[ny as usize * width + nx as usize];
                        if r.is_finite() {
                            window_values.push(r);
                        }
                    }
                }
            }
            if window_values.is_empty() {
                continue;
            }
            let mid = window_values.len() / 2;
            let (_, &mut median, _) = window_values.select_nth_unstable_by(mid, |a, b| {
                a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
            });

            let here = ranges[y * width + x];
            let idx = y * width + x;
            scaled[idx] = if (here - median).abs() <= dist_thresh {
                median
            } else {
                here + dist_thresh.copysign(median - here)
            };
        }
    }

    for (p, (&old_r, &new_r)) in cloud
        .positions
        .iter_mut()
        .zip(ranges.iter().zip(scaled.iter()))
    {
        if old_r > 1e-8 {
            *p *= new_r / old_r;
        }
    }
}
