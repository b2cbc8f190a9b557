use std::f32::consts::PI;

use coreg_common::geometry::{dist2d, rotation_rows_about_z, Pose, Vec3};
use rayon::prelude::*;
use rustfft::num_complex::Complex32;

use crate::{
    descriptor_cache::DescriptorCache,
    dft::{dft2d, fftshift0_to_origin, unit_phase_correlation},
};

#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub index: usize,
    pub score: f32,
    pub pose: Pose,
}

/// Locates the global maximum of the inverse DFT of the normalized
/// cross-power spectrum of `a` and `b` (phase correlation), returning its
/// `(row, col)` location and value. Ties keep the first occurrence found in
/// row-major scan order.
pub fn best_phase_corr(
    a: &[Complex32],
    b: &[Complex32],
    desc_width: usize,
    desc_height: usize,
) -> (usize, usize, f32) {
    let mut corr = unit_phase_correlation(a, b);
    if let Err(err) = dft2d(desc_width, desc_height, &mut corr, false) {
        log::warn!("best_phase_corr skipped, descriptor shape mismatch: {err}");
        return (0, 0, f32::MIN);
    }
    fftshift0_to_origin(&mut corr, desc_width, desc_height);

    let mut best_row = 0;
    let mut best_col = 0;
    let mut best_score = f32::MIN;
    for row in 0..desc_height {
        for col in 0..desc_width {
            let score = corr[row * desc_width + col].re;
            if score > best_score {
                best_score = score;
                best_row = row;
                best_col = col;
            }
        }
    }
    (best_row, best_col, best_score)
}

/// Ranks dictionary entries of `cache` within `search_radius` of
/// `estimate_pos` against `query_dft`, returning at most `max_candidates`
/// results in dictionary-discovery order (not sorted by score — callers
/// that want the single best match should take the max themselves).
pub fn search_dictionary(
    cache: &DescriptorCache,
    max_candidates: usize,
    search_radius: f32,
    query_dft: &[Complex32],
    estimate_pos: Vec3,
) -> Vec<Candidate> {
    if max_candidates == 0 {
        return Vec::new();
    }

    let in_radius: Vec<usize> = cache
        .grid()
        .orient()
        .iter()
        .enumerate()
        .filter(|(_, pose)| dist2d(&estimate_pos, &pose.translation()) <= search_radius)
        .map(|(index, _)| index)
        .collect();

    // Warm every candidate's descriptor concurrently; distinct slots don't
    // contend, so this is a pure throughput win on a wide search radius.
    in_radius.par_iter().for_each(|&index| {
        cache.get_entry_descriptor_dft(index);
    });

    let desc_width = cache.desc_width();
    let desc_height = cache.desc_height();

    // Stream through the candidate set, keeping the best `max_candidates` by
    // score via a running min-tracker, as the search never holds more than
    // `max_candidates` entries in memory at once.
    let mut kept: Vec<(usize, f32, usize)> = Vec::with_capacity(max_candidates);
    let mut min_index = 0usize;

    for &grid_index in &in_radius {
        let (_, entry_dft) = cache.get_entry_descriptor_dft(grid_index);
        let (_, best_col, score) = best_phase_corr(entry_dft, query_dft, desc_width, desc_height);

        if kept.len() < max_candidates {
            kept.push((grid_index, score, best_col));
            if kept[min_index].1 > score {
                min_index = kept.len() - 1;
            }
        } else if score > kept[min_index].1 {
            kept[min_index] = (grid_index, score, best_col);
            min_index = (0..kept.len()).min_by(|&a, &b| {
                kept[a].1.partial_cmp(&kept[b].1).unwrap_or(std::cmp::Ordering::Equal)
            }).unwrap();
        }
    }

    let azimuth_res = 2.0 * PI / desc_width as f32;
    let center_shift = if desc_width % 2 == 0 { 0.5 } else { 0.0 };

    kept.into_iter()
        .map(|(grid_index, score, best_col)| {
            let pose = &cache.grid().orient()[grid_index];
            let theta = (best_col as f32 + center_shift) * azimuth_res - PI;
            let rotated = pose.compose_local_rotation(rotation_rows_about_z(theta));
            Candidate {
                index: grid_index,
                score,
                pose: rotated,
            }
        })
        .collect()
}
