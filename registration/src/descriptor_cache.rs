use std::sync::OnceLock;

use coreg_common::geometry::Vec3;
use rustfft::num_complex::Complex32;

use crate::{
    dft::dft2d,
    oriented_grid::OrientedGrid,
    range_image::pcl2descriptor,
};

type Descriptor = (Vec<f32>, Vec<Complex32>);

/// Extends an [`OrientedGrid`] with a lazily-materialized, per-pose range
/// image and its 2-D DFT. Each slot starts empty and is filled in at most
/// once, on first access, by whichever caller reaches it first — concurrent
/// first-touches of the *same* slot are serialized by the `OnceLock`;
/// distinct slots need no synchronization between them.
pub struct DescriptorCache {
    grid: OrientedGrid,
    descriptors: Vec<OnceLock<Descriptor>>,
    desc_width: usize,
    desc_height: usize,
    r_min: f32,
    r_max: f32,
}

impl DescriptorCache {
    pub fn new(voxel_size: f32, desc_width: usize, desc_height: usize, r_min: f32, r_max: f32) -> Self {
        DescriptorCache {
            grid: OrientedGrid::new(voxel_size),
            descriptors: Vec::new(),
            desc_width,
            desc_height,
            r_min,
            r_max,
        }
    }

    pub fn grid(&self) -> &OrientedGrid {
        &self.grid
    }

    pub fn desc_width(&self) -> usize {
        self.desc_width
    }

    pub fn desc_height(&self) -> usize {
        self.desc_height
    }

    pub fn dictionary_update(&mut self, points: &[Vec3], d_grid: f32, d_sensor: f32) -> usize {
        let pre_size = self.grid.point_cloud_and_grid_update(points, d_grid, d_sensor);
        self.descriptors
            .resize_with(self.grid.orient().len(), OnceLock::new);
        pre_size
    }

    pub fn reset_dictionary(&mut self) {
        self.descriptors.clear();
        self.grid.reset_grid();
    }

    /// Builds (if not already cached) and returns the range image and DFT
    /// for dictionary entry `index`, by transforming the whole main point
    /// cloud into that entry's local frame.
    pub fn get_entry_descriptor_dft(&self, index: usize) -> &Descriptor {
        self.descriptors[index].get_or_init(|| {
            let pose = &self.grid.orient()[index];
            let local_points: Vec<Vec3> = self
                .grid
                .pts_main()
                .iter()
                .map(|p| pose.inverse_transform_point(p))
                .collect();

            let range_image =
                pcl2descriptor(&local_points, self.desc_width, self.desc_height, self.r_min, self.r_max);

            let mut dft: Vec<Complex32> = range_image.iter().map(|&r| Complex32::new(r, 0.0)).collect();
            if let Err(err) = dft2d(self.desc_width, self.desc_height, &mut dft, true) {
                log::warn!("descriptor DFT for entry {index} skipped: {err}");
            }

            (range_image, dft)
        })
    }
}
