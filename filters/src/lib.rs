pub mod median;
pub mod voxel_grid;

pub use self::{median::denoise_range_of_ordered_point_cloud, voxel_grid::down_sample_point_cloud};
