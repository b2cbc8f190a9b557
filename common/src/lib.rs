pub mod geometry;
pub mod grid2d;
pub mod point_cloud;
pub mod spatial_hash;
