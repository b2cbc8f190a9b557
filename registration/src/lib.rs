pub mod descriptor_cache;
pub mod dft;
pub mod error;
pub mod icp;
pub mod oriented_grid;
pub mod phase_correlation;
pub mod range_image;
pub mod registrar;

pub use self::{
    descriptor_cache::DescriptorCache,
    error::RegistrationError,
    icp::Icp,
    oriented_grid::OrientedGrid,
    phase_correlation::{best_phase_corr, search_dictionary, Candidate},
    registrar::{CoarseRegistrar, CoarseRegistrarOptions, CoarseRegistrarOptionsBuilder},
};
