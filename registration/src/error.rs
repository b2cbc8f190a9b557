use thiserror::Error;

/// Errors surfaced by internal helpers. Nothing on the public
/// `CoarseRegistrar`/`DescriptorCache`/`OrientedGrid` surface returns this:
/// those APIs degrade to a sentinel score instead of failing, per their
/// contract. This exists for the lower-level pieces that are useful to test
/// in isolation.
#[derive(Debug, Error, PartialEq)]
pub enum RegistrationError {
    #[error("source point cloud is empty")]
    SourceEmpty,
    #[error("target point cloud is empty")]
    TargetEmpty,
    #[error("dft buffer length {got} does not match width*height {expected}")]
    DftShapeMismatch { got: usize, expected: usize },
    #[error("icp did not converge within {0} iterations")]
    IcpDidNotConverge(usize),
}
