pub mod normal;
pub mod rmse;

pub use self::{normal::find_normal, rmse::rmse_of_registration};
