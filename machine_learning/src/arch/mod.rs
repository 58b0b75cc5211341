pub mod activations;
pub mod layers;
pub mod loss;
mod model;
pub mod ops;
mod param_manager;
mod sequential;

pub use model::Model;
pub use param_manager::{BackIter, FrontIter, ParamManager, ParamTensor};
pub use sequential::Sequential;
