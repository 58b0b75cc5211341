pub mod arch;
pub mod data;
pub mod error;
pub mod initialization;
pub mod optimization;
pub mod specs;
mod test;
pub mod training;

pub use error::{MlErr, Result};
