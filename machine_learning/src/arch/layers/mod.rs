mod dense;
mod layer;
mod log_softmax;

pub use dense::Dense;
pub use layer::Layer;
pub use log_softmax::LogSoftmax;
