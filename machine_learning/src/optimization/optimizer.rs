use crate::{MlErr, Result};

/// An optimization algorithm bound to a model's parameters.
pub trait Optimizer {
    /// Applies one update to every parameter.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient of the loss with respect to each parameter.
    ///
    /// # Returns
    /// An error if `params` and `grad` don't have the same length.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}

pub(super) fn check_lens(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
