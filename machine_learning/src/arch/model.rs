use ndarray::{Array2, ArrayView2};

use super::ParamManager;
use crate::Result;

/// A differentiable computation from a batch of inputs to a batch of outputs.
///
/// This is the seam through which the training loop reaches gradient computation: `forward`
/// records whatever the reverse pass needs, `backward` walks it back populating the gradient slots
/// of every parameter and `zero_grad` clears those slots.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Returns the amount of features each input row must have.
    fn input_size(&self) -> usize;

    /// Returns the amount of columns of the output, one per class.
    fn output_size(&self) -> usize;

    /// Whether the model's outputs are log-probabilities instead of raw logits.
    fn emits_log_probs(&self) -> bool {
        false
    }

    /// Makes a forward pass through the model, keeping what `backward` needs.
    ///
    /// # Arguments
    /// * `x` - A `batch × input_size` input.
    ///
    /// # Returns
    /// The `batch × output_size` prediction, or an error if the input has the wrong shape.
    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Makes a forward pass without recording anything for `backward`.
    fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Propagates `d`, the derivative of the loss with respect to the last `forward`'s output, back
    /// through the model.
    ///
    /// The gradient is **added** onto the gradient slots: two backward passes without a
    /// `zero_grad` in between leave the sum of both gradients.
    ///
    /// # Returns
    /// An error if there's no forward pass to backpropagate or `d` has the wrong shape.
    fn backward(&mut self, d: Array2<f32>) -> Result<()>;

    /// Zeros out every gradient slot.
    fn zero_grad(&mut self);

    fn params(&self) -> &ParamManager;

    fn params_mut(&mut self) -> &mut ParamManager;
}
