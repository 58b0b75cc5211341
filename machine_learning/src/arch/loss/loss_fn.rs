use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A loss function over a batch of predictions and their class labels.
pub trait LossFn {
    /// Computes the scalar loss of the batch.
    ///
    /// # Returns
    /// The loss, or an error if the labels don't fit the predictions.
    fn loss(&self, y_pred: ArrayView2<f32>, labels: &[usize]) -> Result<f32>;

    /// Computes the derivative of the loss with respect to every prediction.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, labels: &[usize]) -> Result<Array2<f32>>;
}
