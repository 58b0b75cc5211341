use ndarray::{Array2, ArrayView2};

use super::{LossFn, check_labels, one_hot};
use crate::{Result, arch::ops};

/// Cross entropy over raw logits: the mean of `-log(softmax(z)[label])`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for CrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, labels: &[usize]) -> Result<f32> {
        check_labels(&y_pred, labels)?;
        let log_probs = ops::log_softmax(y_pred);

        let total: f32 = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| -log_probs[[i, label]])
            .sum();

        Ok(total / labels.len() as f32)
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, labels: &[usize]) -> Result<Array2<f32>> {
        check_labels(&y_pred, labels)?;
        let probs = ops::softmax(y_pred);
        let y = one_hot(labels, y_pred.ncols());

        Ok((probs - y) / labels.len() as f32)
    }
}
