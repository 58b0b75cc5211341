use ndarray::{Array2, ArrayView2};

use super::{LossFn, check_labels};
use crate::Result;

/// Negative log likelihood over log-probabilities, meant to follow a `LogSoftmax` layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Nll;

impl Nll {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Nll {
    fn loss(&self, y_pred: ArrayView2<f32>, labels: &[usize]) -> Result<f32> {
        check_labels(&y_pred, labels)?;

        let total: f32 = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| -y_pred[[i, label]])
            .sum();

        Ok(total / labels.len() as f32)
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, labels: &[usize]) -> Result<Array2<f32>> {
        check_labels(&y_pred, labels)?;

        let n = labels.len() as f32;
        let mut d = Array2::zeros(y_pred.raw_dim());
        for (i, &label) in labels.iter().enumerate() {
            d[[i, label]] = -1. / n;
        }

        Ok(d)
    }
}
