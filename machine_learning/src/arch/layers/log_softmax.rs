use ndarray::{Array2, ArrayView2, Axis};

use crate::{MlErr, Result, arch::ops};

/// Turns each row of logits into log-probabilities, `y = x - logsumexp(x)`.
#[derive(Clone, Debug, Default)]
pub struct LogSoftmax {
    y: Option<Array2<f32>>,
}

impl LogSoftmax {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_primed(&self) -> bool {
        self.y.is_some()
    }

    pub fn clear_cache(&mut self) {
        self.y = None;
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let y = ops::log_softmax(x);
        self.y = Some(y.clone());
        y
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Array2<f32> {
        ops::log_softmax(x)
    }

    /// `dx = d - softmax(x) * Σ_row d`
    pub fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        let y = self.y.take().ok_or(MlErr::MissingForwardPass)?;

        if d.dim() != y.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "log softmax delta",
                got: d.shape().to_vec(),
                expected: y.shape().to_vec(),
            });
        }

        let row_sums = d.sum_axis(Axis(1)).insert_axis(Axis(1));
        Ok(d - y.mapv_into(f32::exp) * &row_sums)
    }
}
