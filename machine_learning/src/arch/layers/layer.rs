use ndarray::{Array2, ArrayView2};

use super::{Dense, LogSoftmax};
use crate::{Result, arch::activations::ActFn};

/// A layer of a `Sequential` model.
#[derive(Clone, Debug)]
pub enum Layer {
    Dense(Dense),
    LogSoftmax(LogSoftmax),
}

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    pub fn log_softmax() -> Self {
        Self::LogSoftmax(LogSoftmax::new())
    }

    /// Returns the amount of parameters of the layer.
    pub fn size(&self) -> usize {
        match self {
            Layer::Dense(l) => l.size(),
            Layer::LogSoftmax(_) => 0,
        }
    }

    /// Returns the `(fan_in, fan_out)` dimensions, `None` for layers that keep the width.
    pub fn dim(&self) -> Option<(usize, usize)> {
        match self {
            Layer::Dense(l) => Some(l.dim()),
            Layer::LogSoftmax(_) => None,
        }
    }

    /// Returns the name and shape of every parameter tensor of the layer, in storage order.
    pub fn param_shapes(&self) -> Vec<(&'static str, Vec<usize>)> {
        match self {
            Layer::Dense(l) => {
                let (n, m) = l.dim();
                vec![("weight", vec![n, m]), ("bias", vec![m])]
            }
            Layer::LogSoftmax(_) => vec![],
        }
    }

    pub fn is_primed(&self) -> bool {
        match self {
            Layer::Dense(l) => l.is_primed(),
            Layer::LogSoftmax(l) => l.is_primed(),
        }
    }

    pub fn clear_cache(&mut self) {
        match self {
            Layer::Dense(l) => l.clear_cache(),
            Layer::LogSoftmax(l) => l.clear_cache(),
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Layer::Dense(l) => l.forward(params, x),
            Layer::LogSoftmax(l) => Ok(l.forward(x)),
        }
    }

    pub fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Layer::Dense(l) => l.predict(params, x),
            Layer::LogSoftmax(l) => Ok(l.predict(x)),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Layer::Dense(l) => l.backward(params, grad, d),
            Layer::LogSoftmax(l) => l.backward(d),
        }
    }
}
