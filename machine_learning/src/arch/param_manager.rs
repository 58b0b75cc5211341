use std::{mem, ops::Range};

use super::layers::Layer;
use crate::{MlErr, Result, optimization::Optimizer};

/// The manager of a model's parameters.
///
/// Holds every parameter of the model in a flat buffer together with a gradient buffer of the same
/// length, and knows how both are split into layers and into named tensors. The layers' slices can
/// be iterated in order through `FrontIter` and in reverse, alongside their gradients, through
/// `BackIter`.
#[derive(Clone, Debug)]
pub struct ParamManager {
    params: Vec<f32>,
    grad: Vec<f32>,
    layer_sizes: Vec<usize>,
    tensors: Vec<TensorMeta>,
}

#[derive(Clone, Debug)]
struct TensorMeta {
    name: String,
    shape: Vec<usize>,
    range: Range<usize>,
}

/// A borrowed parameter tensor and its gradient slot.
#[derive(Debug, Clone, Copy)]
pub struct ParamTensor<'pm> {
    pub name: &'pm str,
    pub shape: &'pm [usize],
    pub value: &'pm [f32],
    pub grad: &'pm [f32],
}

impl ParamManager {
    /// Creates a new `ParamManager`.
    ///
    /// # Arguments
    /// * `params` - The initial values of every parameter, in layer order.
    /// * `layers` - The layers the parameters belong to.
    ///
    /// # Returns
    /// A new `ParamManager` instance, or an error if `params` doesn't have as many values as the
    /// layers need.
    pub fn new(params: Vec<f32>, layers: &[Layer]) -> Result<Self> {
        let layer_sizes: Vec<usize> = layers.iter().map(Layer::size).collect();
        let expected = layer_sizes.iter().sum();

        if params.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got: params.len(),
                expected,
            });
        }

        let mut tensors = Vec::new();
        let mut offset = 0;

        for (i, layer) in layers.iter().enumerate() {
            for (kind, shape) in layer.param_shapes() {
                let len: usize = shape.iter().product();
                tensors.push(TensorMeta {
                    name: format!("layer{i}.{kind}"),
                    shape,
                    range: offset..offset + len,
                });
                offset += len;
            }
        }

        Ok(Self {
            grad: vec![0.; params.len()],
            params,
            layer_sizes,
            tensors,
        })
    }

    /// Returns the total amount of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    /// Iterates the parameter tensors in a stable order: layer by layer, weights before biases.
    pub fn tensors(&self) -> impl Iterator<Item = ParamTensor<'_>> {
        self.tensors.iter().map(|meta| ParamTensor {
            name: &meta.name,
            shape: &meta.shape,
            value: &self.params[meta.range.clone()],
            grad: &self.grad[meta.range.clone()],
        })
    }

    /// Creates a new `FrontIter` parameter iterator.
    ///
    /// The returned iterator iterates the model's layers forward.
    pub fn front(&self) -> FrontIter<'_> {
        FrontIter {
            params: &self.params,
            layer_sizes: self.layer_sizes.iter(),
        }
    }

    /// Creates a new `BackIter` parameter iterator.
    ///
    /// The returned iterator iterates the model's layers backwards.
    pub fn back(&mut self) -> BackIter<'_> {
        BackIter {
            params: &self.params,
            grad: &mut self.grad,
            layer_sizes: self.layer_sizes.iter(),
        }
    }

    /// Zeros out the gradient slots. Calling it repeatedly has no further effect.
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Applies the gradient onto the parameters.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer bound to these parameters.
    pub fn optimize<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) -> Result<()> {
        optimizer.update_params(&mut self.params, &self.grad)
    }
}

/// A model's layer iterator.
///
/// This iterator iterates the layers of a model from the front.
pub struct FrontIter<'pm> {
    params: &'pm [f32],
    layer_sizes: std::slice::Iter<'pm, usize>,
}

impl<'pm> Iterator for FrontIter<'pm> {
    type Item = &'pm [f32];

    fn next(&mut self) -> Option<Self::Item> {
        let &n = self.layer_sizes.next()?;

        // The manager's constructor validates that the sizes add up to the buffer's length.
        let (head, tail) = self.params.split_at(n);
        self.params = tail;
        Some(head)
    }
}

/// A model's layer iterator.
///
/// This iterator iterates the layers of a model from the back, yielding the parameters and the
/// gradient slots of each.
pub struct BackIter<'pm> {
    params: &'pm [f32],
    grad: &'pm mut [f32],
    layer_sizes: std::slice::Iter<'pm, usize>,
}

impl<'pm> Iterator for BackIter<'pm> {
    type Item = (&'pm [f32], &'pm mut [f32]);

    fn next(&mut self) -> Option<Self::Item> {
        let &n = self.layer_sizes.next_back()?;

        let (params_head, params_tail) = self.params.split_at(self.params.len() - n);
        self.params = params_head;

        let grad = mem::take(&mut self.grad);
        let split = grad.len() - n;
        let (grad_head, grad_tail) = grad.split_at_mut(split);
        self.grad = grad_head;

        Some((params_tail, grad_tail))
    }
}
