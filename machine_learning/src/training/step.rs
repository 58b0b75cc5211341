use ndarray::{Array2, ArrayView2};

use crate::{Result, arch::Model, optimization::Optimizer};

/// The gradient context of a single training step.
///
/// Borrows the model for the duration of the step and zeros its gradient slots both when the step
/// begins and when it ends, whether it's applied or dropped on an error. Gradients computed within
/// a step can't leak into the next one.
pub struct GradStep<'m, M: Model + ?Sized> {
    model: &'m mut M,
}

impl<'m, M: Model + ?Sized> GradStep<'m, M> {
    /// Opens a new step on `model`, clearing every gradient slot.
    pub fn begin(model: &'m mut M) -> Self {
        model.zero_grad();
        Self { model }
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.model.forward(x)
    }

    /// Backpropagates `d` through the model, see `Model::backward`.
    pub fn backward(&mut self, d: Array2<f32>) -> Result<()> {
        self.model.backward(d)
    }

    /// The gradient accumulated so far within this step.
    pub fn grad(&self) -> &[f32] {
        self.model.params().grad()
    }

    /// Applies the step's gradient to the model's parameters and closes the step.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer bound to the model's parameters.
    pub fn apply<O: Optimizer + ?Sized>(mut self, optimizer: &mut O) -> Result<()> {
        self.model.params_mut().optimize(optimizer)
    }
}

impl<M: Model + ?Sized> Drop for GradStep<'_, M> {
    fn drop(&mut self) {
        self.model.zero_grad();
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{Sequential, layers::Layer},
        optimization::GradientDescent,
    };

    fn model() -> Sequential {
        Sequential::with_params([Layer::dense((2, 1), None)], vec![1., 1., 0.]).unwrap()
    }

    #[test]
    fn begin_discards_stale_gradients() {
        let mut model = model();
        model.forward(array![[1., 2.]].view()).unwrap();
        model.backward(array![[1.]]).unwrap();
        assert_ne!(model.params().grad(), [0.; 3]);

        let step = GradStep::begin(&mut model);
        assert_eq!(step.grad(), [0.; 3]);
    }

    #[test]
    fn apply_updates_and_clears() {
        let mut model = model();
        let mut optimizer = GradientDescent::new(0.5);

        let mut step = GradStep::begin(&mut model);
        step.forward(array![[1., 2.]].view()).unwrap();
        step.backward(array![[1.]]).unwrap();
        assert_eq!(step.grad(), [1., 2., 1.]);
        step.apply(&mut optimizer).unwrap();

        assert_eq!(model.params().params(), [0.5, 0., -0.5]);
        assert_eq!(model.params().grad(), [0.; 3]);
    }

    #[test]
    fn dropping_a_step_clears_its_gradient() {
        let mut model = model();

        {
            let mut step = GradStep::begin(&mut model);
            step.forward(array![[1., 2.]].view()).unwrap();
            step.backward(array![[1.]]).unwrap();
        }

        assert_eq!(model.params().grad(), [0.; 3]);
        assert_eq!(model.params().params(), [1., 1., 0.]);
    }
}
