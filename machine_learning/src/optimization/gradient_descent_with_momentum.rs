use super::{Optimizer, optimizer::check_lens};
use crate::Result;

#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Box<[f32]>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Hyperparameter to the optimization algorithm.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        check_lens("momentum state", params.len(), self.velocity.len())?;
        check_lens("gradient", grad.len(), params.len())?;

        let lr = self.learning_rate;
        let mu = self.momentum;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((w, g), v)| {
                *v = (mu * *v) + g;
                *w -= lr * *v;
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_carries_over_between_updates() {
        let mut opt = GradientDescentWithMomentum::new(1, 0.1, 0.9);
        let mut params = [0.];

        opt.update_params(&mut params, &[1.]).unwrap();
        assert!((params[0] + 0.1).abs() < 1e-6);

        // v = 0.9 * 1 + 1
        opt.update_params(&mut params, &[1.]).unwrap();
        assert!((params[0] + 0.29).abs() < 1e-6);
    }

    #[test]
    fn state_is_sized_at_construction() {
        let mut opt = GradientDescentWithMomentum::new(2, 0.1, 0.9);
        let mut params = [0.; 3];

        assert!(opt.update_params(&mut params, &[1.; 3]).is_err());
    }
}
