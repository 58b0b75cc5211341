use super::{Relu, Sigmoid, Tanh};

/// An elementwise activation function applied after a dense layer's affine map.
#[derive(Clone, Debug)]
pub enum ActFn {
    Sigmoid(Sigmoid),
    Relu(Relu),
    Tanh(Tanh),
}

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        Self::Sigmoid(Sigmoid::new(amp))
    }

    pub fn relu() -> Self {
        Self::Relu(Relu)
    }

    pub fn tanh() -> Self {
        Self::Tanh(Tanh)
    }

    /// Evaluates the function at `z`.
    pub fn f(&self, z: f32) -> f32 {
        match self {
            Self::Sigmoid(a) => a.f(z),
            Self::Relu(a) => a.f(z),
            Self::Tanh(a) => a.f(z),
        }
    }

    /// Evaluates the derivative at `z`, the pre-activation value.
    pub fn df(&self, z: f32) -> f32 {
        match self {
            Self::Sigmoid(a) => a.df(z),
            Self::Relu(a) => a.df(z),
            Self::Tanh(a) => a.df(z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clamps_negatives_and_has_step_derivative() {
        let relu = ActFn::relu();

        assert_eq!(relu.f(-2.0), 0.0);
        assert_eq!(relu.f(3.0), 3.0);
        assert_eq!(relu.df(-2.0), 0.0);
        assert_eq!(relu.df(3.0), 1.0);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let h = 1e-3;

        for act_fn in [ActFn::sigmoid(1.0), ActFn::sigmoid(2.5), ActFn::tanh()] {
            for z in [-2.0, -0.3, 0.0, 0.7, 1.9] {
                let numeric = (act_fn.f(z + h) - act_fn.f(z - h)) / (2.0 * h);
                assert!(
                    (numeric - act_fn.df(z)).abs() < 1e-2,
                    "{act_fn:?} at {z}: {numeric} vs {}",
                    act_fn.df(z)
                );
            }
        }
    }
}
