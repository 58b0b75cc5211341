use rand::Rng;

use super::ParamGen;

/// Fills a tensor with a single value, which is how the biases of dense layers start out (at zero)
/// unless a layer's config says otherwise.
#[derive(Debug, Clone)]
pub struct ConstParamGen {
    value: f32,
    remaining: usize,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value every parameter starts at.
    /// * `limit` - The size of the tensor being filled.
    ///
    /// # Returns
    /// A new `ConstParamGen` instance.
    pub fn new(value: f32, limit: usize) -> Self {
        Self {
            value,
            remaining: limit,
        }
    }
}

impl<R: Rng> ParamGen<R> for ConstParamGen {
    fn sample(&mut self, _rng: &mut R, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;
        Some(vec![self.value; n])
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn an_empty_tensor_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut param_gen = ConstParamGen::new(0., 0);

        assert!(param_gen.sample(&mut rng, 1).is_none());
    }

    #[test]
    fn zero_biases_never_exceed_the_tensor() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut biases = ConstParamGen::new(0., 10);

        assert_eq!(biases.sample(&mut rng, 7).unwrap(), [0.; 7]);
        assert_eq!(ParamGen::<StdRng>::remaining(&biases), 3);

        assert_eq!(biases.sample(&mut rng, 7).unwrap(), [0.; 3]);
        assert!(biases.sample(&mut rng, 1).is_none());
    }
}
