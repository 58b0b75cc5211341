use rand::Rng;

use super::ParamGen;

/// Initializes a whole model by running its layers' generators back to back.
///
/// The model's parameters are laid out layer by layer, each dense layer holding its weights
/// followed by its biases, so the chain usually alternates a weight generator sized
/// `fan_in * fan_out` with a bias generator sized `fan_out`. A single call to `sample` may span
/// several of them.
pub struct ChainedParamGen<R: Rng> {
    param_gens: Vec<Box<dyn ParamGen<R>>>,
    curr: usize,
}

impl<R: Rng> ChainedParamGen<R> {
    /// Creates a new `ChainedParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `param_gens` - The generators of every parameter tensor, in layout order.
    pub fn new(param_gens: Vec<Box<dyn ParamGen<R>>>) -> Self {
        Self {
            param_gens,
            curr: 0,
        }
    }
}

impl<R: Rng> ParamGen<R> for ChainedParamGen<R> {
    fn sample(&mut self, rng: &mut R, n: usize) -> Option<Vec<f32>> {
        let mut out = Vec::with_capacity(n);

        while out.len() < n {
            let Some(param_gen) = self.param_gens.get_mut(self.curr) else {
                break;
            };

            let wanted = n - out.len();
            match param_gen.sample(rng, wanted) {
                Some(sample) => {
                    let exhausted = sample.len() < wanted;
                    out.extend(sample);
                    if exhausted {
                        self.curr += 1;
                    }
                }
                None => self.curr += 1,
            }
        }

        (!out.is_empty()).then_some(out)
    }

    fn remaining(&self) -> usize {
        self.param_gens[self.curr..]
            .iter()
            .map(|param_gen| param_gen.remaining())
            .sum()
    }
}
