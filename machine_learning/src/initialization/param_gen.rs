use rand::Rng;

/// A `ParamGen` generates values for the initial state of the model's parameters.
pub trait ParamGen<R: Rng> {
    /// Should sample at most `n` parameters.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to draw from, if the generator needs one.
    /// * `n` - The upper limit of samples to generate.
    ///
    /// # Returns
    /// `None` if the generator is exhausted.
    fn sample(&mut self, rng: &mut R, n: usize) -> Option<Vec<f32>>;

    /// Returns how many more values this generator can produce.
    fn remaining(&self) -> usize;
}
