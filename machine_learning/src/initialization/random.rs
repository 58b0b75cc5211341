use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::ParamGen;
use crate::Result;

/// A parameter generator that follows a certain probabilistic distribution.
#[derive(Debug, Clone)]
pub struct RandParamGen<D: Distribution<f32>> {
    distribution: D,
    remaining: usize,
}

impl<D: Distribution<f32>> RandParamGen<D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `distribution` - The distribution to sample the random numbers from.
    /// * `limit` - The maximum amount of numbers to generate.
    pub fn new(distribution: D, limit: usize) -> Self {
        Self {
            distribution,
            remaining: limit,
        }
    }
}

impl RandParamGen<Uniform<f32>> {
    /// Creates a new `RandParamGen` parameter generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(limit: usize, low: f32, high: f32) -> Result<Self> {
        Ok(Self::new(Uniform::new(low, high)?, limit))
    }

    /// Creates a new `RandParamGen` parameter generator with an inclusive uniform distribution.
    ///
    /// # Arguments
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The inclusive upper limit.
    ///
    /// # Returns
    /// An error if the range is invalid (low > high).
    pub fn uniform_inclusive(limit: usize, low: f32, high: f32) -> Result<Self> {
        Ok(Self::new(Uniform::new_inclusive(low, high)?, limit))
    }

    /// Creates a new `RandParamGen` parameter generator using Xavier uniform initialization.
    ///
    /// # Arguments
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `fan_in` - The number of input units in the weight tensor.
    /// * `fan_out` - The number of output units in the weight tensor.
    pub fn xavier_uniform(limit: usize, fan_in: usize, fan_out: usize) -> Result<Self> {
        let range = (6. / (fan_in + fan_out) as f32).sqrt();
        Self::uniform(limit, -range, range)
    }

    /// Creates a new `RandParamGen` parameter generator using LeCun uniform initialization.
    ///
    /// # Arguments
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `fan_in` - The number of input units in the weight tensor.
    pub fn lecun_uniform(limit: usize, fan_in: usize) -> Result<Self> {
        let range = (3. / fan_in as f32).sqrt();
        Self::uniform(limit, -range, range)
    }
}

impl RandParamGen<Normal<f32>> {
    /// Creates a new `RandParamGen` parameter generator with a normal distribution.
    ///
    /// # Arguments
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn normal(limit: usize, mean: f32, std_dev: f32) -> Result<Self> {
        Ok(Self::new(Normal::new(mean, std_dev)?, limit))
    }

    /// Kaiming normal initialization, `N(0, 2 / fan_in)`.
    pub fn kaiming(limit: usize, fan_in: usize) -> Result<Self> {
        let std_dev = (2. / fan_in as f32).sqrt();
        Self::normal(limit, 0., std_dev)
    }

    /// Xavier normal initialization, `N(0, 2 / (fan_in + fan_out))`.
    pub fn xavier(limit: usize, fan_in: usize, fan_out: usize) -> Result<Self> {
        Self::kaiming(limit, fan_in + fan_out)
    }

    /// LeCun normal initialization, `N(0, 1 / fan_in)`.
    pub fn lecun(limit: usize, fan_in: usize) -> Result<Self> {
        let std_dev = (1. / fan_in as f32).sqrt();
        Self::normal(limit, 0., std_dev)
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen<R> for RandParamGen<D> {
    fn sample(&mut self, rng: &mut R, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;

        let sample = (0..n).map(|_| self.distribution.sample(rng)).collect();
        Some(sample)
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::MlErr;

    #[test]
    fn partial() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut param_gen = RandParamGen::normal(10, 0., 1.).unwrap();

        assert_eq!(param_gen.sample(&mut rng, 7).unwrap().len(), 7);
        assert_eq!(param_gen.sample(&mut rng, 7).unwrap().len(), 3);
        assert!(param_gen.sample(&mut rng, 1).is_none());
    }

    #[test]
    fn lecun_uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut param_gen = RandParamGen::lecun_uniform(1000, 12).unwrap();

        let sample = param_gen.sample(&mut rng, 1000).unwrap();
        assert!(sample.iter().all(|v| v.abs() <= 0.5));
    }

    #[test]
    fn same_seed_same_values() {
        let mut a = RandParamGen::xavier_uniform(8, 4, 2).unwrap();
        let mut b = a.clone();

        let sample_a = a.sample(&mut StdRng::seed_from_u64(1), 8).unwrap();
        let sample_b = b.sample(&mut StdRng::seed_from_u64(1), 8).unwrap();
        assert_eq!(sample_a, sample_b);
    }

    #[test]
    fn invalid_ranges_are_init_errors() {
        assert!(matches!(
            RandParamGen::uniform(1, 1., -1.),
            Err(MlErr::InvalidInit(_))
        ));
        assert!(matches!(
            RandParamGen::normal(1, 0., f32::NAN),
            Err(MlErr::InvalidInit(_))
        ));
    }
}
