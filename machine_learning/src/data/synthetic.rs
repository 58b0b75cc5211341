//! A stand-in for a digit dataset: noisy copies of one random binary prototype per class.

use log::debug;
use ndarray::{Array2, Axis};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;

use super::InMemoryDataset;
use crate::{MlErr, Result};

/// Parameters of a synthetic image classification dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticDigits {
    /// The amount of samples to generate.
    pub samples: usize,
    /// The width and height of every image.
    pub side: usize,
    /// The amount of classes, labels are assigned round robin.
    pub classes: usize,
    /// The half-width of the uniform noise added to every pixel.
    pub noise: f32,
}

impl SyntheticDigits {
    /// Generates the dataset.
    ///
    /// # Arguments
    /// * `rng` - The source of the prototypes and the noise.
    ///
    /// # Returns
    /// A dataset of `(samples, side, side)` images with pixels in `[0, 1]`, or an error if any of
    /// the parameters is out of range.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<InMemoryDataset> {
        let &Self {
            samples,
            side,
            classes,
            noise,
        } = self;

        if samples == 0 || side == 0 || classes == 0 {
            return Err(MlErr::InvalidConfig(format!(
                "synthetic dataset needs samples, side and classes above zero, got {self:?}"
            )));
        }

        if !noise.is_finite() || noise < 0. {
            return Err(MlErr::InvalidConfig(format!(
                "synthetic noise must be finite and non negative, got {noise}"
            )));
        }

        let pixels = side * side;
        let prototypes = Array2::random_using((classes, pixels), Uniform::new(0., 1.)?, rng)
            .mapv_into(|v: f32| if v < 0.5 { 0. } else { 1. });
        let mut inputs =
            Array2::random_using((samples, pixels), Uniform::new_inclusive(-noise, noise)?, rng);

        let labels: Vec<usize> = (0..samples).map(|i| i % classes).collect();
        for (mut row, &label) in inputs.axis_iter_mut(Axis(0)).zip(&labels) {
            row += &prototypes.row(label);
            row.mapv_inplace(|v| v.clamp(0., 1.));
        }

        debug!(samples, side, classes; "generated synthetic dataset");

        let inputs = inputs
            .into_shape_with_order((samples, side, side))
            .map_err(|_| MlErr::ShapeMismatch {
                what: "synthetic inputs",
                got: vec![samples, pixels],
                expected: vec![samples, side, side],
            })?;

        InMemoryDataset::new(inputs.into_dyn(), labels)
    }
}
