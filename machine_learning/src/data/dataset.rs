use ndarray::{ArrayD, ArrayViewD, Axis, Slice};
use rand::{Rng, seq::SliceRandom};

use super::BatchRef;
use crate::{MlErr, Result};

/// An in-memory labelled dataset.
///
/// The inputs keep their per-sample shape, `(N, 28, 28)` for images, and are stored in standard
/// layout so any contiguous run of samples can be viewed and reshaped without copying.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    inputs: ArrayD<f32>,
    labels: Vec<usize>,
}

impl InMemoryDataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Arguments
    /// * `inputs` - The samples, stacked along the first axis.
    /// * `labels` - The class index of every sample.
    ///
    /// # Returns
    /// A new `InMemoryDataset`, or an error if there are no samples or the amount of inputs and
    /// labels differ.
    pub fn new(inputs: ArrayD<f32>, labels: Vec<usize>) -> Result<Self> {
        if inputs.ndim() == 0 {
            return Err(MlErr::ShapeMismatch {
                what: "dataset inputs",
                got: vec![],
                expected: vec![labels.len()],
            });
        }

        let n = inputs.len_of(Axis(0));
        if n != labels.len() {
            return Err(MlErr::ShapeMismatch {
                what: "dataset labels",
                got: vec![labels.len()],
                expected: vec![n],
            });
        }

        if n == 0 {
            return Err(MlErr::EmptyDataset);
        }

        Ok(Self {
            inputs: standard_layout(inputs),
            labels,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The shape of a single sample.
    pub fn sample_shape(&self) -> &[usize] {
        &self.inputs.shape()[1..]
    }

    /// The amount of classes the labels span, the largest label plus one.
    pub fn num_classes(&self) -> usize {
        self.labels.iter().max().map_or(0, |&max| max + 1)
    }

    pub fn inputs(&self) -> ArrayViewD<'_, f32> {
        self.inputs.view()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Returns the sample at `idx` as a batch of one, or `None` if out of bounds.
    pub fn get(&self, idx: usize) -> Option<BatchRef<'_>> {
        (idx < self.len()).then(|| self.slice(idx, idx + 1))
    }

    /// Borrows the samples in `start..end`, both of which must be in bounds.
    pub(super) fn slice(&self, start: usize, end: usize) -> BatchRef<'_> {
        BatchRef {
            inputs: self.inputs.slice_axis(Axis(0), Slice::from(start..end)),
            labels: &self.labels[start..end],
        }
    }

    /// Permutes the samples in place, keeping every input paired with its label.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        self.inputs = standard_layout(self.inputs.select(Axis(0), &order));
        self.labels = order.iter().map(|&i| self.labels[i]).collect();
    }
}

fn standard_layout(a: ArrayD<f32>) -> ArrayD<f32> {
    if a.is_standard_layout() {
        a
    } else {
        a.as_standard_layout().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, IxDyn};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn dataset() -> InMemoryDataset {
        // sample i is filled with i
        let inputs = Array::from_shape_fn(IxDyn(&[5, 2, 2]), |idx| idx[0] as f32);
        InMemoryDataset::new(inputs, vec![0, 1, 2, 1, 0]).unwrap()
    }

    #[test]
    fn dataset_basic() {
        let ds = dataset();

        assert_eq!(ds.len(), 5);
        assert_eq!(ds.sample_shape(), [2, 2]);
        assert_eq!(ds.num_classes(), 3);

        let sample = ds.get(3).unwrap();
        assert_eq!(sample.labels, [1]);
        assert_eq!(sample.inputs.shape(), [1, 2, 2]);
        assert!(sample.inputs.iter().all(|&v| v == 3.));
        assert!(ds.get(5).is_none());
    }

    #[test]
    fn inputs_and_labels_must_pair_up() {
        let inputs = ArrayD::zeros(IxDyn(&[3, 4]));
        let err = InMemoryDataset::new(inputs, vec![0, 1]).unwrap_err();

        assert!(matches!(
            err,
            MlErr::ShapeMismatch { got, expected, .. } if got == [2] && expected == [3]
        ));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let inputs = ArrayD::zeros(IxDyn(&[0, 4]));
        assert!(matches!(
            InMemoryDataset::new(inputs, vec![]),
            Err(MlErr::EmptyDataset)
        ));
    }

    #[test]
    fn shuffle_keeps_pairs() {
        let mut ds = dataset();
        let before = ds.labels().to_vec();

        ds.shuffle(&mut StdRng::seed_from_u64(3));

        for i in 0..ds.len() {
            let sample = ds.get(i).unwrap();
            let original = sample.inputs[[0, 0, 0]] as usize;
            assert_eq!(sample.labels[0], before[original]);
        }
    }
}
