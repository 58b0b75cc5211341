mod dataloader;
mod dataset;
pub mod idx;
mod reshape;
pub mod synthetic;

pub use dataloader::DataLoader;
pub use dataset::InMemoryDataset;
pub use reshape::{flatten, flatten_to, unflatten};
pub use synthetic::SyntheticDigits;

use ndarray::{ArrayViewD, Axis};

/// Borrowed batch view (zero-copy).
///
/// The leading dimension of `inputs` is the batch size and `labels` holds one class index per
/// sample.
#[derive(Debug, Clone)]
pub struct BatchRef<'a> {
    pub inputs: ArrayViewD<'a, f32>,
    pub labels: &'a [usize],
}

impl BatchRef<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.len_of(Axis(0))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A restartable source of batches.
pub trait BatchSource {
    /// Restarts the source so the next call to `next_batch` yields the first batch of a new pass.
    fn reset(&mut self);

    /// Returns the next borrowed batch, or `None` once the pass is exhausted.
    fn next_batch(&mut self) -> Option<BatchRef<'_>>;

    /// The amount of batches in a pass, if known.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}
