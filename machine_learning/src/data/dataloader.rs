use std::num::NonZeroUsize;

use rand::{SeedableRng, rngs::StdRng};

use super::{BatchRef, BatchSource, InMemoryDataset};

/// A `BatchSource` producing borrowed, contiguous batches of an `InMemoryDataset`.
///
/// Every batch holds `batch_size` samples except possibly the last one of a pass. The order of the
/// samples is the dataset's own unless shuffling is enabled, in which case the dataset is permuted
/// on every `reset`.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: InMemoryDataset,
    batch_size: NonZeroUsize,
    cursor: usize,
    rng: Option<StdRng>,
}

impl DataLoader {
    pub fn new(dataset: InMemoryDataset, batch_size: NonZeroUsize) -> Self {
        Self {
            dataset,
            batch_size,
            cursor: 0,
            rng: None,
        }
    }

    /// Enables reshuffling the samples on every `reset`.
    ///
    /// # Arguments
    /// * `seed` - The seed of the shuffling rng, the same seed yields the same sequence of orders.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    #[inline]
    pub fn dataset(&self) -> &InMemoryDataset {
        &self.dataset
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }
}

impl BatchSource for DataLoader {
    fn reset(&mut self) {
        self.cursor = 0;

        if let Some(rng) = &mut self.rng {
            self.dataset.shuffle(rng);
        }
    }

    fn next_batch(&mut self) -> Option<BatchRef<'_>> {
        let len = self.dataset.len();
        if self.cursor >= len {
            return None;
        }

        let start = self.cursor;
        let end = (start + self.batch_size.get()).min(len);

        self.cursor = end;
        Some(self.dataset.slice(start, end))
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.dataset.len().div_ceil(self.batch_size.get()))
    }
}
