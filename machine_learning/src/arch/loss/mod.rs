mod cross_entropy;
mod loss_fn;
mod mse;
mod nll;

pub use cross_entropy::CrossEntropy;
pub use loss_fn::LossFn;
pub use mse::Mse;
pub use nll::Nll;

use ndarray::{Array2, ArrayView2};

use crate::{MlErr, Result};

/// Validates that there's one label per prediction row and that every label is a valid column.
fn check_labels(y_pred: &ArrayView2<f32>, labels: &[usize]) -> Result<()> {
    if labels.is_empty() {
        return Err(MlErr::EmptyBatch);
    }

    if labels.len() != y_pred.nrows() {
        return Err(MlErr::ShapeMismatch {
            what: "labels",
            got: vec![labels.len()],
            expected: vec![y_pred.nrows()],
        });
    }

    let classes = y_pred.ncols();
    match labels.iter().position(|&label| label >= classes) {
        Some(index) => Err(MlErr::InvalidLabel {
            index,
            label: labels[index],
            classes,
        }),
        None => Ok(()),
    }
}

/// Encodes already validated labels as rows of a `labels.len() × classes` matrix.
fn one_hot(labels: &[usize], classes: usize) -> Array2<f32> {
    let mut encoded = Array2::zeros((labels.len(), classes));
    for (i, &label) in labels.iter().enumerate() {
        encoded[[i, label]] = 1.;
    }

    encoded
}
