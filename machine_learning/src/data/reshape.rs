use ndarray::{ArrayView2, ArrayViewD, Axis};

use crate::{MlErr, Result};

/// Reinterprets a batch of any shape `(N, d1, .., dk)` as a `(N, d1 * .. * dk)` matrix.
///
/// No data is copied, the view must be contiguous in standard order.
pub fn flatten(x: ArrayViewD<'_, f32>) -> Result<ArrayView2<'_, f32>> {
    let features = x.shape().iter().skip(1).product();
    flatten_to(x, features)
}

/// Same as `flatten` but checks the amount of features of every sample.
///
/// # Arguments
/// * `x` - A batch whose leading dimension is the amount of samples.
/// * `features` - The amount of values every sample must have.
///
/// # Returns
/// The `(N, features)` view, or a `ShapeMismatch` carrying the shape of `x` and the expected one.
pub fn flatten_to(x: ArrayViewD<'_, f32>, features: usize) -> Result<ArrayView2<'_, f32>> {
    let n = x.shape().first().copied().unwrap_or(0);
    let shape = x.shape().to_vec();
    let mismatch = || MlErr::ShapeMismatch {
        what: "batch input",
        got: shape.clone(),
        expected: vec![n, features],
    };

    if x.ndim() == 0 || x.shape()[1..].iter().product::<usize>() != features {
        return Err(mismatch());
    }

    x.into_shape_with_order((n, features))
        .map_err(|_| mismatch())
}

/// Reinterprets a `(N, features)` matrix as a batch of samples of shape `sample_shape`.
///
/// The inverse of `flatten`.
pub fn unflatten<'a>(
    x: ArrayView2<'a, f32>,
    sample_shape: &[usize],
) -> Result<ArrayViewD<'a, f32>> {
    let n = x.len_of(Axis(0));
    let mut shape = Vec::with_capacity(sample_shape.len() + 1);
    shape.push(n);
    shape.extend_from_slice(sample_shape);

    let mismatch = || MlErr::ShapeMismatch {
        what: "flat batch",
        got: x.shape().to_vec(),
        expected: vec![n, sample_shape.iter().product()],
    };

    if sample_shape.iter().product::<usize>() != x.ncols() {
        return Err(mismatch());
    }

    let err = mismatch();
    x.into_shape_with_order(shape).map_err(|_| err)
}
