use ndarray::{Array2, ArrayView2};

/// Row-wise `log(softmax(x))`, computed with the max-shift so large logits don't overflow.
pub fn log_softmax(x: ArrayView2<f32>) -> Array2<f32> {
    let mut y = x.to_owned();

    for mut row in y.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        let ln_sum = row.iter().map(|&v| (v - max).exp()).sum::<f32>().ln();
        row.mapv_inplace(|v| (v - max) - ln_sum);
    }

    y
}

/// Row-wise softmax, each row of the result sums up to one.
pub fn softmax(x: ArrayView2<f32>) -> Array2<f32> {
    log_softmax(x).mapv_into(f32::exp)
}

/// Returns the column index of the largest value of every row.
pub fn argmax(x: ArrayView2<f32>) -> Vec<usize> {
    x.rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
                    if v > max { (i, v) } else { (best, max) }
                })
                .0
        })
        .collect()
}
