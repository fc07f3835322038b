//! Small numeric helpers shared by statistics and metric code.

/// Population mean and standard deviation, accumulated in `f64`.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let var = values
        .iter()
        .map(|&v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / count;
    (mean, var.sqrt())
}

/// Arithmetic mean; `NaN` for an empty slice, like an empty numpy mean.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Summed-area table with one row and column of zero padding.
///
/// `table[(y + 1) * (w + 1) + (x + 1)]` holds the sum of `values` over
/// `[0..=y, 0..=x]`.
pub(crate) fn integral(values: &[f64], width: usize, height: usize) -> Vec<f64> {
    let stride = width + 1;
    let mut table = vec![0.0f64; stride * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0.0f64;
        for x in 0..width {
            row_sum += values[y * width + x];
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
        }
    }
    table
}

/// Sum of a `size x size` box with top-left `(x, y)` from an integral table.
#[inline]
pub(crate) fn box_sum(table: &[f64], width: usize, x: usize, y: usize, size: usize) -> f64 {
    let stride = width + 1;
    let a = table[y * stride + x];
    let b = table[y * stride + x + size];
    let c = table[(y + size) * stride + x];
    let d = table[(y + size) * stride + x + size];
    d - b - c + a
}
