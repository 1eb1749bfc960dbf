use ndarray::prelude::*;

/// Position of the element (i, j) with j <= i in a row-wise packed lower triangle.
#[inline]
pub fn tril_index(i: usize, j: usize) -> usize {
    i * (i + 1) / 2 + j
}

/// Packs the lower triangle (including the diagonal) of a square matrix row by row.
/// For a symmetric matrix this is also the column-wise packed upper triangle.
pub fn pack_tril(a: ArrayView2<f64>) -> Array1<f64> {
    let n: usize = a.nrows();
    let mut packed: Array1<f64> = Array1::zeros(n * (n + 1) / 2);
    let mut idx: usize = 0;
    for i in 0..n {
        for j in 0..=i {
            packed[idx] = a[[i, j]];
            idx += 1;
        }
    }
    packed
}

/// Unpacks a row-wise packed lower triangle into a symmetric matrix.
pub fn unpack_tril(packed: ArrayView1<f64>, n: usize) -> Array2<f64> {
    let mut a: Array2<f64> = Array2::zeros((n, n));
    unpack_tril_into(packed, a.view_mut());
    a
}

/// Same as [unpack_tril] but writes into an existing square matrix.
pub fn unpack_tril_into(packed: ArrayView1<f64>, mut a: ArrayViewMut2<f64>) {
    let n: usize = a.nrows();
    debug_assert_eq!(packed.len(), n * (n + 1) / 2);
    let mut idx: usize = 0;
    for i in 0..n {
        for j in 0..=i {
            let value: f64 = packed[idx];
            a[[i, j]] = value;
            a[[j, i]] = value;
            idx += 1;
        }
    }
}

/// Splits [start, end) into consecutive ranges of at most `step` elements.
/// The last range is shorter if the length is not a multiple of `step`.
pub fn prange(start: usize, end: usize, step: usize) -> impl Iterator<Item = (usize, usize)> {
    assert!(step > 0, "the step of a range partition has to be positive");
    (start..end)
        .step_by(step)
        .map(move |b0| (b0, (b0 + step).min(end)))
}
