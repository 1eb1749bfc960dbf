use crate::df::DfError;
use ndarray::prelude::*;
use ndarray_linalg::{Cholesky, Diag, Eigh, SolveTriangular, UPLO};

/// Lower Cholesky factor L of a positive definite metric, S = L L^T.
pub fn metric_cholesky(s: ArrayView2<f64>) -> Result<Array2<f64>, DfError> {
    s.cholesky(UPLO::Lower)
        .map_err(|err| DfError::numerical("Cholesky factorization of the metric failed", err))
}

/// Back transformation v = L^-T w of eigenvectors of the reduced problem.
fn back_transform(l: ArrayView2<f64>, w: &Array2<f64>) -> Result<Array2<f64>, DfError> {
    let lt: Array2<f64> = l.t().to_owned();
    lt.solve_triangular(UPLO::Upper, Diag::NonUnit, w)
        .map_err(|err| DfError::numerical("back transformation of the eigenvectors failed", err))
}

/// Generalized symmetric eigenproblem A v = e S v.
///
/// The eigenvalues are returned in ascending order, the eigenvectors are S-orthonormal.
pub fn eigh_generalized(
    a: ArrayView2<f64>,
    s: ArrayView2<f64>,
) -> Result<(Array1<f64>, Array2<f64>), DfError> {
    let l: Array2<f64> = metric_cholesky(s)?;
    // L^-1 A L^-T
    let x: Array2<f64> = l
        .solve_triangular(UPLO::Lower, Diag::NonUnit, &a.to_owned())
        .map_err(|err| DfError::numerical("reduction to a standard eigenproblem failed", err))?;
    let m: Array2<f64> = l
        .solve_triangular(UPLO::Lower, Diag::NonUnit, &x.t().to_owned())
        .map_err(|err| DfError::numerical("reduction to a standard eigenproblem failed", err))?;
    let (e, w): (Array1<f64>, Array2<f64>) = m
        .eigh(UPLO::Lower)
        .map_err(|err| DfError::numerical("eigendecomposition did not converge", err))?;
    let v: Array2<f64> = back_transform(l.view(), &w)?;
    Ok((e, v))
}

/// Generalized symmetric eigenproblem of the second kind, A S v = e v.
///
/// The eigenvectors are S-orthonormal, v^T S v = 1, so that A = sum_k e_k v_k v_k^T.
/// This is the natural decomposition of a density matrix into natural orbitals
/// and occupation numbers.
pub fn eigh_generalized_type2(
    a: ArrayView2<f64>,
    s: ArrayView2<f64>,
) -> Result<(Array1<f64>, Array2<f64>), DfError> {
    let l: Array2<f64> = metric_cholesky(s)?;
    // L^T A L w = e w  with  w = L^T v
    let m: Array2<f64> = l.t().dot(&a).dot(&l);
    let (e, w): (Array1<f64>, Array2<f64>) = m
        .eigh(UPLO::Lower)
        .map_err(|err| DfError::numerical("eigendecomposition did not converge", err))?;
    let v: Array2<f64> = back_transform(l.view(), &w)?;
    Ok((e, v))
}
