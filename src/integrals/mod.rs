mod model;

pub use model::GaussianChain;

use crate::df::DfError;
use ndarray::prelude::*;
use std::ops::Range;

/// Integrals the density fitting code needs from the basis set side.
///
/// Orbital pairs are addressed in the row-wise packed lower triangle,
/// `pair(i, j) = i * (i + 1) / 2 + j` with `j <= i`.
pub trait AuxiliaryIntegrals: Sync {
    /// Number of orbital basis functions.
    fn nao(&self) -> usize;

    /// Overlap matrix of the orbital basis.
    fn overlap(&self) -> Array2<f64>;

    /// Number of functions in the auxiliary basis `auxbasis`.
    fn naux(&self, auxbasis: &str) -> Result<usize, DfError>;

    /// Two-centre metric (P|Q) of the auxiliary basis, [naux, naux].
    fn aux_metric(&self, auxbasis: &str) -> Result<Array2<f64>, DfError>;

    /// Three-centre integrals (P|ij) for the orbital pairs in `pairs`, [naux, pairs.len()].
    fn three_center(&self, auxbasis: &str, pairs: Range<usize>) -> Result<Array2<f64>, DfError>;
}
