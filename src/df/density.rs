use crate::df::linalg::eigh_generalized_type2;
use crate::df::DfError;
use crate::utils::{pack_tril, tril_index};
use itertools::Itertools;
use log::debug;
use ndarray::prelude::*;

/// Selects the contraction algorithm for the exchange matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hermiticity {
    /// The density matrix is symmetric. K is built from the signed natural
    /// orbitals of the density.
    Symmetric,
    /// No symmetry is assumed. K is built from the full density matrix.
    General,
}

/// The part of the density that enters the exchange contraction.
#[derive(Debug, Clone)]
pub enum ExchangeFactor {
    /// Pseudo-orbitals sqrt(|e_k|) v_k of the positive and negative generalized
    /// eigenvalues. They are stored as rows, [n_pos, nao] and [n_neg, nao],
    /// so that every pseudo-orbital is contiguous in memory.
    Split { cpos: Array2<f64>, cneg: Array2<f64> },
    /// The unmodified density matrix.
    Full { dm: Array2<f64> },
}

/// A density matrix prepared for the block contraction.
#[derive(Debug, Clone)]
pub struct PreparedDensity {
    /// Packed lower triangle of dm + dm^T with the diagonal counted once.
    pub dmtril: Array1<f64>,
    pub exchange: ExchangeFactor,
}

impl PreparedDensity {
    pub fn hermiticity(&self) -> Hermiticity {
        match self.exchange {
            ExchangeFactor::Split { .. } => Hermiticity::Symmetric,
            ExchangeFactor::Full { .. } => Hermiticity::General,
        }
    }

    pub fn nao(&self) -> usize {
        match &self.exchange {
            ExchangeFactor::Split { cpos, .. } => cpos.ncols(),
            ExchangeFactor::Full { dm } => dm.nrows(),
        }
    }
}

/// Partition of the indices of a spectrum by sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrumSplit {
    pub positive: Vec<usize>,
    pub negative: Vec<usize>,
    pub dropped: Vec<usize>,
}

/// Eigenvalues above `occdrop` are positive, below `-occdrop` negative and all
/// others are dropped. Values exactly at the threshold are dropped.
pub fn split_spectrum(e: ArrayView1<f64>, occdrop: f64) -> SpectrumSplit {
    SpectrumSplit {
        positive: e.iter().positions(|&x| x > occdrop).collect(),
        negative: e.iter().positions(|&x| x < -occdrop).collect(),
        dropped: e.iter().positions(|&x| x.abs() <= occdrop).collect(),
    }
}

/// Packed lower triangle of dm + dm^T with halved diagonal elements, so that a sum
/// over the packed pairs counts every element of dm exactly once.
pub fn symmetrized_tril(dm: ArrayView2<f64>) -> Array1<f64> {
    let mut dmtril: Array1<f64> = pack_tril((&dm + &dm.t()).view());
    for i in 0..dm.nrows() {
        dmtril[tril_index(i, i)] *= 0.5;
    }
    dmtril
}

/// Rows sqrt(sign * e_k) v_k for the eigenpairs in `indices`.
fn pseudo_orbitals(
    e: ArrayView1<f64>,
    v: ArrayView2<f64>,
    indices: &[usize],
    sign: f64,
) -> Array2<f64> {
    let mut c: Array2<f64> = Array2::zeros((indices.len(), v.nrows()));
    for (mut row, k) in c.outer_iter_mut().zip(indices.iter()) {
        row.assign(&(&v.column(*k) * (sign * e[*k]).sqrt()));
    }
    c
}

/// Prepares a density matrix for the J/K contraction.
///
/// For a symmetric density the generalized eigenproblem dm S v = e v is solved and the
/// density is written as dm = cpos cpos^T - cneg cneg^T. A density matrix difference
/// need not be positive semi-definite, therefore both signs are kept.
pub fn prepare(
    dm: ArrayView2<f64>,
    s: ArrayView2<f64>,
    hermi: Hermiticity,
    occdrop: f64,
) -> Result<PreparedDensity, DfError> {
    if !dm.is_square() || dm.dim() != s.dim() {
        return Err(DfError::Shape(format!(
            "density matrix of shape {:?} does not match the overlap matrix of shape {:?}",
            dm.dim(),
            s.dim()
        )));
    }
    let dmtril: Array1<f64> = symmetrized_tril(dm);

    let exchange: ExchangeFactor = match hermi {
        Hermiticity::Symmetric => {
            let (e, v): (Array1<f64>, Array2<f64>) = eigh_generalized_type2(dm, s)?;
            let split: SpectrumSplit = split_spectrum(e.view(), occdrop);
            debug!(
                "{: <25} {} positive, {} negative, {} dropped",
                "natural occupations:",
                split.positive.len(),
                split.negative.len(),
                split.dropped.len()
            );
            ExchangeFactor::Split {
                cpos: pseudo_orbitals(e.view(), v.view(), &split.positive, 1.0),
                cneg: pseudo_orbitals(e.view(), v.view(), &split.negative, -1.0),
            }
        }
        Hermiticity::General => ExchangeFactor::Full {
            dm: dm.as_standard_layout().into_owned(),
        },
    };
    Ok(PreparedDensity { dmtril, exchange })
}
