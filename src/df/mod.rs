//! Density fitted Coulomb and exchange matrices.
mod cderi;
mod contraction;
mod density;
mod error;
mod jk;
pub mod linalg;
mod logging;
mod veff;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cderi::{FactorHandle, FactorStore, InCoreFactor, OutOfCoreFactor};
pub use contraction::contract;
pub use density::{
    prepare, split_spectrum, symmetrized_tril, ExchangeFactor, Hermiticity, PreparedDensity,
    SpectrumSplit,
};
pub use error::DfError;
pub use jk::DensityFit;
pub use veff::{core_guess_density, electronic_energy, rhf_veff, uhf_electronic_energy, uhf_veff};
