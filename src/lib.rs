pub mod defaults;
pub mod df;
pub mod integrals;
pub mod io;
pub mod utils;

pub use df::{DensityFit, DfError, FactorHandle, Hermiticity};
pub use integrals::{AuxiliaryIntegrals, GaussianChain};
pub use io::{Configuration, DfConfig};
