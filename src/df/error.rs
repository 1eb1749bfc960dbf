use ndarray_linalg::error::LinalgError;
use std::fmt;
use std::io;

/// Errors of the density fitted J/K build. All of them are fatal for the call that
/// raised them; nothing is retried internally.
#[derive(Debug)]
pub enum DfError {
    /// The Cholesky factor does not fit into the memory budget and the scratch
    /// storage could not be created, written or read.
    Resource { message: String, source: io::Error },
    /// A Cholesky factorization or an eigendecomposition failed.
    Numerical { message: String, source: LinalgError },
    /// Dimensions of the input do not match the basis, or an invalid block size.
    Shape(String),
    /// The integral provider does not know the requested auxiliary basis.
    AuxBasis(String),
}

impl DfError {
    pub fn resource(message: impl Into<String>, source: io::Error) -> Self {
        DfError::Resource {
            message: message.into(),
            source,
        }
    }

    pub fn numerical(message: impl Into<String>, source: LinalgError) -> Self {
        DfError::Numerical {
            message: message.into(),
            source,
        }
    }
}

impl fmt::Display for DfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            DfError::Resource { message, source } => {
                write!(f, "scratch storage failure: {} ({})", message, source)
            }
            DfError::Numerical { message, source } => {
                write!(f, "numerical failure: {} ({})", message, source)
            }
            DfError::Shape(message) => write!(f, "shape mismatch: {}", message),
            DfError::AuxBasis(name) => write!(f, "unknown auxiliary basis: {}", name),
        }
    }
}

impl std::error::Error for DfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DfError::Resource { source, .. } => Some(source),
            DfError::Numerical { source, .. } => Some(source),
            _ => None,
        }
    }
}
