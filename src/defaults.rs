// DENSITY FITTING
// name of the auxiliary basis used to fit the electron repulsion integrals
pub const AUXBASIS: &str = "weigend";
// memory budget in MB; the Cholesky factor is kept in memory if it fits
pub const MAX_MEMORY: f64 = 4000.0;
// number of auxiliary functions that are contracted at once
pub const BLOCKDIM: usize = 160;
// generalized eigenvalues of the density matrix with an absolute value
// at or below this threshold do not contribute to the exchange matrix
pub const OCCDROP: f64 = 1.0e-12;

// config file
pub const CONFIG_FILE_NAME: &str = "dfjk.toml";

// MODEL SYSTEM
// exponents of the s-type orbital basis functions on each atom,
// scaled by the square root of the nuclear charge
pub const ORBITAL_EXPONENTS: [f64; 2] = [1.6, 0.35];
// exponents of the auxiliary functions, scaled in the same way
pub const WEIGEND_AUX_EXPONENTS: [f64; 3] = [3.2, 0.9, 0.22];
pub const MINIMAL_AUX_EXPONENTS: [f64; 1] = [0.7];
// width parameter of the attractive Gaussian nuclear potential
pub const NUCLEAR_POTENTIAL_WIDTH: f64 = 1.2;
