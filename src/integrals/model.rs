use crate::defaults::{
    MINIMAL_AUX_EXPONENTS, NUCLEAR_POTENTIAL_WIDTH, ORBITAL_EXPONENTS, WEIGEND_AUX_EXPONENTS,
};
use crate::df::DfError;
use crate::integrals::AuxiliaryIntegrals;
use crate::io::ModelInput;
use ndarray::prelude::*;
use std::f64::consts::PI;
use std::ops::Range;

/// Normalized one-dimensional s-type Gaussian exp(-a (x - X)^2).
#[derive(Debug, Clone, Copy)]
struct Gaussian {
    exponent: f64,
    center: f64,
    norm: f64,
}

impl Gaussian {
    fn new(exponent: f64, center: f64) -> Self {
        Self {
            exponent,
            center,
            norm: (2.0 * exponent / PI).powf(0.25),
        }
    }

    /// Gaussian product theorem: exponent, center and prefactor of the product
    /// with `other` (normalization not included).
    fn product(&self, other: &Gaussian) -> (f64, f64, f64) {
        let p: f64 = self.exponent + other.exponent;
        let center: f64 = (self.exponent * self.center + other.exponent * other.center) / p;
        let d: f64 = self.center - other.center;
        let prefactor: f64 = (-self.exponent * other.exponent / p * d * d).exp();
        (p, center, prefactor)
    }
}

/// Overlap of two unnormalized Gaussians.
fn gaussian_overlap(a: f64, ax: f64, b: f64, bx: f64) -> f64 {
    let d: f64 = ax - bx;
    (PI / (a + b)).sqrt() * (-a * b / (a + b) * d * d).exp()
}

/// A one-dimensional chain of atoms, each carrying s-type Gaussians for the orbital
/// and the auxiliary basis. Nuclei attract the electrons through a Gaussian potential
/// and the auxiliary basis is fitted in the overlap metric, so that every integral is
/// analytic. The fitted four-index integrals are positive semi-definite by construction.
#[derive(Debug, Clone)]
pub struct GaussianChain {
    pub charges: Vec<f64>,
    pub positions: Vec<f64>,
    pub n_electrons: usize,
    basis: Vec<Gaussian>,
    pairs: Vec<(usize, usize)>,
}

impl GaussianChain {
    pub fn new(atoms: &[(f64, f64)], n_electrons: usize) -> Self {
        let charges: Vec<f64> = atoms.iter().map(|(charge, _)| *charge).collect();
        let positions: Vec<f64> = atoms.iter().map(|(_, position)| *position).collect();
        let basis: Vec<Gaussian> = atoms
            .iter()
            .flat_map(|(charge, position)| {
                ORBITAL_EXPONENTS
                    .iter()
                    .map(move |exponent| Gaussian::new(exponent * charge.sqrt(), *position))
            })
            .collect();
        let n: usize = basis.len();
        let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (0..=i).map(move |j| (i, j))).collect();
        Self {
            charges,
            positions,
            n_electrons,
            basis,
            pairs,
        }
    }

    pub fn n_occ(&self) -> usize {
        self.n_electrons / 2
    }

    fn aux_functions(&self, auxbasis: &str) -> Result<Vec<Gaussian>, DfError> {
        let exponents: &[f64] = match auxbasis.to_lowercase().as_str() {
            "weigend" => &WEIGEND_AUX_EXPONENTS[..],
            "minimal" => &MINIMAL_AUX_EXPONENTS[..],
            _ => return Err(DfError::AuxBasis(auxbasis.to_owned())),
        };
        Ok(self
            .charges
            .iter()
            .zip(self.positions.iter())
            .flat_map(|(charge, position)| {
                exponents
                    .iter()
                    .map(move |exponent| Gaussian::new(exponent * charge.sqrt(), *position))
            })
            .collect())
    }

    /// Kinetic energy integrals -1/2 <i|d^2/dx^2|j>.
    pub fn kinetic(&self) -> Array2<f64> {
        let s: Array2<f64> = self.overlap();
        Array2::from_shape_fn(s.raw_dim(), |(i, j)| {
            let (gi, gj) = (&self.basis[i], &self.basis[j]);
            let mu: f64 = gi.exponent * gj.exponent / (gi.exponent + gj.exponent);
            let d: f64 = gi.center - gj.center;
            mu * (1.0 - 2.0 * mu * d * d) * s[[i, j]]
        })
    }

    /// Attraction by the Gaussian nuclear potentials -Z_A exp(-w (x - X_A)^2).
    pub fn nuclear_attraction(&self) -> Array2<f64> {
        let n: usize = self.basis.len();
        Array2::from_shape_fn((n, n), |(i, j)| {
            let (gi, gj) = (&self.basis[i], &self.basis[j]);
            let (p, center, prefactor) = gi.product(gj);
            let v: f64 = self
                .charges
                .iter()
                .zip(self.positions.iter())
                .map(|(charge, position)| {
                    -charge * gaussian_overlap(p, center, NUCLEAR_POTENTIAL_WIDTH, *position)
                })
                .sum();
            gi.norm * gj.norm * prefactor * v
        })
    }

    /// One-electron Hamiltonian.
    pub fn hcore(&self) -> Array2<f64> {
        self.kinetic() + self.nuclear_attraction()
    }

    /// Point charge repulsion of the nuclei.
    pub fn nuclear_repulsion(&self) -> f64 {
        let mut energy: f64 = 0.0;
        for a in 0..self.charges.len() {
            for b in 0..a {
                energy += self.charges[a] * self.charges[b]
                    / (self.positions[a] - self.positions[b]).abs();
            }
        }
        energy
    }
}

impl From<&ModelInput> for GaussianChain {
    fn from(input: &ModelInput) -> Self {
        let atoms: Vec<(f64, f64)> = input
            .atoms
            .iter()
            .map(|atom| (atom.charge, atom.position))
            .collect();
        GaussianChain::new(&atoms, input.n_electrons)
    }
}

impl AuxiliaryIntegrals for GaussianChain {
    fn nao(&self) -> usize {
        self.basis.len()
    }

    fn overlap(&self) -> Array2<f64> {
        let n: usize = self.basis.len();
        Array2::from_shape_fn((n, n), |(i, j)| {
            let (gi, gj) = (&self.basis[i], &self.basis[j]);
            gi.norm * gj.norm * gaussian_overlap(gi.exponent, gi.center, gj.exponent, gj.center)
        })
    }

    fn naux(&self, auxbasis: &str) -> Result<usize, DfError> {
        Ok(self.aux_functions(auxbasis)?.len())
    }

    fn aux_metric(&self, auxbasis: &str) -> Result<Array2<f64>, DfError> {
        let aux: Vec<Gaussian> = self.aux_functions(auxbasis)?;
        let n: usize = aux.len();
        Ok(Array2::from_shape_fn((n, n), |(p, q)| {
            let (gp, gq) = (&aux[p], &aux[q]);
            gp.norm * gq.norm * gaussian_overlap(gp.exponent, gp.center, gq.exponent, gq.center)
        }))
    }

    fn three_center(&self, auxbasis: &str, pairs: Range<usize>) -> Result<Array2<f64>, DfError> {
        if pairs.start > pairs.end || pairs.end > self.pairs.len() {
            return Err(DfError::Shape(format!(
                "pair range {:?} exceeds the {} orbital pairs",
                pairs,
                self.pairs.len()
            )));
        }
        let aux: Vec<Gaussian> = self.aux_functions(auxbasis)?;
        let pair_slice: &[(usize, usize)] = &self.pairs[pairs];
        Ok(Array2::from_shape_fn(
            (aux.len(), pair_slice.len()),
            |(p, ij)| {
                let (i, j) = pair_slice[ij];
                let (gi, gj) = (&self.basis[i], &self.basis[j]);
                let (exponent, center, prefactor) = gi.product(gj);
                let gp: &Gaussian = &aux[p];
                gi.norm
                    * gj.norm
                    * gp.norm
                    * prefactor
                    * gaussian_overlap(exponent, center, gp.exponent, gp.center)
            },
        ))
    }
}
