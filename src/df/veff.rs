use crate::df::density::Hermiticity;
use crate::df::jk::DensityFit;
use crate::df::linalg::eigh_generalized;
use crate::df::DfError;
use crate::integrals::AuxiliaryIntegrals;
use ndarray::prelude::*;

/// Closed-shell density P = 2 C_occ C_occ^T from the eigenvectors of the
/// one-electron Hamiltonian.
pub fn core_guess_density(
    h: ArrayView2<f64>,
    s: ArrayView2<f64>,
    n_occ: usize,
) -> Result<Array2<f64>, DfError> {
    if n_occ > h.nrows() {
        return Err(DfError::Shape(format!(
            "{} occupied orbitals do not fit into {} basis functions",
            n_occ,
            h.nrows()
        )));
    }
    let (_, c): (Array1<f64>, Array2<f64>) = eigh_generalized(h, s)?;
    let c_occ: ArrayView2<f64> = c.slice(s![.., ..n_occ]);
    Ok(2.0 * c_occ.dot(&c_occ.t()))
}

/// Restricted Hartree-Fock potential J - 1/2 K of a closed-shell density.
pub fn rhf_veff<I: AuxiliaryIntegrals + ?Sized>(
    df: &mut DensityFit<I>,
    dm: ArrayView2<f64>,
) -> Result<Array2<f64>, DfError> {
    let (vj, vk) = df.get_jk(dm, Hermiticity::Symmetric)?;
    Ok(vj - 0.5 * vk)
}

/// Unrestricted Hartree-Fock potentials J_a + J_b - K_s for the spin densities
/// [alpha, beta].
pub fn uhf_veff<I: AuxiliaryIntegrals + ?Sized>(
    df: &mut DensityFit<I>,
    dms: ArrayView3<f64>,
) -> Result<Array3<f64>, DfError> {
    if dms.len_of(Axis(0)) != 2 {
        return Err(DfError::Shape(format!(
            "expected alpha and beta densities, got {} matrices",
            dms.len_of(Axis(0))
        )));
    }
    let (vj, vk) = df.get_jk_batch(dms, Hermiticity::Symmetric)?;
    let vj_total: Array2<f64> = vj.sum_axis(Axis(0));
    let mut veff: Array3<f64> = -vk;
    for mut v in veff.outer_iter_mut() {
        v += &vj_total;
    }
    Ok(veff)
}

/// Electronic energy tr(P h) + 1/2 tr(P V) of a closed-shell density.
pub fn electronic_energy(h: ArrayView2<f64>, dm: ArrayView2<f64>, veff: ArrayView2<f64>) -> f64 {
    (&dm * &(&h + &(0.5 * &veff))).sum()
}

/// Electronic energy sum_s tr(P_s h) + 1/2 tr(P_s V_s) of the spin densities.
pub fn uhf_electronic_energy(
    h: ArrayView2<f64>,
    dms: ArrayView3<f64>,
    veff: ArrayView3<f64>,
) -> f64 {
    dms.outer_iter()
        .zip(veff.outer_iter())
        .map(|(dm, v)| electronic_energy(h, dm, v))
        .sum()
}
