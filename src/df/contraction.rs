use crate::df::cderi::FactorHandle;
use crate::df::density::{ExchangeFactor, PreparedDensity};
use crate::df::DfError;
use crate::utils::{prange, unpack_tril, unpack_tril_into};
use ndarray::linalg::general_mat_mul;
use ndarray::prelude::*;
use rayon::prelude::*;

/// Coulomb contribution of one block in packed form: (L dmtril) L.
fn coulomb_block(eri1: ArrayView2<f64>, dmtril: ArrayView1<f64>) -> Array1<f64> {
    eri1.dot(&dmtril).dot(&eri1)
}

/// Transforms the first orbital index of every L_P in the block with the rows of `c`:
/// buf[P, k, :] = sum_i c[k, i] L_P[i, :]. The result has the shape [count * m, nao].
fn half_transform(
    eri1: ArrayView2<f64>,
    c: ArrayView2<f64>,
    nao: usize,
) -> Result<Array2<f64>, DfError> {
    let count: usize = eri1.nrows();
    let m: usize = c.nrows();
    let mut buf: Array3<f64> = Array3::zeros((count, m, nao));
    buf.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(eri1.axis_iter(Axis(0)).into_par_iter())
        .for_each(|(mut band, row)| {
            let l: Array2<f64> = unpack_tril(row, nao);
            general_mat_mul(1.0, &c, &l, 0.0, &mut band);
        });
    buf.into_shape((count * m, nao))
        .map_err(|err| DfError::Shape(err.to_string()))
}

/// Unpacked copy of every L_P in the block, shape [count * nao, nao].
fn unpack_block(eri1: ArrayView2<f64>, nao: usize) -> Result<Array2<f64>, DfError> {
    let count: usize = eri1.nrows();
    let mut buf: Array3<f64> = Array3::zeros((count, nao, nao));
    buf.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(eri1.axis_iter(Axis(0)).into_par_iter())
        .for_each(|(band, row)| unpack_tril_into(row, band));
    buf.into_shape((count * nao, nao))
        .map_err(|err| DfError::Shape(err.to_string()))
}

/// Builds J and K for one prepared density by streaming the Cholesky factor in blocks
/// of `block_size` auxiliary functions.
///
/// Symmetric densities use the pseudo-orbitals of the density,
/// K = sum_P (L_P cpos)(L_P cpos)^T - (L_P cneg)(L_P cneg)^T, general densities are
/// contracted directly, K = sum_P L_P dm L_P. The Coulomb matrix only depends on
/// dm + dm^T and is computed in the same way for both.
pub fn contract(
    handle: &FactorHandle,
    prepared: &PreparedDensity,
    block_size: usize,
) -> Result<(Array2<f64>, Array2<f64>), DfError> {
    let nao: usize = handle.nao();
    if prepared.nao() != nao {
        return Err(DfError::Shape(format!(
            "prepared density has dimension {}, the basis has {} functions",
            prepared.nao(),
            nao
        )));
    }
    if block_size == 0 {
        return Err(DfError::Shape(String::from(
            "the auxiliary block size has to be positive",
        )));
    }

    let mut vj_tril: Array1<f64> = Array1::zeros(handle.npair());
    let mut vk: Array2<f64> = Array2::zeros((nao, nao));
    for (b0, b1) in prange(0, handle.naux(), block_size) {
        let eri1 = handle.load_block(b0, b1 - b0)?;
        vj_tril += &coulomb_block(eri1.view(), prepared.dmtril.view());

        match &prepared.exchange {
            ExchangeFactor::Split { cpos, cneg } => {
                if cpos.nrows() > 0 {
                    let buf: Array2<f64> = half_transform(eri1.view(), cpos.view(), nao)?;
                    general_mat_mul(1.0, &buf.t(), &buf, 1.0, &mut vk);
                }
                if cneg.nrows() > 0 {
                    let buf: Array2<f64> = half_transform(eri1.view(), cneg.view(), nao)?;
                    general_mat_mul(-1.0, &buf.t(), &buf, 1.0, &mut vk);
                }
            }
            ExchangeFactor::Full { dm } => {
                // buf[P] = dm^T L_P, buf1[P] = L_P
                let buf: Array2<f64> = half_transform(eri1.view(), dm.t(), nao)?;
                let buf1: Array2<f64> = unpack_block(eri1.view(), nao)?;
                general_mat_mul(1.0, &buf.t(), &buf1, 1.0, &mut vk);
            }
        }
    }
    Ok((unpack_tril(vj_tril.view(), nao), vk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::OCCDROP;
    use crate::df::density::{prepare, Hermiticity};
    use crate::df::test_helpers::{chain, eri, exact_jk, handle, random_matrix};
    use crate::integrals::AuxiliaryIntegrals;

    #[test]
    fn symmetric_path_matches_exact_contraction() {
        let system = chain();
        let handle = handle(&system);
        let s: Array2<f64> = system.overlap();
        let a: Array2<f64> = random_matrix(6, 7);
        // indefinite symmetric density
        let dm: Array2<f64> = &a + &a.t();
        let prepared = prepare(dm.view(), s.view(), Hermiticity::Symmetric, OCCDROP).unwrap();
        let (vj, vk) = contract(&handle, &prepared, 4).unwrap();
        let (vj_ref, vk_ref) = exact_jk(&eri(&handle), dm.view());
        assert!(vj.abs_diff_eq(&vj_ref, 1e-10));
        assert!(vk.abs_diff_eq(&vk_ref, 1e-10));
        assert!(vj.abs_diff_eq(&vj.t(), 1e-12));
    }

    #[test]
    fn general_path_matches_exact_contraction() {
        let system = chain();
        let handle = handle(&system);
        let s: Array2<f64> = system.overlap();
        let dm: Array2<f64> = random_matrix(6, 11);
        let prepared = prepare(dm.view(), s.view(), Hermiticity::General, OCCDROP).unwrap();
        let (vj, vk) = contract(&handle, &prepared, 4).unwrap();
        let (vj_ref, vk_ref) = exact_jk(&eri(&handle), dm.view());
        assert!(vj.abs_diff_eq(&vj_ref, 1e-10));
        assert!(vk.abs_diff_eq(&vk_ref, 1e-10));
        // J only sees the symmetric part of the density
        assert!(vj.abs_diff_eq(&vj.t(), 1e-12));
    }

    #[test]
    fn both_paths_agree_for_symmetric_density() {
        let system = chain();
        let handle = handle(&system);
        let s: Array2<f64> = system.overlap();
        let a: Array2<f64> = random_matrix(6, 3);
        let dm: Array2<f64> = a.dot(&a.t()) - 0.5 * Array2::<f64>::eye(6);
        let symmetric = prepare(dm.view(), s.view(), Hermiticity::Symmetric, OCCDROP).unwrap();
        let general = prepare(dm.view(), s.view(), Hermiticity::General, OCCDROP).unwrap();
        let (vj_s, vk_s) = contract(&handle, &symmetric, 160).unwrap();
        let (vj_g, vk_g) = contract(&handle, &general, 160).unwrap();
        assert!(vj_s.abs_diff_eq(&vj_g, 1e-12));
        assert!(vk_s.abs_diff_eq(&vk_g, 1e-10));
    }

    #[test]
    fn block_size_does_not_change_the_result() {
        let system = chain();
        let handle = handle(&system);
        let s: Array2<f64> = system.overlap();
        let a: Array2<f64> = random_matrix(6, 5);
        let dm: Array2<f64> = &a + &a.t();
        for hermi in [Hermiticity::Symmetric, Hermiticity::General] {
            let prepared = prepare(dm.view(), s.view(), hermi, OCCDROP).unwrap();
            let (vj_ref, vk_ref) = contract(&handle, &prepared, 160).unwrap();
            for block_size in [1, 2, 4, 8, 9] {
                let (vj, vk) = contract(&handle, &prepared, block_size).unwrap();
                assert!(vj.abs_diff_eq(&vj_ref, 1e-12));
                assert!(vk.abs_diff_eq(&vk_ref, 1e-12));
            }
        }
    }

    #[test]
    fn zero_density_gives_zero_matrices() {
        let system = chain();
        let handle = handle(&system);
        let s: Array2<f64> = system.overlap();
        let dm: Array2<f64> = Array2::zeros((6, 6));
        for hermi in [Hermiticity::Symmetric, Hermiticity::General] {
            let prepared = prepare(dm.view(), s.view(), hermi, OCCDROP).unwrap();
            let (vj, vk) = contract(&handle, &prepared, 4).unwrap();
            assert!(vj.iter().all(|x| *x == 0.0));
            assert!(vk.iter().all(|x| *x == 0.0));
        }
    }

    #[test]
    fn invalid_input_is_rejected() {
        let system = chain();
        let handle = handle(&system);
        let s: Array2<f64> = Array2::eye(4);
        let dm: Array2<f64> = Array2::eye(4);
        let prepared = prepare(dm.view(), s.view(), Hermiticity::General, OCCDROP).unwrap();
        assert!(matches!(
            contract(&handle, &prepared, 4),
            Err(DfError::Shape(_))
        ));
        let s: Array2<f64> = system.overlap();
        let dm: Array2<f64> = Array2::eye(6);
        let prepared = prepare(dm.view(), s.view(), Hermiticity::General, OCCDROP).unwrap();
        assert!(matches!(
            contract(&handle, &prepared, 0),
            Err(DfError::Shape(_))
        ));
    }
}
