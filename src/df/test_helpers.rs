use crate::df::cderi::FactorHandle;
use crate::integrals::GaussianChain;
use crate::io::DfConfig;
use crate::utils::unpack_tril;
use ndarray::prelude::*;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Three atoms, six orbital and nine auxiliary functions.
pub fn chain() -> GaussianChain {
    GaussianChain::new(&[(1.0, -1.4), (8.0, 0.0), (1.0, 1.4)], 10)
}

pub fn handle(system: &GaussianChain) -> FactorHandle {
    FactorHandle::obtain(system, &DfConfig::default()).unwrap()
}

pub fn random_matrix(n: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::random_using((n, n), Uniform::new(-1.0, 1.0), &mut rng)
}

/// Four-index integrals (ij|kl) = sum_P L_P[ij] L_P[kl] without any blocking.
pub fn eri(handle: &FactorHandle) -> Array4<f64> {
    let nao: usize = handle.nao();
    let cderi = handle.load_block(0, handle.naux()).unwrap();
    let mut eri: Array4<f64> = Array4::zeros((nao, nao, nao, nao));
    for row in cderi.outer_iter() {
        let l: Array2<f64> = unpack_tril(row, nao);
        for i in 0..nao {
            for j in 0..nao {
                for k in 0..nao {
                    for m in 0..nao {
                        eri[[i, j, k, m]] += l[[i, j]] * l[[k, m]];
                    }
                }
            }
        }
    }
    eri
}

/// J_ij = sum_kl (ij|kl) dm_kl and K_ij = sum_kl (ik|jl) dm_kl.
pub fn exact_jk(eri: &Array4<f64>, dm: ArrayView2<f64>) -> (Array2<f64>, Array2<f64>) {
    let nao: usize = dm.nrows();
    let mut vj: Array2<f64> = Array2::zeros((nao, nao));
    let mut vk: Array2<f64> = Array2::zeros((nao, nao));
    for i in 0..nao {
        for j in 0..nao {
            for k in 0..nao {
                for l in 0..nao {
                    vj[[i, j]] += eri[[i, j, k, l]] * dm[[k, l]];
                    vk[[i, j]] += eri[[i, k, j, l]] * dm[[k, l]];
                }
            }
        }
    }
    (vj, vk)
}
