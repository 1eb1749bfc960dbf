use crate::df::cderi::FactorHandle;
use crate::df::contraction::contract;
use crate::df::density::{prepare, Hermiticity, PreparedDensity};
use crate::df::logging::print_jk_timing;
use crate::df::DfError;
use crate::integrals::AuxiliaryIntegrals;
use crate::io::DfConfig;
use crate::utils::Timer;
use ndarray::prelude::*;
use rayon::prelude::*;

/// J and K of one density matrix.
fn jk_single(
    handle: &FactorHandle,
    s: ArrayView2<f64>,
    dm: ArrayView2<f64>,
    hermi: Hermiticity,
    config: &DfConfig,
) -> Result<(Array2<f64>, Array2<f64>), DfError> {
    let prepared: PreparedDensity = prepare(dm, s, hermi, config.occdrop)?;
    contract(handle, &prepared, config.block_size)
}

/// Returns the factor stored in `slot` and builds it first if necessary.
fn factor_in<'b, I: AuxiliaryIntegrals + ?Sized>(
    slot: &'b mut Option<FactorHandle>,
    integrals: &I,
    config: &DfConfig,
) -> Result<&'b FactorHandle, DfError> {
    let handle: FactorHandle = match slot.take() {
        Some(handle) => handle,
        None => FactorHandle::obtain(integrals, config)?,
    };
    Ok(slot.insert(handle))
}

/// Density fitted J/K builder for one basis set.
///
/// The Cholesky factor of the auxiliary basis is built on the first request and
/// reused for all later density matrices, until the builder is dropped or
/// [DensityFit::release_factor] is called.
pub struct DensityFit<'a, I: AuxiliaryIntegrals + ?Sized> {
    integrals: &'a I,
    config: DfConfig,
    overlap: Array2<f64>,
    factor: Option<FactorHandle>,
}

impl<'a, I: AuxiliaryIntegrals + ?Sized> DensityFit<'a, I> {
    pub fn new(integrals: &'a I, config: DfConfig) -> Self {
        Self {
            integrals,
            config,
            overlap: integrals.overlap(),
            factor: None,
        }
    }

    pub fn config(&self) -> &DfConfig {
        &self.config
    }

    pub fn nao(&self) -> usize {
        self.overlap.nrows()
    }

    pub fn overlap(&self) -> ArrayView2<'_, f64> {
        self.overlap.view()
    }

    pub fn has_factor(&self) -> bool {
        self.factor.is_some()
    }

    pub fn factor(&mut self) -> Result<&FactorHandle, DfError> {
        factor_in(&mut self.factor, self.integrals, &self.config)
    }

    /// Drops the Cholesky factor. A scratch file is deleted at this point.
    pub fn release_factor(&mut self) {
        self.factor = None;
    }

    fn check_density(&self, shape: &[usize]) -> Result<(), DfError> {
        let nao: usize = self.nao();
        if shape.len() < 2 || shape[shape.len() - 2..] != [nao, nao] {
            return Err(DfError::Shape(format!(
                "density matrices of shape {:?} do not match {} basis functions",
                shape, nao
            )));
        }
        Ok(())
    }

    /// J and K of a single density matrix.
    pub fn get_jk(
        &mut self,
        dm: ArrayView2<f64>,
        hermi: Hermiticity,
    ) -> Result<(Array2<f64>, Array2<f64>), DfError> {
        self.check_density(dm.shape())?;
        let timer: Timer = Timer::start();
        let handle: &FactorHandle = factor_in(&mut self.factor, self.integrals, &self.config)?;
        let jk = jk_single(handle, self.overlap.view(), dm, hermi, &self.config)?;
        print_jk_timing(1, hermi, timer);
        Ok(jk)
    }

    /// J and K of an ordered batch of density matrices, [n, nao, nao]. The matrices
    /// are independent of each other and are processed in parallel; the output has
    /// the same order as the input.
    pub fn get_jk_batch(
        &mut self,
        dms: ArrayView3<f64>,
        hermi: Hermiticity,
    ) -> Result<(Array3<f64>, Array3<f64>), DfError> {
        self.check_density(dms.shape())?;
        let nao: usize = self.nao();
        let n_dm: usize = dms.len_of(Axis(0));
        let mut vj: Array3<f64> = Array3::zeros((n_dm, nao, nao));
        let mut vk: Array3<f64> = Array3::zeros((n_dm, nao, nao));
        if n_dm == 0 {
            return Ok((vj, vk));
        }
        let timer: Timer = Timer::start();
        let handle: &FactorHandle = factor_in(&mut self.factor, self.integrals, &self.config)?;
        let s: ArrayView2<f64> = self.overlap.view();
        let config: &DfConfig = &self.config;
        let results: Vec<(Array2<f64>, Array2<f64>)> = dms
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|dm| jk_single(handle, s, dm, hermi, config))
            .collect::<Result<Vec<_>, DfError>>()?;
        for (idx, (j, k)) in results.into_iter().enumerate() {
            vj.index_axis_mut(Axis(0), idx).assign(&j);
            vk.index_axis_mut(Axis(0), idx).assign(&k);
        }
        print_jk_timing(n_dm, hermi, timer);
        Ok((vj, vk))
    }

    /// Dispatches on the dimensionality of `dms`: a matrix gives single J and K
    /// matrices, a stack of matrices gives stacks of the same length.
    pub fn get_jk_dyn(
        &mut self,
        dms: ArrayViewD<f64>,
        hermi: Hermiticity,
    ) -> Result<(ArrayD<f64>, ArrayD<f64>), DfError> {
        let shape_err = |err: ndarray::ShapeError| DfError::Shape(err.to_string());
        match dms.ndim() {
            2 => {
                let dm: ArrayView2<f64> = dms.into_dimensionality::<Ix2>().map_err(shape_err)?;
                let (vj, vk) = self.get_jk(dm, hermi)?;
                Ok((vj.into_dyn(), vk.into_dyn()))
            }
            3 => {
                let batch: ArrayView3<f64> =
                    dms.into_dimensionality::<Ix3>().map_err(shape_err)?;
                let (vj, vk) = self.get_jk_batch(batch, hermi)?;
                Ok((vj.into_dyn(), vk.into_dyn()))
            }
            ndim => Err(DfError::Shape(format!(
                "expected one or a stack of density matrices, got an array with {} axes",
                ndim
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::df::test_helpers::{chain, random_matrix};
    use ndarray::stack;

    fn batch() -> Array3<f64> {
        let matrices: Vec<Array2<f64>> = (0..3)
            .map(|seed| {
                let a: Array2<f64> = random_matrix(6, seed);
                &a + &a.t()
            })
            .collect();
        let views: Vec<ArrayView2<f64>> = matrices.iter().map(|m| m.view()).collect();
        stack(Axis(0), &views).unwrap()
    }

    #[test]
    fn batch_preserves_order() {
        let system = chain();
        let mut df = DensityFit::new(&system, DfConfig::default());
        let dms: Array3<f64> = batch();
        for hermi in [Hermiticity::Symmetric, Hermiticity::General] {
            let (vj, vk) = df.get_jk_batch(dms.view(), hermi).unwrap();
            assert_eq!(vj.dim(), (3, 6, 6));
            for (idx, dm) in dms.outer_iter().enumerate() {
                let (vj_single, vk_single) = df.get_jk(dm, hermi).unwrap();
                assert!(vj.index_axis(Axis(0), idx).abs_diff_eq(&vj_single, 1e-13));
                assert!(vk.index_axis(Axis(0), idx).abs_diff_eq(&vk_single, 1e-13));
            }
        }
    }

    #[test]
    fn factor_is_built_lazily_and_reused() {
        let system = chain();
        let mut config = DfConfig::default();
        config.max_memory = 0.0;
        let mut df = DensityFit::new(&system, config);
        assert!(!df.has_factor());
        let dm: Array2<f64> = Array2::eye(6);
        df.get_jk(dm.view(), Hermiticity::Symmetric).unwrap();
        assert!(df.has_factor());
        let path = df.factor().unwrap().scratch_path().unwrap().to_path_buf();
        df.get_jk_batch(batch().view(), Hermiticity::General).unwrap();
        assert_eq!(df.factor().unwrap().scratch_path().unwrap(), path.as_path());
        df.release_factor();
        assert!(!df.has_factor());
        assert!(!path.exists());
    }

    #[test]
    fn shape_errors_come_before_any_work() {
        let system = chain();
        let mut df = DensityFit::new(&system, DfConfig::default());
        let dm: Array2<f64> = Array2::eye(5);
        assert!(matches!(
            df.get_jk(dm.view(), Hermiticity::Symmetric),
            Err(DfError::Shape(_))
        ));
        let dms: Array3<f64> = Array3::zeros((2, 6, 5));
        assert!(matches!(
            df.get_jk_batch(dms.view(), Hermiticity::General),
            Err(DfError::Shape(_))
        ));
        assert!(!df.has_factor());
    }

    #[test]
    fn dynamic_dispatch_on_dimensionality() {
        let system = chain();
        let mut df = DensityFit::new(&system, DfConfig::default());
        let dms: Array3<f64> = batch();
        let (vj, vk) = df
            .get_jk_dyn(dms.view().into_dyn(), Hermiticity::Symmetric)
            .unwrap();
        assert_eq!(vj.shape(), &[3, 6, 6]);
        assert_eq!(vk.shape(), &[3, 6, 6]);
        let (vj, _) = df
            .get_jk_dyn(
                dms.index_axis(Axis(0), 1).into_dyn(),
                Hermiticity::Symmetric,
            )
            .unwrap();
        assert_eq!(vj.shape(), &[6, 6]);
        let too_many_axes: ArrayD<f64> = ArrayD::zeros(IxDyn(&[1, 1, 6, 6]));
        assert!(matches!(
            df.get_jk_dyn(too_many_axes.view(), Hermiticity::General),
            Err(DfError::Shape(_))
        ));
    }

    #[test]
    fn empty_batch() {
        let system = chain();
        let mut df = DensityFit::new(&system, DfConfig::default());
        let dms: Array3<f64> = Array3::zeros((0, 6, 6));
        let (vj, vk) = df.get_jk_batch(dms.view(), Hermiticity::General).unwrap();
        assert_eq!(vj.dim(), (0, 6, 6));
        assert_eq!(vk.dim(), (0, 6, 6));
    }
}
