use crate::df::linalg::metric_cholesky;
use crate::df::logging::print_factor_info;
use crate::df::DfError;
use crate::integrals::AuxiliaryIntegrals;
use crate::io::DfConfig;
use crate::utils::{prange, Timer};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use ndarray::prelude::*;
use ndarray::CowArray;
use ndarray_linalg::{Diag, SolveTriangular, UPLO};
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const F64_SIZE: usize = std::mem::size_of::<f64>();

/// Storage of the Cholesky decomposed three-index integrals L[P, ij], with the
/// orbital pair ij packed as a lower triangle. The tensor is immutable once built,
/// so blocks can be read concurrently.
pub trait FactorStore: Send + Sync {
    fn nao(&self) -> usize;

    fn naux(&self) -> usize;

    fn npair(&self) -> usize {
        self.nao() * (self.nao() + 1) / 2
    }

    /// Rows [start, start + count) of the factor, shape [count, npair].
    fn load_block(&self, start: usize, count: usize) -> Result<CowArray<'_, f64, Ix2>, DfError>;

    fn is_in_core(&self) -> bool;

    /// Location of the scratch file, if the factor lives on disk.
    fn scratch_path(&self) -> Option<&Path> {
        None
    }
}

fn check_block(start: usize, count: usize, naux: usize) -> Result<(), DfError> {
    if start + count > naux {
        return Err(DfError::Shape(format!(
            "auxiliary block [{}, {}) exceeds the auxiliary dimension {}",
            start,
            start + count,
            naux
        )));
    }
    Ok(())
}

/// Solves L X = (P|ij) for a set of orbital pairs.
fn fit_pairs(l: &Array2<f64>, int3c: &Array2<f64>) -> Result<Array2<f64>, DfError> {
    l.solve_triangular(UPLO::Lower, Diag::NonUnit, int3c)
        .map_err(|err| DfError::numerical("fitting of the three-centre integrals failed", err))
}

/// The complete factor held in memory.
pub struct InCoreFactor {
    nao: usize,
    cderi: Array2<f64>,
}

impl InCoreFactor {
    pub fn new<I: AuxiliaryIntegrals + ?Sized>(
        integrals: &I,
        auxbasis: &str,
    ) -> Result<Self, DfError> {
        let nao: usize = integrals.nao();
        let npair: usize = nao * (nao + 1) / 2;
        let l: Array2<f64> = metric_cholesky(integrals.aux_metric(auxbasis)?.view())?;
        let int3c: Array2<f64> = integrals.three_center(auxbasis, 0..npair)?;
        let cderi: Array2<f64> = fit_pairs(&l, &int3c)?.as_standard_layout().into_owned();
        Ok(Self { nao, cderi })
    }
}

impl FactorStore for InCoreFactor {
    fn nao(&self) -> usize {
        self.nao
    }

    fn naux(&self) -> usize {
        self.cderi.nrows()
    }

    fn load_block(&self, start: usize, count: usize) -> Result<CowArray<'_, f64, Ix2>, DfError> {
        check_block(start, count, self.naux())?;
        Ok(CowArray::from(self.cderi.slice(s![start..start + count, ..])))
    }

    fn is_in_core(&self) -> bool {
        true
    }
}

/// The factor stored in a scratch file as little-endian f64 values in
/// [aux][pair] order. The file is deleted when the factor is dropped.
pub struct OutOfCoreFactor {
    nao: usize,
    naux: usize,
    file: NamedTempFile,
}

impl OutOfCoreFactor {
    /// Builds the factor chunk by chunk over the orbital pairs, so that at most
    /// `memory_budget` bytes of fitted integrals are held at once.
    pub fn new<I: AuxiliaryIntegrals + ?Sized>(
        integrals: &I,
        auxbasis: &str,
        memory_budget: f64,
        scratch_dir: Option<&Path>,
    ) -> Result<Self, DfError> {
        let nao: usize = integrals.nao();
        let npair: usize = nao * (nao + 1) / 2;
        let naux: usize = integrals.naux(auxbasis)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("cderi").suffix(".bin");
        let file: NamedTempFile = match scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|err| DfError::resource("unable to create the scratch file", err))?;
        file.as_file()
            .set_len((naux * npair * F64_SIZE) as u64)
            .map_err(|err| DfError::resource("unable to allocate the scratch file", err))?;

        let l: Array2<f64> = metric_cholesky(integrals.aux_metric(auxbasis)?.view())?;
        // the integrals and the fitted chunk are held at the same time
        let chunk: usize = ((memory_budget / (2.0 * (naux * F64_SIZE) as f64)) as usize)
            .clamp(1, npair.max(1));
        let mut writer: &File = file.as_file();
        let write_err = |err| DfError::resource("unable to write the scratch file", err);
        for (p0, p1) in prange(0, npair, chunk) {
            let int3c: Array2<f64> = integrals.three_center(auxbasis, p0..p1)?;
            let fitted: Array2<f64> = fit_pairs(&l, &int3c)?;
            let mut bytes: Vec<u8> = vec![0; (p1 - p0) * F64_SIZE];
            for (aux, row) in fitted.outer_iter().enumerate() {
                for (dst, value) in bytes.chunks_exact_mut(F64_SIZE).zip(row.iter()) {
                    LittleEndian::write_f64(dst, *value);
                }
                writer
                    .seek(SeekFrom::Start(((aux * npair + p0) * F64_SIZE) as u64))
                    .map_err(write_err)?;
                writer.write_all(&bytes).map_err(write_err)?;
            }
        }
        writer.flush().map_err(write_err)?;
        Ok(Self { nao, naux, file })
    }
}

impl FactorStore for OutOfCoreFactor {
    fn nao(&self) -> usize {
        self.nao
    }

    fn naux(&self) -> usize {
        self.naux
    }

    fn load_block(&self, start: usize, count: usize) -> Result<CowArray<'_, f64, Ix2>, DfError> {
        check_block(start, count, self.naux)?;
        let npair: usize = self.npair();
        let read_err = |err| DfError::resource("unable to read the scratch file", err);
        // every read uses its own file handle, no locking is needed
        let mut file: File = self.file.reopen().map_err(read_err)?;
        file.seek(SeekFrom::Start((start * npair * F64_SIZE) as u64))
            .map_err(read_err)?;
        let mut reader = BufReader::new(file);
        let mut data: Vec<f64> = vec![0.0; count * npair];
        reader
            .read_f64_into::<LittleEndian>(&mut data)
            .map_err(read_err)?;
        let block: Array2<f64> = Array2::from_shape_vec((count, npair), data)
            .map_err(|err| DfError::Shape(err.to_string()))?;
        Ok(CowArray::from(block))
    }

    fn is_in_core(&self) -> bool {
        false
    }

    fn scratch_path(&self) -> Option<&Path> {
        Some(self.file.path())
    }
}

/// Owner of the Cholesky factor for one basis and auxiliary basis.
pub struct FactorHandle {
    store: Box<dyn FactorStore>,
    auxbasis: String,
}

impl FactorHandle {
    /// Builds the Cholesky factor of the auxiliary basis `config.auxbasis`. The factor is
    /// kept in memory if nao (nao + 1) / 2 * naux * 8 bytes fit into the memory budget,
    /// otherwise it is written to a scratch file.
    pub fn obtain<I: AuxiliaryIntegrals + ?Sized>(
        integrals: &I,
        config: &DfConfig,
    ) -> Result<Self, DfError> {
        let timer: Timer = Timer::start();
        let nao: usize = integrals.nao();
        let naux: usize = integrals.naux(&config.auxbasis)?;
        let required: f64 = (nao * (nao + 1) / 2 * naux * F64_SIZE) as f64;
        let store: Box<dyn FactorStore> = if required < config.memory_budget() {
            Box::new(InCoreFactor::new(integrals, &config.auxbasis)?)
        } else {
            Box::new(OutOfCoreFactor::new(
                integrals,
                &config.auxbasis,
                config.memory_budget(),
                config.scratch_dir.as_deref().map(Path::new),
            )?)
        };
        let handle = Self {
            store,
            auxbasis: config.auxbasis.clone(),
        };
        print_factor_info(&handle, required, timer);
        Ok(handle)
    }

    pub fn nao(&self) -> usize {
        self.store.nao()
    }

    pub fn naux(&self) -> usize {
        self.store.naux()
    }

    pub fn npair(&self) -> usize {
        self.store.npair()
    }

    pub fn auxbasis(&self) -> &str {
        &self.auxbasis
    }

    pub fn is_in_core(&self) -> bool {
        self.store.is_in_core()
    }

    pub fn scratch_path(&self) -> Option<&Path> {
        self.store.scratch_path()
    }

    pub fn load_block(&self, start: usize, count: usize) -> Result<CowArray<'_, f64, Ix2>, DfError> {
        self.store.load_block(start, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrals::GaussianChain;

    fn chain() -> GaussianChain {
        GaussianChain::new(&[(1.0, -1.4), (8.0, 0.0), (1.0, 1.4)], 10)
    }

    fn config(max_memory: f64) -> DfConfig {
        let mut config = DfConfig::default();
        config.max_memory = max_memory;
        config
    }

    #[test]
    fn memory_budget_selects_storage() {
        let system = chain();
        let in_core = FactorHandle::obtain(&system, &config(100.0)).unwrap();
        assert!(in_core.is_in_core());
        assert!(in_core.scratch_path().is_none());
        let out_of_core = FactorHandle::obtain(&system, &config(0.0)).unwrap();
        assert!(!out_of_core.is_in_core());
        assert!(out_of_core.scratch_path().unwrap().exists());
        assert_eq!(out_of_core.nao(), 6);
        assert_eq!(out_of_core.naux(), 9);
        assert_eq!(out_of_core.npair(), 21);
    }

    #[test]
    fn both_stores_hold_the_same_factor() {
        let system = chain();
        let in_core = FactorHandle::obtain(&system, &config(100.0)).unwrap();
        // a budget of a few pairs forces several chunks during the build
        let out_of_core = FactorHandle::obtain(&system, &config(4.0e-4)).unwrap();
        assert!(!out_of_core.is_in_core());
        for (b0, b1) in prange(0, in_core.naux(), 4) {
            let a = in_core.load_block(b0, b1 - b0).unwrap();
            let b = out_of_core.load_block(b0, b1 - b0).unwrap();
            assert_eq!(a.dim(), (b1 - b0, 21));
            assert!(a.abs_diff_eq(&b, 1e-14));
        }
    }

    #[test]
    fn factor_reproduces_three_center_integrals() {
        let system = chain();
        let handle = FactorHandle::obtain(&system, &config(100.0)).unwrap();
        let cderi = handle.load_block(0, handle.naux()).unwrap();
        let l: Array2<f64> = metric_cholesky(system.aux_metric("weigend").unwrap().view()).unwrap();
        let int3c: Array2<f64> = system.three_center("weigend", 0..21).unwrap();
        assert!(l.dot(&cderi).abs_diff_eq(&int3c, 1e-10));
    }

    #[test]
    fn scratch_file_is_removed_with_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(0.0);
        cfg.scratch_dir = Some(dir.path().to_string_lossy().into_owned());
        let handle = FactorHandle::obtain(&chain(), &cfg).unwrap();
        let path = handle.scratch_path().unwrap().to_path_buf();
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.exists());
        drop(handle);
        assert!(!path.exists());
    }

    #[test]
    fn missing_scratch_directory_is_a_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(0.0);
        cfg.scratch_dir = Some(
            dir.path()
                .join("does_not_exist")
                .to_string_lossy()
                .into_owned(),
        );
        assert!(matches!(
            FactorHandle::obtain(&chain(), &cfg),
            Err(DfError::Resource { .. })
        ));
    }

    #[test]
    fn invalid_requests() {
        let system = chain();
        let handle = FactorHandle::obtain(&system, &config(0.0)).unwrap();
        assert!(matches!(handle.load_block(8, 2), Err(DfError::Shape(_))));
        let mut cfg = config(100.0);
        cfg.auxbasis = String::from("def2-svp-jkfit");
        assert!(matches!(
            FactorHandle::obtain(&system, &cfg),
            Err(DfError::AuxBasis(_))
        ));
    }
}
