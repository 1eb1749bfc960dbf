use crate::df::cderi::FactorHandle;
use crate::df::density::Hermiticity;
use crate::utils::Timer;
use log::{debug, info};

pub fn print_factor_info(handle: &FactorHandle, required_bytes: f64, timer: Timer) {
    info!("{:^80}", "");
    info!("{: ^80}", "Density Fitting");
    info!("{:-^80}", "");
    info!("{: <25} {}", "auxiliary basis:", handle.auxbasis());
    info!("{: <25} {}", "orbital functions:", handle.nao());
    info!("{: <25} {}", "auxiliary functions:", handle.naux());
    info!(
        "{: <25} {:.3} MB",
        "size of the factor:",
        required_bytes * 1.0e-6
    );
    match handle.scratch_path() {
        Some(path) => info!("{: <25} {}", "factor stored in:", path.display()),
        None => info!("{: <25} {}", "factor stored in:", "memory"),
    }
    info!("{}", timer);
    info!("{:-^80}", "");
}

pub fn print_jk_timing(n_dm: usize, hermi: Hermiticity, timer: Timer) {
    debug!(
        "{: <25} {} density matrices, {:?}",
        "vj and vk:",
        n_dm,
        hermi
    );
    debug!("{}", timer);
}
