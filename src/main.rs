use anyhow::{Context, Result};
use clap::{crate_name, crate_version, App, Arg};
use dfjk::df::{core_guess_density, electronic_energy, DensityFit, Hermiticity};
use dfjk::integrals::{AuxiliaryIntegrals, GaussianChain};
use dfjk::io::{read_model, write_footer, write_header, Configuration, ModelInput};
use dfjk::utils::Timer;
use env_logger::Builder;
use log::{info, LevelFilter};
use ndarray::prelude::*;
use ndarray_stats::DeviationExt;
use std::io::Write;

fn main() -> Result<()> {
    // Input.
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .about("density fitted Coulomb and exchange matrices")
        .arg(
            Arg::new("model-File")
                .about("Sets the model file to use")
                .required(true)
                .index(1),
        )
        .get_matches();
    let model_file: &str = matches
        .value_of("model-File")
        .context("No model file was given")?;
    let model: ModelInput = read_model(model_file)?;
    let config: Configuration = Configuration::new()?;

    // Multithreading.
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallelization.number_of_cores)
        .build_global()
        .context("Unable to build the rayon thread pool")?;

    // Logging.
    let log_level: LevelFilter = match config.verbose {
        2 => LevelFilter::Trace,
        1 => LevelFilter::Debug,
        0 => LevelFilter::Info,
        -1 => LevelFilter::Warn,
        -2 => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    Builder::new()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .filter(None, log_level)
        .init();

    write_header();
    let timer: Timer = Timer::start();

    // Computations.
    // ................................................................
    let system: GaussianChain = GaussianChain::from(&model);
    let h: Array2<f64> = system.hcore();
    let mut df = DensityFit::new(&system, config.df.clone());
    let dm: Array2<f64> = core_guess_density(h.view(), df.overlap(), system.n_occ())?;

    let (vj, vk) = df.get_jk(dm.view(), Hermiticity::Symmetric)?;
    let (vj_general, vk_general) = df.get_jk(dm.view(), Hermiticity::General)?;
    let j_deviation: f64 = vj.linf_dist(&vj_general)?;
    let k_deviation: f64 = vk.linf_dist(&vk_general)?;

    let veff: Array2<f64> = &vj - &(0.5 * &vk);
    let e_coulomb: f64 = 0.5 * (&dm * &vj).sum();
    let e_exchange: f64 = -0.25 * (&dm * &vk).sum();
    let e_elec: f64 = electronic_energy(h.view(), dm.view(), veff.view());
    let e_nuc: f64 = system.nuclear_repulsion();

    info!("{:^80}", "");
    info!("{: ^80}", "Core Guess Energies");
    info!("{:-^80}", "");
    info!("{: <25} {}", "orbital functions:", system.nao());
    info!("{: <25} {}", "occupied orbitals:", system.n_occ());
    info!("{: <25} {:>18.12} Hartree", "Coulomb energy:", e_coulomb);
    info!("{: <25} {:>18.12} Hartree", "exchange energy:", e_exchange);
    info!("{: <25} {:>18.12} Hartree", "electronic energy:", e_elec);
    info!("{: <25} {:>18.12} Hartree", "nuclear repulsion:", e_nuc);
    info!("{: <25} {:>18.12} Hartree", "total energy:", e_elec + e_nuc);
    info!("{: <25} {:>18.3e}", "max |J_sym - J_gen|:", j_deviation);
    info!("{: <25} {:>18.3e}", "max |K_sym - K_gen|:", k_deviation);
    info!("{:-^80}", "");
    // ................................................................

    df.release_factor();
    write_footer(timer);
    Ok(())
}
