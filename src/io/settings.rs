use crate::defaults::*;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_verbose() -> i8 {
    0
}
fn default_auxbasis() -> String {
    String::from(AUXBASIS)
}
fn default_max_memory() -> f64 {
    MAX_MEMORY
}
fn default_block_size() -> usize {
    BLOCKDIM
}
fn default_occdrop() -> f64 {
    OCCDROP
}
fn default_scratch_dir() -> Option<String> {
    None
}
fn default_number_of_cores() -> usize {
    1
}
fn default_df_config() -> DfConfig {
    DfConfig {
        auxbasis: default_auxbasis(),
        max_memory: default_max_memory(),
        block_size: default_block_size(),
        occdrop: default_occdrop(),
        scratch_dir: default_scratch_dir(),
    }
}
fn default_parallelization_config() -> ParallelizationConfig {
    ParallelizationConfig {
        number_of_cores: default_number_of_cores(),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Configuration {
    #[serde(default = "default_verbose")]
    pub verbose: i8,
    #[serde(default = "default_df_config")]
    pub df: DfConfig,
    #[serde(default = "default_parallelization_config")]
    pub parallelization: ParallelizationConfig,
}

impl Configuration {
    /// Reads the configuration file from the working directory. If it does not exist,
    /// the default settings are used and written to a new configuration file.
    pub fn new() -> Result<Self> {
        let config_file_path: &Path = Path::new(CONFIG_FILE_NAME);
        let config_string: String = if config_file_path.exists() {
            fs::read_to_string(config_file_path)
                .with_context(|| format!("Unable to read config file {}", CONFIG_FILE_NAME))?
        } else {
            String::from("")
        };
        let config: Self = toml::from_str(&config_string)
            .with_context(|| format!("Unable to parse config file {}", CONFIG_FILE_NAME))?;
        // save the configuration file if it does not exist already
        if !config_file_path.exists() {
            let config_string: String =
                toml::to_string(&config).context("Unable to serialize the configuration")?;
            fs::write(config_file_path, config_string)
                .with_context(|| format!("Unable to write config file {}", CONFIG_FILE_NAME))?;
        }
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_string: String = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Unable to read config file {:?}", path.as_ref()))?;
        toml::from_str(&config_string)
            .with_context(|| format!("Unable to parse config file {:?}", path.as_ref()))
    }
}

/// Settings of the density fitted J/K build.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DfConfig {
    #[serde(default = "default_auxbasis")]
    pub auxbasis: String,
    /// memory budget in MB
    #[serde(default = "default_max_memory")]
    pub max_memory: f64,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default = "default_occdrop")]
    pub occdrop: f64,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: Option<String>,
}

impl DfConfig {
    /// Memory budget in bytes.
    pub fn memory_budget(&self) -> f64 {
        self.max_memory * 1.0e6
    }
}

impl Default for DfConfig {
    fn default() -> Self {
        default_df_config()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct ParallelizationConfig {
    #[serde(default = "default_number_of_cores")]
    pub number_of_cores: usize,
}
