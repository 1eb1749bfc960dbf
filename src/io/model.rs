use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// An atom of the one-dimensional model chain.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct AtomInput {
    pub charge: f64,
    pub position: f64,
}

/// Input file of the command line program: the atoms of the chain and the number
/// of electrons of the closed-shell reference.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelInput {
    pub n_electrons: usize,
    pub atoms: Vec<AtomInput>,
}

impl ModelInput {
    fn check(&self) -> Result<()> {
        if self.atoms.is_empty() {
            bail!("The model contains no atoms");
        }
        if self.n_electrons % 2 != 0 {
            bail!(
                "Only closed-shell references are supported, got {} electrons",
                self.n_electrons
            );
        }
        if let Some(atom) = self.atoms.iter().find(|atom| atom.charge <= 0.0) {
            bail!("Nuclear charges have to be positive, got {}", atom.charge);
        }
        Ok(())
    }
}

pub fn read_model<P: AsRef<Path>>(path: P) -> Result<ModelInput> {
    let input_string: String = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Unable to read model file {:?}", path.as_ref()))?;
    let input: ModelInput = toml::from_str(&input_string)
        .with_context(|| format!("Unable to parse model file {:?}", path.as_ref()))?;
    input.check()?;
    Ok(input)
}
