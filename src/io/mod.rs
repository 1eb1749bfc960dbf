mod imprint;
mod model;
pub(crate) mod settings;

pub use imprint::{write_footer, write_header};
pub use model::{read_model, ModelInput};
pub use settings::{Configuration, DfConfig, ParallelizationConfig};
