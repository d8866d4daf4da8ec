//! The model represents the static input data provided by the user.
use crate::city::Policy;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub mod parameters;
pub use parameters::{ModelParameters, NIGHTS_PER_MONTH, OccupancyModel, OccupancyRange};

/// Model definition
#[derive(Debug, PartialEq)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let parameters = ModelParameters::from_path(&model_dir)?;

        Ok(Model {
            model_path: model_dir.as_ref().to_path_buf(),
            parameters,
        })
    }

    /// Iterate over the policy variants to be simulated, in order
    pub fn iter_variants(&self) -> impl Iterator<Item = Policy> + '_ {
        self.parameters.variants.iter().copied()
    }
}
