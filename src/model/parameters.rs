//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::area::{AreaRates, check_area_rates};
use crate::city::{CityConfig, MAX_GRID_SIZE, Policy};
use crate::input::{input_err_msg, read_toml};
use crate::place::OccupancyParameters;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_num_steps, u32, 180);
define_param_default!(default_seed, u64, 42);
define_param_default!(default_initial_price_multiplier, f64, 900.0);
define_param_default!(default_low_occupancy, OccupancyRange, OccupancyRange(5, 15));
define_param_default!(default_high_occupancy, OccupancyRange, OccupancyRange(10, 20));
define_param_default!(
    default_variants,
    Vec<Policy>,
    vec![Policy::Baseline, Policy::LocalOnly]
);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Side length of the square city grid
    pub grid_size: u32,
    /// Number of monthly steps to simulate (180 is 15 years)
    #[serde(default = "default_num_steps")]
    pub num_steps: u32,
    /// Seed for the random number generator. Each variant gets its own generator seeded with
    /// this value.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// The bidding policies to simulate, in order
    #[serde(default = "default_variants")]
    pub variants: Vec<Policy>,
    /// How occupancy is derived from a place's rate
    #[serde(default)]
    pub occupancy_model: OccupancyModel,
    /// A place's initial ask price is its nightly rate multiplied by this
    #[serde(default = "default_initial_price_multiplier")]
    pub initial_price_multiplier: f64,
    /// Nights booked per month for places priced above their area's average
    #[serde(default = "default_low_occupancy")]
    pub low_occupancy: OccupancyRange,
    /// Nights booked per month for places priced at or below their area's average
    #[serde(default = "default_high_occupancy")]
    pub high_occupancy: OccupancyRange,
    /// Range of nightly rates for each area
    pub area_rates: AreaRates,
}

/// The formula used for updating occupancy each step
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Clone, Copy, Default)]
pub enum OccupancyModel {
    /// Draw a whole number of nights from the low or high occupancy range
    #[default]
    #[string = "nights"]
    Nights,
    /// Derive a continuous occupancy ratio from the rate relative to the area's average
    #[string = "ratio"]
    Ratio,
}

/// An inclusive range of nights booked per month, written as `[min, max]` in the model file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct OccupancyRange(pub u32, pub u32);

/// The maximum number of nights in a month
pub const NIGHTS_PER_MONTH: u32 = 30;

/// Check that the `grid_size` parameter is valid
fn check_grid_size(grid_size: u32) -> Result<()> {
    ensure!(grid_size > 0, "grid_size must be greater than zero");
    ensure!(
        grid_size <= MAX_GRID_SIZE,
        "grid_size cannot exceed {MAX_GRID_SIZE}"
    );

    Ok(())
}

/// Check that the `num_steps` parameter is valid
fn check_num_steps(num_steps: u32) -> Result<()> {
    ensure!(num_steps > 0, "num_steps cannot be zero");

    Ok(())
}

/// Check that the `variants` parameter is valid
fn check_variants(variants: &[Policy]) -> Result<()> {
    ensure!(!variants.is_empty(), "`variants` is empty");
    ensure!(
        variants.iter().all_unique(),
        "`variants` cannot contain duplicate entries"
    );

    Ok(())
}

/// Check the `initial_price_multiplier` parameter is valid
fn check_initial_price_multiplier(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "initial_price_multiplier must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that an occupancy range is non-empty and fits within a month
pub fn check_occupancy_range(name: &str, range: OccupancyRange) -> Result<()> {
    ensure!(
        range.0 <= range.1,
        "{name} has min ({}) greater than max ({})",
        range.0,
        range.1
    );
    ensure!(
        range.1 <= NIGHTS_PER_MONTH,
        "{name} cannot exceed {NIGHTS_PER_MONTH} nights"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_grid_size(self.grid_size)?;
        check_num_steps(self.num_steps)?;
        check_variants(&self.variants)?;
        check_initial_price_multiplier(self.initial_price_multiplier)?;
        check_occupancy_range("low_occupancy", self.low_occupancy)?;
        check_occupancy_range("high_occupancy", self.high_occupancy)?;
        check_area_rates(&self.area_rates)?;

        Ok(())
    }

    /// The configuration for a city simulating the given policy
    pub fn city_config(&self, policy: Policy) -> CityConfig {
        CityConfig {
            grid_size: self.grid_size,
            area_rates: self.area_rates.clone(),
            seed: self.seed,
            policy,
            initial_price_multiplier: self.initial_price_multiplier,
            occupancy: OccupancyParameters {
                model: self.occupancy_model,
                low: self.low_occupancy,
                high: self.high_occupancy,
            },
        }
    }
}
