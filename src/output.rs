//! The module responsible for writing output data to disk.
use crate::area::Area;
use crate::city::{City, Policy};
use crate::host::{Bid, HostID};
use crate::metrics::HostWealth;
use crate::place::PlaceID;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "citysim_results";

/// The output file name for the average ask price time series
const AVERAGE_PRICES_FILE_NAME: &str = "average_prices.csv";

/// The output file name for transactions
const TRANSACTIONS_FILE_NAME: &str = "transactions.csv";

/// The output file name for the end-of-run wealth table
const WEALTH_FILE_NAME: &str = "wealth.csv";

/// The output file name for per-place snapshots
const PLACES_FILE_NAME: &str = "debug_places.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data
///
/// # Arguments
///
/// * `output_dir` - The output directory to create/overwrite
/// * `allow_overwrite` - Whether to delete and recreate the folder if it is non-empty
///
/// # Returns
///
/// True if the output dir contained existing data that was deleted, false if not, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the average prices CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct AveragePriceRow {
    variant: Policy,
    step: u32,
    average_ask_price: f64,
}

/// Represents a row in the transactions CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TransactionRow {
    variant: Policy,
    step: u32,
    place_id: PlaceID,
    seller_id: HostID,
    buyer_id: HostID,
    spread: f64,
    bid_price: f64,
}

impl TransactionRow {
    /// Create a new [`TransactionRow`]
    fn new(variant: Policy, step: u32, tx: &Bid) -> Self {
        Self {
            variant,
            step,
            place_id: tx.place_id,
            seller_id: tx.seller_id,
            buyer_id: tx.buyer_id,
            spread: tx.spread.value(),
            bid_price: tx.bid_price.value(),
        }
    }
}

/// Represents a row in the wealth CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct WealthRow {
    variant: Policy,
    rank: usize,
    host_id: HostID,
    area_of_origin: Area,
    profits: f64,
    assets_value: f64,
    wealth: f64,
}

/// Represents a row in the per-place debug CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PlaceRow {
    variant: Policy,
    step: u32,
    place_id: PlaceID,
    owner_id: HostID,
    occupancy: f64,
    ask_price: f64,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    places_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        let file_path = output_path.join(PLACES_FILE_NAME);
        Ok(Self {
            places_writer: csv::Writer::from_path(file_path)?,
        })
    }

    /// Write a snapshot of every place to file
    fn write_places(&mut self, variant: Policy, city: &City) -> Result<()> {
        for place in city.places.values() {
            let row = PlaceRow {
                variant,
                step: city.step,
                place_id: place.id,
                owner_id: place.owner_id,
                occupancy: place.occupancy.value(),
                ask_price: place.ask_price().value(),
            };
            self.places_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.places_writer.flush()?;

        Ok(())
    }
}

/// An object for writing simulation results to file
pub struct DataWriter {
    average_prices_writer: csv::Writer<File>,
    transactions_writer: csv::Writer<File>,
    wealth_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            average_prices_writer: new_writer(AVERAGE_PRICES_FILE_NAME)?,
            transactions_writer: new_writer(TRANSACTIONS_FILE_NAME)?,
            wealth_writer: new_writer(WEALTH_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write the average ask price for a step
    pub fn write_average_price(
        &mut self,
        variant: Policy,
        step: u32,
        average_ask_price: f64,
    ) -> Result<()> {
        let row = AveragePriceRow {
            variant,
            step,
            average_ask_price,
        };
        self.average_prices_writer.serialize(row)?;

        Ok(())
    }

    /// Write the transactions carried out during a step
    pub fn write_transactions(
        &mut self,
        variant: Policy,
        step: u32,
        transactions: &[Bid],
    ) -> Result<()> {
        for tx in transactions {
            self.transactions_writer
                .serialize(TransactionRow::new(variant, step, tx))?;
        }

        Ok(())
    }

    /// Write the wealth table, which should already be ranked
    pub fn write_wealth(&mut self, variant: Policy, wealth: &[HostWealth]) -> Result<()> {
        for (rank, host) in wealth.iter().enumerate() {
            let row = WealthRow {
                variant,
                rank: rank + 1,
                host_id: host.host_id,
                area_of_origin: host.area_of_origin,
                profits: host.profits.value(),
                assets_value: host.assets_value.value(),
                wealth: host.wealth.value(),
            };
            self.wealth_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write debug information to CSV files
    pub fn write_debug_info(&mut self, variant: Policy, city: &City) -> Result<()> {
        if let Some(ref mut wtr) = self.debug_writer {
            wtr.write_places(variant, city)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.average_prices_writer.flush()?;
        self.transactions_writer.flush()?;
        self.wealth_writer.flush()?;
        if let Some(ref mut wtr) = self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}
