//! Areas are the four quadrants the city grid is divided into.
//!
//! Each area has its own range of nightly rates, which is used when places are set up.
use crate::units::MoneyPerNight;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// One of the four quadrants of the city grid
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Area {
    /// Rows and columns both below the midpoint
    TopLeft,
    /// Row below the midpoint, column at or beyond it
    TopRight,
    /// Row at or beyond the midpoint, column below it
    BottomLeft,
    /// Rows and columns both at or beyond the midpoint
    BottomRight,
}

impl Area {
    /// Classify a grid cell by comparing its row and column to the grid midpoint.
    ///
    /// The midpoint is `grid_size / 2` (integer division), so for odd-sized grids the bottom and
    /// right areas are one row/column larger than the top and left ones.
    pub fn from_grid_position(row: u32, col: u32, grid_size: u32) -> Self {
        let mid = grid_size / 2;
        match (row < mid, col < mid) {
            (true, true) => Self::TopLeft,
            (true, false) => Self::TopRight,
            (false, true) => Self::BottomLeft,
            (false, false) => Self::BottomRight,
        }
    }
}

/// An inclusive range of integer nightly rates, written as `[min, max]` in the model file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRange(pub u32, pub u32);

impl RateRange {
    /// The lowest rate in the range
    pub fn min(self) -> u32 {
        self.0
    }

    /// The highest rate in the range
    pub fn max(self) -> u32 {
        self.1
    }

    /// Whether `rate` lies within the range
    pub fn contains(self, rate: MoneyPerNight) -> bool {
        rate >= MoneyPerNight(self.0 as f64) && rate <= MoneyPerNight(self.1 as f64)
    }
}

/// The rate ranges for each area
pub type AreaRates = IndexMap<Area, RateRange>;

/// Look up the rate range for an area, failing if the model didn't provide one
pub fn get_rate_range(area_rates: &AreaRates, area: Area) -> Result<RateRange> {
    area_rates
        .get(&area)
        .copied()
        .with_context(|| format!("No rate range provided for area {area}"))
}

/// Check that every area has a valid rate range
pub fn check_area_rates(area_rates: &AreaRates) -> Result<()> {
    for area in Area::iter() {
        let range = get_rate_range(area_rates, area)?;
        ensure!(
            range.min() <= range.max(),
            "Rate range for area {area} has min ({}) greater than max ({})",
            range.min(),
            range.max()
        );
    }

    Ok(())
}
