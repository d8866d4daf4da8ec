//! Fixtures for tests
use crate::area::{Area, AreaRates, RateRange};
use crate::city::{City, CityConfig, Policy};
use crate::model::{OccupancyModel, OccupancyRange};
use crate::place::OccupancyParameters;
use indexmap::indexmap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rstest::fixture;
use strum::IntoEnumIterator;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

#[fixture]
pub fn area_rates() -> AreaRates {
    indexmap! {
        Area::TopLeft => RateRange(100, 200),
        Area::TopRight => RateRange(50, 250),
        Area::BottomLeft => RateRange(250, 350),
        Area::BottomRight => RateRange(150, 450),
    }
}

#[fixture]
pub fn occupancy_parameters() -> OccupancyParameters {
    OccupancyParameters {
        model: OccupancyModel::Nights,
        low: OccupancyRange(5, 15),
        high: OccupancyRange(10, 20),
    }
}

/// A 2x2 city in which every place has a nightly rate of 100
#[fixture]
pub fn city_config_2x2(occupancy_parameters: OccupancyParameters) -> CityConfig {
    CityConfig {
        grid_size: 2,
        area_rates: Area::iter().map(|area| (area, RateRange(100, 100))).collect(),
        seed: 42,
        policy: Policy::Baseline,
        initial_price_multiplier: 900.0,
        occupancy: occupancy_parameters,
    }
}

#[fixture]
pub fn city_2x2(city_config_2x2: CityConfig) -> City {
    let mut city = City::new(city_config_2x2);
    city.initialize().unwrap();
    city
}
