//! Places are the cells of the city grid: rentable properties with a nightly rate.
use crate::area::{Area, AreaRates, get_rate_range};
use crate::host::HostID;
use crate::id::{define_id_getter, define_id_type};
use crate::model::parameters::check_occupancy_range;
use crate::model::{NIGHTS_PER_MONTH, OccupancyModel, OccupancyRange};
use crate::units::{Money, MoneyPerNight, Nights};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use rand::Rng;
use std::collections::BTreeMap;

define_id_type! {PlaceID}

/// A map of places, keyed by place ID
pub type PlaceMap = IndexMap<PlaceID, Place>;

/// Offsets to the (up to) eight cells surrounding a cell
const NEIGHBOUR_OFFSETS: [(i64, i64); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
];

/// Parameters controlling how occupancy is updated each step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancyParameters {
    /// Which occupancy formula to use
    pub model: OccupancyModel,
    /// Nights booked for places priced above their area's average
    pub low: OccupancyRange,
    /// Nights booked for places priced at or below their area's average
    pub high: OccupancyRange,
}

impl OccupancyParameters {
    /// Check that both occupancy ranges are non-empty and fit within a month
    pub fn validate(&self) -> Result<()> {
        check_occupancy_range("low_occupancy", self.low)?;
        check_occupancy_range("high_occupancy", self.high)?;

        Ok(())
    }
}

/// The ask prices a place has had, keyed by the step at which they were recorded.
///
/// Entries are never removed or overwritten. The current ask price is the most recent entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory(BTreeMap<u32, Money>);

impl PriceHistory {
    /// Create a new history with the initial ask price recorded at step 0
    pub fn new(initial_ask_price: Money) -> Self {
        Self(BTreeMap::from([(0, initial_ask_price)]))
    }

    /// The most recently recorded price
    pub fn latest(&self) -> Money {
        *self
            .0
            .values()
            .next_back()
            .expect("Price history always contains the initial price")
    }

    /// The step at which the most recent price was recorded
    pub fn latest_step(&self) -> u32 {
        *self
            .0
            .keys()
            .next_back()
            .expect("Price history always contains the initial price")
    }

    /// Record a new price. The step must be later than any already recorded.
    pub fn record(&mut self, step: u32, price: Money) -> Result<()> {
        let latest_step = self.latest_step();
        ensure!(
            step > latest_step,
            "Cannot record price at step {step}: a price was already recorded at step \
            {latest_step}"
        );
        self.0.insert(step, price);

        Ok(())
    }

    /// Iterate over the recorded `(step, price)` pairs in step order
    pub fn iter(&self) -> impl Iterator<Item = (u32, Money)> + '_ {
        self.0.iter().map(|(step, price)| (*step, *price))
    }

    /// The number of recorded prices
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false, as a history holds at least the initial price
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A rentable property occupying one cell of the grid
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    /// Unique identifier, equal to the cell's row-major position
    pub id: PlaceID,
    /// The host who currently owns this place
    pub owner_id: HostID,
    /// The quadrant the place is in
    pub area: Area,
    /// The nightly rate. Fixed once the place is set up.
    pub rate: MoneyPerNight,
    /// IDs of adjacent places, including diagonals
    pub neighbours: Vec<PlaceID>,
    /// Nights booked during the current month
    pub occupancy: Nights,
    /// Ask prices recorded so far
    pub price_history: PriceHistory,
}
define_id_getter! {Place, PlaceID}

impl Place {
    /// Create and set up the place for a grid cell.
    ///
    /// The area is derived from the cell's position, a nightly rate is drawn uniformly from that
    /// area's rate range and the initial ask price (the rate multiplied by
    /// `initial_price_multiplier`) is recorded at step 0.
    ///
    /// # Arguments
    ///
    /// * `id` - The place's ID (its row-major position in the grid)
    /// * `owner_id` - The host who initially owns the place
    /// * `grid_size` - Side length of the grid
    /// * `area_rates` - Rate ranges for each area
    /// * `initial_price_multiplier` - Ratio of initial ask price to nightly rate
    /// * `rng` - Random number generator used to draw the rate
    pub fn setup<R: Rng + ?Sized>(
        id: PlaceID,
        owner_id: HostID,
        grid_size: u32,
        area_rates: &AreaRates,
        initial_price_multiplier: f64,
        rng: &mut R,
    ) -> Result<Self> {
        ensure!(grid_size > 0, "Grid size must be greater than zero");
        ensure!(
            u64::from(id.0) < u64::from(grid_size) * u64::from(grid_size),
            "Place {id} is outside a grid of size {grid_size}"
        );

        let row = id.0 / grid_size;
        let col = id.0 % grid_size;
        let area = Area::from_grid_position(row, col, grid_size);

        let range = get_rate_range(area_rates, area)?;
        let rate = MoneyPerNight(rng.gen_range(range.min()..=range.max()) as f64);
        let initial_ask_price = Money(rate.value() * initial_price_multiplier);

        Ok(Self {
            id,
            owner_id,
            area,
            rate,
            neighbours: neighbours_of(row, col, grid_size),
            occupancy: Nights(0.0),
            price_history: PriceHistory::new(initial_ask_price),
        })
    }

    /// Update the number of nights booked this month.
    ///
    /// Places priced above their area's average rate are booked less.
    pub fn update_occupancy<R: Rng + ?Sized>(
        &mut self,
        area_average_rate: MoneyPerNight,
        parameters: &OccupancyParameters,
        rng: &mut R,
    ) {
        self.occupancy = match parameters.model {
            OccupancyModel::Nights => {
                let range = if self.rate > area_average_rate {
                    parameters.low
                } else {
                    parameters.high
                };
                Nights(rng.gen_range(range.0..=range.1) as f64)
            }
            OccupancyModel::Ratio => {
                Nights(NIGHTS_PER_MONTH as f64) * occupancy_ratio(self.rate, area_average_rate)
            }
        };
    }

    /// The gross income from this place for the current month
    pub fn monthly_earnings(&self) -> Money {
        self.rate * self.occupancy
    }

    /// The current market valuation of this place, i.e. its most recently recorded price
    pub fn ask_price(&self) -> Money {
        self.price_history.latest()
    }

    /// Record that the place was sold at the given step, which sets its new ask price
    pub fn record_sale(&mut self, step: u32, price: Money) -> Result<()> {
        self.price_history.record(step, price)
    }
}

/// Fraction of the month a place is booked, given its rate and its area's average rate.
///
/// Cheaper places are booked more. The result is clamped to lie between 0.2 and 1.
fn occupancy_ratio(rate: MoneyPerNight, area_average_rate: MoneyPerNight) -> f64 {
    let rate_ratio = if area_average_rate > MoneyPerNight(0.0) {
        rate / area_average_rate
    } else {
        1.0
    };

    (1.2 - rate_ratio).clamp(0.2, 1.0)
}

/// Get the IDs of the cells surrounding the given cell which lie inside the grid
fn neighbours_of(row: u32, col: u32, grid_size: u32) -> Vec<PlaceID> {
    let size = i64::from(grid_size);
    NEIGHBOUR_OFFSETS
        .iter()
        .map(|(dr, dc)| (i64::from(row) + dr, i64::from(col) + dc))
        .filter(|(r, c)| (0..size).contains(r) && (0..size).contains(c))
        .map(|(r, c)| PlaceID((r * size + c) as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::RateRange;
    use crate::fixture::{area_rates, assert_error, occupancy_parameters, rng};
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;
    use std::collections::HashSet;

    fn setup_grid(grid_size: u32, area_rates: &AreaRates, rng: &mut ChaCha8Rng) -> Vec<Place> {
        (0..grid_size * grid_size)
            .map(|id| {
                Place::setup(PlaceID(id), HostID(id), grid_size, area_rates, 900.0, rng).unwrap()
            })
            .collect()
    }

    #[rstest]
    fn test_setup_rate_within_range(area_rates: AreaRates, mut rng: ChaCha8Rng) {
        for place in setup_grid(10, &area_rates, &mut rng) {
            assert!(area_rates[&place.area].contains(place.rate));
            assert_eq!(place.rate.value().fract(), 0.0);
            assert_eq!(place.ask_price(), Money(place.rate.value() * 900.0));
            assert_eq!(place.price_history.len(), 1);
            assert_eq!(place.occupancy, Nights(0.0));
        }
    }

    #[rstest]
    fn test_setup_area_matches_position(area_rates: AreaRates, mut rng: ChaCha8Rng) {
        for place in setup_grid(7, &area_rates, &mut rng) {
            let expected = Area::from_grid_position(place.id.0 / 7, place.id.0 % 7, 7);
            assert_eq!(place.area, expected);
        }
    }

    #[rstest]
    fn test_setup_missing_area_rate(mut area_rates: AreaRates, mut rng: ChaCha8Rng) {
        area_rates.shift_remove(&Area::TopLeft);
        assert_error!(
            Place::setup(PlaceID(0), HostID(0), 4, &area_rates, 900.0, &mut rng),
            "No rate range provided for area top_left"
        );
    }

    #[rstest]
    fn test_setup_out_of_grid(area_rates: AreaRates, mut rng: ChaCha8Rng) {
        assert_error!(
            Place::setup(PlaceID(4), HostID(4), 2, &area_rates, 900.0, &mut rng),
            "Place 4 is outside a grid of size 2"
        );
    }

    #[rstest]
    #[case(0, 3)] // corner
    #[case(8, 3)] // corner
    #[case(1, 5)] // top edge
    #[case(3, 5)] // left edge
    #[case(4, 8)] // interior
    fn test_neighbour_counts_3x3(#[case] id: u32, #[case] expected: usize) {
        assert_eq!(neighbours_of(id / 3, id % 3, 3).len(), expected);
    }

    #[test]
    fn test_neighbours_2x2() {
        let neighbours = neighbours_of(0, 0, 2).into_iter().sorted().collect_vec();
        assert_eq!(neighbours, [PlaceID(1), PlaceID(2), PlaceID(3)]);
    }

    #[test]
    fn test_neighbours_1x1() {
        assert!(neighbours_of(0, 0, 1).is_empty());
    }

    #[rstest]
    fn test_neighbours_symmetric(area_rates: AreaRates, mut rng: ChaCha8Rng) {
        let places = setup_grid(6, &area_rates, &mut rng);
        for place in &places {
            let unique: HashSet<_> = place.neighbours.iter().collect();
            assert_eq!(unique.len(), place.neighbours.len());
            assert!(!place.neighbours.contains(&place.id));

            for neighbour_id in &place.neighbours {
                let neighbour = &places[neighbour_id.0 as usize];
                assert!(neighbour.neighbours.contains(&place.id));
            }
        }
    }

    #[rstest]
    fn test_update_occupancy_nights(
        occupancy_parameters: OccupancyParameters,
        mut rng: ChaCha8Rng,
    ) {
        let mut area_rates = AreaRates::new();
        for area in [
            Area::TopLeft,
            Area::TopRight,
            Area::BottomLeft,
            Area::BottomRight,
        ] {
            area_rates.insert(area, RateRange(150, 150));
        }
        let mut place =
            Place::setup(PlaceID(0), HostID(0), 2, &area_rates, 900.0, &mut rng).unwrap();

        // Priced above average: low occupancy range
        for _ in 0..50 {
            place.update_occupancy(MoneyPerNight(100.0), &occupancy_parameters, &mut rng);
            assert!(place.occupancy >= Nights(5.0) && place.occupancy <= Nights(15.0));
        }

        // Priced at average: high occupancy range
        for _ in 0..50 {
            place.update_occupancy(MoneyPerNight(150.0), &occupancy_parameters, &mut rng);
            assert!(place.occupancy >= Nights(10.0) && place.occupancy <= Nights(20.0));
            assert_eq!(
                place.monthly_earnings(),
                Money(150.0 * place.occupancy.value())
            );
        }
    }

    #[rstest]
    #[case(100.0, 100.0, 0.2)]
    #[case(50.0, 100.0, 0.7)]
    #[case(10.0, 100.0, 1.0)]
    #[case(200.0, 100.0, 0.2)]
    #[case(100.0, 0.0, 0.2)] // neutral ratio when there is no average
    fn test_occupancy_ratio(#[case] rate: f64, #[case] average: f64, #[case] expected: f64) {
        assert_approx_eq!(
            f64,
            occupancy_ratio(MoneyPerNight(rate), MoneyPerNight(average)),
            expected
        );
    }

    #[rstest]
    fn test_update_occupancy_ratio(
        area_rates: AreaRates,
        mut occupancy_parameters: OccupancyParameters,
        mut rng: ChaCha8Rng,
    ) {
        occupancy_parameters.model = OccupancyModel::Ratio;
        let mut place =
            Place::setup(PlaceID(0), HostID(0), 2, &area_rates, 900.0, &mut rng).unwrap();
        let average = MoneyPerNight(place.rate.value() * 2.0);
        place.update_occupancy(average, &occupancy_parameters, &mut rng);
        assert_approx_eq!(f64, place.occupancy.value(), 0.7 * 30.0);
    }

    #[test]
    fn test_price_history() {
        let mut history = PriceHistory::new(Money(90000.0));
        assert_eq!(history.latest(), Money(90000.0));
        assert_eq!(history.latest_step(), 0);

        history.record(3, Money(120_000.0)).unwrap();
        history.record(7, Money(80000.0)).unwrap();
        assert_eq!(history.latest(), Money(80000.0));
        assert_eq!(
            history.iter().collect_vec(),
            [
                (0, Money(90000.0)),
                (3, Money(120_000.0)),
                (7, Money(80000.0))
            ]
        );

        // Earlier entries cannot be overwritten
        assert_error!(
            history.record(7, Money(1.0)),
            "Cannot record price at step 7: a price was already recorded at step 7"
        );
        assert_eq!(history.len(), 3);
    }
}
