//! The city owns all places and hosts and runs the monthly simulation steps.
//!
//! Each step runs in a fixed order:
//!
//! 1. Occupancy is updated for every place
//! 2. Every host's profits are updated with the month's earnings
//! 3. The market is cleared: bids are collected, approved and executed
use crate::area::{Area, AreaRates, check_area_rates};
use crate::host::{Bid, Host, HostID, HostMap};
use crate::id::HasID;
use crate::place::{OccupancyParameters, Place, PlaceID, PlaceMap};
use crate::units::{Money, MoneyPerNight};
use anyhow::{Context, Result, ensure};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use strum::{Display, EnumIter, IntoEnumIterator};

/// The largest grid side length for which every place ID fits in a `u32`
pub const MAX_GRID_SIZE: u32 = 65_535;

/// The average rate used for an area with no places in it
pub const DEFAULT_AREA_AVERAGE_RATE: MoneyPerNight = MoneyPerNight(100.0);

/// The bidding policy hosts follow
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Policy {
    /// Hosts may bid for any neighbouring place (V0)
    Baseline,
    /// Hosts may only bid for neighbouring places in their area of origin (V1)
    LocalOnly,
}

/// Everything needed to construct a [`City`]
#[derive(Debug, Clone, PartialEq)]
pub struct CityConfig {
    /// Side length of the grid
    pub grid_size: u32,
    /// Range of nightly rates for each area
    pub area_rates: AreaRates,
    /// Seed for the city's random number generator
    pub seed: u64,
    /// The bidding policy
    pub policy: Policy,
    /// Ratio of a place's initial ask price to its nightly rate
    pub initial_price_multiplier: f64,
    /// How occupancy is updated
    pub occupancy: OccupancyParameters,
}

/// A grid of places and the hosts who own them
#[derive(Debug, Clone)]
pub struct City {
    /// Side length of the grid
    pub size: u32,
    /// Range of nightly rates for each area
    pub area_rates: AreaRates,
    /// All places, keyed by ID
    pub places: PlaceMap,
    /// All hosts, keyed by ID
    pub hosts: HostMap,
    /// The current step (month). Zero until the first iteration.
    pub step: u32,
    /// The bidding policy
    pub policy: Policy,
    initial_price_multiplier: f64,
    occupancy: OccupancyParameters,
    rng: ChaCha8Rng,
}

impl City {
    /// Create a new, empty city. Call [`City::initialize`] to populate it.
    pub fn new(config: CityConfig) -> Self {
        Self {
            size: config.grid_size,
            area_rates: config.area_rates,
            places: PlaceMap::new(),
            hosts: HostMap::new(),
            step: 0,
            policy: config.policy,
            initial_price_multiplier: config.initial_price_multiplier,
            occupancy: config.occupancy,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Create all places and hosts.
    ///
    /// One place is created for every grid cell and each place is given its own host, so that
    /// host `i` initially owns place `i`. This can only be done once. The city's configuration is
    /// checked first, so that invalid rate or occupancy ranges are reported as errors.
    pub fn initialize(&mut self) -> Result<()> {
        ensure!(self.places.is_empty(), "City has already been initialised");
        ensure!(self.size > 0, "Grid size must be greater than zero");
        let num_places = self
            .size
            .checked_mul(self.size)
            .with_context(|| format!("Grid size {} is too large", self.size))?;
        check_area_rates(&self.area_rates)?;
        self.occupancy.validate()?;

        for id in 0..num_places {
            let place = Place::setup(
                PlaceID(id),
                HostID(id),
                self.size,
                &self.area_rates,
                self.initial_price_multiplier,
                &mut self.rng,
            )?;
            let host = Host::new(HostID(id), place.get_id(), place.area);
            self.hosts.insert(host.get_id(), host);
            self.places.insert(place.get_id(), place);
        }

        debug!(
            "Initialised {}x{} city with {} places and {} hosts",
            self.size,
            self.size,
            self.places.len(),
            self.hosts.len()
        );

        Ok(())
    }

    /// Whether the local-only bidding policy is active
    pub fn is_v1_active(&self) -> bool {
        self.policy == Policy::LocalOnly
    }

    /// Whether [`City::initialize`] has been called
    pub fn is_initialised(&self) -> bool {
        !self.places.is_empty()
    }

    /// Get a place by its ID
    pub fn get_place(&self, id: PlaceID) -> Result<&Place> {
        self.places
            .get(&id)
            .with_context(|| format!("Unknown place ID {id}"))
    }

    /// Get a host by its ID
    pub fn get_host(&self, id: HostID) -> Result<&Host> {
        self.hosts
            .get(&id)
            .with_context(|| format!("Unknown host ID {id}"))
    }

    /// Get a mutable reference to a host by its ID
    fn get_host_mut(&mut self, id: HostID) -> Result<&mut Host> {
        self.hosts
            .get_mut(&id)
            .with_context(|| format!("Unknown host ID {id}"))
    }

    /// The average nightly rate of all places in an area.
    ///
    /// If there are no places in the area, [`DEFAULT_AREA_AVERAGE_RATE`] is returned.
    pub fn area_average_rate(&self, area: Area) -> MoneyPerNight {
        let (total, count) = self
            .places
            .values()
            .filter(|place| place.area == area)
            .fold((MoneyPerNight(0.0), 0u32), |(total, count), place| {
                (total + place.rate, count + 1)
            });

        if count == 0 {
            DEFAULT_AREA_AVERAGE_RATE
        } else {
            total / count as f64
        }
    }

    /// The average nightly rate for every area
    pub fn area_average_rates(&self) -> HashMap<Area, MoneyPerNight> {
        Area::iter()
            .map(|area| (area, self.area_average_rate(area)))
            .collect()
    }

    /// Update the occupancy of every place for the current month
    fn update_occupancy(&mut self) {
        let averages = self.area_average_rates();
        for place in self.places.values_mut() {
            place.update_occupancy(averages[&place.area], &self.occupancy, &mut self.rng);
        }
    }

    /// Add the current month's earnings to every host's profits
    fn update_profits(&mut self) -> Result<()> {
        for host in self.hosts.values_mut() {
            host.update_profits(&self.places)?;
        }

        Ok(())
    }

    /// Collect bids from every host which owns at least one place and has positive profits
    pub fn collect_bids(&self) -> Result<Vec<Bid>> {
        let mut bids = Vec::new();
        for host in self
            .hosts
            .values()
            .filter(|host| !host.assets.is_empty() && host.profits > Money(0.0))
        {
            bids.extend(host.make_bids(self)?);
        }

        Ok(bids)
    }

    /// Decide which bids succeed.
    ///
    /// Bids are ranked by spread, highest first, with ties broken by buyer ID and then place ID.
    /// They are then approved greedily in that order, subject to these rules:
    ///
    /// * A place can only be sold once per step
    /// * A host can only buy one place per step
    /// * The buyer must still be able to afford the bid
    ///
    /// The approved bids are returned in ranked order.
    pub fn approve_bids(&self, mut bids: Vec<Bid>) -> Vec<Bid> {
        bids.sort_by(|a, b| {
            b.spread
                .value()
                .total_cmp(&a.spread.value())
                .then(a.buyer_id.cmp(&b.buyer_id))
                .then(a.place_id.cmp(&b.place_id))
        });

        let mut sold_places = HashSet::new();
        let mut buyers = HashSet::new();
        let mut approved = Vec::new();
        for bid in bids {
            if sold_places.contains(&bid.place_id) || buyers.contains(&bid.buyer_id) {
                continue;
            }

            let can_afford = self
                .hosts
                .get(&bid.buyer_id)
                .is_some_and(|buyer| buyer.profits >= bid.bid_price);
            if can_afford {
                sold_places.insert(bid.place_id);
                buyers.insert(bid.buyer_id);
                approved.push(bid);
            }
        }

        approved
    }

    /// Transfer ownership and funds for each approved bid.
    ///
    /// The sale price becomes the place's new ask price, recorded at the current step. If a
    /// transaction refers to an unknown ID, it is not applied and an error is returned, but the
    /// transactions before it in `transactions` remain applied.
    pub fn execute_transactions(&mut self, transactions: &[Bid]) -> Result<()> {
        for tx in transactions {
            // Check the IDs before changing anything, so a failing transaction is not half applied.
            // Transactions earlier in the batch stay applied.
            ensure!(
                self.hosts.contains_key(&tx.seller_id),
                "Unknown host ID {}",
                tx.seller_id
            );
            ensure!(
                self.hosts.contains_key(&tx.buyer_id),
                "Unknown host ID {}",
                tx.buyer_id
            );
            let place = self
                .places
                .get_mut(&tx.place_id)
                .with_context(|| format!("Unknown place ID {}", tx.place_id))?;

            place.record_sale(self.step, tx.bid_price)?;
            place.owner_id = tx.buyer_id;

            let seller = self.get_host_mut(tx.seller_id)?;
            seller.assets.remove(&tx.place_id);
            seller.profits += tx.bid_price;

            let buyer = self.get_host_mut(tx.buyer_id)?;
            buyer.assets.insert(tx.place_id);
            buyer.profits -= tx.bid_price;
        }

        Ok(())
    }

    /// Collect, approve and execute bids for the current step
    pub fn clear_market(&mut self) -> Result<Vec<Bid>> {
        let bids = self.collect_bids()?;
        let num_bids = bids.len();
        let approved = self.approve_bids(bids);
        self.execute_transactions(&approved)?;

        debug!(
            "Step {}: {num_bids} bids received, {} approved",
            self.step,
            approved.len()
        );

        Ok(approved)
    }

    /// Advance the simulation by one step (month).
    ///
    /// # Returns
    ///
    /// The transactions which were carried out during this step.
    pub fn iterate(&mut self) -> Result<Vec<Bid>> {
        ensure!(
            self.is_initialised(),
            "City must be initialised before it can be iterated"
        );

        self.step += 1;
        self.update_occupancy();
        self.update_profits()?;
        self.clear_market()
    }

    /// Check that every place is owned by exactly one host and that owners and assets agree
    pub fn check_ownership(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for host in self.hosts.values() {
            for place_id in &host.assets {
                ensure!(
                    seen.insert(*place_id),
                    "Place {place_id} is owned by more than one host"
                );
                let place = self.get_place(*place_id)?;
                ensure!(
                    place.owner_id == host.id,
                    "Place {place_id} is in the assets of host {} but is owned by host {}",
                    host.id,
                    place.owner_id
                );
            }
        }
        ensure!(
            seen.len() == self.places.len(),
            "{} places have no owner",
            self.places.len() - seen.len()
        );

        Ok(())
    }
}
