//! Hosts are the agents of the simulation: they own places, earn from them and bid for more.
use crate::area::Area;
use crate::city::City;
use crate::id::{define_id_getter, define_id_type};
use crate::place::{PlaceID, PlaceMap};
use crate::units::Money;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::collections::BTreeSet;

define_id_type! {HostID}

/// A map of hosts, keyed by host ID
pub type HostMap = IndexMap<HostID, Host>;

/// An offer by a host to buy a place
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bid {
    /// The place being bid for
    pub place_id: PlaceID,
    /// The place's current owner
    pub seller_id: HostID,
    /// The host making the bid
    pub buyer_id: HostID,
    /// How far the buyer's profits exceed the ask price. Used to rank bids.
    pub spread: Money,
    /// The amount offered, which is the buyer's entire balance
    pub bid_price: Money,
}

/// An economic agent which owns places
#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    /// Unique identifier
    pub id: HostID,
    /// The area of the place the host started with
    pub area_of_origin: Area,
    /// The places the host currently owns
    pub assets: BTreeSet<PlaceID>,
    /// The host's cash balance
    pub profits: Money,
}
define_id_getter! {Host, HostID}

impl Host {
    /// Create a new host owning a single place, with no profits
    pub fn new(id: HostID, initial_place: PlaceID, area_of_origin: Area) -> Self {
        Self {
            id,
            area_of_origin,
            assets: BTreeSet::from([initial_place]),
            profits: Money(0.0),
        }
    }

    /// Add this month's earnings from all owned places to the host's profits
    pub fn update_profits(&mut self, places: &PlaceMap) -> Result<()> {
        let mut earnings = Money(0.0);
        for place_id in &self.assets {
            let place = places
                .get(place_id)
                .with_context(|| format!("Host {} owns unknown place {place_id}", self.id))?;
            earnings += place.monthly_earnings();
        }
        self.profits += earnings;

        Ok(())
    }

    /// Get the places adjacent to the host's assets which the host does not own yet.
    ///
    /// A place next to several owned places is only included once.
    pub fn opportunities(&self, places: &PlaceMap) -> Result<BTreeSet<PlaceID>> {
        let mut opportunities = BTreeSet::new();
        for place_id in &self.assets {
            let place = places
                .get(place_id)
                .with_context(|| format!("Host {} owns unknown place {place_id}", self.id))?;
            opportunities.extend(
                place
                    .neighbours
                    .iter()
                    .filter(|neighbour_id| !self.assets.contains(*neighbour_id)),
            );
        }

        Ok(opportunities)
    }

    /// Generate bids for the neighbouring places this host can afford.
    ///
    /// The host offers its entire balance for each place it can afford. If the local-only policy
    /// is active, places outside the host's area of origin are ignored.
    pub fn make_bids(&self, city: &City) -> Result<Vec<Bid>> {
        let mut bids = Vec::new();
        for place_id in self.opportunities(&city.places)? {
            let place = city.get_place(place_id)?;
            let ask_price = place.ask_price();

            if city.is_v1_active() && place.area != self.area_of_origin {
                continue;
            }

            if self.profits >= ask_price {
                bids.push(Bid {
                    place_id,
                    seller_id: place.owner_id,
                    buyer_id: self.id,
                    spread: self.profits - ask_price,
                    bid_price: self.profits,
                });
            }
        }

        Ok(bids)
    }

    /// The host's total wealth: its profits plus the current value of the places it owns
    pub fn wealth(&self, places: &PlaceMap) -> Result<Money> {
        Ok(self.profits + self.assets_value(places)?)
    }

    /// The sum of the ask prices of the places the host owns
    pub fn assets_value(&self, places: &PlaceMap) -> Result<Money> {
        self.assets
            .iter()
            .map(|place_id| {
                places
                    .get(place_id)
                    .map(|place| place.ask_price())
                    .with_context(|| format!("Host {} owns unknown place {place_id}", self.id))
            })
            .sum()
    }
}
