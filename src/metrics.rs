//! Summary statistics calculated from the state of a city.
use crate::area::Area;
use crate::city::City;
use crate::host::HostID;
use crate::units::Money;
use anyhow::Result;
use indexmap::IndexMap;
use itertools::Itertools;
use strum::IntoEnumIterator;

/// The mean current ask price across all places, or zero if there are none
pub fn average_ask_price(city: &City) -> Money {
    if city.places.is_empty() {
        return Money(0.0);
    }

    let total: Money = city.places.values().map(|place| place.ask_price()).sum();
    total / city.places.len() as f64
}

/// A host's wealth at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct HostWealth {
    /// The host
    pub host_id: HostID,
    /// The area the host started in
    pub area_of_origin: Area,
    /// The host's cash balance
    pub profits: Money,
    /// The sum of the current ask prices of the host's places
    pub assets_value: Money,
    /// `profits + assets_value`
    pub wealth: Money,
}

/// Calculate the wealth of every host, richest first.
///
/// Hosts with equal wealth are ordered by ID.
pub fn host_wealth(city: &City) -> Result<Vec<HostWealth>> {
    let mut rows = Vec::with_capacity(city.hosts.len());
    for host in city.hosts.values() {
        let assets_value = host.assets_value(&city.places)?;
        rows.push(HostWealth {
            host_id: host.id,
            area_of_origin: host.area_of_origin,
            profits: host.profits,
            assets_value,
            wealth: host.profits + assets_value,
        });
    }

    rows.sort_by(|a, b| {
        b.wealth
            .value()
            .total_cmp(&a.wealth.value())
            .then(a.host_id.cmp(&b.host_id))
    });

    Ok(rows)
}

/// Total and mean wealth of the hosts originating in one area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaWealth {
    /// Number of hosts from this area
    pub num_hosts: usize,
    /// Combined wealth of those hosts
    pub total: Money,
    /// Mean wealth of those hosts (zero if there are none)
    pub mean: Money,
}

/// Summarise host wealth by area of origin
pub fn area_summary(wealth: &[HostWealth]) -> IndexMap<Area, AreaWealth> {
    let by_area = wealth.iter().into_group_map_by(|row| row.area_of_origin);

    Area::iter()
        .map(|area| {
            let rows = by_area.get(&area).map_or(&[][..], Vec::as_slice);
            let total: Money = rows.iter().map(|row| row.wealth).sum();
            let mean = if rows.is_empty() {
                Money(0.0)
            } else {
                total / rows.len() as f64
            };
            let summary = AreaWealth {
                num_hosts: rows.len(),
                total,
                mean,
            };
            (area, summary)
        })
        .collect()
}
