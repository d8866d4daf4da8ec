//! An agent-based simulation of a short-term rental market on a grid-shaped city.
//!
//! Hosts own places, earn from them each month and buy neighbouring places from one another. The
//! simulation can be run under different market policies so that their outcomes can be compared.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod area;
pub mod city;
pub mod cli;
pub mod host;
pub mod id;
pub mod input;
pub mod log;
pub mod metrics;
pub mod model;
pub mod output;
pub mod place;
pub mod settings;
pub mod simulation;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which the program's configuration files are stored.
///
/// Falls back to the current directory if the platform has no standard config directory.
pub fn get_citysim_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("citysim");

    path
}
