//! Integration tests for loading the example models.
use citysim::city::Policy;
use citysim::model::{Model, OccupancyModel};
use float_cmp::assert_approx_eq;
use std::path::PathBuf;

/// Get the path to an example model.
fn get_model_dir(name: &str) -> PathBuf {
    PathBuf::from("demos").join(name)
}

/// An integration test which attempts to load the default example model
#[test]
fn test_model_from_path() {
    let model = Model::from_path(get_model_dir("default")).unwrap();
    assert_eq!(model.parameters.grid_size, 10);
    assert_eq!(model.parameters.num_steps, 180);
    assert_eq!(
        model.iter_variants().collect::<Vec<_>>(),
        [Policy::Baseline, Policy::LocalOnly]
    );
}

/// Optional parameters take their default values
#[test]
fn test_model_from_path_defaults() {
    let model = Model::from_path(get_model_dir("small")).unwrap();
    assert_eq!(model.parameters.occupancy_model, OccupancyModel::Ratio);
    assert_approx_eq!(f64, model.parameters.initial_price_multiplier, 900.0);
    assert_eq!(model.iter_variants().count(), 2);
}
