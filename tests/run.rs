//! Integration tests for the `run` command.
use citysim::cli::{RunOpts, handle_run_command};
use citysim::settings::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/small")
}

/// Count the data rows in a CSV file
fn count_rows(path: PathBuf) -> usize {
    csv::Reader::from_path(path).unwrap().records().count()
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("CITYSIM_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: false,
        debug_model: true,
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();

    for file_name in [
        "average_prices.csv",
        "transactions.csv",
        "wealth.csv",
        "debug_places.csv",
        "metadata.toml",
        "citysim_info.log",
    ] {
        assert!(output_dir.join(file_name).is_file(), "{file_name} missing");
    }

    // Two variants of a 4x4 city run for 24 steps, plus the initial state
    assert_eq!(count_rows(output_dir.join("average_prices.csv")), 2 * 25);
    assert_eq!(count_rows(output_dir.join("wealth.csv")), 2 * 16);
    assert_eq!(count_rows(output_dir.join("debug_places.csv")), 2 * 25 * 16);

    // Running again into the same folder requires the overwrite option
    let err = handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    );

    let opts = RunOpts {
        overwrite: true,
        ..opts
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();
    assert!(fs::read_dir(&output_dir).unwrap().count() > 0);
}
