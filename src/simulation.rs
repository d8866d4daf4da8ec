//! Functionality for running the simulation.
use crate::city::{City, Policy};
use crate::host::Bid;
use crate::metrics::{HostWealth, area_summary, average_ask_price, host_wealth};
use crate::model::{Model, ModelParameters};
use crate::output::DataWriter;
use crate::output::metadata::write_metadata;
use crate::units::Money;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;

/// What happened during a single step of the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSummary<'a> {
    /// The step which has just finished (zero for the initial state)
    pub step: u32,
    /// The mean ask price across all places at the end of the step
    pub average_ask_price: Money,
    /// The transactions carried out during the step
    pub transactions: &'a [Bid],
}

/// The results of simulating one policy variant
#[derive(Debug, Clone, PartialEq)]
pub struct VariantResults {
    /// The policy which was simulated
    pub policy: Policy,
    /// The average ask price at each step, starting with the initial state
    pub average_prices: Vec<Money>,
    /// The total number of transactions carried out
    pub num_transactions: usize,
    /// The wealth of every host at the end of the run, richest first
    pub wealth: Vec<HostWealth>,
}

/// Run the simulation.
///
/// Each of the model's policy variants is simulated in turn with a freshly constructed city, so
/// that variants share a seed but not any state.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write a snapshot of every place at every step
pub fn run(model: &Model, output_path: &Path, debug_model: bool) -> Result<()> {
    write_metadata(output_path, model).context("Failed to save metadata.")?;

    let mut writer = DataWriter::create(output_path, debug_model)?;
    for policy in model.iter_variants() {
        info!("Running variant: {policy}");

        let results = run_variant(&model.parameters, policy, |city, summary| {
            writer.write_transactions(policy, summary.step, summary.transactions)?;
            writer.write_average_price(policy, summary.step, summary.average_ask_price.value())?;
            writer.write_debug_info(policy, city)
        })?;
        writer.write_wealth(policy, &results.wealth)?;

        log_results(&results);
    }
    writer.flush()?;

    Ok(())
}

/// Simulate a single policy variant.
///
/// `observer` is called with the city and a summary of the step once the city has been
/// initialised and again after every step.
pub fn run_variant<F>(
    parameters: &ModelParameters,
    policy: Policy,
    mut observer: F,
) -> Result<VariantResults>
where
    F: FnMut(&City, &StepSummary) -> Result<()>,
{
    let mut city = City::new(parameters.city_config(policy));
    city.initialize()?;

    let mut average_prices = Vec::with_capacity(parameters.num_steps as usize + 1);
    let initial = StepSummary {
        step: city.step,
        average_ask_price: average_ask_price(&city),
        transactions: &[],
    };
    average_prices.push(initial.average_ask_price);
    observer(&city, &initial)?;

    let mut num_transactions = 0;
    for _ in 0..parameters.num_steps {
        let transactions = city.iterate()?;
        city.check_ownership()
            .with_context(|| format!("Inconsistent ownership after step {}", city.step))?;

        let summary = StepSummary {
            step: city.step,
            average_ask_price: average_ask_price(&city),
            transactions: &transactions,
        };
        debug!(
            "Step {}: {} transactions, average ask price {:.2}",
            summary.step,
            transactions.len(),
            summary.average_ask_price.value()
        );
        average_prices.push(summary.average_ask_price);
        num_transactions += transactions.len();
        observer(&city, &summary)?;
    }

    Ok(VariantResults {
        policy,
        average_prices,
        num_transactions,
        wealth: host_wealth(&city)?,
    })
}

/// Log a summary of a variant's results
fn log_results(results: &VariantResults) {
    info!(
        "Variant {} finished with {} transactions",
        results.policy, results.num_transactions
    );

    if let Some(richest) = results.wealth.first() {
        info!(
            "Richest host: {} from {} with wealth {:.2} ({} in profits)",
            richest.host_id,
            richest.area_of_origin,
            richest.wealth.value(),
            richest.profits.value()
        );
    }

    for (area, summary) in area_summary(&results.wealth) {
        info!(
            "Hosts from {area}: {} with mean wealth {:.2}",
            summary.num_hosts,
            summary.mean.value()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{Area, AreaRates, RateRange};
    use crate::fixture::area_rates;
    use crate::model::{OccupancyModel, OccupancyRange};
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};
    use strum::IntoEnumIterator;

    #[fixture]
    fn parameters(area_rates: AreaRates) -> ModelParameters {
        ModelParameters {
            grid_size: 6,
            num_steps: 24,
            seed: 42,
            variants: Policy::iter().collect(),
            occupancy_model: OccupancyModel::Nights,
            initial_price_multiplier: 900.0,
            low_occupancy: OccupancyRange(5, 15),
            high_occupancy: OccupancyRange(10, 20),
            area_rates,
        }
    }

    #[rstest]
    fn test_run_variant_observer(parameters: ModelParameters) {
        let mut steps = Vec::new();
        let mut observed_transactions = 0;
        let results = run_variant(&parameters, Policy::Baseline, |city, summary| {
            assert_eq!(city.step, summary.step);
            assert_eq!(summary.average_ask_price, average_ask_price(city));
            steps.push(summary.step);
            observed_transactions += summary.transactions.len();
            Ok(())
        })
        .unwrap();

        assert_eq!(steps, (0..=24).collect::<Vec<_>>());
        assert_eq!(results.policy, Policy::Baseline);
        assert_eq!(results.average_prices.len(), 25);
        assert_eq!(results.num_transactions, observed_transactions);
        assert_eq!(results.wealth.len(), 36);
    }

    #[rstest]
    #[case(Policy::Baseline)]
    #[case(Policy::LocalOnly)]
    fn test_run_variant_is_reproducible(parameters: ModelParameters, #[case] policy: Policy) {
        let first = run_variant(&parameters, policy, |_, _| Ok(())).unwrap();
        let second = run_variant(&parameters, policy, |_, _| Ok(())).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    fn test_run_variant_wealth_is_consistent(parameters: ModelParameters) {
        let results = run_variant(&parameters, Policy::Baseline, |_, _| Ok(())).unwrap();

        // Every place is counted in exactly one host's assets
        let total_assets: Money = results.wealth.iter().map(|row| row.assets_value).sum();
        let final_average = *results.average_prices.last().unwrap();
        assert_approx_eq!(
            f64,
            total_assets.value(),
            final_average.value() * 36.0,
            epsilon = 1e-6
        );

        for row in &results.wealth {
            assert_eq!(row.wealth, row.profits + row.assets_value);
        }
        assert!(
            results
                .wealth
                .windows(2)
                .all(|pair| pair[0].wealth >= pair[1].wealth)
        );
    }

    #[rstest]
    fn test_run_variant_initial_average(mut parameters: ModelParameters) {
        parameters.area_rates = Area::iter()
            .map(|area| (area, RateRange(120, 120)))
            .collect();
        let results = run_variant(&parameters, Policy::LocalOnly, |_, _| Ok(())).unwrap();
        assert_eq!(results.average_prices[0], Money(108_000.0));
    }

    #[rstest]
    fn test_run_variant_observer_error(parameters: ModelParameters) {
        let result = run_variant(&parameters, Policy::Baseline, |_, summary| {
            anyhow::ensure!(summary.step < 3, "Stopped at step {}", summary.step);
            Ok(())
        });
        assert_eq!(result.unwrap_err().to_string(), "Stopped at step 3");
    }
}
