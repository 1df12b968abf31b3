use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use tracing::{debug, info};

use super::engine::{compute_loan_terms, first_invalid_rate, simulate};
use super::error::ModelError;
use super::types::{
    AggregateResult, BreakevenStats, BreakevenSummary, Inputs, MacroAssumptions, MacroVariances,
    SimulationRun,
};

/// Runs the baseline plus `inputs.additional_simulations` perturbed runs,
/// seeding the sampler from `inputs.seed` or from OS entropy when unset.
pub fn aggregate_with_seed(inputs: &Inputs) -> Result<AggregateResult, ModelError> {
    let mut rng = match inputs.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    aggregate(inputs, &mut rng)
}

/// Runs the baseline plus `inputs.additional_simulations` perturbed runs,
/// drawing every perturbation from `rng`.
///
/// All assumption sets are drawn up front, in run order, so a seeded source
/// fully determines the result; the runs themselves are independent and are
/// simulated in parallel.
pub fn aggregate<R: Rng + ?Sized>(
    inputs: &Inputs,
    rng: &mut R,
) -> Result<AggregateResult, ModelError> {
    let loan_terms = compute_loan_terms(inputs)?;

    let mut assumptions = Vec::with_capacity(inputs.additional_simulations as usize + 1);
    assumptions.push(inputs.baseline);
    for run in 1..=inputs.additional_simulations as usize {
        let sampled = sample_assumptions(&inputs.baseline, &inputs.variances, rng)?;
        if let Some((field, value)) = first_invalid_rate(&sampled) {
            return Err(ModelError::InvalidSample { run, field, value });
        }
        debug!(
            run,
            appreciation = sampled.appreciation,
            investment_return = sampled.investment_return,
            inflation = sampled.inflation,
            rental_inflation = sampled.rental_inflation,
            "sampled macro assumptions"
        );
        assumptions.push(sampled);
    }

    let runs: Vec<SimulationRun> = assumptions
        .par_iter()
        .map(|run_assumptions| simulate(inputs, &loan_terms, run_assumptions))
        .collect();

    let breakeven_periods = runs.iter().map(|run| run.breakeven_period).collect::<Vec<_>>();
    let final_present_value_benefits = runs
        .iter()
        .map(|run| run.final_present_value_benefit)
        .collect::<Vec<_>>();
    let summary = summarize_breakevens(&breakeven_periods, inputs.additional_simulations == 0);
    let average_final_present_value_benefit = mean(&final_present_value_benefits);

    info!(
        runs = runs.len(),
        broke_even = breakeven_periods.iter().flatten().count(),
        monthly_payment = loan_terms.monthly_payment,
        average_final_present_value_benefit,
        "aggregated simulations"
    );

    Ok(AggregateResult {
        loan_terms,
        runs,
        breakeven_periods,
        final_present_value_benefits,
        summary,
        average_final_present_value_benefit,
    })
}

/// Draws each macro rate from a normal centred on the baseline. Fields are
/// drawn in declaration order.
pub fn sample_assumptions<R: Rng + ?Sized>(
    baseline: &MacroAssumptions,
    variances: &MacroVariances,
    rng: &mut R,
) -> Result<MacroAssumptions, ModelError> {
    Ok(MacroAssumptions {
        appreciation: sample_normal(
            "appreciation",
            baseline.appreciation,
            variances.appreciation,
            rng,
        )?,
        investment_return: sample_normal(
            "investment return",
            baseline.investment_return,
            variances.investment_return,
            rng,
        )?,
        inflation: sample_normal("inflation", baseline.inflation, variances.inflation, rng)?,
        rental_inflation: sample_normal(
            "rental inflation",
            baseline.rental_inflation,
            variances.rental_inflation,
            rng,
        )?,
    })
}

fn sample_normal<R: Rng + ?Sized>(
    field: &'static str,
    mean: f64,
    std_dev: f64,
    rng: &mut R,
) -> Result<f64, ModelError> {
    let normal = Normal::new(mean, std_dev)
        .map_err(|_| ModelError::InvalidVariance { field, value: std_dev })?;
    Ok(normal.sample(rng))
}

/// Breakeven statistics across runs. Attempts include the baseline run.
pub fn summarize_breakevens(periods: &[Option<u32>], single_run: bool) -> BreakevenSummary {
    if single_run {
        return BreakevenSummary::Single {
            years: periods.first().copied().flatten().map(periods_to_years),
        };
    }

    let attempts = periods.len();
    let broke_even = periods.iter().flatten().copied().collect::<Vec<_>>();
    if broke_even.is_empty() {
        return BreakevenSummary::Never { attempts };
    }

    let total: f64 = broke_even.iter().map(|&p| f64::from(p)).sum();
    let average = total / broke_even.len() as f64;
    let min = broke_even.iter().copied().min().unwrap_or_default();
    let max = broke_even.iter().copied().max().unwrap_or_default();
    let stats = BreakevenStats {
        count: broke_even.len(),
        attempts,
        average_years: round_years(average / 12.0),
        min_years: periods_to_years(min),
        max_years: periods_to_years(max),
    };

    if broke_even.len() == attempts {
        BreakevenSummary::Always { stats }
    } else {
        BreakevenSummary::Mixed { stats }
    }
}

fn periods_to_years(period: u32) -> f64 {
    round_years(f64::from(period) / 12.0)
}

fn round_years(years: f64) -> f64 {
    (years * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::tests::sample_inputs;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn baseline_run_is_first_and_unperturbed() {
        let inputs = sample_inputs();
        let mut rng = StdRng::seed_from_u64(3);
        let result = aggregate(&inputs, &mut rng).expect("valid inputs");

        assert_eq!(result.runs.len(), 11);
        assert_eq!(result.baseline().assumptions, inputs.baseline);
        assert!(result.runs[1..].iter().all(|r| r.assumptions != inputs.baseline));
        assert_eq!(result.breakeven_periods.len(), 11);
        assert_eq!(result.final_present_value_benefits.len(), 11);
        assert_eq!(
            result.final_present_value_benefits[0],
            result.baseline().final_present_value_benefit
        );
    }

    #[test]
    fn same_seed_reproduces_samples_and_results() {
        let inputs = sample_inputs();
        let first = aggregate(&inputs, &mut StdRng::seed_from_u64(99)).expect("valid inputs");
        let second = aggregate(&inputs, &mut StdRng::seed_from_u64(99)).expect("valid inputs");

        assert_eq!(first.runs, second.runs);
        assert_eq!(first.breakeven_periods, second.breakeven_periods);
        assert_eq!(first.summary, second.summary);
        assert_eq!(
            first.average_final_present_value_benefit,
            second.average_final_present_value_benefit
        );

        let other = aggregate(&inputs, &mut StdRng::seed_from_u64(100)).expect("valid inputs");
        assert_ne!(first.runs[1].assumptions, other.runs[1].assumptions);
    }

    #[test]
    fn aggregate_with_seed_matches_explicit_seeded_rng() {
        let mut inputs = sample_inputs();
        inputs.seed = Some(5);
        let seeded = aggregate_with_seed(&inputs).expect("valid inputs");
        let explicit = aggregate(&inputs, &mut StdRng::seed_from_u64(5)).expect("valid inputs");
        assert_eq!(seeded.runs, explicit.runs);
    }

    #[test]
    fn sampled_runs_match_direct_sampling_order() {
        let inputs = sample_inputs();
        let result = aggregate(&inputs, &mut StdRng::seed_from_u64(11)).expect("valid inputs");

        let mut rng = StdRng::seed_from_u64(11);
        for run in &result.runs[1..] {
            let expected = sample_assumptions(&inputs.baseline, &inputs.variances, &mut rng)
                .expect("valid variances");
            assert_eq!(run.assumptions, expected);
        }
    }

    #[test]
    fn zero_variance_runs_repeat_the_baseline() {
        let mut inputs = sample_inputs();
        inputs.variances = MacroVariances::default();
        inputs.additional_simulations = 3;
        let result = aggregate(&inputs, &mut StdRng::seed_from_u64(1)).expect("valid inputs");

        for run in &result.runs[1..] {
            assert_eq!(run, result.baseline());
        }
    }

    #[test]
    fn single_run_reports_never_for_baseline_scenario() {
        let mut inputs = sample_inputs();
        inputs.additional_simulations = 0;
        let result = aggregate(&inputs, &mut StdRng::seed_from_u64(0)).expect("valid inputs");

        assert_eq!(result.runs.len(), 1);
        assert_eq!(result.summary, BreakevenSummary::Single { years: None });
        assert_approx(
            result.average_final_present_value_benefit,
            result.baseline().final_present_value_benefit,
        );
    }

    #[test]
    fn single_run_reports_breakeven_years() {
        let mut inputs = sample_inputs();
        inputs.additional_simulations = 0;
        inputs.interest_rate = 0.0;
        let result = aggregate(&inputs, &mut StdRng::seed_from_u64(0)).expect("valid inputs");

        assert_eq!(result.summary, BreakevenSummary::Single { years: Some(1.0) });
    }

    #[test]
    fn every_run_breaking_even_counts_the_baseline() {
        let mut inputs = sample_inputs();
        inputs.monthly_rent = 20_000.0;
        let result = aggregate(&inputs, &mut StdRng::seed_from_u64(21)).expect("valid inputs");

        let BreakevenSummary::Always { stats } = result.summary else {
            panic!("expected every run to break even, got {:?}", result.summary);
        };
        assert_eq!(stats.count, 11);
        assert_eq!(stats.attempts, 11);
        assert!(stats.min_years <= stats.average_years);
        assert!(stats.average_years <= stats.max_years);

        let periods = result.breakeven_periods.iter().flatten().copied().collect::<Vec<_>>();
        let min = periods.iter().copied().min().expect("non-empty");
        assert_approx(stats.min_years, (f64::from(min) / 12.0 * 100.0).round() / 100.0);
    }

    #[test]
    fn depreciating_home_never_breaks_even() {
        let mut inputs = sample_inputs();
        inputs.baseline.appreciation = -0.05;
        inputs.monthly_rent = 1.0;
        let result = aggregate(&inputs, &mut StdRng::seed_from_u64(8)).expect("valid inputs");

        assert_eq!(result.summary, BreakevenSummary::Never { attempts: 11 });
        assert!(result.breakeven_periods.iter().all(Option::is_none));
    }

    #[test]
    fn mixed_outcomes_use_only_the_breakeven_subset() {
        let periods = [None, Some(24), Some(36), None, Some(100)];
        let summary = summarize_breakevens(&periods, false);

        let BreakevenSummary::Mixed { stats } = summary else {
            panic!("expected mixed outcome, got {summary:?}");
        };
        assert_eq!(stats.count, 3);
        assert_eq!(stats.attempts, 5);
        assert_approx(stats.average_years, 4.44);
        assert_approx(stats.min_years, 2.0);
        assert_approx(stats.max_years, 8.33);
    }

    #[test]
    fn breakeven_in_first_period_is_not_treated_as_never() {
        assert_eq!(
            summarize_breakevens(&[Some(0)], true),
            BreakevenSummary::Single { years: Some(0.0) }
        );
    }

    #[test]
    fn invalid_sample_fails_the_whole_aggregate() {
        let mut inputs = sample_inputs();
        inputs.baseline.inflation = -0.99;
        inputs.variances.inflation = 5.0;
        inputs.additional_simulations = 200;

        let err = aggregate(&inputs, &mut StdRng::seed_from_u64(4))
            .expect_err("a draw below -100% must fail");
        assert!(matches!(
            err,
            ModelError::InvalidSample {
                field: "inflation",
                ..
            }
        ));
    }

    #[test]
    fn sampling_rejects_a_negative_variance() {
        let inputs = sample_inputs();
        let variances = MacroVariances {
            inflation: -0.01,
            ..inputs.variances
        };

        let err = sample_assumptions(&inputs.baseline, &variances, &mut StdRng::seed_from_u64(2))
            .expect_err("a negative spread cannot be sampled");
        assert_eq!(
            err,
            ModelError::InvalidVariance {
                field: "inflation",
                value: -0.01
            }
        );
    }

    #[test]
    fn invalid_inputs_fail_before_sampling() {
        let mut inputs = sample_inputs();
        inputs.purchase_price = -1.0;
        assert!(aggregate(&inputs, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
