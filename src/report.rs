//! Console report for an aggregated model run.
//!
//! Figures print in their shortest exact form with at least one decimal
//! (`7.5`, `2.0`, `3912.17`); years and the average benefit are rounded to
//! two decimals first.

use crate::core::{AggregateResult, BreakevenStats, BreakevenSummary};

/// Builds the report lines in display order.
pub fn render(result: &AggregateResult) -> Vec<String> {
    let terms = &result.loan_terms;
    let mut lines = Vec::with_capacity(6);

    lines.push(format!(
        "Your down payment will be ${}",
        number(terms.down_payment)
    ));
    if terms.gift != 0.0 {
        lines.push(format!(
            "Since you had a gift, your portion of the down payment will only be ${}",
            number(terms.own_down_payment())
        ));
    }
    lines.push(format!(
        "Your monthly mortgage payment, excluding insurance and taxes, will be ${}",
        number(terms.monthly_payment)
    ));

    lines.extend(breakeven_lines(&result.summary));

    lines.push(format!(
        "The average ending present value benefit of owning over renting is ${}",
        number(round_cents(result.average_final_present_value_benefit))
    ));
    lines
}

pub fn breakeven_lines(summary: &BreakevenSummary) -> Vec<String> {
    match summary {
        BreakevenSummary::Single { years: Some(years) } => {
            vec![format!("It will take {} years to break even.", number(*years))]
        }
        BreakevenSummary::Single { years: None } => {
            vec!["It will always be better to rent.".to_string()]
        }
        BreakevenSummary::Always { stats } => vec![
            format!(
                "After {} attempts, you always break even. It takes on average {} years.",
                stats.attempts,
                number(stats.average_years)
            ),
            range_line(stats),
        ],
        BreakevenSummary::Never { attempts } => vec![format!(
            "After {attempts} attempts, you never break even. It'll always be better to rent."
        )],
        BreakevenSummary::Mixed { stats } => vec![
            format!(
                "You break even in {} out of {} simulations. When you break even it takes on average {} years.",
                stats.count,
                stats.attempts,
                number(stats.average_years)
            ),
            range_line(stats),
        ],
    }
}

fn range_line(stats: &BreakevenStats) -> String {
    format!(
        "Breaking even could take as little as {} years or as long as {} years.",
        number(stats.min_years),
        number(stats.max_years)
    )
}

/// `Debug` keeps the trailing `.0` that `Display` drops for whole numbers.
fn number(value: f64) -> String {
    format!("{value:?}")
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::core::aggregate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn stats() -> BreakevenStats {
        BreakevenStats {
            count: 3,
            attempts: 5,
            average_years: 4.44,
            min_years: 2.0,
            max_years: 8.33,
        }
    }

    #[test]
    fn single_run_lines() {
        assert_eq!(
            breakeven_lines(&BreakevenSummary::Single { years: Some(7.5) }),
            vec!["It will take 7.5 years to break even."]
        );
        assert_eq!(
            breakeven_lines(&BreakevenSummary::Single { years: None }),
            vec!["It will always be better to rent."]
        );
    }

    #[test]
    fn always_lines_have_no_never_framing() {
        let lines = breakeven_lines(&BreakevenSummary::Always { stats: stats() });
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("After 5 attempts, you always break even."));
        assert!(!lines.iter().any(|line| line.contains("never")));
        assert_eq!(
            lines[1],
            "Breaking even could take as little as 2.0 years or as long as 8.33 years."
        );
    }

    #[test]
    fn mixed_lines_report_subset() {
        let lines = breakeven_lines(&BreakevenSummary::Mixed { stats: stats() });
        assert_eq!(
            lines[0],
            "You break even in 3 out of 5 simulations. When you break even it takes on average 4.44 years."
        );
    }

    #[test]
    fn figures_print_like_rounded_decimals() {
        assert_eq!(number(2.0), "2.0");
        assert_eq!(number(7.5), "7.5");
        assert_eq!(number(4.44), "4.44");
        assert_eq!(number(-46_959.69), "-46959.69");
        assert_eq!(number(round_cents(-46_959.687_032)), "-46959.69");
        assert_eq!(
            breakeven_lines(&BreakevenSummary::Single { years: Some(2.0) }),
            vec!["It will take 2.0 years to break even."]
        );
    }

    #[test]
    fn never_line() {
        assert_eq!(
            breakeven_lines(&BreakevenSummary::Never { attempts: 11 }),
            vec!["After 11 attempts, you never break even. It'll always be better to rent."]
        );
    }

    #[test]
    fn full_report_for_default_config() {
        let mut config = ModelConfig::default();
        config.simulation.additional_simulations = 0;
        config.known.gift = 10_000.0;
        let inputs = config.build_inputs().expect("valid inputs");
        let result = aggregate(&inputs, &mut StdRng::seed_from_u64(1)).expect("valid inputs");

        let lines = render(&result);
        assert_eq!(lines[0], "Your down payment will be $163140.0");
        assert_eq!(
            lines[1],
            "Since you had a gift, your portion of the down payment will only be $153140.0"
        );
        assert!(lines[2].starts_with("Your monthly mortgage payment"));
        assert!(
            lines
                .last()
                .expect("lines")
                .starts_with("The average ending present value benefit of owning over renting is $")
        );
    }

    #[test]
    fn report_omits_gift_line_without_gift() {
        let mut config = ModelConfig::default();
        config.simulation.additional_simulations = 0;
        let inputs = config.build_inputs().expect("valid inputs");
        let result = aggregate(&inputs, &mut StdRng::seed_from_u64(1)).expect("valid inputs");

        let lines = render(&result);
        assert_eq!(lines[0], "Your down payment will be $153140.0");
        assert_eq!(
            lines[1],
            "Your monthly mortgage payment, excluding insurance and taxes, will be $3912.17"
        );
        assert_eq!(lines[2], "It will always be better to rent.");
        assert_eq!(
            lines[3],
            "The average ending present value benefit of owning over renting is $-46959.69"
        );
        assert_eq!(lines.len(), 4);
    }
}
