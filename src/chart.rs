//! Time-series charts for an aggregated model run.
//!
//! [`ChartData`] is the serializable form the web page draws from;
//! [`render_svg_charts`] writes the same two charts as SVG files.

use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use serde::Serialize;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::core::AggregateResult;

const CHART_SIZE: (u32, u32) = (1024, 640);
const PROCEEDS_COLOR: RGBColor = RGBColor(31, 119, 180);
const EQUITY_COLOR: RGBColor = RGBColor(255, 127, 14);

pub const VALUES_CHART_FILE: &str = "graph_1.svg";
pub const BENEFIT_CHART_FILE: &str = "graph_2.svg";

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to create chart directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render {}: {message}", .path.display())]
    Render { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSeries {
    pub baseline: bool,
    pub home_proceeds: Vec<f64>,
    /// Post-period renting equity, aligned with `home_proceeds`.
    pub renting_equity: Vec<f64>,
    pub present_value_benefit: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    /// Elapsed years for each period.
    pub years: Vec<f64>,
    /// Baseline run first.
    pub runs: Vec<RunSeries>,
}

impl ChartData {
    pub fn from_result(result: &AggregateResult) -> Self {
        let years = (0..result.loan_terms.periods)
            .map(|period| f64::from(period) / 12.0)
            .collect();
        let runs = result
            .runs
            .iter()
            .enumerate()
            .map(|(idx, run)| RunSeries {
                baseline: idx == 0,
                home_proceeds: run.months.iter().map(|m| m.home_proceeds).collect(),
                renting_equity: run.months.iter().map(|m| m.renting_equity).collect(),
                present_value_benefit: run
                    .months
                    .iter()
                    .map(|m| m.present_value_benefit)
                    .collect(),
            })
            .collect();
        Self { years, runs }
    }

    fn year_span(&self) -> f64 {
        self.years.last().map_or(1.0, |last| last + 1.0 / 12.0)
    }
}

/// Writes both charts into `dir`, creating it when missing.
pub fn render_svg_charts(data: &ChartData, dir: &Path) -> Result<[PathBuf; 2], ChartError> {
    std::fs::create_dir_all(dir).map_err(|source| ChartError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let values_path = dir.join(VALUES_CHART_FILE);
    draw_values_chart(data, &values_path).map_err(|e| ChartError::Render {
        path: values_path.clone(),
        message: e.to_string(),
    })?;

    let benefit_path = dir.join(BENEFIT_CHART_FILE);
    draw_benefit_chart(data, &benefit_path).map_err(|e| ChartError::Render {
        path: benefit_path.clone(),
        message: e.to_string(),
    })?;

    info!(
        values = %values_path.display(),
        benefit = %benefit_path.display(),
        "charts written"
    );
    Ok([values_path, benefit_path])
}

fn points(years: &[f64], values: &[f64]) -> Vec<(f64, f64)> {
    years.iter().copied().zip(values.iter().copied()).collect()
}

/// Padded value range covering every point; never empty.
fn value_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(1.0);
    (min - pad, max + pad)
}

fn draw_values_chart(data: &ChartData, path: &Path) -> Result<(), Box<dyn StdError>> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = value_range(
        data.runs
            .iter()
            .flat_map(|run| run.home_proceeds.iter().chain(run.renting_equity.iter())),
    );
    let mut chart = ChartBuilder::on(&root)
        .caption("Owning vs Renting Values Over Time", ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..data.year_span(), y_min..y_max)?;
    chart.configure_mesh().x_desc("Year").y_desc("Value").draw()?;

    // Perturbed runs first so the baseline stays on top.
    for run in data.runs.iter().filter(|run| !run.baseline) {
        chart.draw_series(DashedLineSeries::new(
            points(&data.years, &run.home_proceeds),
            4,
            4,
            PROCEEDS_COLOR.mix(0.2).stroke_width(1),
        ))?;
        chart.draw_series(DashedLineSeries::new(
            points(&data.years, &run.renting_equity),
            4,
            4,
            EQUITY_COLOR.mix(0.5).stroke_width(1),
        ))?;
    }

    if let Some(baseline) = data.runs.iter().find(|run| run.baseline) {
        chart
            .draw_series(LineSeries::new(
                points(&data.years, &baseline.home_proceeds),
                PROCEEDS_COLOR.stroke_width(2),
            ))?
            .label("home proceeds if sold")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], PROCEEDS_COLOR));
        chart
            .draw_series(LineSeries::new(
                points(&data.years, &baseline.renting_equity),
                EQUITY_COLOR.stroke_width(2),
            ))?
            .label("investments while renting")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], EQUITY_COLOR));
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_benefit_chart(data: &ChartData, path: &Path) -> Result<(), Box<dyn StdError>> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let zero = [0.0];
    let (y_min, y_max) = value_range(
        data.runs
            .iter()
            .flat_map(|run| run.present_value_benefit.iter())
            .chain(zero.iter()),
    );
    let x_max = data.year_span();
    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Present Value Benefit Difference: Owning Minus Renting",
            ("sans-serif", 22),
        )
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)?;
    chart.configure_mesh().x_desc("Year").y_desc("Value").draw()?;

    for run in data.runs.iter().filter(|run| !run.baseline) {
        chart.draw_series(DashedLineSeries::new(
            points(&data.years, &run.present_value_benefit),
            4,
            4,
            PROCEEDS_COLOR.mix(0.5).stroke_width(1),
        ))?;
    }
    if let Some(baseline) = data.runs.iter().find(|run| run.baseline) {
        chart.draw_series(LineSeries::new(
            points(&data.years, &baseline.present_value_benefit),
            PROCEEDS_COLOR.stroke_width(2),
        ))?;
    }
    chart.draw_series(DashedLineSeries::new(
        vec![(0.0, 0.0), (x_max, 0.0)],
        8,
        6,
        EQUITY_COLOR.stroke_width(1),
    ))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::core::aggregate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_result(extra_runs: u32) -> AggregateResult {
        let mut config = ModelConfig::default();
        config.simulation.additional_simulations = extra_runs;
        config.known.years_of_mortgage = 15;
        let inputs = config.build_inputs().expect("valid inputs");
        aggregate(&inputs, &mut StdRng::seed_from_u64(17)).expect("valid inputs")
    }

    #[test]
    fn chart_data_has_one_series_per_run_on_a_monthly_axis() {
        let result = sample_result(3);
        let data = ChartData::from_result(&result);

        assert_eq!(data.years.len(), 180);
        assert_eq!(data.years[0], 0.0);
        assert_eq!(data.years[12], 1.0);
        assert!((data.year_span() - 15.0).abs() < 1e-9);

        assert_eq!(data.runs.len(), 4);
        assert!(data.runs[0].baseline);
        assert!(data.runs[1..].iter().all(|run| !run.baseline));
        for (series, run) in data.runs.iter().zip(&result.runs) {
            assert_eq!(series.home_proceeds.len(), 180);
            assert_eq!(series.renting_equity.len(), 180);
            assert_eq!(series.renting_equity[0], run.months[0].renting_equity);
            assert_ne!(series.renting_equity[0], run.opening.renting_equity);
            assert_eq!(
                series.present_value_benefit.last().copied(),
                Some(run.final_present_value_benefit)
            );
        }
    }

    #[test]
    fn chart_data_serializes_camel_case() {
        let data = ChartData::from_result(&sample_result(0));
        let json = serde_json::to_string(&data).expect("serializes");
        assert!(json.contains("\"homeProceeds\""));
        assert!(json.contains("\"rentingEquity\""));
        assert!(json.contains("\"presentValueBenefit\""));
    }

    #[test]
    fn value_range_pads_and_handles_empty_input() {
        assert_eq!(value_range(std::iter::empty()), (-1.0, 1.0));
        let (lo, hi) = value_range([0.0, 100.0].iter());
        assert_eq!((lo, hi), (-5.0, 105.0));
        let (lo, hi) = value_range([3.0].iter());
        assert_eq!((lo, hi), (2.0, 4.0));
    }

    #[test]
    fn render_writes_both_svg_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let out = dir.path().join("charts");
        let data = ChartData::from_result(&sample_result(2));

        let [values, benefit] = render_svg_charts(&data, &out).expect("charts render");
        assert_eq!(values, out.join(VALUES_CHART_FILE));
        assert_eq!(benefit, out.join(BENEFIT_CHART_FILE));
        for path in [values, benefit] {
            let svg = std::fs::read_to_string(&path).expect("svg written");
            assert!(svg.contains("<svg"));
        }
    }
}
