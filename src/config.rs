//! Configuration file for the rent-versus-buy model.
//!
//! Every rate in the file is a percentage (`6.6` means 6.6%); they are
//! converted to fractions when [`ModelConfig::build_inputs`] produces the
//! model [`Inputs`]. Every field has a default, so an empty file is valid.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::{
    AssessmentRule, CapBasis, CapGrowth, Inputs, MacroAssumptions, MacroVariances, ModelError,
    validate_inputs,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub known: KnownConfig,
    pub assumed: AssumedConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

/// Figures known before buying.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnownConfig {
    pub purchase_price: f64,
    /// Own contribution only; a gift is configured separately.
    pub down_payment_percentage: f64,
    pub interest_rate: f64,
    pub years_of_mortgage: u32,
    /// Dollars per year.
    pub home_insurance: f64,
    pub property_tax_rate: f64,
    /// Dollars per month.
    pub rent: f64,
    pub pmi_rate: f64,
    /// Dollars per month.
    pub hoa_fees: f64,
    pub gift: f64,
    /// Limits yearly growth of the tax-assessed value.
    pub in_california: bool,
    pub assessment_cap: f64,
    pub cap_basis: CapBasisSetting,
    pub cap_growth: CapGrowthSetting,
}

impl Default for KnownConfig {
    fn default() -> Self {
        Self {
            purchase_price: 765_700.0,
            down_payment_percentage: 20.0,
            interest_rate: 6.6,
            years_of_mortgage: 30,
            home_insurance: 1_000.0,
            property_tax_rate: 1.0,
            rent: 2_700.0,
            pmi_rate: 1.5,
            hoa_fees: 0.0,
            gift: 0.0,
            in_california: true,
            assessment_cap: 2.0,
            cap_basis: CapBasisSetting::Baseline,
            cap_growth: CapGrowthSetting::Greater,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapBasisSetting {
    #[serde(alias = "baseline_appreciation")]
    Baseline,
    #[serde(alias = "per_run", alias = "perRun")]
    PerRun,
}

impl From<CapBasisSetting> for CapBasis {
    fn from(value: CapBasisSetting) -> Self {
        match value {
            CapBasisSetting::Baseline => CapBasis::Baseline,
            CapBasisSetting::PerRun => CapBasis::PerRun,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapGrowthSetting {
    #[serde(alias = "max")]
    Greater,
    #[serde(alias = "min")]
    Lesser,
}

impl From<CapGrowthSetting> for CapGrowth {
    fn from(value: CapGrowthSetting) -> Self {
        match value {
            CapGrowthSetting::Greater => CapGrowth::Greater,
            CapGrowthSetting::Lesser => CapGrowth::Lesser,
        }
    }
}

/// Educated guesses. The first four are perturbed between simulations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssumedConfig {
    pub annual_appreciation: f64,
    pub after_tax_annual_return: f64,
    pub inflation: f64,
    pub rental_inflation: f64,
    pub marginal_income_tax: f64,
    pub annual_maintenance: f64,
    pub transaction_cost: f64,
}

impl Default for AssumedConfig {
    fn default() -> Self {
        Self {
            annual_appreciation: 3.0,
            after_tax_annual_return: 5.0,
            inflation: 3.0,
            rental_inflation: 2.0,
            marginal_income_tax: 24.0,
            annual_maintenance: 2.0,
            transaction_cost: 6.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Runs in addition to the baseline run.
    pub additional_simulations: u32,
    /// One standard deviation each for appreciation, investment return,
    /// inflation and rental inflation, in percentage points.
    pub variances: Vec<f64>,
    /// Fixed sampler seed; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            additional_simulations: 10,
            variances: vec![0.5; MacroVariances::FIELD_COUNT],
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ModelConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn build_inputs(&self) -> Result<Inputs, ModelError> {
        let known = &self.known;
        let assumed = &self.assumed;
        let simulation = &self.simulation;

        if simulation.additional_simulations > 0 && simulation.variances.is_empty() {
            return Err(ModelError::VarianceCount {
                expected: MacroVariances::FIELD_COUNT,
                actual: 0,
            });
        }
        let variance_fractions = simulation
            .variances
            .iter()
            .map(|v| v / 100.0)
            .collect::<Vec<_>>();

        let assessment = if known.in_california {
            AssessmentRule::Capped {
                annual_cap: known.assessment_cap / 100.0,
                basis: known.cap_basis.into(),
                growth: known.cap_growth.into(),
            }
        } else {
            AssessmentRule::MarketValue
        };

        let inputs = Inputs {
            purchase_price: known.purchase_price,
            down_payment_fraction: known.down_payment_percentage / 100.0,
            gift: known.gift,
            interest_rate: known.interest_rate / 100.0,
            mortgage_years: known.years_of_mortgage,
            home_insurance_annual: known.home_insurance,
            property_tax_rate: known.property_tax_rate / 100.0,
            monthly_rent: known.rent,
            pmi_rate: known.pmi_rate / 100.0,
            hoa_monthly: known.hoa_fees,
            assessment,
            marginal_income_tax_rate: assumed.marginal_income_tax / 100.0,
            annual_maintenance_rate: assumed.annual_maintenance / 100.0,
            transaction_cost_rate: assumed.transaction_cost / 100.0,
            baseline: MacroAssumptions {
                appreciation: assumed.annual_appreciation / 100.0,
                investment_return: assumed.after_tax_annual_return / 100.0,
                inflation: assumed.inflation / 100.0,
                rental_inflation: assumed.rental_inflation / 100.0,
            },
            variances: MacroVariances::from_slice(&variance_fractions)?,
            additional_simulations: simulation.additional_simulations,
            seed: simulation.seed,
        };

        validate_inputs(&inputs)?;
        Ok(inputs)
    }
}
