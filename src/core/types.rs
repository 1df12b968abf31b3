use serde::Serialize;

use super::error::ModelError;

/// How the tax-assessed value follows the market.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AssessmentRule {
    /// Assessed value is reset to the home value every anniversary.
    MarketValue,
    /// Assessed value grows once a year by `annual_cap` combined with the
    /// appreciation picked by `basis` (California).
    Capped {
        annual_cap: f64,
        basis: CapBasis,
        growth: CapGrowth,
    },
}

/// How the cap and the appreciation combine into the yearly assessed growth.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CapGrowth {
    /// The larger of the two: the cap acts as a floor.
    #[default]
    Greater,
    /// The smaller of the two: the cap acts as a ceiling.
    Lesser,
}

impl CapGrowth {
    pub fn combine(self, annual_cap: f64, appreciation: f64) -> f64 {
        match self {
            CapGrowth::Greater => annual_cap.max(appreciation),
            CapGrowth::Lesser => annual_cap.min(appreciation),
        }
    }
}

/// Which appreciation figure the capped assessment growth is compared against.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CapBasis {
    /// The baseline appreciation, even inside perturbed runs.
    Baseline,
    /// The appreciation sampled for the run being simulated.
    PerRun,
}

/// One set of macro rates, fixed for the duration of a run. Annual fractions.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroAssumptions {
    pub appreciation: f64,
    pub investment_return: f64,
    pub inflation: f64,
    pub rental_inflation: f64,
}

impl MacroAssumptions {
    pub(crate) fn named_fields(&self) -> [(&'static str, f64); 4] {
        [
            ("appreciation", self.appreciation),
            ("investment return", self.investment_return),
            ("inflation", self.inflation),
            ("rental inflation", self.rental_inflation),
        ]
    }
}

/// One standard deviation per macro assumption, in the same units.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MacroVariances {
    pub appreciation: f64,
    pub investment_return: f64,
    pub inflation: f64,
    pub rental_inflation: f64,
}

impl MacroVariances {
    pub const FIELD_COUNT: usize = 4;

    /// Builds variances from a list ordered appreciation, return, inflation,
    /// rental inflation. An empty list means no variance at all.
    pub fn from_slice(values: &[f64]) -> Result<Self, ModelError> {
        match values {
            [] => Ok(Self::default()),
            [appreciation, investment_return, inflation, rental_inflation] => {
                let variances = Self {
                    appreciation: *appreciation,
                    investment_return: *investment_return,
                    inflation: *inflation,
                    rental_inflation: *rental_inflation,
                };
                for (field, value) in variances.named_fields() {
                    if !value.is_finite() || value < 0.0 {
                        return Err(ModelError::InvalidVariance { field, value });
                    }
                }
                Ok(variances)
            }
            other => Err(ModelError::VarianceCount {
                expected: Self::FIELD_COUNT,
                actual: other.len(),
            }),
        }
    }

    pub(crate) fn named_fields(&self) -> [(&'static str, f64); 4] {
        [
            ("appreciation", self.appreciation),
            ("investment return", self.investment_return),
            ("inflation", self.inflation),
            ("rental inflation", self.rental_inflation),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Inputs {
    pub purchase_price: f64,
    pub down_payment_fraction: f64,
    pub gift: f64,
    pub interest_rate: f64,
    pub mortgage_years: u32,
    pub home_insurance_annual: f64,
    pub property_tax_rate: f64,
    pub monthly_rent: f64,
    pub pmi_rate: f64,
    pub hoa_monthly: f64,
    pub assessment: AssessmentRule,
    pub marginal_income_tax_rate: f64,
    pub annual_maintenance_rate: f64,
    pub transaction_cost_rate: f64,
    pub baseline: MacroAssumptions,
    pub variances: MacroVariances,
    pub additional_simulations: u32,
    pub seed: Option<u64>,
}

/// Fixed loan figures, computed once and shared by every run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTerms {
    pub purchase_price: f64,
    pub down_payment: f64,
    pub gift: f64,
    pub loan_amount: f64,
    pub periods: u32,
    pub periodic_rate: f64,
    pub discount_factor: f64,
    pub monthly_payment: f64,
}

impl LoanTerms {
    /// The buyer's own contribution, which a renter would invest instead.
    pub fn own_down_payment(&self) -> f64 {
        self.down_payment - self.gift
    }
}

/// Pre-period values a run starts from.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningState {
    pub home_value: f64,
    pub debt: f64,
    pub tax_assessed_value: f64,
    pub home_equity: f64,
    pub insurance: f64,
    pub property_tax: f64,
    pub transaction_cost: f64,
    pub rent: f64,
    pub hoa: f64,
    pub renting_equity: f64,
    pub pmi_terminated: bool,
}

/// One elapsed month of a run. `period` 0 is the first month.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyState {
    pub period: u32,
    pub home_value: f64,
    pub debt: f64,
    pub tax_assessed_value: f64,
    pub home_equity: f64,
    pub insurance: f64,
    pub property_tax: f64,
    pub maintenance: f64,
    pub pmi: f64,
    pub hoa: f64,
    pub interest: f64,
    pub principal: f64,
    pub income_tax_savings: f64,
    pub transaction_cost: f64,
    pub rent: f64,
    pub cash_outflow: f64,
    pub home_investment_surplus: f64,
    pub home_proceeds: f64,
    pub renting_equity: f64,
    pub present_value_benefit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRun {
    pub assumptions: MacroAssumptions,
    pub opening: OpeningState,
    pub months: Vec<MonthlyState>,
    pub breakeven_period: Option<u32>,
    pub final_present_value_benefit: f64,
}

/// Breakeven statistics over the runs that broke even. Years are rounded to
/// two decimals.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakevenStats {
    pub count: usize,
    pub attempts: usize,
    pub average_years: f64,
    pub min_years: f64,
    pub max_years: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BreakevenSummary {
    /// No additional simulations were requested.
    Single { years: Option<f64> },
    Always { stats: BreakevenStats },
    Never { attempts: usize },
    Mixed { stats: BreakevenStats },
}

#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub loan_terms: LoanTerms,
    /// Baseline run first, then the perturbed runs in sampling order.
    pub runs: Vec<SimulationRun>,
    pub breakeven_periods: Vec<Option<u32>>,
    pub final_present_value_benefits: Vec<f64>,
    pub summary: BreakevenSummary,
    pub average_final_present_value_benefit: f64,
}

impl AggregateResult {
    pub fn baseline(&self) -> &SimulationRun {
        &self.runs[0]
    }
}
