use super::error::ModelError;
use super::types::{
    AssessmentRule, CapBasis, Inputs, LoanTerms, MacroAssumptions, MonthlyState, OpeningState,
    SimulationRun,
};

const MONTHS_PER_YEAR: u32 = 12;
const PMI_LTV_THRESHOLD: f64 = 0.8;
const MAX_MORTGAGE_YEARS: u32 = 100;

/// Costs that only move on the anniversary / non-anniversary schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RecurringCosts {
    insurance: f64,
    tax_assessed_value: f64,
    property_tax: f64,
    rent: f64,
    hoa: f64,
    transaction_cost: f64,
}

impl From<&OpeningState> for RecurringCosts {
    fn from(opening: &OpeningState) -> Self {
        Self {
            insurance: opening.insurance,
            tax_assessed_value: opening.tax_assessed_value,
            property_tax: opening.property_tax,
            rent: opening.rent,
            hoa: opening.hoa,
            transaction_cost: opening.transaction_cost,
        }
    }
}

pub fn validate_inputs(inputs: &Inputs) -> Result<(), ModelError> {
    check("purchase price", inputs.purchase_price, "> 0", |v| v > 0.0)?;
    check(
        "mortgage years",
        f64::from(inputs.mortgage_years),
        "between 1 and 100",
        |v| (1.0..=f64::from(MAX_MORTGAGE_YEARS)).contains(&v),
    )?;
    check(
        "down payment percentage",
        inputs.down_payment_fraction * 100.0,
        "between 0 and 100",
        |v| (0.0..=100.0).contains(&v),
    )?;
    check("gift", inputs.gift, ">= 0", |v| v >= 0.0)?;
    check("interest rate", inputs.interest_rate * 100.0, ">= 0", |v| v >= 0.0)?;

    for (field, value) in [
        ("home insurance", inputs.home_insurance_annual),
        ("property tax rate", inputs.property_tax_rate),
        ("rent", inputs.monthly_rent),
        ("PMI rate", inputs.pmi_rate),
        ("HOA fees", inputs.hoa_monthly),
        ("marginal income tax rate", inputs.marginal_income_tax_rate),
        ("annual maintenance rate", inputs.annual_maintenance_rate),
        ("transaction cost rate", inputs.transaction_cost_rate),
    ] {
        check(field, value, ">= 0", |v| v >= 0.0)?;
    }

    if let AssessmentRule::Capped { annual_cap, .. } = inputs.assessment {
        check("assessment cap", annual_cap * 100.0, "> -100", |v| v > -100.0)?;
    }

    if let Some((field, value)) = first_invalid_rate(&inputs.baseline) {
        return Err(ModelError::InvalidInput {
            field,
            requirement: "> -100",
            value: value * 100.0,
        });
    }

    for (field, value) in inputs.variances.named_fields() {
        if !value.is_finite() || value < 0.0 {
            return Err(ModelError::InvalidVariance { field, value });
        }
    }

    let down_payment = down_payment(inputs);
    if down_payment > inputs.purchase_price {
        return Err(ModelError::DownPaymentExceedsPrice {
            down_payment,
            purchase_price: inputs.purchase_price,
        });
    }

    Ok(())
}

fn check(
    field: &'static str,
    value: f64,
    requirement: &'static str,
    valid: impl Fn(f64) -> bool,
) -> Result<(), ModelError> {
    if value.is_finite() && valid(value) {
        Ok(())
    } else {
        Err(ModelError::InvalidInput {
            field,
            requirement,
            value,
        })
    }
}

/// Returns the first macro rate that is not finite or is at or below -100%.
pub(crate) fn first_invalid_rate(assumptions: &MacroAssumptions) -> Option<(&'static str, f64)> {
    assumptions
        .named_fields()
        .into_iter()
        .find(|(_, value)| !value.is_finite() || *value <= -1.0)
}

fn down_payment(inputs: &Inputs) -> f64 {
    inputs.purchase_price * inputs.down_payment_fraction + inputs.gift
}

pub fn compute_loan_terms(inputs: &Inputs) -> Result<LoanTerms, ModelError> {
    validate_inputs(inputs)?;

    let periods = inputs.mortgage_years * MONTHS_PER_YEAR;
    let periodic_rate = inputs.interest_rate / f64::from(MONTHS_PER_YEAR);
    let down_payment = down_payment(inputs);
    let loan_amount = inputs.purchase_price - down_payment;
    let discount_factor = annuity_discount_factor(periodic_rate, periods);

    Ok(LoanTerms {
        purchase_price: inputs.purchase_price,
        down_payment,
        gift: inputs.gift,
        loan_amount,
        periods,
        periodic_rate,
        discount_factor,
        monthly_payment: round_cents(loan_amount / discount_factor),
    })
}

/// Present value of one unit paid at the end of each of `periods` months.
/// Collapses to `periods` for an interest-free loan.
fn annuity_discount_factor(periodic_rate: f64, periods: u32) -> f64 {
    if periodic_rate == 0.0 {
        return f64::from(periods);
    }
    let growth = (1.0 + periodic_rate).powf(f64::from(periods));
    (growth - 1.0) / (periodic_rate * growth)
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn is_anniversary(period: u32) -> bool {
    period != 0 && period % MONTHS_PER_YEAR == 0
}

pub(crate) fn is_non_anniversary(period: u32) -> bool {
    period != 0 && period % MONTHS_PER_YEAR != 0
}

fn opening_state(inputs: &Inputs, terms: &LoanTerms) -> OpeningState {
    let price = terms.purchase_price;
    OpeningState {
        home_value: price,
        debt: terms.loan_amount,
        tax_assessed_value: price,
        home_equity: terms.down_payment,
        insurance: inputs.home_insurance_annual / 12.0,
        property_tax: inputs.property_tax_rate / 12.0 * price,
        transaction_cost: inputs.transaction_cost_rate * price,
        rent: inputs.monthly_rent,
        hoa: inputs.hoa_monthly,
        renting_equity: terms.own_down_payment(),
        pmi_terminated: terms.loan_amount / price <= PMI_LTV_THRESHOLD,
    }
}

/// Yearly step: insurance and HOA follow inflation, rent follows rental
/// inflation, the assessed value (and so the property tax) is re-based.
/// The transaction cost is left at its prior value.
fn apply_anniversary(
    inputs: &Inputs,
    assumptions: &MacroAssumptions,
    prior: RecurringCosts,
    home_value: f64,
) -> RecurringCosts {
    let tax_assessed_value = match inputs.assessment {
        AssessmentRule::MarketValue => home_value,
        AssessmentRule::Capped {
            annual_cap,
            basis,
            growth,
        } => {
            let appreciation = match basis {
                CapBasis::Baseline => inputs.baseline.appreciation,
                CapBasis::PerRun => assumptions.appreciation,
            };
            prior.tax_assessed_value * (1.0 + growth.combine(annual_cap, appreciation))
        }
    };

    RecurringCosts {
        insurance: prior.insurance * (1.0 + assumptions.inflation),
        tax_assessed_value,
        property_tax: inputs.property_tax_rate / 12.0 * tax_assessed_value,
        rent: prior.rent * (1.0 + assumptions.rental_inflation),
        hoa: prior.hoa * (1.0 + assumptions.inflation),
        transaction_cost: prior.transaction_cost,
    }
}

/// Every other month after the first: only the selling cost tracks the home value.
fn apply_non_anniversary(inputs: &Inputs, prior: RecurringCosts, home_value: f64) -> RecurringCosts {
    RecurringCosts {
        transaction_cost: inputs.transaction_cost_rate * home_value,
        ..prior
    }
}

/// Runs one month-by-month projection over the full loan term.
///
/// Pure: identical inputs give identical ledgers. Inputs are expected to have
/// passed [`validate_inputs`] (which [`compute_loan_terms`] enforces).
pub fn simulate(
    inputs: &Inputs,
    terms: &LoanTerms,
    assumptions: &MacroAssumptions,
) -> SimulationRun {
    let opening = opening_state(inputs, terms);
    let monthly_appreciation = 1.0 + assumptions.appreciation / 12.0;
    let monthly_return = 1.0 + assumptions.investment_return / 12.0;
    let monthly_discount = 1.0 + assumptions.inflation / 12.0;
    let half_term = f64::from(terms.periods) / 2.0;

    let mut months = Vec::with_capacity(terms.periods as usize);
    let mut home_value = opening.home_value;
    let mut debt = opening.debt;
    let mut costs = RecurringCosts::from(&opening);
    let mut pmi = 0.0;
    let mut pmi_terminated = opening.pmi_terminated;
    let mut home_investment_surplus = 0.0;
    let mut renting_equity = opening.renting_equity;
    let mut breakeven_period = None;

    for period in 0..terms.periods {
        home_value *= monthly_appreciation;
        let interest = round_cents(terms.periodic_rate * debt);
        let principal = terms.monthly_payment - interest;
        debt -= principal;
        let maintenance = inputs.annual_maintenance_rate / 12.0 * home_value;
        let income_tax_savings = interest * inputs.marginal_income_tax_rate;
        let home_equity = home_value - debt;

        if is_anniversary(period) {
            costs = apply_anniversary(inputs, assumptions, costs, home_value);
        } else if is_non_anniversary(period) {
            costs = apply_non_anniversary(inputs, costs, home_value);
        }

        // Once terminated PMI never comes back, even if the LTV rises again.
        if !pmi_terminated {
            let loan_to_value = debt / home_value;
            if loan_to_value <= PMI_LTV_THRESHOLD || f64::from(period) > half_term {
                pmi_terminated = true;
                pmi = 0.0;
            } else {
                pmi = inputs.pmi_rate / 12.0 * debt;
            }
        }

        let cash_outflow = interest
            + maintenance
            + costs.insurance
            + costs.property_tax
            + pmi
            + costs.hoa
            - income_tax_savings;
        let outflow_vs_rent = cash_outflow - costs.rent;

        home_investment_surplus =
            home_investment_surplus * monthly_return + (-outflow_vs_rent).max(0.0);
        let home_proceeds =
            home_value - costs.transaction_cost - debt + home_investment_surplus;
        renting_equity = renting_equity * monthly_return + outflow_vs_rent.max(0.0);
        let present_value_benefit =
            (home_proceeds - renting_equity) / monthly_discount.powf(f64::from(period));

        if breakeven_period.is_none() && home_proceeds > renting_equity {
            breakeven_period = Some(period);
        }

        months.push(MonthlyState {
            period,
            home_value,
            debt,
            tax_assessed_value: costs.tax_assessed_value,
            home_equity,
            insurance: costs.insurance,
            property_tax: costs.property_tax,
            maintenance,
            pmi,
            hoa: costs.hoa,
            interest,
            principal,
            income_tax_savings,
            transaction_cost: costs.transaction_cost,
            rent: costs.rent,
            cash_outflow,
            home_investment_surplus,
            home_proceeds,
            renting_equity,
            present_value_benefit,
        });
    }

    let final_present_value_benefit = months
        .last()
        .map_or(0.0, |month| month.present_value_benefit);

    SimulationRun {
        assumptions: *assumptions,
        opening,
        months,
        breakeven_period,
        final_present_value_benefit,
    }
}
