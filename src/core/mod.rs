mod aggregate;
mod engine;
mod error;
mod types;

pub use aggregate::{aggregate, aggregate_with_seed, sample_assumptions, summarize_breakevens};
pub use engine::{compute_loan_terms, simulate, validate_inputs};
pub use error::ModelError;
pub use types::{
    AggregateResult, AssessmentRule, BreakevenStats, BreakevenSummary, CapBasis, CapGrowth,
    Inputs, LoanTerms, MacroAssumptions, MacroVariances, MonthlyState, OpeningState,
    SimulationRun,
};
