use axum::{
    Router,
    extract::{Json, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::chart::ChartData;
use crate::config::{CapBasisSetting, CapGrowthSetting, ModelConfig};
use crate::core::{
    AggregateResult, BreakevenSummary, Inputs, LoanTerms, MacroAssumptions, aggregate_with_seed,
};
use crate::report;

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MAX_API_SIMULATIONS: u32 = 5_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCapBasis {
    #[serde(alias = "baselineAppreciation", alias = "baseline_appreciation")]
    Baseline,
    #[serde(alias = "perRun", alias = "per_run")]
    PerRun,
}

impl From<ApiCapBasis> for CapBasisSetting {
    fn from(value: ApiCapBasis) -> Self {
        match value {
            ApiCapBasis::Baseline => CapBasisSetting::Baseline,
            ApiCapBasis::PerRun => CapBasisSetting::PerRun,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCapGrowth {
    #[serde(alias = "max")]
    Greater,
    #[serde(alias = "min")]
    Lesser,
}

impl From<ApiCapGrowth> for CapGrowthSetting {
    fn from(value: ApiCapGrowth) -> Self {
        match value {
            ApiCapGrowth::Greater => CapGrowthSetting::Greater,
            ApiCapGrowth::Lesser => CapGrowthSetting::Lesser,
        }
    }
}

/// Overrides layered on the server's configuration. Rates are percents.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    purchase_price: Option<f64>,
    down_payment_percentage: Option<f64>,
    interest_rate: Option<f64>,
    years_of_mortgage: Option<u32>,
    home_insurance: Option<f64>,
    property_tax_rate: Option<f64>,
    rent: Option<f64>,
    pmi_rate: Option<f64>,
    hoa_fees: Option<f64>,
    gift: Option<f64>,
    in_california: Option<bool>,
    assessment_cap: Option<f64>,
    cap_basis: Option<ApiCapBasis>,
    cap_growth: Option<ApiCapGrowth>,

    annual_appreciation: Option<f64>,
    after_tax_annual_return: Option<f64>,
    inflation: Option<f64>,
    rental_inflation: Option<f64>,
    marginal_income_tax: Option<f64>,
    annual_maintenance: Option<f64>,
    transaction_cost: Option<f64>,

    simulations: Option<u32>,
    seed: Option<u64>,
    appreciation_variance: Option<f64>,
    return_variance: Option<f64>,
    inflation_variance: Option<f64>,
    rental_inflation_variance: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    down_payment: f64,
    gift: f64,
    own_down_payment: f64,
    monthly_payment: f64,
    loan_terms: LoanTerms,
    assumptions: Vec<MacroAssumptions>,
    breakeven_periods: Vec<Option<u32>>,
    summary: BreakevenSummary,
    report_lines: Vec<String>,
    final_present_value_benefits: Vec<f64>,
    average_final_present_value_benefit: f64,
    charts: ChartData,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16, defaults: ModelConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(Arc::new(defaults));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "rent-vs-buy HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    State(defaults): State<Arc<ModelConfig>>,
    Query(payload): Query<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&defaults, payload).await
}

async fn simulate_post_handler(
    State(defaults): State<Arc<ModelConfig>>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&defaults, payload).await
}

async fn simulate_handler_impl(defaults: &ModelConfig, payload: SimulatePayload) -> Response {
    let inputs = match api_request_from_payload(defaults, payload) {
        Ok(inputs) => inputs,
        Err(msg) => {
            warn!(error = %msg, "rejected simulate request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let outcome = tokio::task::spawn_blocking(move || aggregate_with_seed(&inputs)).await;
    match outcome {
        Ok(Ok(result)) => {
            info!(
                runs = result.runs.len(),
                average_final_present_value_benefit = result.average_final_present_value_benefit,
                "simulate request served"
            );
            json_response(StatusCode::OK, build_simulate_response(&result))
        }
        Ok(Err(e)) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        Err(e) => {
            warn!(error = %e, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(defaults: &ModelConfig, json: &str) -> Result<Inputs, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(defaults, payload)
}

fn api_request_from_payload(
    defaults: &ModelConfig,
    payload: SimulatePayload,
) -> Result<Inputs, String> {
    let mut config = defaults.clone();

    let known = &mut config.known;
    if let Some(v) = payload.purchase_price {
        known.purchase_price = v;
    }
    if let Some(v) = payload.down_payment_percentage {
        known.down_payment_percentage = v;
    }
    if let Some(v) = payload.interest_rate {
        known.interest_rate = v;
    }
    if let Some(v) = payload.years_of_mortgage {
        known.years_of_mortgage = v;
    }
    if let Some(v) = payload.home_insurance {
        known.home_insurance = v;
    }
    if let Some(v) = payload.property_tax_rate {
        known.property_tax_rate = v;
    }
    if let Some(v) = payload.rent {
        known.rent = v;
    }
    if let Some(v) = payload.pmi_rate {
        known.pmi_rate = v;
    }
    if let Some(v) = payload.hoa_fees {
        known.hoa_fees = v;
    }
    if let Some(v) = payload.gift {
        known.gift = v;
    }
    if let Some(v) = payload.in_california {
        known.in_california = v;
    }
    if let Some(v) = payload.assessment_cap {
        known.assessment_cap = v;
    }
    if let Some(v) = payload.cap_basis {
        known.cap_basis = v.into();
    }
    if let Some(v) = payload.cap_growth {
        known.cap_growth = v.into();
    }

    let assumed = &mut config.assumed;
    if let Some(v) = payload.annual_appreciation {
        assumed.annual_appreciation = v;
    }
    if let Some(v) = payload.after_tax_annual_return {
        assumed.after_tax_annual_return = v;
    }
    if let Some(v) = payload.inflation {
        assumed.inflation = v;
    }
    if let Some(v) = payload.rental_inflation {
        assumed.rental_inflation = v;
    }
    if let Some(v) = payload.marginal_income_tax {
        assumed.marginal_income_tax = v;
    }
    if let Some(v) = payload.annual_maintenance {
        assumed.annual_maintenance = v;
    }
    if let Some(v) = payload.transaction_cost {
        assumed.transaction_cost = v;
    }

    let simulation = &mut config.simulation;
    if let Some(v) = payload.simulations {
        if v > MAX_API_SIMULATIONS {
            return Err(format!("simulations must be <= {MAX_API_SIMULATIONS}"));
        }
        simulation.additional_simulations = v;
    }
    if let Some(v) = payload.seed {
        simulation.seed = Some(v);
    }
    let variance_overrides = [
        payload.appreciation_variance,
        payload.return_variance,
        payload.inflation_variance,
        payload.rental_inflation_variance,
    ];
    if variance_overrides.iter().any(Option::is_some) {
        let mut variances = simulation.variances.clone();
        variances.resize(variance_overrides.len(), 0.0);
        for (slot, value) in variances.iter_mut().zip(variance_overrides) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        simulation.variances = variances;
    }

    config.build_inputs().map_err(|e| e.to_string())
}

fn build_simulate_response(result: &AggregateResult) -> SimulateResponse {
    let terms = result.loan_terms;
    SimulateResponse {
        down_payment: terms.down_payment,
        gift: terms.gift,
        own_down_payment: terms.own_down_payment(),
        monthly_payment: terms.monthly_payment,
        loan_terms: terms,
        assumptions: result.runs.iter().map(|run| run.assumptions).collect(),
        breakeven_periods: result.breakeven_periods.clone(),
        summary: result.summary,
        report_lines: report::render(result),
        final_present_value_benefits: result.final_present_value_benefits.clone(),
        average_final_present_value_benefit: result.average_final_present_value_benefit,
        charts: ChartData::from_result(result),
    }
}
