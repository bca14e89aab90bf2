use napi::Result as NapiResult;
use napi_derive::napi;
use serde_json::json;

use property_eval_core::mortgage::Mortgage;
use property_eval_core::scenario::ScenarioConfig;
use property_eval_core::{evaluate_request, normalize_request, DashboardResponse, EngineConfig, EvalError, RawRequest};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn engine_config(config_json: Option<String>) -> Result<EngineConfig, EvalError> {
    match config_json {
        Some(json) => EngineConfig::from_json(&json),
        None => Ok(EngineConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate a request and return the dashboard response as JSON.
///
/// Bad input never throws: it comes back as `{"success": false, "error": ...}`.
#[napi]
pub fn evaluate_investment(request_json: String, config_json: Option<String>) -> NapiResult<String> {
    let response = engine_config(config_json).and_then(|config| {
        let request: RawRequest = serde_json::from_str(&request_json)?;
        Ok(evaluate_request(&request, &config))
    });
    let response = response.unwrap_or_else(|e| DashboardResponse::failure(&e));
    serde_json::to_string(&response).map_err(to_napi_error)
}

#[napi]
pub fn amortization_schedule(input_json: String, months: Option<u32>) -> NapiResult<String> {
    let request: RawRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let (_, loan) =
        normalize_request(&request, &EngineConfig::default()).map_err(to_napi_error)?;
    let mortgage = Mortgage::new(loan.loan_amount, &loan).map_err(to_napi_error)?;
    let rows = mortgage
        .amortization_schedule(months.unwrap_or(mortgage.total_months))
        .map_err(to_napi_error)?;
    let output = json!({
        "loan_amount": mortgage.loan_amount,
        "monthly_payment": mortgage.monthly_payment,
        "total_months": mortgage.total_months,
        "total_interest": mortgage.total_interest(),
        "rows": rows,
    });
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Parse and validate scenario settings, returning them with defaults filled in.
#[napi]
pub fn validate_scenario_config(config_json: String) -> NapiResult<String> {
    let config: ScenarioConfig = serde_json::from_str(&config_json).map_err(to_napi_error)?;
    config.validate().map_err(to_napi_error)?;
    serde_json::to_string(&config).map_err(to_napi_error)
}
