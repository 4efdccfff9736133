use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Approach calculators
// ---------------------------------------------------------------------------

#[napi]
pub fn sales_comparison(input_json: String) -> NapiResult<String> {
    let request: appraisal_core::sales_comparison::SalesComparisonRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal_core::sales_comparison::calculate_sales_comparison(&request);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn income_approach(input_json: String) -> NapiResult<String> {
    let request: appraisal_core::income::IncomeApproachRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal_core::income::calculate_income_approach(&request);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn cost_approach(input_json: String) -> NapiResult<String> {
    let request: appraisal_core::cost::CostApproachRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal_core::cost::calculate_cost_approach(&request);
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Reconciliation and appeal economics
// ---------------------------------------------------------------------------

#[napi]
pub fn reconcile_valuation(input_json: String) -> NapiResult<String> {
    let request: appraisal_core::reconciliation::ReconciliationRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal_core::reconciliation::reconcile(&request);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn appeal_decision(input_json: String) -> NapiResult<String> {
    let request: appraisal_core::decision::AppealDecisionRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal_core::decision::classify_appeal(&request);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn tax_savings(input_json: String) -> NapiResult<String> {
    let request: appraisal_core::tax_savings::TaxSavingsRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal_core::tax_savings::calculate_tax_savings(&request);
    serde_json::to_string(&output).map_err(to_napi_error)
}
