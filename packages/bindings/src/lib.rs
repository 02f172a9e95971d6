use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use maincalc_core::automotive::{horsepower, tire};
use maincalc_core::finance::{compound_interest, loan, mortgage};
use maincalc_core::health::{bmi, body_fat, metabolic};
use maincalc_core::input::FormValues;
use maincalc_core::keywords::{self, KeywordPlan, KeywordPlanRequest, KeywordPlanResponse};
use maincalc_core::math::{gcf, half_life, percentage, statistics};
use maincalc_core::presentation::{evaluate_form, PageView, Present};
use maincalc_core::{CalcError, CalcResult, ComputationOutput};

fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Typed entry point: JSON input in, `ComputationOutput` JSON out. Invalid
/// input is a thrown error.
fn run_json<I, T, F>(input_json: &str, evaluate: F) -> NapiResult<String>
where
    I: DeserializeOwned,
    T: Serialize,
    F: FnOnce(&I) -> CalcResult<ComputationOutput<T>>,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = evaluate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Page entry point: raw form fields in, `PageView` JSON out. Invalid input
/// comes back as a `status: "invalid"` view, never as a thrown error.
fn run_page<I, T, F>(form_json: &str, evaluate: F) -> NapiResult<String>
where
    I: for<'a> TryFrom<&'a FormValues, Error = CalcError>,
    T: Serialize + Present,
    F: FnOnce(&I) -> CalcResult<ComputationOutput<T>>,
{
    let view = match FormValues::from_json(form_json) {
        Ok(form) => evaluate_form::<I, T, F>(&form, evaluate),
        Err(e) => PageView::<T>::invalid(&e),
    };
    serde_json::to_string(&view).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_loan(input_json: String) -> NapiResult<String> {
    run_json(&input_json, loan::calculate_loan)
}

#[napi]
pub fn loan_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, loan::calculate_loan)
}

#[napi]
pub fn amortize_with_payment(input_json: String) -> NapiResult<String> {
    run_json(&input_json, loan::amortize_with_payment)
}

#[napi]
pub fn amortization_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, loan::amortize_with_payment)
}

#[napi]
pub fn calculate_mortgage(input_json: String) -> NapiResult<String> {
    run_json(&input_json, mortgage::calculate_mortgage)
}

#[napi]
pub fn mortgage_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, mortgage::calculate_mortgage)
}

#[napi]
pub fn calculate_compound_interest(input_json: String) -> NapiResult<String> {
    run_json(&input_json, compound_interest::calculate_compound_interest)
}

#[napi]
pub fn compound_interest_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, compound_interest::calculate_compound_interest)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_energy(input_json: String) -> NapiResult<String> {
    run_json(&input_json, metabolic::calculate_energy)
}

#[napi]
pub fn energy_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, metabolic::calculate_energy)
}

#[napi]
pub fn calculate_bmi(input_json: String) -> NapiResult<String> {
    run_json(&input_json, bmi::calculate_bmi)
}

#[napi]
pub fn bmi_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, bmi::calculate_bmi)
}

#[napi]
pub fn calculate_body_fat(input_json: String) -> NapiResult<String> {
    run_json(&input_json, body_fat::calculate_body_fat)
}

#[napi]
pub fn body_fat_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, body_fat::calculate_body_fat)
}

// ---------------------------------------------------------------------------
// Math
// ---------------------------------------------------------------------------

#[napi]
pub fn solve_decay(input_json: String) -> NapiResult<String> {
    run_json(&input_json, half_life::solve_decay)
}

#[napi]
pub fn half_life_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, half_life::solve_decay)
}

#[napi]
pub fn calculate_gcf(input_json: String) -> NapiResult<String> {
    run_json(&input_json, gcf::calculate_gcf)
}

#[napi]
pub fn gcf_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, gcf::calculate_gcf)
}

#[napi]
pub fn describe_sample(input_json: String) -> NapiResult<String> {
    run_json(&input_json, statistics::describe)
}

#[napi]
pub fn statistics_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, statistics::describe)
}

#[napi]
pub fn calculate_correlation(input_json: String) -> NapiResult<String> {
    run_json(&input_json, statistics::correlation)
}

#[napi]
pub fn correlation_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, statistics::correlation)
}

#[napi]
pub fn calculate_percentage(input_json: String) -> NapiResult<String> {
    run_json(&input_json, percentage::calculate_percentage)
}

#[napi]
pub fn percentage_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, percentage::calculate_percentage)
}

// ---------------------------------------------------------------------------
// Automotive
// ---------------------------------------------------------------------------

#[napi]
pub fn convert_power(input_json: String) -> NapiResult<String> {
    run_json(&input_json, horsepower::convert_power)
}

#[napi]
pub fn horsepower_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, horsepower::convert_power)
}

#[napi]
pub fn calculate_tire(input_json: String) -> NapiResult<String> {
    run_json(&input_json, tire::calculate_tire)
}

#[napi]
pub fn tire_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, tire::calculate_tire)
}

#[napi]
pub fn compare_tires(input_json: String) -> NapiResult<String> {
    run_json(&input_json, tire::compare_tires)
}

#[napi]
pub fn tire_comparison_page(form_json: String) -> NapiResult<String> {
    run_page(&form_json, tire::compare_tires)
}

// ---------------------------------------------------------------------------
// Keyword planner
// ---------------------------------------------------------------------------

/// Validate a planner request (JSON or form fields) and return it in wire
/// shape, ready to POST to the planner.
#[napi]
pub fn keyword_plan_request(form_json: String) -> NapiResult<String> {
    let form = FormValues::from_json(&form_json).map_err(to_napi_error)?;
    let request = KeywordPlanRequest::try_from(&form).map_err(to_napi_error)?;
    serde_json::to_string(&request).map_err(to_napi_error)
}

/// Decode the planner's answer and re-apply the request thresholds.
#[napi]
pub fn filter_keyword_plan(response_json: String, request_json: String) -> NapiResult<String> {
    let request: KeywordPlanRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    request.validate().map_err(to_napi_error)?;
    let plan = KeywordPlanResponse::from_json(&response_json)
        .and_then(KeywordPlanResponse::into_result)
        .map_err(to_napi_error)?;
    serde_json::to_string(&keywords::filter_ideas(&plan, &request)).map_err(to_napi_error)
}

#[napi]
pub fn export_keyword_csv(plan_json: String) -> NapiResult<String> {
    let plan: KeywordPlan = serde_json::from_str(&plan_json).map_err(to_napi_error)?;
    keywords::export_csv(&plan).map_err(to_napi_error)
}
