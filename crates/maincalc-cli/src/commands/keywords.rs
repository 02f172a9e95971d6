use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::fs;
use tracing::info;

use maincalc_core::keywords::{self, KeywordPlan, KeywordPlanRequest, KeywordPlanResponse};
use maincalc_core::CalcError;

use crate::input;

/// Arguments for building a keyword plan
#[derive(Args)]
pub struct KeywordsArgs {
    /// Path to a JSON request (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Keyword to expand
    #[arg(long)]
    pub seed: Option<String>,

    /// Drop ideas searched fewer times a month than this
    #[arg(long, default_value = "0")]
    pub min_volume: u64,

    /// Drop ideas harder than this (0-100)
    #[arg(long, default_value = "100")]
    pub max_difficulty: Decimal,

    /// Drop ideas cheaper per click than this
    #[arg(long, default_value = "0")]
    pub min_cpc: Decimal,

    /// Keep seasonal ideas
    #[arg(long)]
    pub seasonal: bool,

    /// Drop long-tail ideas
    #[arg(long)]
    pub no_long_tail: bool,

    /// Planner response saved as JSON; skips the network call
    #[arg(long)]
    pub plan: Option<String>,

    /// Planner endpoint receiving the request as a JSON POST
    #[arg(long, env = "MAINCALC_KEYWORD_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Planner request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Also write the filtered plan as CSV to this path
    #[arg(long)]
    pub export: Option<String>,
}

pub fn run_keywords(args: KeywordsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = match input::resolve::<KeywordPlanRequest>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => KeywordPlanRequest {
            seed_keyword: args
                .seed
                .clone()
                .ok_or("--seed is required (or provide --input)")?,
            min_volume: args.min_volume,
            max_difficulty: args.max_difficulty,
            min_cpc: args.min_cpc,
            include_seasonal: args.seasonal,
            include_long_tail: !args.no_long_tail,
        },
    };
    request.validate()?;

    let plan = match args.plan.as_deref() {
        Some(path) => KeywordPlanResponse::from_json(&input::file::read_text(path)?)?.into_result()?,
        None => fetch_plan(&args, &request)?,
    };

    let filtered = keywords::filter_ideas(&plan, &request);
    if filtered.is_empty() {
        info!(seed = %request.seed_keyword, "no keyword ideas passed the filters");
    }

    let exported_to = match args.export.as_deref() {
        Some(path) => {
            fs::write(path, keywords::export_csv(&filtered)?)
                .map_err(|e| format!("cannot write '{path}': {e}"))?;
            Some(path.to_string())
        }
        None => None,
    };

    Ok(json!({
        "result": filtered,
        "request": request,
        "idea_count": filtered.len(),
        "content_strategy": filtered.content_strategy_lines(),
        "exported_to": exported_to,
    }))
}

#[cfg(feature = "keyword-planner")]
fn fetch_plan(args: &KeywordsArgs, request: &KeywordPlanRequest) -> Result<KeywordPlan, Box<dyn std::error::Error>> {
    let endpoint = args
        .endpoint
        .as_deref()
        .ok_or("--endpoint or MAINCALC_KEYWORD_ENDPOINT is required (or provide --plan)")?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    Ok(runtime.block_on(planner::fetch(endpoint, request, args.timeout_secs))?)
}

#[cfg(not(feature = "keyword-planner"))]
fn fetch_plan(_args: &KeywordsArgs, _request: &KeywordPlanRequest) -> Result<KeywordPlan, Box<dyn std::error::Error>> {
    Err("provide --plan, or build with the `keyword-planner` feature to query a planner endpoint".into())
}

/// Turn a non-success planner answer into a keyword-planner error,
/// keeping the planner's own `{"error": ...}` text when it sent one.
#[cfg_attr(not(feature = "keyword-planner"), allow(dead_code))]
fn status_error(status: u16, body: &str) -> Option<CalcError> {
    if (200..300).contains(&status) {
        return None;
    }
    let message = match KeywordPlanResponse::from_json(body) {
        Ok(KeywordPlanResponse::Error { error }) => format!("HTTP {status}: {error}"),
        _ => format!("HTTP {status}"),
    };
    Some(CalcError::ExternalService(message))
}

#[cfg(feature = "keyword-planner")]
mod planner {
    use reqwest::Client;
    use std::time::Duration;
    use tracing::debug;

    use maincalc_core::keywords::{KeywordPlan, KeywordPlanRequest, KeywordPlanResponse};
    use maincalc_core::{CalcError, CalcResult};

    fn planner_error(e: impl std::fmt::Display) -> CalcError {
        CalcError::ExternalService(e.to_string())
    }

    pub async fn fetch(endpoint: &str, request: &KeywordPlanRequest, timeout_secs: u64) -> CalcResult<KeywordPlan> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("mcalc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(planner_error)?;

        debug!(endpoint, seed = %request.seed_keyword, "requesting keyword plan");
        let response = client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(planner_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(planner_error)?;
        if let Some(err) = super::status_error(status, &body) {
            return Err(err);
        }

        KeywordPlanResponse::from_json(&body)
            .map_err(|e| planner_error(format!("planner returned an unexpected payload: {e}")))?
            .into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: CalcError) -> String {
        match err {
            CalcError::ExternalService(m) => m,
            other => panic!("expected a keyword planner error, got {other}"),
        }
    }

    #[test]
    fn test_success_status_passes() {
        assert!(status_error(200, "{}").is_none());
        assert!(status_error(204, "").is_none());
    }

    #[test]
    fn test_failed_status_is_planner_error() {
        let err = status_error(404, "<html>not found</html>").unwrap();
        assert_eq!(message(err), "HTTP 404");

        let err = status_error(429, r#"{"error": "quota exceeded"}"#).unwrap();
        assert_eq!(err.to_string(), "Keyword planner error: HTTP 429: quota exceeded");
    }
}
