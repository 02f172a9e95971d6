//! Keyword planner request/response types and local post-processing.
//!
//! The planner itself is a remote service. This module validates what is
//! sent, decodes what comes back, re-applies the user's thresholds and
//! exports the plan as CSV. The HTTP call lives in the CLI.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::CalcError;
use crate::input::{require_non_negative, require_range, FormValues};
use crate::types::Money;
use crate::CalcResult;

pub const CSV_HEADERS: [&str; 7] = [
    "keyword",
    "volume",
    "difficulty",
    "CPC",
    "competition",
    "intent",
    "seasonality",
];

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordPlanRequest {
    pub seed_keyword: String,
    #[serde(default)]
    pub min_volume: u64,
    #[serde(default = "default_max_difficulty")]
    pub max_difficulty: Decimal,
    #[serde(default)]
    pub min_cpc: Money,
    #[serde(default)]
    pub include_seasonal: bool,
    #[serde(default = "default_true")]
    pub include_long_tail: bool,
}

fn default_max_difficulty() -> Decimal {
    dec!(100)
}

fn default_true() -> bool {
    true
}

impl KeywordPlanRequest {
    pub fn new(seed_keyword: impl Into<String>) -> Self {
        KeywordPlanRequest {
            seed_keyword: seed_keyword.into(),
            min_volume: 0,
            max_difficulty: default_max_difficulty(),
            min_cpc: Decimal::ZERO,
            include_seasonal: false,
            include_long_tail: true,
        }
    }

    /// Checked before anything is sent to the planner.
    pub fn validate(&self) -> CalcResult<()> {
        if self.seed_keyword.trim().is_empty() {
            return Err(CalcError::invalid("seedKeyword", "enter a seed keyword"));
        }
        require_range("maxDifficulty", self.max_difficulty, Decimal::ZERO, dec!(100))?;
        require_non_negative("minCpc", self.min_cpc)?;
        Ok(())
    }
}

impl TryFrom<&FormValues> for KeywordPlanRequest {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        let min_volume = match form.raw("min_volume") {
            Some(_) => u64::from(form.whole("min_volume")?),
            None => 0,
        };
        let request = KeywordPlanRequest {
            seed_keyword: form.text("seed_keyword")?,
            min_volume,
            max_difficulty: form
                .optional("max_difficulty")?
                .unwrap_or_else(default_max_difficulty),
            min_cpc: form.optional("min_cpc")?.unwrap_or_default(),
            include_seasonal: form.flag("include_seasonal"),
            include_long_tail: form.raw("include_long_tail").is_none() || form.flag("include_long_tail"),
        };
        request.validate()?;
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordIdea {
    pub keyword: String,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub difficulty: Decimal,
    #[serde(default)]
    pub cpc: Money,
    #[serde(default)]
    pub competition: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub seasonality: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordPlan {
    #[serde(default)]
    pub primary_keywords: Vec<KeywordIdea>,
    #[serde(default)]
    pub long_tail_keywords: Vec<KeywordIdea>,
    #[serde(default)]
    pub seasonal_keywords: Vec<KeywordIdea>,
    /// Free-form advice; the planner returns text or a list of text.
    #[serde(default)]
    pub content_strategy: Value,
}

impl KeywordPlan {
    /// Every idea in display order: primary, long-tail, seasonal.
    pub fn ideas(&self) -> impl Iterator<Item = &KeywordIdea> {
        self.primary_keywords
            .iter()
            .chain(&self.long_tail_keywords)
            .chain(&self.seasonal_keywords)
    }

    pub fn len(&self) -> usize {
        self.primary_keywords.len() + self.long_tail_keywords.len() + self.seasonal_keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn content_strategy_lines(&self) -> Vec<String> {
        fn collect(value: &Value, out: &mut Vec<String>) {
            match value {
                Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
                Value::Array(items) => items.iter().for_each(|v| collect(v, out)),
                Value::Object(map) => map.values().for_each(|v| collect(v, out)),
                _ => {}
            }
        }
        let mut out = Vec::new();
        collect(&self.content_strategy, &mut out);
        out
    }
}

/// Either a plan or an error message, as the planner answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordPlanResponse {
    Plan { plan: KeywordPlan },
    Error { error: String },
}

impl KeywordPlanResponse {
    pub fn from_json(json: &str) -> CalcResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_result(self) -> CalcResult<KeywordPlan> {
        match self {
            KeywordPlanResponse::Plan { plan } => Ok(plan),
            KeywordPlanResponse::Error { error } => Err(CalcError::ExternalService(error)),
        }
    }
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

fn keep(idea: &KeywordIdea, request: &KeywordPlanRequest) -> bool {
    idea.volume >= request.min_volume
        && idea.difficulty <= request.max_difficulty
        && idea.cpc >= request.min_cpc
}

/// Re-apply the request thresholds to a plan, dropping groups the user
/// switched off.
pub fn filter_ideas(plan: &KeywordPlan, request: &KeywordPlanRequest) -> KeywordPlan {
    let filter = |ideas: &[KeywordIdea]| -> Vec<KeywordIdea> {
        ideas.iter().filter(|i| keep(i, request)).cloned().collect()
    };

    let filtered = KeywordPlan {
        primary_keywords: filter(&plan.primary_keywords),
        long_tail_keywords: if request.include_long_tail {
            filter(&plan.long_tail_keywords)
        } else {
            Vec::new()
        },
        seasonal_keywords: if request.include_seasonal {
            filter(&plan.seasonal_keywords)
        } else {
            Vec::new()
        },
        content_strategy: plan.content_strategy.clone(),
    };
    debug!(before = plan.len(), after = filtered.len(), "filtered keyword plan");
    filtered
}

pub fn export_csv(plan: &KeywordPlan) -> CalcResult<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADERS)?;
    for idea in plan.ideas() {
        wtr.write_record([
            idea.keyword.as_str(),
            &idea.volume.to_string(),
            &idea.difficulty.normalize().to_string(),
            &format!("{:.2}", idea.cpc),
            idea.competition.as_str(),
            idea.intent.as_str(),
            idea.seasonality.as_deref().unwrap_or(""),
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| CalcError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CalcError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"{
        "plan": {
            "primaryKeywords": [
                {"keyword": "mortgage calculator", "volume": 90500, "difficulty": 78, "cpc": 4.1, "competition": "high", "intent": "transactional"},
                {"keyword": "loan calculator", "volume": 60500, "difficulty": 45, "cpc": "2.35", "competition": "medium", "intent": "transactional"}
            ],
            "longTailKeywords": [
                {"keyword": "mortgage calculator with pmi, taxes", "volume": 2400, "difficulty": 30, "cpc": 3.2, "competition": "medium", "intent": "informational"}
            ],
            "seasonalKeywords": [
                {"keyword": "tax refund calculator", "volume": 12000, "difficulty": 40, "cpc": 1.1, "competition": "low", "intent": "informational", "seasonality": "Jan-Apr"}
            ],
            "contentStrategy": ["Lead with the calculator", "Add an amortization guide"]
        }
    }"#;

    fn plan() -> KeywordPlan {
        KeywordPlanResponse::from_json(SAMPLE)
            .unwrap()
            .into_result()
            .unwrap()
    }

    #[test]
    fn test_decode_plan() {
        let plan = plan();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.primary_keywords[1].cpc, dec!(2.35));
        assert_eq!(plan.seasonal_keywords[0].seasonality.as_deref(), Some("Jan-Apr"));
        assert_eq!(plan.content_strategy_lines().len(), 2);
    }

    #[test]
    fn test_error_payload() {
        let resp = KeywordPlanResponse::from_json(r#"{"error": "quota exceeded"}"#).unwrap();
        let err = resp.into_result().unwrap_err();
        assert!(matches!(err, CalcError::ExternalService(ref m) if m == "quota exceeded"));
    }

    #[test]
    fn test_request_validation() {
        assert!(KeywordPlanRequest::new("  ").validate().is_err());
        let mut req = KeywordPlanRequest::new("bmi calculator");
        assert!(req.validate().is_ok());
        req.max_difficulty = dec!(120);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_request_wire_names() {
        let json = serde_json::to_value(KeywordPlanRequest::new("tdee")).unwrap();
        assert_eq!(json["seedKeyword"], "tdee");
        assert!(json.get("includeLongTail").is_some());
    }

    #[test]
    fn test_filter_applies_thresholds() {
        let mut req = KeywordPlanRequest::new("mortgage");
        req.max_difficulty = dec!(50);
        req.include_seasonal = false;
        let filtered = filter_ideas(&plan(), &req);
        assert_eq!(filtered.primary_keywords.len(), 1);
        assert_eq!(filtered.primary_keywords[0].keyword, "loan calculator");
        assert_eq!(filtered.long_tail_keywords.len(), 1);
        assert!(filtered.seasonal_keywords.is_empty());
    }

    #[test]
    fn test_export_csv() {
        let csv = export_csv(&plan()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("keyword,volume,difficulty,CPC,competition,intent,seasonality")
        );
        assert_eq!(
            lines.next(),
            Some("mortgage calculator,90500,78,4.10,high,transactional,")
        );
        assert!(csv.contains("\"mortgage calculator with pmi, taxes\""));
        assert_eq!(csv.lines().count(), 5);
    }

    #[test]
    fn test_form_request() {
        let form = FormValues::new()
            .with("seed_keyword", "calorie calculator")
            .with("min_volume", "1000")
            .with("include_seasonal", "on");
        let req = KeywordPlanRequest::try_from(&form).unwrap();
        assert_eq!(req.min_volume, 1000);
        assert!(req.include_seasonal);
        assert!(req.include_long_tail);
    }
}
