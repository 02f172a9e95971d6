use serde::Serialize;
use tracing::debug;

use super::chart::{Chart, ChartError};
use crate::error::CalcError;
use crate::input::FormValues;
use crate::types::ComputationOutput;
use crate::CalcResult;

/// One label/value pair on a result card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub label: String,
    pub value: String,
}

impl SummaryLine {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        SummaryLine {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Maps a calculator's result record onto charts and summary lines.
pub trait Present {
    fn charts(&self) -> Result<Vec<Chart>, ChartError>;
    fn summary(&self) -> Vec<SummaryLine>;
}

/// What a page receives: a rendered result, or a message to show next to
/// the form.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageView<T: Serialize> {
    Ready {
        output: ComputationOutput<T>,
        charts: Vec<Chart>,
        summary: Vec<SummaryLine>,
    },
    Invalid {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
}

impl<T: Serialize> PageView<T> {
    pub fn invalid(err: &CalcError) -> Self {
        let field = match err {
            CalcError::InvalidInput { field, .. } => Some(field.clone()),
            _ => None,
        };
        PageView::Invalid {
            message: err.to_string(),
            field,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PageView::Ready { .. })
    }
}

/// Render an evaluation. Errors from the calculator or from chart
/// construction become `Invalid`.
pub fn render<T: Serialize + Present>(result: CalcResult<ComputationOutput<T>>) -> PageView<T> {
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, "evaluation rejected");
            return PageView::invalid(&e);
        }
    };
    match output.result.charts() {
        Ok(charts) => PageView::Ready {
            summary: output.result.summary(),
            charts,
            output,
        },
        Err(e) => PageView::invalid(&CalcError::from(e)),
    }
}

/// Full page pipeline: collect the form into `I`, evaluate, render.
pub fn evaluate_form<I, T, F>(form: &FormValues, evaluate: F) -> PageView<T>
where
    I: for<'a> TryFrom<&'a FormValues, Error = CalcError>,
    T: Serialize + Present,
    F: FnOnce(&I) -> CalcResult<ComputationOutput<T>>,
{
    render(I::try_from(form).and_then(|input| evaluate(&input)))
}
