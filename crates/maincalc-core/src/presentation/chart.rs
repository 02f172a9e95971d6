//! Typed chart configurations.
//!
//! Every chart is built through a constructor that checks its shape, so a
//! page never receives a config its charting library would choke on.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CalcError;

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("chart '{0}' has no data")]
    Empty(String),

    #[error("series '{series}' has {actual} values for {expected} labels")]
    LengthMismatch {
        series: String,
        expected: usize,
        actual: usize,
    },

    #[error("pie slice '{0}' is negative")]
    NegativeSlice(String),

    #[error("gauge value {value} is outside [{min}, {max}]")]
    GaugeOutOfRange {
        value: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("gauge range [{min}, {max}] is empty")]
    EmptyRange { min: Decimal, max: Decimal },
}

impl From<ChartError> for CalcError {
    fn from(e: ChartError) -> Self {
        CalcError::DomainError(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Chart kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Decimal>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<Decimal>) -> Self {
        Series {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChart {
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    pub stacked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub label: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<PieSlice>,
}

impl PieChart {
    pub fn total(&self) -> Decimal {
        self.slices
            .iter()
            .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.value))
    }

    /// Each slice as a percentage of the whole; all zero for an empty pie.
    pub fn shares(&self) -> Vec<Decimal> {
        let total = self.total();
        self.slices
            .iter()
            .map(|s| {
                if total.is_zero() {
                    Decimal::ZERO
                } else {
                    s.value / total * dec!(100)
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<Decimal>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeBand {
    pub label: String,
    pub from: Decimal,
    pub to: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeChart {
    pub title: String,
    pub value: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub bands: Vec<GaugeBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    Bar(BarChart),
    Pie(PieChart),
    Line(LineChart),
    Gauge(GaugeChart),
}

// ---------------------------------------------------------------------------
// Validating constructors
// ---------------------------------------------------------------------------

fn check_series(title: &str, points: usize, series: &[Series]) -> Result<(), ChartError> {
    if points == 0 || series.is_empty() {
        return Err(ChartError::Empty(title.to_string()));
    }
    for s in series {
        if s.values.len() != points {
            return Err(ChartError::LengthMismatch {
                series: s.name.clone(),
                expected: points,
                actual: s.values.len(),
            });
        }
    }
    Ok(())
}

impl Chart {
    pub fn bar(
        title: impl Into<String>,
        labels: Vec<String>,
        series: Vec<Series>,
        stacked: bool,
    ) -> Result<Chart, ChartError> {
        let title = title.into();
        check_series(&title, labels.len(), &series)?;
        Ok(Chart::Bar(BarChart {
            title,
            labels,
            series,
            stacked,
        }))
    }

    pub fn pie(title: impl Into<String>, slices: Vec<(String, Decimal)>) -> Result<Chart, ChartError> {
        let title = title.into();
        if slices.is_empty() {
            return Err(ChartError::Empty(title));
        }
        if let Some((label, _)) = slices.iter().find(|(_, v)| *v < Decimal::ZERO) {
            return Err(ChartError::NegativeSlice(label.clone()));
        }
        Ok(Chart::Pie(PieChart {
            title,
            slices: slices
                .into_iter()
                .map(|(label, value)| PieSlice { label, value })
                .collect(),
        }))
    }

    pub fn line(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        x: Vec<Decimal>,
        series: Vec<Series>,
    ) -> Result<Chart, ChartError> {
        let title = title.into();
        check_series(&title, x.len(), &series)?;
        Ok(Chart::Line(LineChart {
            title,
            x_label: x_label.into(),
            y_label: y_label.into(),
            x,
            series,
        }))
    }

    pub fn gauge(
        title: impl Into<String>,
        value: Decimal,
        min: Decimal,
        max: Decimal,
        bands: Vec<GaugeBand>,
    ) -> Result<Chart, ChartError> {
        if min >= max {
            return Err(ChartError::EmptyRange { min, max });
        }
        if value < min || value > max {
            return Err(ChartError::GaugeOutOfRange { value, min, max });
        }
        Ok(Chart::Gauge(GaugeChart {
            title: title.into(),
            value,
            min,
            max,
            bands,
        }))
    }

    /// Gauge whose needle is pinned to the nearest end when the value is off
    /// the dial.
    pub fn gauge_clamped(
        title: impl Into<String>,
        value: Decimal,
        min: Decimal,
        max: Decimal,
        bands: Vec<GaugeBand>,
    ) -> Result<Chart, ChartError> {
        if min >= max {
            return Err(ChartError::EmptyRange { min, max });
        }
        Chart::gauge(title, value.clamp(min, max), min, max, bands)
    }

    pub fn title(&self) -> &str {
        match self {
            Chart::Bar(c) => &c.title,
            Chart::Pie(c) => &c.title,
            Chart::Line(c) => &c.title,
            Chart::Gauge(c) => &c.title,
        }
    }
}

pub fn band(label: &str, from: Decimal, to: Decimal) -> GaugeBand {
    GaugeBand {
        label: label.to_string(),
        from,
        to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bar_length_mismatch() {
        let err = Chart::bar(
            "Yearly",
            vec!["1".into(), "2".into()],
            vec![Series::new("Interest", vec![dec!(1)])],
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ChartError::LengthMismatch {
                series: "Interest".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_line_requires_series() {
        assert!(matches!(
            Chart::line("Balance", "Year", "$", vec![dec!(1)], vec![]),
            Err(ChartError::Empty(_))
        ));
    }

    #[test]
    fn test_pie_rejects_negative_and_reports_shares() {
        assert!(Chart::pie("Split", vec![("a".into(), dec!(-1))]).is_err());

        let Chart::Pie(pie) = Chart::pie(
            "Split",
            vec![("Principal".into(), dec!(75)), ("Interest".into(), dec!(25))],
        )
        .unwrap() else {
            panic!("expected a pie chart");
        };
        assert_eq!(pie.shares(), vec![dec!(75), dec!(25)]);
    }

    #[test]
    fn test_gauge_bounds() {
        assert!(Chart::gauge("BMI", dec!(50), dec!(10), dec!(40), vec![]).is_err());
        assert!(Chart::gauge("BMI", dec!(20), dec!(40), dec!(10), vec![]).is_err());
        let Chart::Gauge(g) = Chart::gauge_clamped("BMI", dec!(50), dec!(10), dec!(40), vec![]).unwrap() else {
            panic!("expected a gauge");
        };
        assert_eq!(g.value, dec!(40));
    }

    #[test]
    fn test_serialized_kind_tag() {
        let chart = Chart::pie("Split", vec![("Fat".into(), dec!(1))]).unwrap();
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["kind"], "pie");
        assert_eq!(json["title"], "Split");
    }
}
