use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CalcError;
use crate::input::FormValues;
use crate::types::{with_metadata, ComputationOutput, Percent};
use crate::CalcResult;

const HUNDRED: Decimal = dec!(100);

/// The three questions the percentage page answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PercentageInput {
    /// What is `percent`% of `value`?
    PercentOf { percent: Percent, value: Decimal },
    /// `part` is what percent of `whole`?
    WhatPercent { part: Decimal, whole: Decimal },
    /// Percent change going from `from` to `to`.
    Change { from: Decimal, to: Decimal },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Increase,
    Decrease,
    NoChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageOutput {
    pub answer: Decimal,
    /// Set for percent change only.
    pub direction: Option<ChangeDirection>,
    pub difference: Option<Decimal>,
    pub explanation: String,
}

impl TryFrom<&FormValues> for PercentageInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        let mode = form.text("mode")?;
        match mode.to_lowercase().replace('-', "_").as_str() {
            "percent_of" | "of" => Ok(PercentageInput::PercentOf {
                percent: form.required("percent")?,
                value: form.required("value")?,
            }),
            "what_percent" | "ratio" => Ok(PercentageInput::WhatPercent {
                part: form.required("part")?,
                whole: form.required("whole")?,
            }),
            "change" | "percent_change" => Ok(PercentageInput::Change {
                from: form.required("from")?,
                to: form.required("to")?,
            }),
            other => Err(CalcError::invalid(
                "mode",
                format!("unknown mode '{other}'; use percent_of, what_percent or change"),
            )),
        }
    }
}

fn too_large() -> CalcError {
    CalcError::DomainError("the answer is too large to represent".into())
}

pub fn percent_of(percent: Percent, value: Decimal) -> CalcResult<Decimal> {
    value
        .checked_mul(percent)
        .map(|product| product / HUNDRED)
        .or_else(|| (value / HUNDRED).checked_mul(percent))
        .ok_or_else(too_large)
}

pub fn what_percent(part: Decimal, whole: Decimal) -> CalcResult<Percent> {
    if whole.is_zero() {
        return Err(CalcError::DomainError(
            "cannot express a value as a percent of zero".into(),
        ));
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .ok_or_else(too_large)
}

/// Relative change measured against the magnitude of the starting value.
pub fn percent_change(from: Decimal, to: Decimal) -> CalcResult<Percent> {
    if from.is_zero() {
        return Err(CalcError::DomainError(
            "percent change from zero is undefined".into(),
        ));
    }
    to.checked_sub(from)
        .and_then(|change| change.checked_div(from.abs()))
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .ok_or_else(too_large)
}

pub fn calculate_percentage(input: &PercentageInput) -> CalcResult<ComputationOutput<PercentageOutput>> {
    let start = Instant::now();

    let output = match *input {
        PercentageInput::PercentOf { percent, value } => {
            let answer = percent_of(percent, value)?;
            PercentageOutput {
                answer,
                direction: None,
                difference: None,
                explanation: format!("{percent}% of {value} = {}", answer.normalize()),
            }
        }
        PercentageInput::WhatPercent { part, whole } => {
            let answer = what_percent(part, whole)?;
            PercentageOutput {
                answer,
                direction: None,
                difference: None,
                explanation: format!("{part} is {}% of {whole}", answer.round_dp(4).normalize()),
            }
        }
        PercentageInput::Change { from, to } => {
            let answer = percent_change(from, to)?;
            let direction = if answer > Decimal::ZERO {
                ChangeDirection::Increase
            } else if answer < Decimal::ZERO {
                ChangeDirection::Decrease
            } else {
                ChangeDirection::NoChange
            };
            PercentageOutput {
                answer,
                direction: Some(direction),
                difference: Some(to - from),
                explanation: format!(
                    "{from} to {to} is a {}% change",
                    answer.round_dp(4).normalize()
                ),
            }
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Percentages relative to the base value",
        input,
        Vec::new(),
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec!(15), dec!(200)).unwrap(), dec!(30));
        // The product overflows but the answer fits.
        let big = dec!(10_000_000_000_000_000_000_000_000_000);
        assert_eq!(percent_of(dec!(200), big).unwrap(), big * dec!(2));
        assert!(percent_of(dec!(1000), Decimal::MAX).is_err());
    }

    #[test]
    fn test_answers_past_decimal_range_are_domain_errors() {
        assert!(matches!(
            what_percent(Decimal::MAX, dec!(0.5)),
            Err(CalcError::DomainError(_))
        ));
        assert!(matches!(
            percent_change(dec!(-1), Decimal::MAX),
            Err(CalcError::DomainError(_))
        ));
        assert!(matches!(
            percent_change(Decimal::MIN, Decimal::MAX),
            Err(CalcError::DomainError(_))
        ));
    }

    #[test]
    fn test_what_percent() {
        assert_eq!(what_percent(dec!(30), dec!(120)).unwrap(), dec!(25));
        assert!(what_percent(dec!(1), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_percent_change_direction() {
        let up = calculate_percentage(&PercentageInput::Change {
            from: dec!(80),
            to: dec!(100),
        })
        .unwrap()
        .result;
        assert_eq!(up.answer, dec!(25));
        assert_eq!(up.direction, Some(ChangeDirection::Increase));
        assert_eq!(up.difference, Some(dec!(20)));

        let down = percent_change(dec!(-50), dec!(-75)).unwrap();
        assert_eq!(down, dec!(-50));
    }

    #[test]
    fn test_change_from_zero_is_domain_error() {
        assert!(matches!(
            percent_change(Decimal::ZERO, dec!(5)),
            Err(CalcError::DomainError(_))
        ));
    }

    #[test]
    fn test_form_modes() {
        let form = FormValues::new()
            .with("mode", "percent-of")
            .with("percent", "10")
            .with("value", "$1,000");
        let input = PercentageInput::try_from(&form).unwrap();
        let out = calculate_percentage(&input).unwrap().result;
        assert_eq!(out.answer, dec!(100));

        let bad = FormValues::new().with("mode", "median");
        assert!(PercentageInput::try_from(&bad).is_err());
    }
}
