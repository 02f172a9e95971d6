//! Input collection: turn raw form text into typed, validated values.
//!
//! Pages post every field as text. Nothing here coerces silently: a value
//! that does not parse, or falls outside its declared range, becomes a
//! `CalcError::InvalidInput` naming the field.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CalcError;
use crate::CalcResult;

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

/// Parse user-typed numeric text. Accepts a leading `$` and `,` thousands
/// separators ("$250,000.00").
pub fn parse_number(field: &str, raw: &str) -> CalcResult<Decimal> {
    let trimmed = raw.trim();
    let cleaned: String = trimmed
        .trim_start_matches('$')
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect();

    if cleaned.is_empty() {
        return Err(CalcError::invalid(field, "a value is required"));
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| CalcError::invalid(field, format!("'{trimmed}' is not a number")))
}

pub fn parse_positive(field: &str, raw: &str) -> CalcResult<Decimal> {
    let value = parse_number(field, raw)?;
    require_positive(field, value)?;
    Ok(value)
}

pub fn parse_non_negative(field: &str, raw: &str) -> CalcResult<Decimal> {
    let value = parse_number(field, raw)?;
    require_non_negative(field, value)?;
    Ok(value)
}

pub fn parse_in_range(field: &str, raw: &str, min: Decimal, max: Decimal) -> CalcResult<Decimal> {
    let value = parse_number(field, raw)?;
    require_range(field, value, min, max)?;
    Ok(value)
}

/// Parse a whole, non-negative count (years, ages, RPM steps).
pub fn parse_whole(field: &str, raw: &str) -> CalcResult<u32> {
    let value = parse_number(field, raw)?;
    if !value.fract().is_zero() {
        return Err(CalcError::invalid(field, "must be a whole number"));
    }
    value
        .to_u32()
        .ok_or_else(|| CalcError::invalid(field, "must be a non-negative whole number"))
}

/// Parse a list of numbers separated by commas, semicolons or whitespace.
pub fn parse_list(field: &str, raw: &str) -> CalcResult<Vec<Decimal>> {
    let values = raw
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            Decimal::from_str(token)
                .or_else(|_| Decimal::from_scientific(token))
                .map_err(|_| CalcError::invalid(field, format!("'{token}' is not a number")))
        })
        .collect::<CalcResult<Vec<_>>>()?;

    if values.is_empty() {
        return Err(CalcError::invalid(field, "enter at least one number"));
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Typed-value checks, shared by every evaluator
// ---------------------------------------------------------------------------

pub fn require_positive(field: &str, value: Decimal) -> CalcResult<()> {
    if value <= Decimal::ZERO {
        return Err(CalcError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

pub fn require_non_negative(field: &str, value: Decimal) -> CalcResult<()> {
    if value < Decimal::ZERO {
        return Err(CalcError::invalid(field, "cannot be negative"));
    }
    Ok(())
}

pub fn require_range(field: &str, value: Decimal, min: Decimal, max: Decimal) -> CalcResult<()> {
    if value < min || value > max {
        return Err(CalcError::invalid(
            field,
            format!("must be between {min} and {max}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// FormValues
// ---------------------------------------------------------------------------

/// Raw field text as posted by a calculator page, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<String>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// Accepts a JSON object whose values are strings, numbers, booleans or
    /// null. Pages are inconsistent about quoting numbers.
    pub fn from_json(json: &str) -> CalcResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Object(map) = value else {
            return Err(CalcError::SerializationError(
                "form values must be a JSON object".into(),
            ));
        };

        let mut form = FormValues::new();
        for (key, val) in map {
            let text = match val {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                Value::Object(_) => {
                    return Err(CalcError::invalid(&key, "nested objects are not supported"))
                }
            };
            form.insert(&key, text);
        }
        Ok(form)
    }

    /// The trimmed text of a field, or `None` when missing or blank.
    pub fn raw(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn required(&self, field: &str) -> CalcResult<Decimal> {
        let raw = self
            .raw(field)
            .ok_or_else(|| CalcError::invalid(field, "a value is required"))?;
        parse_number(field, raw)
    }

    pub fn optional(&self, field: &str) -> CalcResult<Option<Decimal>> {
        self.raw(field).map(|raw| parse_number(field, raw)).transpose()
    }

    pub fn positive(&self, field: &str) -> CalcResult<Decimal> {
        let value = self.required(field)?;
        require_positive(field, value)?;
        Ok(value)
    }

    pub fn non_negative(&self, field: &str) -> CalcResult<Decimal> {
        let value = self.required(field)?;
        require_non_negative(field, value)?;
        Ok(value)
    }

    pub fn optional_non_negative(&self, field: &str) -> CalcResult<Option<Decimal>> {
        let value = self.optional(field)?;
        if let Some(v) = value {
            require_non_negative(field, v)?;
        }
        Ok(value)
    }

    pub fn optional_positive(&self, field: &str) -> CalcResult<Option<Decimal>> {
        let value = self.optional(field)?;
        if let Some(v) = value {
            require_positive(field, v)?;
        }
        Ok(value)
    }

    pub fn in_range(&self, field: &str, min: Decimal, max: Decimal) -> CalcResult<Decimal> {
        let value = self.required(field)?;
        require_range(field, value, min, max)?;
        Ok(value)
    }

    pub fn whole(&self, field: &str) -> CalcResult<u32> {
        let raw = self
            .raw(field)
            .ok_or_else(|| CalcError::invalid(field, "a value is required"))?;
        parse_whole(field, raw)
    }

    pub fn list(&self, field: &str) -> CalcResult<Vec<Decimal>> {
        let raw = self
            .raw(field)
            .ok_or_else(|| CalcError::invalid(field, "enter at least one number"))?;
        parse_list(field, raw)
    }

    pub fn text(&self, field: &str) -> CalcResult<String> {
        self.raw(field)
            .map(str::to_string)
            .ok_or_else(|| CalcError::invalid(field, "a value is required"))
    }

    /// Parse a select/toggle value through the type's `FromStr`.
    pub fn choice<T>(&self, field: &str) -> CalcResult<T>
    where
        T: FromStr<Err = String>,
    {
        let raw = self
            .raw(field)
            .ok_or_else(|| CalcError::invalid(field, "a selection is required"))?;
        raw.parse::<T>().map_err(|reason| CalcError::invalid(field, reason))
    }

    pub fn choice_or<T>(&self, field: &str, default: T) -> CalcResult<T>
    where
        T: FromStr<Err = String>,
    {
        match self.raw(field) {
            Some(raw) => raw.parse::<T>().map_err(|reason| CalcError::invalid(field, reason)),
            None => Ok(default),
        }
    }

    /// Checkbox semantics: "true", "on", "yes" and "1" are set.
    pub fn flag(&self, field: &str) -> bool {
        matches!(
            self.raw(field).map(|s| s.to_lowercase()).as_deref(),
            Some("true" | "on" | "yes" | "1")
        )
    }

    /// ISO `YYYY-MM-DD` date, optional.
    pub fn date(&self, field: &str) -> CalcResult<Option<NaiveDate>> {
        self.raw(field)
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| CalcError::invalid(field, format!("'{raw}' is not a YYYY-MM-DD date")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_number_accepts_currency_text() {
        assert_eq!(parse_number("principal", "$250,000.50").unwrap(), dec!(250000.50));
        assert_eq!(parse_number("principal", "  42 ").unwrap(), dec!(42));
        assert_eq!(parse_number("rate", "-1.5").unwrap(), dec!(-1.5));
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        let err = parse_number("principal", "abc").unwrap_err();
        assert!(err.to_string().contains("principal"));
        assert!(parse_number("principal", "   ").is_err());
        assert!(parse_number("principal", "1.2.3").is_err());
    }

    #[test]
    fn test_parse_number_scientific() {
        assert_eq!(parse_number("n", "1e3").unwrap(), dec!(1000));
    }

    #[test]
    fn test_positive_and_range_checks() {
        assert!(parse_positive("weight", "0").is_err());
        assert!(parse_non_negative("extra", "0").is_ok());
        assert!(parse_non_negative("extra", "-1").is_err());
        assert!(parse_in_range("age", "150", dec!(1), dec!(120)).is_err());
        assert_eq!(parse_in_range("age", "30", dec!(1), dec!(120)).unwrap(), dec!(30));
    }

    #[test]
    fn test_parse_whole() {
        assert_eq!(parse_whole("years", "30").unwrap(), 30);
        assert!(parse_whole("years", "2.5").is_err());
        assert!(parse_whole("years", "-3").is_err());
    }

    #[test]
    fn test_parse_list_mixed_separators() {
        let values = parse_list("data", "1, 2;3\n4  5").unwrap();
        assert_eq!(values, vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);
        assert!(parse_list("data", " , ").is_err());
        assert!(parse_list("data", "1, x").is_err());
    }

    #[test]
    fn test_form_values_from_json_mixed_types() {
        let form = FormValues::from_json(
            r#"{"principal": 100000, "rate": "6", "extra": null, "on": true, "data": [1, "2"]}"#,
        )
        .unwrap();
        assert_eq!(form.positive("principal").unwrap(), dec!(100000));
        assert_eq!(form.required("rate").unwrap(), dec!(6));
        assert_eq!(form.optional("extra").unwrap(), None);
        assert!(form.flag("on"));
        assert_eq!(form.list("data").unwrap(), vec![dec!(1), dec!(2)]);
    }

    #[test]
    fn test_form_values_missing_field_names_field() {
        let form = FormValues::new();
        let err = form.required("term_years").unwrap_err();
        assert!(err.to_string().contains("term_years"));
    }

    #[test]
    fn test_form_values_blank_is_missing() {
        let form = FormValues::new().with("extra", "   ");
        assert_eq!(form.optional_non_negative("extra").unwrap(), None);
    }

    #[test]
    fn test_form_values_date() {
        let form = FormValues::new().with("start", "2025-01-15").with("bad", "15/01/2025");
        assert_eq!(
            form.date("start").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert!(form.date("bad").is_err());
        assert_eq!(form.date("missing").unwrap(), None);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(FormValues::from_json("[1,2]").is_err());
    }
}
