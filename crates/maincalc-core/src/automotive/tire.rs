use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::CalcError;
use crate::input::{parse_number, require_positive, require_range, FormValues};
use crate::types::{with_metadata, ComputationOutput, Percent};
use crate::CalcResult;

pub const MM_PER_INCH: Decimal = dec!(25.4);
const MM_PER_KM: Decimal = dec!(1000000);
const INCHES_PER_MILE: Decimal = dec!(63360);
/// Replacement tires beyond this diameter change are flagged.
pub const DIAMETER_TOLERANCE_PERCENT: Decimal = dec!(3);
const DEFAULT_REFERENCE_SPEED: Decimal = dec!(60);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metric tire designation, e.g. `225/45R17`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TireSize {
    pub width_mm: Decimal,
    /// Sidewall height as a percentage of width.
    pub aspect_ratio: Decimal,
    pub rim_inches: Decimal,
}

impl fmt::Display for TireSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}R{}",
            self.width_mm.normalize(),
            self.aspect_ratio.normalize(),
            self.rim_inches.normalize()
        )
    }
}

impl FromStr for TireSize {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tire_size(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TireGeometry {
    pub size: String,
    pub sidewall_mm: Decimal,
    pub sidewall_in: Decimal,
    pub diameter_mm: Decimal,
    pub diameter_in: Decimal,
    pub circumference_mm: Decimal,
    pub circumference_in: Decimal,
    pub revolutions_per_km: Decimal,
    pub revolutions_per_mile: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TireComparisonInput {
    pub original: TireSize,
    pub replacement: TireSize,
    /// Speedometer reading to translate, in whatever unit the user drives in.
    #[serde(default)]
    pub reference_speed: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TireComparisonOutput {
    pub original: TireGeometry,
    pub replacement: TireGeometry,
    pub diameter_difference_mm: Decimal,
    pub diameter_difference_percent: Percent,
    pub speedometer_reading: Decimal,
    pub actual_speed: Decimal,
    /// Positive when the speedometer reads low.
    pub speedometer_error_percent: Percent,
    pub within_tolerance: bool,
}

impl TryFrom<&FormValues> for TireSize {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        match form.raw("size") {
            Some(size) => parse_tire_size(size),
            None => {
                let size = TireSize {
                    width_mm: form.positive("width_mm")?,
                    aspect_ratio: form.positive("aspect_ratio")?,
                    rim_inches: form.positive("rim_inches")?,
                };
                validate_size(&size)?;
                Ok(size)
            }
        }
    }
}

impl TryFrom<&FormValues> for TireComparisonInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        Ok(TireComparisonInput {
            original: parse_tire_size(&form.text("original")?)?,
            replacement: parse_tire_size(&form.text("replacement")?)?,
            reference_speed: form.optional_positive("reference_speed")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn validate_size(size: &TireSize) -> CalcResult<()> {
    require_range("width_mm", size.width_mm, dec!(100), dec!(500))?;
    require_range("aspect_ratio", size.aspect_ratio, dec!(20), dec!(100))?;
    require_range("rim_inches", size.rim_inches, dec!(10), dec!(30))?;
    Ok(())
}

/// Parse `225/45R17`. Accepts a service prefix (`P`, `LT`), a speed letter
/// before the construction code (`ZR`), a dash or space in place of `R`.
pub fn parse_tire_size(raw: &str) -> CalcResult<TireSize> {
    let invalid = || CalcError::invalid("size", format!("'{}' is not a size like 225/45R17", raw.trim()));

    let text = raw.trim().to_uppercase();
    let text = text
        .strip_prefix("LT")
        .or_else(|| text.strip_prefix('P'))
        .unwrap_or(&text);

    let (width, rest) = text.split_once('/').ok_or_else(invalid)?;
    let split_at = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(invalid)?;
    let (aspect, tail) = rest.split_at(split_at);
    let rim = tail.trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == '-' || c == ' ');

    let size = TireSize {
        width_mm: parse_number("width_mm", width.trim())?,
        aspect_ratio: parse_number("aspect_ratio", aspect)?,
        rim_inches: parse_number("rim_inches", rim)?,
    };
    validate_size(&size)?;
    Ok(size)
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

pub fn tire_geometry(size: &TireSize) -> CalcResult<TireGeometry> {
    validate_size(size)?;

    let sidewall_mm = size.width_mm * size.aspect_ratio / dec!(100);
    let diameter_mm = dec!(2) * sidewall_mm + size.rim_inches * MM_PER_INCH;
    let circumference_mm = Decimal::PI * diameter_mm;
    let circumference_in = circumference_mm / MM_PER_INCH;

    Ok(TireGeometry {
        size: size.to_string(),
        sidewall_mm,
        sidewall_in: sidewall_mm / MM_PER_INCH,
        diameter_mm,
        diameter_in: diameter_mm / MM_PER_INCH,
        circumference_mm,
        circumference_in,
        revolutions_per_km: MM_PER_KM / circumference_mm,
        revolutions_per_mile: INCHES_PER_MILE / circumference_in,
    })
}

pub fn calculate_tire(size: &TireSize) -> CalcResult<ComputationOutput<TireGeometry>> {
    let start = Instant::now();
    let output = tire_geometry(size)?;
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Diameter = 2 × width × aspect / 100 + rim × 25.4",
        size,
        Vec::new(),
        elapsed,
        output,
    ))
}

/// Effect of swapping tire sizes on overall diameter and speedometer accuracy.
pub fn compare_tires(input: &TireComparisonInput) -> CalcResult<ComputationOutput<TireComparisonOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let original = tire_geometry(&input.original)?;
    let replacement = tire_geometry(&input.replacement)?;

    let reading = input.reference_speed.unwrap_or(DEFAULT_REFERENCE_SPEED);
    require_positive("reference_speed", reading)?;

    let diff_mm = replacement.diameter_mm - original.diameter_mm;
    let diff_pct = diff_mm / original.diameter_mm * dec!(100);
    let actual = reading
        .checked_mul(replacement.diameter_mm / original.diameter_mm)
        .ok_or_else(|| CalcError::invalid("reference_speed", "speed is too large"))?;
    let within_tolerance = diff_pct.abs() <= DIAMETER_TOLERANCE_PERCENT;
    if !within_tolerance {
        warnings.push(format!(
            "Diameter changes by more than {DIAMETER_TOLERANCE_PERCENT}%; speedometer and ABS calibration will be off"
        ));
    }

    let output = TireComparisonOutput {
        original,
        replacement,
        diameter_difference_mm: diff_mm,
        diameter_difference_percent: diff_pct,
        speedometer_reading: reading,
        actual_speed: actual,
        speedometer_error_percent: (actual - reading) / reading * dec!(100),
        within_tolerance,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Speed scales with overall tire diameter",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn size(w: Decimal, a: Decimal, r: Decimal) -> TireSize {
        TireSize {
            width_mm: w,
            aspect_ratio: a,
            rim_inches: r,
        }
    }

    #[test]
    fn test_parse_variants() {
        let expected = size(dec!(225), dec!(45), dec!(17));
        assert_eq!(parse_tire_size("225/45R17").unwrap(), expected);
        assert_eq!(parse_tire_size("P225/45ZR17").unwrap(), expected);
        assert_eq!(parse_tire_size(" 225/45-17 ").unwrap(), expected);
        assert_eq!(parse_tire_size("lt225/45 r17").unwrap(), expected);
        assert_eq!(expected.to_string(), "225/45R17");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_tire_size("22545R17").is_err());
        assert!(parse_tire_size("225/45").is_err());
        assert!(parse_tire_size("225/150R17").is_err());
    }

    #[test]
    fn test_geometry_225_45_17() {
        let g = tire_geometry(&size(dec!(225), dec!(45), dec!(17))).unwrap();
        assert_eq!(g.sidewall_mm, dec!(101.25));
        // 2 × 101.25 + 17 × 25.4
        assert_eq!(g.diameter_mm, dec!(634.3));
        assert!((g.diameter_in - dec!(24.972)).abs() < dec!(0.001));
        assert!((g.circumference_mm - dec!(1992.7)).abs() < dec!(0.1));
        assert!((g.revolutions_per_km - dec!(501.8)).abs() < dec!(0.1));
    }

    #[test]
    fn test_larger_tire_reads_low() {
        let input = TireComparisonInput {
            original: size(dec!(225), dec!(45), dec!(17)),
            replacement: size(dec!(245), dec!(45), dec!(17)),
            reference_speed: None,
        };
        let out = compare_tires(&input).unwrap();
        let r = &out.result;
        assert_eq!(r.diameter_difference_mm, dec!(18));
        assert!(r.actual_speed > dec!(60));
        assert!(r.speedometer_error_percent > Decimal::ZERO);
        assert!(r.within_tolerance);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_large_change_flagged() {
        let input = TireComparisonInput {
            original: size(dec!(205), dec!(55), dec!(16)),
            replacement: size(dec!(275), dec!(60), dec!(18)),
            reference_speed: Some(dec!(100)),
        };
        let out = compare_tires(&input).unwrap();
        assert!(!out.result.within_tolerance);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_form_with_separate_fields() {
        let form = FormValues::new()
            .with("width_mm", "205")
            .with("aspect_ratio", "55")
            .with("rim_inches", "16");
        assert_eq!(
            TireSize::try_from(&form).unwrap(),
            size(dec!(205), dec!(55), dec!(16))
        );
    }

    #[test]
    fn test_sizes_outside_range_rejected_before_geometry() {
        assert!(tire_geometry(&size(dec!(1000000000000000000000000000), dec!(45), dec!(17))).is_err());

        let input = TireComparisonInput {
            original: size(dec!(205), dec!(55), dec!(16)),
            replacement: size(dec!(275), dec!(60), dec!(18)),
            reference_speed: Some(Decimal::MAX),
        };
        assert!(matches!(
            compare_tires(&input),
            Err(CalcError::InvalidInput { ref field, .. }) if field == "reference_speed"
        ));
    }
}
