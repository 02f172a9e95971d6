use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::CalcError;
use crate::input::{require_positive, FormValues};
use crate::types::{with_metadata, ComputationOutput};
use crate::CalcResult;

/// RPM at which horsepower and lb·ft torque curves cross.
pub const HP_TORQUE_CONSTANT: Decimal = dec!(5252);
pub const KW_PER_HP: Decimal = dec!(0.745699872);
pub const NM_PER_LBFT: Decimal = dec!(1.35581795);
/// Kilowatts per metric horsepower (PS).
pub const KW_PER_PS: Decimal = dec!(0.73549875);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Engine speed plus either a power figure or a torque figure. Power may be
/// given in hp or kW, torque in lb·ft or N·m.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerInput {
    pub rpm: Decimal,
    #[serde(default)]
    pub horsepower: Option<Decimal>,
    #[serde(default)]
    pub kilowatts: Option<Decimal>,
    #[serde(default)]
    pub torque_lbft: Option<Decimal>,
    #[serde(default)]
    pub torque_nm: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUnknown {
    Horsepower,
    Torque,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerOutput {
    pub solved_for: PowerUnknown,
    pub rpm: Decimal,
    pub horsepower: Decimal,
    pub kilowatts: Decimal,
    pub metric_horsepower: Decimal,
    pub torque_lbft: Decimal,
    pub torque_nm: Decimal,
}

impl TryFrom<&FormValues> for PowerInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        Ok(PowerInput {
            rpm: form.positive("rpm")?,
            horsepower: form.optional_positive("horsepower")?,
            kilowatts: form.optional_positive("kilowatts")?,
            torque_lbft: form.optional_positive("torque_lbft")?,
            torque_nm: form.optional_positive("torque_nm")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn too_large(field: &str) -> CalcError {
    CalcError::invalid(field, "value is too large to convert")
}

pub fn horsepower_from_torque(torque_lbft: Decimal, rpm: Decimal) -> CalcResult<Decimal> {
    torque_lbft
        .checked_mul(rpm)
        .map(|product| product / HP_TORQUE_CONSTANT)
        .ok_or_else(|| too_large("torque_lbft"))
}

pub fn torque_from_horsepower(horsepower: Decimal, rpm: Decimal) -> CalcResult<Decimal> {
    if rpm.is_zero() {
        return Err(CalcError::DivisionByZero {
            context: "torque at zero rpm".into(),
        });
    }
    horsepower
        .checked_mul(HP_TORQUE_CONSTANT)
        .and_then(|product| product.checked_div(rpm))
        .ok_or_else(|| too_large("horsepower"))
}

pub fn hp_to_kw(horsepower: Decimal) -> Decimal {
    horsepower * KW_PER_HP
}

pub fn kw_to_hp(kilowatts: Decimal) -> CalcResult<Decimal> {
    kilowatts.checked_div(KW_PER_HP).ok_or_else(|| too_large("kilowatts"))
}

pub fn lbft_to_nm(torque_lbft: Decimal) -> CalcResult<Decimal> {
    torque_lbft.checked_mul(NM_PER_LBFT).ok_or_else(|| too_large("torque_lbft"))
}

pub fn nm_to_lbft(torque_nm: Decimal) -> Decimal {
    torque_nm / NM_PER_LBFT
}

/// Whichever of two fields for the same quantity was filled in. A value in
/// the second field's unit goes through `to_first_unit`.
fn one_of(
    first: (&str, Option<Decimal>),
    second: (&str, Option<Decimal>),
    to_first_unit: impl FnOnce(Decimal) -> CalcResult<Decimal>,
) -> CalcResult<Option<Decimal>> {
    match (first.1, second.1) {
        (Some(_), Some(_)) => Err(CalcError::invalid(
            first.0,
            format!("enter either {} or {}, not both", first.0, second.0),
        )),
        (Some(v), None) => {
            require_positive(first.0, v)?;
            Ok(Some(v))
        }
        (None, Some(v)) => {
            require_positive(second.0, v)?;
            to_first_unit(v).map(Some)
        }
        (None, None) => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Solve the missing side of `HP = torque × RPM / 5252` and express both in
/// every unit.
pub fn convert_power(input: &PowerInput) -> CalcResult<ComputationOutput<PowerOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    require_positive("rpm", input.rpm)?;

    let power = one_of(("horsepower", input.horsepower), ("kilowatts", input.kilowatts), kw_to_hp)?;
    let torque = one_of(("torque_lbft", input.torque_lbft), ("torque_nm", input.torque_nm), |nm| {
        Ok(nm_to_lbft(nm))
    })?;

    let (solved_for, hp, lbft) = match (power, torque) {
        (Some(hp), None) => (PowerUnknown::Torque, hp, torque_from_horsepower(hp, input.rpm)?),
        (None, Some(lbft)) => (
            PowerUnknown::Horsepower,
            horsepower_from_torque(lbft, input.rpm)?,
            lbft,
        ),
        (Some(_), Some(_)) => {
            return Err(CalcError::DomainError(
                "enter power or torque, and leave the other blank".into(),
            ))
        }
        (None, None) => {
            return Err(CalcError::DomainError(
                "enter a power or a torque figure to convert".into(),
            ))
        }
    };

    if input.rpm > dec!(20000) {
        warnings.push("Engine speed is above 20,000 rpm".into());
    }
    debug!(?solved_for, rpm = %input.rpm, "power/torque conversion");

    let kilowatts = hp_to_kw(hp);
    let output = PowerOutput {
        solved_for,
        rpm: input.rpm,
        horsepower: hp,
        kilowatts,
        metric_horsepower: kilowatts.checked_div(KW_PER_PS).ok_or_else(|| too_large("horsepower"))?,
        torque_lbft: lbft,
        torque_nm: lbft_to_nm(lbft)?,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "HP = lb·ft × RPM / 5252",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_torque_to_horsepower() {
        let input = PowerInput {
            rpm: dec!(5252),
            torque_lbft: Some(dec!(300)),
            ..Default::default()
        };
        let r = convert_power(&input).unwrap().result;
        assert_eq!(r.solved_for, PowerUnknown::Horsepower);
        assert_eq!(r.horsepower, dec!(300));
        assert_eq!(r.kilowatts, dec!(223.7099616));
    }

    #[test]
    fn test_horsepower_to_torque() {
        let input = PowerInput {
            rpm: dec!(6000),
            horsepower: Some(dec!(400)),
            ..Default::default()
        };
        let r = convert_power(&input).unwrap().result;
        assert_eq!(r.solved_for, PowerUnknown::Torque);
        // 400 × 5252 / 6000
        assert!((r.torque_lbft - dec!(350.1333)).abs() < dec!(0.0001));
        assert!((r.torque_nm - dec!(474.7170)).abs() < dec!(0.001));
    }

    #[test]
    fn test_metric_inputs() {
        let input = PowerInput {
            rpm: dec!(4000),
            kilowatts: Some(dec!(745.699872)),
            ..Default::default()
        };
        let r = convert_power(&input).unwrap().result;
        assert_eq!(r.horsepower, dec!(1000));
    }

    #[test]
    fn test_both_or_neither_rejected() {
        let both = PowerInput {
            rpm: dec!(3000),
            horsepower: Some(dec!(100)),
            torque_lbft: Some(dec!(100)),
            ..Default::default()
        };
        assert!(convert_power(&both).is_err());

        let neither = PowerInput {
            rpm: dec!(3000),
            ..Default::default()
        };
        assert!(convert_power(&neither).is_err());

        let two_units = PowerInput {
            rpm: dec!(3000),
            horsepower: Some(dec!(100)),
            kilowatts: Some(dec!(75)),
            ..Default::default()
        };
        assert!(matches!(
            convert_power(&two_units),
            Err(CalcError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_zero_rpm_rejected() {
        let input = PowerInput {
            rpm: Decimal::ZERO,
            horsepower: Some(dec!(100)),
            ..Default::default()
        };
        assert!(convert_power(&input).is_err());
    }

    #[test]
    fn test_figures_past_decimal_range_rejected() {
        let huge = Decimal::MAX / dec!(2);
        let torque = PowerInput {
            rpm: dec!(6000),
            torque_lbft: Some(huge),
            ..Default::default()
        };
        assert!(matches!(
            convert_power(&torque),
            Err(CalcError::InvalidInput { ref field, .. }) if field == "torque_lbft"
        ));

        let power = PowerInput {
            rpm: dec!(1),
            kilowatts: Some(Decimal::MAX),
            ..Default::default()
        };
        assert!(matches!(
            convert_power(&power),
            Err(CalcError::InvalidInput { ref field, .. }) if field == "kilowatts"
        ));
    }
}
