use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::CalcError;
use crate::input::{require_non_negative, require_positive, FormValues};
use crate::types::{with_metadata, ComputationOutput, Percent};
use crate::CalcResult;

pub const LN_2: Decimal = dec!(0.6931471805599453094172321215);

const CURVE_POINTS: u32 = 20;
/// The curve spans at least this many half-lives.
const CURVE_MIN_HALF_LIVES: Decimal = dec!(4);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Three of the four quantities; the missing one is solved for. Time units
/// are whatever the user chose, as long as half-life and elapsed time agree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecayInput {
    #[serde(default)]
    pub initial_amount: Option<Decimal>,
    #[serde(default)]
    pub remaining_amount: Option<Decimal>,
    #[serde(default)]
    pub half_life: Option<Decimal>,
    #[serde(default)]
    pub elapsed_time: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayUnknown {
    InitialAmount,
    RemainingAmount,
    HalfLife,
    ElapsedTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayPoint {
    pub time: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayOutput {
    pub solved_for: DecayUnknown,
    pub initial_amount: Decimal,
    pub remaining_amount: Decimal,
    pub half_life: Decimal,
    pub elapsed_time: Decimal,
    /// λ = ln 2 / t½
    pub decay_constant: Decimal,
    /// τ = 1 / λ
    pub mean_lifetime: Decimal,
    /// `None` when the count is too large for a Decimal.
    pub half_lives_elapsed: Option<Decimal>,
    pub percent_remaining: Percent,
    pub curve: Vec<DecayPoint>,
}

impl TryFrom<&FormValues> for DecayInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        Ok(DecayInput {
            initial_amount: form.optional("initial_amount")?,
            remaining_amount: form.optional("remaining_amount")?,
            half_life: form.optional("half_life")?,
            elapsed_time: form.optional("elapsed_time")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// e^x, reduced to `2^k · e^r` with |r| ≤ ln2/2 before summing the series.
/// `None` when the result is too large for a Decimal; results too small
/// collapse to zero.
fn exp_decimal(x: Decimal) -> Option<Decimal> {
    let k = x.checked_div(LN_2)?.round();
    let r = x - k * LN_2;

    let mut sum = Decimal::ONE;
    let mut term = Decimal::ONE;
    for n in 1..=40u32 {
        term = term * r / Decimal::from(n);
        if term.is_zero() {
            break;
        }
        sum += term;
    }

    let two = Decimal::TWO;
    let mut k = k.to_i64()?;
    while k > 0 {
        sum = sum.checked_mul(two)?;
        k -= 1;
    }
    while k < 0 && !sum.is_zero() {
        sum /= two;
        k += 1;
    }
    Some(sum)
}

/// e^(−x) for x ≥ 0. Values too small for Decimal collapse to zero.
fn decay_factor(x: Decimal) -> Decimal {
    exp_decimal(-x).unwrap_or(Decimal::ZERO)
}

/// `ln2 · t / t½`, the exponent of the decay. `None` past the Decimal range.
fn decay_exponent(t: Decimal, t_half: Decimal) -> Option<Decimal> {
    t.checked_div(t_half)?.checked_mul(LN_2)
}

fn out_of_range(what: &str) -> CalcError {
    CalcError::DomainError(format!("{what} is too large to represent"))
}

/// ln x as `k·ln2 + 2·atanh((m−1)/(m+1))` with `m = x / 2^k` in [1, 2).
fn ln(field: &str, value: Decimal) -> CalcResult<Decimal> {
    if value <= Decimal::ZERO {
        return Err(CalcError::invalid(field, "must be greater than zero"));
    }
    let two = Decimal::TWO;
    let mut m = value;
    let mut k = Decimal::ZERO;
    while m >= two {
        m /= two;
        k += Decimal::ONE;
    }
    while m < Decimal::ONE {
        m *= two;
        k -= Decimal::ONE;
    }

    let z = (m - Decimal::ONE) / (m + Decimal::ONE);
    let z2 = z * z;
    let mut power = z;
    let mut series = Decimal::ZERO;
    for n in (1..200u32).step_by(2) {
        let term = power / Decimal::from(n);
        if term.is_zero() {
            break;
        }
        series += term;
        power *= z2;
    }
    Ok(k * LN_2 + two * series)
}

fn which_unknown(input: &DecayInput) -> CalcResult<DecayUnknown> {
    let missing: Vec<DecayUnknown> = [
        (input.initial_amount, DecayUnknown::InitialAmount),
        (input.remaining_amount, DecayUnknown::RemainingAmount),
        (input.half_life, DecayUnknown::HalfLife),
        (input.elapsed_time, DecayUnknown::ElapsedTime),
    ]
    .into_iter()
    .filter(|(value, _)| value.is_none())
    .map(|(_, unknown)| unknown)
    .collect();

    match missing.as_slice() {
        [one] => Ok(*one),
        [] => Err(CalcError::DomainError(
            "leave exactly one field blank to solve for it".into(),
        )),
        _ => Err(CalcError::DomainError(
            "enter three of the four values to solve for the fourth".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Solve `N(t) = N0 · e^(−λt)`, `λ = ln 2 / t½` for whichever quantity is missing.
pub fn solve_decay(input: &DecayInput) -> CalcResult<ComputationOutput<DecayOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let unknown = which_unknown(input)?;
    for (field, value) in [
        ("initial_amount", input.initial_amount),
        ("remaining_amount", input.remaining_amount),
        ("half_life", input.half_life),
    ] {
        if let Some(v) = value {
            require_positive(field, v)?;
        }
    }
    if let Some(t) = input.elapsed_time {
        require_non_negative("elapsed_time", t)?;
    }
    if let (Some(n0), Some(n)) = (input.initial_amount, input.remaining_amount) {
        if n > n0 {
            return Err(CalcError::DomainError(
                "remaining amount cannot exceed the initial amount".into(),
            ));
        }
    }

    debug!(?unknown, "solving exponential decay");

    let (n0, n, half_life, elapsed) = match unknown {
        DecayUnknown::RemainingAmount => {
            let (n0, t_half, t) = (
                input.initial_amount.unwrap_or_default(),
                input.half_life.unwrap_or_default(),
                input.elapsed_time.unwrap_or_default(),
            );
            // An exponent past the Decimal range has decayed to nothing.
            let n = n0 * decay_exponent(t, t_half).map_or(Decimal::ZERO, decay_factor);
            if n.is_zero() {
                warnings.push("Remaining amount is below the representable precision".into());
            }
            (n0, n, t_half, t)
        }
        DecayUnknown::InitialAmount => {
            let (n, t_half, t) = (
                input.remaining_amount.unwrap_or_default(),
                input.half_life.unwrap_or_default(),
                input.elapsed_time.unwrap_or_default(),
            );
            let growth = decay_exponent(t, t_half).and_then(exp_decimal).ok_or_else(|| {
                CalcError::DomainError("too many half-lives elapsed to recover the initial amount".into())
            })?;
            let n0 = n
                .checked_mul(growth)
                .ok_or_else(|| CalcError::DomainError("initial amount is too large to represent".into()))?;
            (n0, n, t_half, t)
        }
        DecayUnknown::ElapsedTime => {
            let (n0, n, t_half) = (
                input.initial_amount.unwrap_or_default(),
                input.remaining_amount.unwrap_or_default(),
                input.half_life.unwrap_or_default(),
            );
            let decayed = ln("initial_amount", n0)? - ln("remaining_amount", n)?;
            let t = t_half
                .checked_mul(decayed)
                .and_then(|v| v.checked_div(LN_2))
                .ok_or_else(|| out_of_range("elapsed time"))?;
            (n0, n, t_half, t)
        }
        DecayUnknown::HalfLife => {
            let (n0, n, t) = (
                input.initial_amount.unwrap_or_default(),
                input.remaining_amount.unwrap_or_default(),
                input.elapsed_time.unwrap_or_default(),
            );
            if n == n0 {
                return Err(CalcError::DomainError(
                    "nothing has decayed, so the half-life cannot be determined".into(),
                ));
            }
            if t.is_zero() {
                return Err(CalcError::DomainError(
                    "elapsed time must be greater than zero to determine the half-life".into(),
                ));
            }
            let decayed = ln("initial_amount", n0)? - ln("remaining_amount", n)?;
            let t_half = (t * LN_2)
                .checked_div(decayed)
                .ok_or_else(|| out_of_range("half-life"))?;
            (n0, n, t_half, t)
        }
    };

    let lambda = LN_2
        .checked_div(half_life)
        .ok_or_else(|| out_of_range("decay constant"))?;
    let mean_lifetime = half_life
        .checked_div(LN_2)
        .ok_or_else(|| out_of_range("mean lifetime"))?;
    let half_lives_elapsed = elapsed.checked_div(half_life);
    if half_lives_elapsed.is_none() {
        warnings.push("Elapsed time spans more half-lives than can be counted".into());
    }

    let span = half_life
        .checked_mul(CURVE_MIN_HALF_LIVES)
        .unwrap_or(Decimal::MAX)
        .max(elapsed);
    let step = span / Decimal::from(CURVE_POINTS);
    let curve = (0..=CURVE_POINTS)
        .map(|i| {
            let time = step.checked_mul(Decimal::from(i)).unwrap_or(span).min(span);
            let factor = lambda
                .checked_mul(time)
                .map_or(Decimal::ZERO, decay_factor);
            DecayPoint {
                time,
                amount: n0 * factor,
            }
        })
        .collect();

    let output = DecayOutput {
        solved_for: unknown,
        initial_amount: n0,
        remaining_amount: n,
        half_life,
        elapsed_time: elapsed,
        decay_constant: lambda,
        mean_lifetime,
        half_lives_elapsed,
        percent_remaining: if n0.is_zero() {
            Decimal::ZERO
        } else {
            n / n0 * dec!(100)
        },
        curve,
    };

    let elapsed_us = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Exponential decay N(t) = N0·e^(−λt), λ = ln2 / t½",
        input,
        warnings,
        elapsed_us,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000001)
    }

    #[test]
    fn test_exp_and_ln() {
        assert!(close(exp_decimal(Decimal::ONE).unwrap(), dec!(2.718281828459045)));
        assert!(close(exp_decimal(dec!(-3)).unwrap(), dec!(0.049787068367864)));
        assert!(exp_decimal(dec!(100)).is_none());
        assert!(close(ln("x", dec!(10)).unwrap(), dec!(2.302585092994046)));
        assert!(close(ln("x", dec!(0.125)).unwrap(), -LN_2 * dec!(3)));
        assert!(ln("x", Decimal::ZERO).is_err());
    }

    #[test]
    fn test_two_half_lives_leave_a_quarter() {
        let input = DecayInput {
            initial_amount: Some(dec!(100)),
            half_life: Some(dec!(10)),
            elapsed_time: Some(dec!(20)),
            remaining_amount: None,
        };
        let r = solve_decay(&input).unwrap().result;
        assert_eq!(r.solved_for, DecayUnknown::RemainingAmount);
        assert!(close(r.remaining_amount, dec!(25)), "N={}", r.remaining_amount);
        assert!(close(r.half_lives_elapsed.unwrap(), dec!(2)));
    }

    #[test]
    fn test_solve_elapsed_time() {
        let input = DecayInput {
            initial_amount: Some(dec!(100)),
            remaining_amount: Some(dec!(12.5)),
            half_life: Some(dec!(5)),
            elapsed_time: None,
        };
        let r = solve_decay(&input).unwrap().result;
        assert!(close(r.elapsed_time, dec!(15)), "t={}", r.elapsed_time);
    }

    #[test]
    fn test_solve_half_life() {
        let input = DecayInput {
            initial_amount: Some(dec!(80)),
            remaining_amount: Some(dec!(20)),
            elapsed_time: Some(dec!(12)),
            half_life: None,
        };
        let r = solve_decay(&input).unwrap().result;
        assert!(close(r.half_life, dec!(6)), "t½={}", r.half_life);
    }

    #[test]
    fn test_solve_initial_amount() {
        let input = DecayInput {
            remaining_amount: Some(dec!(25)),
            half_life: Some(dec!(10)),
            elapsed_time: Some(dec!(20)),
            initial_amount: None,
        };
        let r = solve_decay(&input).unwrap().result;
        assert!(close(r.initial_amount, dec!(100)), "N0={}", r.initial_amount);
    }

    #[test]
    fn test_remaining_above_initial_is_domain_error() {
        let input = DecayInput {
            initial_amount: Some(dec!(10)),
            remaining_amount: Some(dec!(20)),
            half_life: Some(dec!(5)),
            elapsed_time: None,
        };
        assert!(matches!(solve_decay(&input), Err(CalcError::DomainError(_))));
    }

    #[test]
    fn test_requires_exactly_one_unknown() {
        assert!(solve_decay(&DecayInput::default()).is_err());
        let all = DecayInput {
            initial_amount: Some(dec!(100)),
            remaining_amount: Some(dec!(25)),
            half_life: Some(dec!(10)),
            elapsed_time: Some(dec!(20)),
        };
        assert!(solve_decay(&all).is_err());
    }

    #[test]
    fn test_no_decay_has_no_half_life() {
        let input = DecayInput {
            initial_amount: Some(dec!(50)),
            remaining_amount: Some(dec!(50)),
            elapsed_time: Some(dec!(3)),
            half_life: None,
        };
        assert!(solve_decay(&input).is_err());
    }

    #[test]
    fn test_curve_starts_at_initial_and_decays() {
        let input = DecayInput {
            initial_amount: Some(dec!(100)),
            half_life: Some(dec!(10)),
            elapsed_time: Some(dec!(20)),
            remaining_amount: None,
        };
        let r = solve_decay(&input).unwrap().result;
        assert_eq!(r.curve.len(), 21);
        assert!(close(r.curve[0].amount, dec!(100)));
        assert!(r.curve.windows(2).all(|w| w[1].amount < w[0].amount));
        assert_eq!(r.curve.last().unwrap().time, dec!(40));
    }

    #[test]
    fn test_mean_lifetime() {
        let input = DecayInput {
            initial_amount: Some(dec!(1)),
            half_life: Some(LN_2),
            elapsed_time: Some(dec!(1)),
            remaining_amount: None,
        };
        let r = solve_decay(&input).unwrap().result;
        assert!(close(r.decay_constant, dec!(1)));
        assert!(close(r.mean_lifetime, dec!(1)));
    }

    #[test]
    fn test_tiny_half_life_decays_to_zero() {
        let input = DecayInput {
            initial_amount: Some(dec!(100)),
            half_life: Some(dec!(0.0000000001)),
            elapsed_time: Some(dec!(100000000000000000000)),
            remaining_amount: None,
        };
        let out = solve_decay(&input).unwrap();
        assert_eq!(out.result.remaining_amount, Decimal::ZERO);
        assert_eq!(out.result.half_lives_elapsed, None);
        assert_eq!(out.result.curve[0].amount, dec!(100));
        assert!(out.result.curve[1..].iter().all(|p| p.amount.is_zero()));
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_tiny_remaining_amount_solves_elapsed_time() {
        let input = DecayInput {
            initial_amount: Some(dec!(100000000000000000000)),
            remaining_amount: Some(dec!(0.0000000001)),
            half_life: Some(dec!(5)),
            elapsed_time: None,
        };
        let r = solve_decay(&input).unwrap().result;
        // 1e30 is log2(1e30) ≈ 99.6578 half-lives.
        assert!(
            (r.elapsed_time - dec!(498.289214233)).abs() < dec!(0.00001),
            "t={}",
            r.elapsed_time
        );
    }

    #[test]
    fn test_unrepresentable_initial_amount_is_domain_error() {
        let input = DecayInput {
            remaining_amount: Some(dec!(1)),
            half_life: Some(dec!(0.0000000001)),
            elapsed_time: Some(dec!(100000000000000000000)),
            initial_amount: None,
        };
        assert!(matches!(solve_decay(&input), Err(CalcError::DomainError(_))));
    }
}
