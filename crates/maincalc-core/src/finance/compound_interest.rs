use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

use super::loan::MONTHS_PER_YEAR;
use crate::error::CalcError;
use crate::input::{require_non_negative, require_range, FormValues};
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::CalcResult;

const MAX_YEARS: u32 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundingFrequency {
    Annually,
    SemiAnnually,
    Quarterly,
    #[default]
    Monthly,
    Daily,
}

impl CompoundingFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            CompoundingFrequency::Annually => 1,
            CompoundingFrequency::SemiAnnually => 2,
            CompoundingFrequency::Quarterly => 4,
            CompoundingFrequency::Monthly => 12,
            CompoundingFrequency::Daily => 365,
        }
    }
}

impl FromStr for CompoundingFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "annually" | "annual" | "yearly" | "1" => Ok(CompoundingFrequency::Annually),
            "semiannually" | "semiannual" | "2" => Ok(CompoundingFrequency::SemiAnnually),
            "quarterly" | "4" => Ok(CompoundingFrequency::Quarterly),
            "monthly" | "12" => Ok(CompoundingFrequency::Monthly),
            "daily" | "365" => Ok(CompoundingFrequency::Daily),
            other => Err(format!(
                "unknown compounding '{other}', expected annually, semi-annually, quarterly, monthly or daily"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundInterestInput {
    pub principal: Money,
    pub annual_rate_percent: Percent,
    pub years: u32,
    #[serde(default)]
    pub compounding: CompoundingFrequency,
    /// Deposited at the end of every month.
    #[serde(default)]
    pub monthly_contribution: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundYear {
    pub year: u32,
    pub deposits: Money,
    pub interest: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundInterestOutput {
    pub future_value: Money,
    pub total_contributions: Money,
    pub total_interest: Money,
    pub effective_annual_rate_percent: Percent,
    /// Interest the starting principal alone would earn without compounding.
    pub simple_interest: Money,
    pub yearly: Vec<CompoundYear>,
}

impl TryFrom<&FormValues> for CompoundInterestInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        Ok(CompoundInterestInput {
            principal: form.non_negative("principal")?,
            annual_rate_percent: form.in_range("annual_rate_percent", Decimal::ZERO, dec!(100))?,
            years: form.whole("years")?,
            compounding: form.choice_or("compounding", CompoundingFrequency::Monthly)?,
            monthly_contribution: form.optional_non_negative("monthly_contribution")?.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

fn overflow() -> CalcError {
    CalcError::invalid("annual_rate_percent", "rate and term overflow")
}

/// Interest without compounding: `P × rate × years`.
pub fn simple_interest(principal: Money, annual_rate_percent: Percent, years: Decimal) -> CalcResult<Money> {
    (annual_rate_percent / dec!(100))
        .checked_mul(years)
        .and_then(|factor| principal.checked_mul(factor))
        .ok_or_else(overflow)
}

/// `(1 + r/n)^n − 1` as a fraction.
pub fn effective_annual_rate(annual_rate_percent: Percent, compounding: CompoundingFrequency) -> Decimal {
    let n = compounding.periods_per_year();
    let factor = Decimal::ONE + annual_rate_percent / dec!(100) / Decimal::from(n);
    let mut growth = Decimal::ONE;
    for _ in 0..n {
        growth *= factor;
    }
    growth - Decimal::ONE
}

/// `k`-th root by Newton's method. Converges from above for any
/// `value >= 1`, so the loop stops once an iterate no longer decreases.
fn nth_root(value: Decimal, k: u32) -> CalcResult<Decimal> {
    if value == Decimal::ONE || k == 1 {
        return Ok(value);
    }
    let k_dec = Decimal::from(k);
    let mut x = Decimal::ONE + (value - Decimal::ONE) / k_dec;
    for _ in 0..200 {
        let mut power = Decimal::ONE;
        for _ in 0..k - 1 {
            power = power.checked_mul(x).ok_or_else(overflow)?;
        }
        let next = x - (power.checked_mul(x).ok_or_else(overflow)? - value) / (k_dec * power);
        if next >= x {
            break;
        }
        x = next;
    }
    Ok(x)
}

/// Growth factor applied each month: the 12th root of the year's growth
/// under the chosen compounding.
fn monthly_growth(annual_rate_percent: Percent, compounding: CompoundingFrequency) -> CalcResult<Decimal> {
    let n = compounding.periods_per_year();
    let per_period = Decimal::ONE + annual_rate_percent / dec!(100) / Decimal::from(n);
    if n == MONTHS_PER_YEAR {
        return Ok(per_period);
    }
    let annual = Decimal::ONE + effective_annual_rate(annual_rate_percent, compounding);
    nth_root(annual, MONTHS_PER_YEAR)
}

/// Future value with periodic compounding and optional monthly deposits.
pub fn calculate_compound_interest(
    input: &CompoundInterestInput,
) -> CalcResult<ComputationOutput<CompoundInterestOutput>> {
    let start = Instant::now();

    require_non_negative("principal", input.principal)?;
    require_non_negative("monthly_contribution", input.monthly_contribution)?;
    require_range("annual_rate_percent", input.annual_rate_percent, Decimal::ZERO, dec!(100))?;
    if input.years == 0 || input.years > MAX_YEARS {
        return Err(CalcError::invalid("years", "must be between 1 and 100"));
    }
    if input.principal.is_zero() && input.monthly_contribution.is_zero() {
        return Err(CalcError::invalid(
            "principal",
            "enter a starting amount or a monthly contribution",
        ));
    }

    debug!(principal = %input.principal, years = input.years, "calculating compound interest");

    let monthly_rate = monthly_growth(input.annual_rate_percent, input.compounding)? - Decimal::ONE;
    let deposits = input
        .monthly_contribution
        .checked_mul(Decimal::from(MONTHS_PER_YEAR))
        .ok_or_else(overflow)?;
    let mut balance = input.principal;
    let mut yearly = Vec::with_capacity(input.years as usize);

    for year in 1..=input.years {
        let mut interest = Decimal::ZERO;
        for _ in 0..MONTHS_PER_YEAR {
            let earned = balance.checked_mul(monthly_rate).ok_or_else(overflow)?;
            interest = interest.checked_add(earned).ok_or_else(overflow)?;
            balance = balance
                .checked_add(earned)
                .and_then(|b| b.checked_add(input.monthly_contribution))
                .ok_or_else(overflow)?;
        }
        yearly.push(CompoundYear {
            year,
            deposits,
            interest,
            balance,
        });
    }

    let months = Decimal::from(input.years * MONTHS_PER_YEAR);
    let total_contributions = input
        .monthly_contribution
        .checked_mul(months)
        .and_then(|paid| paid.checked_add(input.principal))
        .ok_or_else(overflow)?;

    let output = CompoundInterestOutput {
        future_value: balance,
        total_contributions,
        total_interest: balance - total_contributions,
        effective_annual_rate_percent: effective_annual_rate(input.annual_rate_percent, input.compounding)
            * dec!(100),
        simple_interest: simple_interest(input.principal, input.annual_rate_percent, Decimal::from(input.years))?,
        yearly,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly projection at the equivalent monthly growth of the chosen compounding",
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

    fn lump_sum(compounding: CompoundingFrequency) -> CompoundInterestInput {
        CompoundInterestInput {
            principal: dec!(10_000),
            annual_rate_percent: dec!(5),
            years: 10,
            compounding,
            monthly_contribution: Decimal::ZERO,
        }
    }

    #[test]
    fn test_annual_compounding_lump_sum() {
        let out = calculate_compound_interest(&lump_sum(CompoundingFrequency::Annually)).unwrap();
        // 10,000 × 1.05^10
        assert!((out.result.future_value - dec!(16288.95)).abs() < dec!(0.01));
    }

    #[test]
    fn test_monthly_compounding_lump_sum() {
        let out = calculate_compound_interest(&lump_sum(CompoundingFrequency::Monthly)).unwrap();
        // 10,000 × (1 + 0.05/12)^120
        assert!((out.result.future_value - dec!(16470.09)).abs() < dec!(0.01));
    }

    #[test]
    fn test_more_frequent_compounding_earns_more() {
        let annual = calculate_compound_interest(&lump_sum(CompoundingFrequency::Annually)).unwrap();
        let daily = calculate_compound_interest(&lump_sum(CompoundingFrequency::Daily)).unwrap();
        assert!(daily.result.future_value > annual.result.future_value);
    }

    #[test]
    fn test_contributions_only() {
        let input = CompoundInterestInput {
            principal: Decimal::ZERO,
            annual_rate_percent: Decimal::ZERO,
            years: 2,
            compounding: CompoundingFrequency::Monthly,
            monthly_contribution: dec!(100),
        };
        let r = calculate_compound_interest(&input).unwrap().result;
        assert_eq!(r.future_value, dec!(2400));
        assert_eq!(r.total_interest, Decimal::ZERO);
        assert_eq!(r.yearly.len(), 2);
        assert_eq!(r.yearly[0].balance, dec!(1200));
    }

    #[test]
    fn test_effective_annual_rate() {
        let ear = effective_annual_rate(dec!(12), CompoundingFrequency::Monthly);
        assert!((ear - dec!(0.126825)).abs() < dec!(0.000001));
        assert_eq!(effective_annual_rate(dec!(5), CompoundingFrequency::Annually), dec!(0.05));
    }

    #[test]
    fn test_nth_root() {
        let root = nth_root(dec!(1.05), 12).unwrap();
        let mut back = Decimal::ONE;
        for _ in 0..12 {
            back *= root;
        }
        assert!((back - dec!(1.05)).abs() < dec!(0.0000000001));
        assert_eq!(nth_root(Decimal::ONE, 12).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_balance_past_decimal_range_is_rejected() {
        // 1000 × (13/12)^1200 is far beyond Decimal::MAX.
        let input = CompoundInterestInput {
            principal: dec!(1000),
            annual_rate_percent: dec!(100),
            years: 100,
            compounding: CompoundingFrequency::Monthly,
            monthly_contribution: Decimal::ZERO,
        };
        let err = calculate_compound_interest(&input).unwrap_err();
        assert!(matches!(
            err,
            CalcError::InvalidInput { ref field, .. } if field == "annual_rate_percent"
        ));

        let huge_deposit = CompoundInterestInput {
            principal: Decimal::ZERO,
            monthly_contribution: Decimal::MAX / dec!(2),
            annual_rate_percent: dec!(1),
            years: 1,
            compounding: CompoundingFrequency::Annually,
        };
        assert!(calculate_compound_interest(&huge_deposit).is_err());
    }

    #[test]
    fn test_simple_interest() {
        assert_eq!(simple_interest(dec!(1000), dec!(5), dec!(3)).unwrap(), dec!(150));
    }

    #[test]
    fn test_nothing_to_grow_rejected() {
        let mut input = lump_sum(CompoundingFrequency::Monthly);
        input.principal = Decimal::ZERO;
        assert!(calculate_compound_interest(&input).is_err());
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!(
            "Semi-Annually".parse::<CompoundingFrequency>().unwrap(),
            CompoundingFrequency::SemiAnnually
        );
        assert!("hourly".parse::<CompoundingFrequency>().is_err());
    }
}
