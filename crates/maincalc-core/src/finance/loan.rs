use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::CalcError;
use crate::input::{require_non_negative, require_positive, require_range, FormValues};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::CalcResult;

/// Upper bound on schedule length, as a multiple of the nominal number of
/// payments. A payment that never covers the accruing interest stops here
/// instead of looping forever.
pub const SAFETY_CAP_MULTIPLIER: Decimal = dec!(1.5);

pub const MONTHS_PER_YEAR: u32 = 12;
const MAX_TERM_YEARS: Decimal = dec!(50);
const MAX_RATE_PERCENT: Decimal = dec!(100);
/// A balance this close to zero after a payment is treated as repaid.
const SETTLE_TOLERANCE: Money = dec!(0.000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Amortizing loan with an optional fixed extra principal payment per month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanInput {
    pub principal: Money,
    pub annual_rate_percent: Percent,
    pub term_years: Decimal,
    #[serde(default)]
    pub extra_payment: Option<Money>,
    /// First payment falls one month after this date.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

/// A loan repaid with a user-chosen monthly payment instead of the annuity
/// payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedPaymentInput {
    pub principal: Money,
    pub annual_rate_percent: Percent,
    pub monthly_payment: Money,
    /// Nominal term, used to size the safety cap.
    pub term_years: Decimal,
}

/// One payment period of an amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub period: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Cash paid this period: interest plus all principal, extra included.
    pub payment: Money,
    /// Principal repaid this period, extra included.
    pub principal: Money,
    pub interest: Money,
    pub extra_payment: Money,
    pub remaining_balance: Money,
}

/// Calendar-year (or loan-year when undated) roll-up of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub ending_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanOutput {
    pub monthly_payment: Money,
    pub total_monthly_payment: Money,
    pub number_of_payments: u32,
    pub payoff_periods: u32,
    pub periods_saved: u32,
    pub total_paid: Money,
    pub total_interest: Money,
    pub interest_saved: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payoff_date: Option<NaiveDate>,
    pub converged: bool,
    pub schedule: Vec<AmortizationRow>,
    pub yearly: Vec<YearSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedPaymentOutput {
    pub monthly_payment: Money,
    /// Payments at or below this never reduce the balance.
    pub interest_only_threshold: Money,
    pub payoff_periods: u32,
    pub total_paid: Money,
    pub total_interest: Money,
    pub final_balance: Money,
    pub converged: bool,
    pub schedule: Vec<AmortizationRow>,
}

/// Raw output of the period loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub rows: Vec<AmortizationRow>,
    pub converged: bool,
}

impl Schedule {
    pub fn total_interest(&self) -> Money {
        self.rows.iter().map(|r| r.interest).sum()
    }

    pub fn total_paid(&self) -> Money {
        self.rows.iter().map(|r| r.payment).sum()
    }

    pub fn final_balance(&self) -> Money {
        self.rows.last().map(|r| r.remaining_balance).unwrap_or(Decimal::ZERO)
    }
}

impl TryFrom<&FormValues> for LoanInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        Ok(LoanInput {
            principal: form.positive("principal")?,
            annual_rate_percent: form.in_range("annual_rate_percent", Decimal::ZERO, MAX_RATE_PERCENT)?,
            term_years: form.positive("term_years")?,
            extra_payment: form.optional_non_negative("extra_payment")?,
            start_date: form.date("start_date")?,
        })
    }
}

impl TryFrom<&FormValues> for FixedPaymentInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        Ok(FixedPaymentInput {
            principal: form.positive("principal")?,
            annual_rate_percent: form.in_range("annual_rate_percent", Decimal::ZERO, MAX_RATE_PERCENT)?,
            monthly_payment: form.positive("monthly_payment")?,
            term_years: form.positive("term_years")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Compute (1 + r)^n via iterative multiplication (avoids Decimal::powd drift).
fn overflow() -> CalcError {
    CalcError::invalid("annual_rate_percent", "rate and term overflow")
}

fn compound(rate: Rate, n: u32) -> CalcResult<Decimal> {
    let factor = Decimal::ONE + rate;
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = result.checked_mul(factor).ok_or_else(overflow)?;
    }
    Ok(result)
}

/// Monthly rate as a fraction from an annual percentage.
pub fn monthly_rate(annual_rate_percent: Percent) -> Rate {
    annual_rate_percent / dec!(100) / Decimal::from(MONTHS_PER_YEAR)
}

/// Number of monthly payments in a term, rounded to the nearest month.
pub fn term_periods(term_years: Decimal) -> CalcResult<u32> {
    (term_years * Decimal::from(MONTHS_PER_YEAR))
        .round()
        .to_u32()
        .filter(|n| *n > 0)
        .ok_or_else(|| CalcError::invalid("term_years", "term must be at least one month"))
}

/// Maximum number of schedule rows for a nominal term.
pub fn safety_cap(nominal_periods: u32) -> u32 {
    (Decimal::from(nominal_periods) * SAFETY_CAP_MULTIPLIER)
        .ceil()
        .to_u32()
        .unwrap_or(u32::MAX)
}

fn payment_date(start: Option<NaiveDate>, period: u32) -> Option<NaiveDate> {
    start.and_then(|d| d.checked_add_months(Months::new(period)))
}

fn validate_common(principal: Money, annual_rate_percent: Percent, term_years: Decimal) -> CalcResult<()> {
    require_positive("principal", principal)?;
    require_range("annual_rate_percent", annual_rate_percent, Decimal::ZERO, MAX_RATE_PERCENT)?;
    require_positive("term_years", term_years)?;
    if term_years > MAX_TERM_YEARS {
        return Err(CalcError::invalid("term_years", "term cannot exceed 50 years"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Level annuity payment `P·r·(1+r)^n / ((1+r)^n − 1)`, or `P/n` at a zero rate.
pub fn monthly_payment(principal: Money, periodic_rate: Rate, periods: u32) -> CalcResult<Money> {
    if periods == 0 {
        return Err(CalcError::invalid("periods", "number of payments must be > 0"));
    }
    if periodic_rate.is_zero() {
        return Ok(principal / Decimal::from(periods));
    }

    let factor = compound(periodic_rate, periods)?;
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(CalcError::DivisionByZero {
            context: "annuity payment factor".into(),
        });
    }
    // Payment per unit borrowed first, so a large principal only meets a
    // factor close to the periodic rate.
    let per_unit = periodic_rate * factor / denominator;
    principal
        .checked_mul(per_unit)
        .ok_or_else(|| CalcError::invalid("principal", "amount too large to amortize"))
}

/// Period-by-period amortization. Stops once the balance is repaid or after
/// `safety_cap(nominal_periods)` rows, whichever comes first.
pub fn amortization_schedule(
    principal: Money,
    periodic_rate: Rate,
    payment: Money,
    extra: Money,
    nominal_periods: u32,
    start_date: Option<NaiveDate>,
) -> Schedule {
    let cap = safety_cap(nominal_periods);
    let mut rows = Vec::with_capacity(nominal_periods as usize);
    let mut balance = principal;
    let mut paid_so_far = Decimal::ZERO;
    let mut interest_so_far = Decimal::ZERO;

    // Rows stop early if a balance or running total would leave the Decimal
    // range, so every sum over the rows fits.
    for period in 1..=cap {
        if balance <= Decimal::ZERO {
            break;
        }

        // A runaway balance can outgrow Decimal; treat that like hitting the cap.
        let Some(interest) = balance.checked_mul(periodic_rate) else {
            break;
        };
        let scheduled_principal = payment - interest;
        // An extra payment too large to add clears the balance anyway.
        let mut principal_paid = scheduled_principal.checked_add(extra).unwrap_or(balance);
        if balance
            .checked_sub(principal_paid)
            .is_some_and(|left| left <= SETTLE_TOLERANCE)
        {
            principal_paid = balance;
        }
        let extra_applied = (principal_paid - scheduled_principal)
            .max(Decimal::ZERO)
            .min(extra);

        let Some(next_balance) = balance.checked_sub(principal_paid) else {
            break;
        };
        let Some(row_payment) = interest.checked_add(principal_paid) else {
            break;
        };
        let (Some(paid), Some(charged)) = (
            paid_so_far.checked_add(row_payment),
            interest_so_far.checked_add(interest),
        ) else {
            break;
        };
        balance = next_balance;
        paid_so_far = paid;
        interest_so_far = charged;

        rows.push(AmortizationRow {
            period,
            date: payment_date(start_date, period),
            payment: row_payment,
            principal: principal_paid,
            interest,
            extra_payment: extra_applied,
            remaining_balance: balance,
        });
    }

    let converged = balance <= Decimal::ZERO;
    if !converged {
        warn!(
            cap,
            remaining = %balance,
            "amortization stopped at safety cap before the balance was repaid"
        );
    }

    Schedule { rows, converged }
}

/// Roll a schedule up by calendar year when dated, loan year otherwise.
pub fn yearly_summary(rows: &[AmortizationRow]) -> Vec<YearSummary> {
    let mut years: Vec<YearSummary> = Vec::new();

    for row in rows {
        let year = match row.date {
            Some(d) => d.year(),
            None => ((row.period - 1) / MONTHS_PER_YEAR + 1) as i32,
        };

        match years.last_mut() {
            Some(last) if last.year == year => {
                last.principal_paid += row.principal;
                last.interest_paid += row.interest;
                last.ending_balance = row.remaining_balance;
            }
            _ => years.push(YearSummary {
                year,
                principal_paid: row.principal,
                interest_paid: row.interest,
                ending_balance: row.remaining_balance,
            }),
        }
    }

    years
}

/// Standard amortizing loan: level payment, full schedule, and the effect of
/// any extra monthly principal.
pub fn calculate_loan(input: &LoanInput) -> CalcResult<ComputationOutput<LoanOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_common(input.principal, input.annual_rate_percent, input.term_years)?;
    let extra = input.extra_payment.unwrap_or(Decimal::ZERO);
    require_non_negative("extra_payment", extra)?;

    debug!(
        principal = %input.principal,
        rate = %input.annual_rate_percent,
        term_years = %input.term_years,
        "calculating loan"
    );

    let n = term_periods(input.term_years)?;
    let r = monthly_rate(input.annual_rate_percent);
    let payment = monthly_payment(input.principal, r, n)?;
    let scheduled_total = payment
        .checked_mul(Decimal::from(n))
        .ok_or_else(|| CalcError::invalid("principal", "amount too large to amortize"))?;

    let schedule = amortization_schedule(input.principal, r, payment, extra, n, input.start_date);
    if !schedule.converged {
        warnings.push(format!(
            "Schedule stopped after {} payments with {} still owed",
            schedule.rows.len(),
            schedule.final_balance()
        ));
    }

    let total_interest = schedule.total_interest();
    let interest_saved = if extra > Decimal::ZERO {
        let baseline_interest = scheduled_total - input.principal;
        (baseline_interest - total_interest).max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };
    let total_monthly_payment = payment
        .checked_add(extra)
        .ok_or_else(|| CalcError::invalid("extra_payment", "amount too large"))?;

    let payoff_periods = schedule.rows.len() as u32;
    let output = LoanOutput {
        monthly_payment: payment,
        total_monthly_payment,
        number_of_payments: n,
        payoff_periods,
        periods_saved: n.saturating_sub(payoff_periods),
        total_paid: schedule.total_paid(),
        total_interest,
        interest_saved,
        payoff_date: schedule.rows.last().and_then(|r| r.date),
        converged: schedule.converged,
        yearly: yearly_summary(&schedule.rows),
        schedule: schedule.rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-payment annuity with monthly amortization",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Amortize with a user-fixed monthly payment. Payments that do not cover
/// the interest are allowed; the schedule then ends at the safety cap.
pub fn amortize_with_payment(
    input: &FixedPaymentInput,
) -> CalcResult<ComputationOutput<FixedPaymentOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_common(input.principal, input.annual_rate_percent, input.term_years)?;
    require_positive("monthly_payment", input.monthly_payment)?;

    let n = term_periods(input.term_years)?;
    let r = monthly_rate(input.annual_rate_percent);
    let threshold = input.principal * r;

    if input.monthly_payment <= threshold {
        warnings.push(format!(
            "Payment of {} does not cover the first month's interest of {}",
            input.monthly_payment, threshold
        ));
    }

    let schedule = amortization_schedule(input.principal, r, input.monthly_payment, Decimal::ZERO, n, None);
    if !schedule.converged {
        warnings.push(format!(
            "Loan not repaid within {} payments; showing the partial schedule",
            safety_cap(n)
        ));
    }

    let output = FixedPaymentOutput {
        monthly_payment: input.monthly_payment,
        interest_only_threshold: threshold,
        payoff_periods: schedule.rows.len() as u32,
        total_paid: schedule.total_paid(),
        total_interest: schedule.total_interest(),
        final_balance: schedule.final_balance(),
        converged: schedule.converged,
        schedule: schedule.rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-payment amortization with safety cap",
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

    fn default_input() -> LoanInput {
        LoanInput {
            principal: dec!(100_000),
            annual_rate_percent: dec!(6),
            term_years: dec!(30),
            extra_payment: None,
            start_date: None,
        }
    }

    #[test]
    fn test_monthly_payment_textbook() {
        let payment = monthly_payment(dec!(100_000), monthly_rate(dec!(6)), 360).unwrap();
        assert!((payment - dec!(599.55)).abs() < dec!(0.01), "payment={payment}");
    }

    #[test]
    fn test_monthly_payment_zero_rate() {
        let payment = monthly_payment(dec!(12_000), Decimal::ZERO, 12).unwrap();
        assert_eq!(payment, dec!(1000));
    }

    #[test]
    fn test_principal_past_decimal_range_rejected() {
        let mut input = default_input();
        input.principal = Decimal::MAX;
        input.annual_rate_percent = dec!(100);
        input.term_years = dec!(50);
        let err = calculate_loan(&input).unwrap_err();
        assert!(matches!(err, CalcError::InvalidInput { ref field, .. } if field == "principal"));
    }

    #[test]
    fn test_growing_balance_stops_inside_decimal_range() {
        let input = FixedPaymentInput {
            principal: dec!(100_000),
            annual_rate_percent: dec!(100),
            monthly_payment: dec!(1),
            term_years: dec!(50),
        };
        let out = amortize_with_payment(&input).unwrap();
        assert!(!out.result.converged);
        assert!(out.result.payoff_periods < safety_cap(600));
        assert!(out.result.final_balance > dec!(1_000_000_000_000_000_000_000_000));
        assert!(out.warnings.len() >= 2);
    }

    #[test]
    fn test_monthly_payment_zero_periods_rejected() {
        assert!(monthly_payment(dec!(1000), dec!(0.01), 0).is_err());
    }

    #[test]
    fn test_schedule_repays_principal() {
        let out = calculate_loan(&default_input()).unwrap().result;
        assert!(out.converged);
        assert_eq!(out.payoff_periods, 360);
        assert_eq!(out.schedule.last().unwrap().remaining_balance, Decimal::ZERO);

        let principal_sum: Decimal = out.schedule.iter().map(|r| r.principal).sum();
        assert!((principal_sum - dec!(100_000)).abs() < dec!(0.01));
    }

    #[test]
    fn test_first_row_split() {
        let out = calculate_loan(&default_input()).unwrap().result;
        let first = &out.schedule[0];
        assert_eq!(first.interest, dec!(500));
        assert!((first.principal - dec!(99.55)).abs() < dec!(0.01));
    }

    #[test]
    fn test_extra_payment_shortens_loan() {
        let mut input = default_input();
        input.extra_payment = Some(dec!(200));
        let out = calculate_loan(&input).unwrap().result;
        assert!(out.converged);
        assert!(out.payoff_periods < 360);
        assert!(out.periods_saved > 0);
        assert!(out.interest_saved > dec!(10_000));
        assert!((out.total_monthly_payment - out.monthly_payment - dec!(200)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_payment_below_interest_stops_at_cap() {
        let input = FixedPaymentInput {
            principal: dec!(100_000),
            annual_rate_percent: dec!(6),
            monthly_payment: dec!(400),
            term_years: dec!(30),
        };
        let out = amortize_with_payment(&input).unwrap();
        assert!(!out.result.converged);
        assert_eq!(out.result.payoff_periods, 540);
        assert!(out.result.final_balance > dec!(100_000));
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_fixed_payment_above_annuity_converges_early() {
        let input = FixedPaymentInput {
            principal: dec!(10_000),
            annual_rate_percent: dec!(5),
            monthly_payment: dec!(1_000),
            term_years: dec!(5),
        };
        let out = amortize_with_payment(&input).unwrap().result;
        assert!(out.converged);
        assert_eq!(out.payoff_periods, 11);
        assert_eq!(out.final_balance, Decimal::ZERO);
    }

    #[test]
    fn test_dated_schedule_and_payoff_date() {
        let mut input = default_input();
        input.term_years = dec!(1);
        input.start_date = NaiveDate::from_ymd_opt(2025, 1, 31);
        let out = calculate_loan(&input).unwrap().result;
        assert_eq!(out.schedule[0].date, NaiveDate::from_ymd_opt(2025, 2, 28));
        assert_eq!(out.payoff_date, NaiveDate::from_ymd_opt(2026, 1, 31));
        assert_eq!(out.yearly.len(), 2);
    }

    #[test]
    fn test_yearly_summary_undated() {
        let out = calculate_loan(&default_input()).unwrap().result;
        assert_eq!(out.yearly.len(), 30);
        assert_eq!(out.yearly[0].year, 1);
        assert_eq!(out.yearly[29].ending_balance, Decimal::ZERO);
    }

    #[test]
    fn test_safety_cap_rounds_up() {
        assert_eq!(safety_cap(360), 540);
        assert_eq!(safety_cap(7), 11);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut input = default_input();
        input.principal = Decimal::ZERO;
        assert!(calculate_loan(&input).is_err());

        let mut input = default_input();
        input.term_years = dec!(60);
        assert!(calculate_loan(&input).is_err());

        let mut input = default_input();
        input.extra_payment = Some(dec!(-5));
        assert!(calculate_loan(&input).is_err());
    }

    #[test]
    fn test_form_conversion() {
        let form = FormValues::new()
            .with("principal", "$100,000")
            .with("annual_rate_percent", "6")
            .with("term_years", "30");
        let input = LoanInput::try_from(&form).unwrap();
        assert_eq!(input, default_input());
    }
}
