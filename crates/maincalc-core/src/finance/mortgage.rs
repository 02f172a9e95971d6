use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::loan::{self, AmortizationRow};
use crate::error::CalcError;
use crate::input::{require_non_negative, require_positive, require_range, FormValues};
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::CalcResult;

/// Private mortgage insurance is charged while the balance is above this
/// share of the home price.
const PMI_LTV_THRESHOLD: Decimal = dec!(0.80);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownPayment {
    Amount(Money),
    Percent(Percent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortgageInput {
    pub home_price: Money,
    pub down_payment: DownPayment,
    pub annual_rate_percent: Percent,
    pub term_years: Decimal,
    #[serde(default)]
    pub property_tax_annual: Money,
    #[serde(default)]
    pub home_insurance_annual: Money,
    #[serde(default)]
    pub hoa_monthly: Money,
    /// Annual PMI premium as a percent of the original loan amount.
    #[serde(default)]
    pub pmi_rate_percent: Percent,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortgageOutput {
    pub loan_amount: Money,
    pub down_payment: Money,
    pub down_payment_percent: Percent,
    pub loan_to_value_percent: Percent,
    pub principal_and_interest: Money,
    pub monthly_property_tax: Money,
    pub monthly_insurance: Money,
    pub monthly_hoa: Money,
    pub monthly_pmi: Money,
    /// First-month outflow: P&I, escrow, HOA and PMI if it applies.
    pub total_monthly_payment: Money,
    pub pmi_months: u32,
    pub total_pmi: Money,
    pub total_interest: Money,
    /// Down payment plus every payment, escrow, HOA and PMI over the loan.
    pub total_cost: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payoff_date: Option<NaiveDate>,
    pub schedule: Vec<AmortizationRow>,
}

impl TryFrom<&FormValues> for MortgageInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        let down_payment = match form.optional_non_negative("down_payment_percent")? {
            Some(pct) => DownPayment::Percent(pct),
            None => DownPayment::Amount(form.non_negative("down_payment")?),
        };

        Ok(MortgageInput {
            home_price: form.positive("home_price")?,
            down_payment,
            annual_rate_percent: form.in_range("annual_rate_percent", Decimal::ZERO, dec!(100))?,
            term_years: form.positive("term_years")?,
            property_tax_annual: form.optional_non_negative("property_tax_annual")?.unwrap_or_default(),
            home_insurance_annual: form.optional_non_negative("home_insurance_annual")?.unwrap_or_default(),
            hoa_monthly: form.optional_non_negative("hoa_monthly")?.unwrap_or_default(),
            pmi_rate_percent: form.optional_non_negative("pmi_rate_percent")?.unwrap_or_default(),
            start_date: form.date("start_date")?,
        })
    }
}

fn too_large() -> CalcError {
    CalcError::DomainError("housing costs are too large to total".into())
}

fn checked_total(parts: &[Money]) -> CalcResult<Money> {
    parts
        .iter()
        .try_fold(Decimal::ZERO, |acc, part| acc.checked_add(*part))
        .ok_or_else(too_large)
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Full monthly housing payment (PITI plus HOA and PMI) and the underlying
/// amortization schedule.
pub fn calculate_mortgage(input: &MortgageInput) -> CalcResult<ComputationOutput<MortgageOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    require_positive("home_price", input.home_price)?;
    require_non_negative("property_tax_annual", input.property_tax_annual)?;
    require_non_negative("home_insurance_annual", input.home_insurance_annual)?;
    require_non_negative("hoa_monthly", input.hoa_monthly)?;
    require_range("pmi_rate_percent", input.pmi_rate_percent, Decimal::ZERO, dec!(10))?;

    let down_payment = match input.down_payment {
        DownPayment::Amount(amount) => {
            require_non_negative("down_payment", amount)?;
            amount
        }
        DownPayment::Percent(pct) => {
            require_range("down_payment_percent", pct, Decimal::ZERO, dec!(100))?;
            input.home_price * (pct / dec!(100))
        }
    };
    if down_payment >= input.home_price {
        return Err(CalcError::invalid(
            "down_payment",
            "down payment must be less than the home price",
        ));
    }

    let loan_amount = input.home_price - down_payment;
    debug!(home_price = %input.home_price, loan_amount = %loan_amount, "calculating mortgage");

    let loan_input = loan::LoanInput {
        principal: loan_amount,
        annual_rate_percent: input.annual_rate_percent,
        term_years: input.term_years,
        extra_payment: None,
        start_date: input.start_date,
    };
    let loan_out = loan::calculate_loan(&loan_input)?;
    warnings.extend(loan_out.warnings);
    let loan_result = loan_out.result;

    let months = Decimal::from(loan::MONTHS_PER_YEAR);
    let monthly_property_tax = input.property_tax_annual / months;
    let monthly_insurance = input.home_insurance_annual / months;
    let monthly_pmi_premium = loan_amount * (input.pmi_rate_percent / dec!(100)) / months;

    // PMI applies to each month that starts above the LTV threshold.
    let pmi_limit = input.home_price * PMI_LTV_THRESHOLD;
    let mut opening_balance = loan_amount;
    let mut pmi_months: u32 = 0;
    for row in &loan_result.schedule {
        if opening_balance > pmi_limit {
            pmi_months += 1;
        }
        opening_balance = row.remaining_balance;
    }
    if input.pmi_rate_percent.is_zero() {
        pmi_months = 0;
    } else if pmi_months == 0 {
        warnings.push("Loan-to-value is at or below 80%; PMI does not apply".into());
    }

    let monthly_pmi = if pmi_months > 0 {
        monthly_pmi_premium
    } else {
        Decimal::ZERO
    };
    let total_pmi = monthly_pmi_premium
        .checked_mul(Decimal::from(pmi_months))
        .ok_or_else(too_large)?;

    let monthly_extras = checked_total(&[monthly_property_tax, monthly_insurance, input.hoa_monthly])?;
    let total_monthly_payment = checked_total(&[loan_result.monthly_payment, monthly_extras, monthly_pmi])?;
    let total_escrow = monthly_extras
        .checked_mul(Decimal::from(loan_result.payoff_periods))
        .ok_or_else(too_large)?;
    let total_cost = checked_total(&[down_payment, loan_result.total_paid, total_escrow, total_pmi])?;

    let output = MortgageOutput {
        loan_amount,
        down_payment,
        down_payment_percent: down_payment / input.home_price * dec!(100),
        loan_to_value_percent: loan_amount / input.home_price * dec!(100),
        principal_and_interest: loan_result.monthly_payment,
        monthly_property_tax,
        monthly_insurance,
        monthly_hoa: input.hoa_monthly,
        monthly_pmi,
        total_monthly_payment,
        pmi_months,
        total_pmi,
        total_interest: loan_result.total_interest,
        total_cost,
        payoff_date: loan_result.payoff_date,
        schedule: loan_result.schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annuity P&I plus monthly escrow, HOA and PMI above 80% LTV",
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

    fn default_input() -> MortgageInput {
        MortgageInput {
            home_price: dec!(400_000),
            down_payment: DownPayment::Percent(dec!(20)),
            annual_rate_percent: dec!(6),
            term_years: dec!(30),
            property_tax_annual: dec!(4_800),
            home_insurance_annual: dec!(1_200),
            hoa_monthly: dec!(50),
            pmi_rate_percent: dec!(0.5),
            start_date: None,
        }
    }

    #[test]
    fn test_twenty_percent_down_has_no_pmi() {
        let out = calculate_mortgage(&default_input()).unwrap();
        let r = &out.result;
        assert_eq!(r.loan_amount, dec!(320_000));
        assert_eq!(r.pmi_months, 0);
        assert_eq!(r.monthly_pmi, Decimal::ZERO);
        assert_eq!(r.loan_to_value_percent, dec!(80));
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_piti_components() {
        let r = calculate_mortgage(&default_input()).unwrap().result;
        assert_eq!(r.monthly_property_tax, dec!(400));
        assert_eq!(r.monthly_insurance, dec!(100));
        // 320k at 6% over 30 years
        assert!((r.principal_and_interest - dec!(1918.56)).abs() < dec!(0.01));
        let expected = r.principal_and_interest + dec!(400) + dec!(100) + dec!(50);
        assert_eq!(r.total_monthly_payment, expected);
    }

    #[test]
    fn test_low_down_payment_charges_pmi_until_threshold() {
        let mut input = default_input();
        input.down_payment = DownPayment::Amount(dec!(20_000));
        let r = calculate_mortgage(&input).unwrap().result;
        assert_eq!(r.loan_amount, dec!(380_000));
        assert!(r.pmi_months > 0 && r.pmi_months < 360);
        // 380k * 0.5% / 12
        assert!((r.monthly_pmi - dec!(158.333)).abs() < dec!(0.001));
        assert_eq!(r.total_pmi, r.monthly_pmi * Decimal::from(r.pmi_months));
    }

    #[test]
    fn test_down_payment_must_be_below_price() {
        let mut input = default_input();
        input.down_payment = DownPayment::Amount(dec!(400_000));
        assert!(calculate_mortgage(&input).is_err());
    }

    #[test]
    fn test_form_percent_takes_priority() {
        let form = FormValues::new()
            .with("home_price", "400000")
            .with("down_payment", "1000")
            .with("down_payment_percent", "20")
            .with("annual_rate_percent", "6")
            .with("term_years", "30");
        let input = MortgageInput::try_from(&form).unwrap();
        assert_eq!(input.down_payment, DownPayment::Percent(dec!(20)));
        assert_eq!(input.hoa_monthly, Decimal::ZERO);
    }
}
