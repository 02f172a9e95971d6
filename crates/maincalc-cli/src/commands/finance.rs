use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use maincalc_core::finance::compound_interest::{self, CompoundInterestInput, CompoundingFrequency};
use maincalc_core::finance::loan::{self, FixedPaymentInput, LoanInput};
use maincalc_core::finance::mortgage::{self, DownPayment, MortgageInput};

use crate::input;

/// Arguments for a standard amortizing loan
#[derive(Args)]
pub struct LoanArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent (e.g. 6.5)
    #[arg(long, alias = "rate")]
    pub annual_rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long, alias = "years")]
    pub term_years: Option<Decimal>,

    /// Extra principal paid every month
    #[arg(long)]
    pub extra_payment: Option<Decimal>,

    /// Loan start date (YYYY-MM-DD); first payment is one month later
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

/// Arguments for repaying a loan with a chosen monthly payment
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long, alias = "rate")]
    pub annual_rate: Option<Decimal>,

    /// Monthly payment to apply
    #[arg(long)]
    pub payment: Option<Decimal>,

    /// Nominal term in years
    #[arg(long, alias = "years")]
    pub term_years: Option<Decimal>,
}

/// Arguments for a full mortgage payment breakdown
#[derive(Args)]
pub struct MortgageArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Purchase price of the home
    #[arg(long)]
    pub home_price: Option<Decimal>,

    /// Down payment as an amount
    #[arg(long, conflicts_with = "down_payment_percent")]
    pub down_payment: Option<Decimal>,

    /// Down payment as a percent of the price
    #[arg(long)]
    pub down_payment_percent: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long, alias = "rate")]
    pub annual_rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long, alias = "years", default_value = "30")]
    pub term_years: Decimal,

    /// Annual property tax
    #[arg(long, default_value = "0")]
    pub property_tax: Decimal,

    /// Annual homeowner's insurance
    #[arg(long, default_value = "0")]
    pub insurance: Decimal,

    /// Monthly HOA dues
    #[arg(long, default_value = "0")]
    pub hoa: Decimal,

    /// Annual PMI rate in percent of the loan amount
    #[arg(long, default_value = "0")]
    pub pmi_rate: Decimal,

    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

/// Arguments for compound growth with monthly contributions
#[derive(Args)]
pub struct CompoundArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Starting balance
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long, alias = "rate")]
    pub annual_rate: Option<Decimal>,

    /// Whole years to project
    #[arg(long)]
    pub years: Option<u32>,

    /// annually, semi-annually, quarterly, monthly or daily
    #[arg(long, default_value = "monthly")]
    pub compounding: CompoundingFrequency,

    /// Deposit added at the end of every month
    #[arg(long, default_value = "0")]
    pub monthly_contribution: Decimal,
}

pub fn run_loan(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan_input = match input::resolve::<LoanInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => LoanInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_percent: args
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            term_years: args
                .term_years
                .ok_or("--term-years is required (or provide --input)")?,
            extra_payment: args.extra_payment,
            start_date: args.start_date,
        },
    };

    let result = loan::calculate_loan(&loan_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let fixed_input = match input::resolve::<FixedPaymentInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => FixedPaymentInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_percent: args
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            monthly_payment: args
                .payment
                .ok_or("--payment is required (or provide --input)")?,
            term_years: args
                .term_years
                .ok_or("--term-years is required (or provide --input)")?,
        },
    };

    let result = loan::amortize_with_payment(&fixed_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_mortgage(args: MortgageArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mortgage_input = match input::resolve::<MortgageInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => {
            let down_payment = match (args.down_payment, args.down_payment_percent) {
                (_, Some(pct)) => DownPayment::Percent(pct),
                (Some(amount), None) => DownPayment::Amount(amount),
                (None, None) => {
                    return Err("--down-payment or --down-payment-percent is required (or provide --input)".into())
                }
            };
            MortgageInput {
                home_price: args
                    .home_price
                    .ok_or("--home-price is required (or provide --input)")?,
                down_payment,
                annual_rate_percent: args
                    .annual_rate
                    .ok_or("--annual-rate is required (or provide --input)")?,
                term_years: args.term_years,
                property_tax_annual: args.property_tax,
                home_insurance_annual: args.insurance,
                hoa_monthly: args.hoa,
                pmi_rate_percent: args.pmi_rate,
                start_date: args.start_date,
            }
        }
    };

    let result = mortgage::calculate_mortgage(&mortgage_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_compound(args: CompoundArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let compound_input = match input::resolve::<CompoundInterestInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => CompoundInterestInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_percent: args
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            years: args.years.ok_or("--years is required (or provide --input)")?,
            compounding: args.compounding,
            monthly_contribution: args.monthly_contribution,
        },
    };

    let result = compound_interest::calculate_compound_interest(&compound_input)?;
    Ok(serde_json::to_value(result)?)
}
