use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde_json::Value;

use maincalc_core::math::gcf::{self, GcfInput};
use maincalc_core::math::half_life::{self, DecayInput};
use maincalc_core::math::percentage::{self, PercentageInput};
use maincalc_core::math::statistics::{self, CorrelationInput, SampleInput};

use crate::input;

/// Arguments for greatest common factor and least common multiple
#[derive(Args)]
pub struct GcfArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated whole numbers (e.g. "84,126,210")
    #[arg(long, value_delimiter = ',')]
    pub numbers: Option<Vec<u64>>,
}

/// Arguments for half-life decay; give any three of the four quantities
#[derive(Args)]
pub struct HalfLifeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub initial: Option<Decimal>,

    #[arg(long)]
    pub remaining: Option<Decimal>,

    /// Half-life, in the same time unit as --elapsed
    #[arg(long)]
    pub half_life: Option<Decimal>,

    #[arg(long)]
    pub elapsed: Option<Decimal>,
}

/// Arguments for descriptive statistics
#[derive(Args)]
pub struct StatsArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated sample values
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub values: Option<Vec<Decimal>>,

    /// Extra percentiles to report (e.g. "10,90")
    #[arg(long, value_delimiter = ',')]
    pub percentiles: Vec<Decimal>,
}

/// Arguments for Pearson correlation and the least-squares line
#[derive(Args)]
pub struct CorrelationArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated x values
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub x: Option<Vec<Decimal>>,

    /// Comma-separated y values, paired with --x
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub y: Option<Vec<Decimal>>,
}

/// Arguments for the percentage calculators
#[derive(Args)]
pub struct PercentageArgs {
    /// Path to JSON input file (overrides the question)
    #[arg(long)]
    pub input: Option<String>,

    #[command(subcommand)]
    pub question: Option<PercentageQuestion>,
}

#[derive(Subcommand)]
pub enum PercentageQuestion {
    /// What is P% of V?
    Of {
        #[arg(long, allow_hyphen_values = true)]
        percent: Decimal,
        #[arg(long, allow_hyphen_values = true)]
        value: Decimal,
    },
    /// PART is what percent of WHOLE?
    WhatPercent {
        #[arg(long, allow_hyphen_values = true)]
        part: Decimal,
        #[arg(long)]
        whole: Decimal,
    },
    /// Percent change from FROM to TO
    Change {
        #[arg(long, allow_hyphen_values = true)]
        from: Decimal,
        #[arg(long, allow_hyphen_values = true)]
        to: Decimal,
    },
}

impl From<PercentageQuestion> for PercentageInput {
    fn from(question: PercentageQuestion) -> Self {
        match question {
            PercentageQuestion::Of { percent, value } => PercentageInput::PercentOf { percent, value },
            PercentageQuestion::WhatPercent { part, whole } => PercentageInput::WhatPercent { part, whole },
            PercentageQuestion::Change { from, to } => PercentageInput::Change { from, to },
        }
    }
}

pub fn run_gcf(args: GcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let gcf_input = match input::resolve::<GcfInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => GcfInput {
            numbers: args
                .numbers
                .ok_or("--numbers is required (or provide --input)")?,
        },
    };

    let result = gcf::calculate_gcf(&gcf_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_half_life(args: HalfLifeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let decay_input = match input::resolve::<DecayInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => DecayInput {
            initial_amount: args.initial,
            remaining_amount: args.remaining,
            half_life: args.half_life,
            elapsed_time: args.elapsed,
        },
    };

    let result = half_life::solve_decay(&decay_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_stats(args: StatsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sample = match input::resolve::<SampleInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => SampleInput {
            values: args
                .values
                .ok_or("--values is required (or provide --input)")?,
            percentiles: args.percentiles,
        },
    };

    let result = statistics::describe(&sample)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_correlation(args: CorrelationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pairs = match input::resolve::<CorrelationInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => CorrelationInput {
            x: args.x.ok_or("--x is required (or provide --input)")?,
            y: args.y.ok_or("--y is required (or provide --input)")?,
        },
    };

    let result = statistics::correlation(&pairs)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_percentage(args: PercentageArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let question = match input::resolve::<PercentageInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => args
            .question
            .map(PercentageInput::from)
            .ok_or("choose a question: of, what-percent or change (or provide --input)")?,
    };

    let result = percentage::calculate_percentage(&question)?;
    Ok(serde_json::to_value(result)?)
}
