use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use maincalc_core::automotive::horsepower::{self, PowerInput};
use maincalc_core::automotive::tire::{self, TireComparisonInput, TireSize};

use crate::input;

/// Arguments for horsepower/torque conversion; give RPM plus one power or
/// torque figure
#[derive(Args)]
pub struct HorsepowerArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Engine speed
    #[arg(long)]
    pub rpm: Option<Decimal>,

    #[arg(long, alias = "hp")]
    pub horsepower: Option<Decimal>,

    #[arg(long, alias = "kw")]
    pub kilowatts: Option<Decimal>,

    /// Torque in lb·ft
    #[arg(long)]
    pub torque_lbft: Option<Decimal>,

    /// Torque in N·m
    #[arg(long)]
    pub torque_nm: Option<Decimal>,
}

/// Arguments for a single tire's dimensions
#[derive(Args)]
pub struct TireArgs {
    /// Path to JSON input file (overrides --size)
    #[arg(long)]
    pub input: Option<String>,

    /// Tire size such as 225/45R17
    #[arg(long)]
    pub size: Option<TireSize>,
}

/// Arguments for comparing two tire sizes
#[derive(Args)]
pub struct TireCompareArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Size currently fitted (the speedometer is calibrated for it)
    #[arg(long)]
    pub original: Option<TireSize>,

    /// Size being considered
    #[arg(long)]
    pub replacement: Option<TireSize>,

    /// Speedometer reading to translate into true speed
    #[arg(long)]
    pub speed: Option<Decimal>,
}

pub fn run_horsepower(args: HorsepowerArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let power_input = match input::resolve::<PowerInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => PowerInput {
            rpm: args.rpm.ok_or("--rpm is required (or provide --input)")?,
            horsepower: args.horsepower,
            kilowatts: args.kilowatts,
            torque_lbft: args.torque_lbft,
            torque_nm: args.torque_nm,
        },
    };

    let result = horsepower::convert_power(&power_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_tire(args: TireArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let size = match input::resolve::<TireSize>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => args.size.ok_or("--size is required (or provide --input)")?,
    };

    let result = tire::calculate_tire(&size)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_tire_compare(args: TireCompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let comparison = match input::resolve::<TireComparisonInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => TireComparisonInput {
            original: args
                .original
                .ok_or("--original is required (or provide --input)")?,
            replacement: args
                .replacement
                .ok_or("--replacement is required (or provide --input)")?,
            reference_speed: args.speed,
        },
    };

    let result = tire::compare_tires(&comparison)?;
    Ok(serde_json::to_value(result)?)
}
