use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use maincalc_core::health::bmi::{self, BmiInput};
use maincalc_core::health::body_fat::{self, BodyFatInput};
use maincalc_core::health::metabolic::{self, ActivityLevel, BodyMetricsInput, MacroSplit};
use maincalc_core::Sex;

use crate::input;

/// Arguments for BMR, TDEE, calorie goals and macros
#[derive(Args)]
pub struct EnergyArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Body weight in kg
    #[arg(long)]
    pub weight_kg: Option<Decimal>,

    /// Height in cm
    #[arg(long)]
    pub height_cm: Option<Decimal>,

    /// Age in whole years
    #[arg(long)]
    pub age: Option<u32>,

    /// male or female
    #[arg(long)]
    pub sex: Option<Sex>,

    /// sedentary, light, moderate, active, very-active, or a multiplier such as 1.45
    #[arg(long, default_value = "sedentary")]
    pub activity: ActivityLevel,

    /// Protein share of calories in percent
    #[arg(long)]
    pub protein_percent: Option<Decimal>,

    /// Carbohydrate share of calories in percent
    #[arg(long)]
    pub carbs_percent: Option<Decimal>,

    /// Fat share of calories in percent
    #[arg(long)]
    pub fat_percent: Option<Decimal>,
}

/// Arguments for body mass index
#[derive(Args)]
pub struct BmiArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub weight_kg: Option<Decimal>,

    #[arg(long)]
    pub height_cm: Option<Decimal>,
}

/// Arguments for the U.S. Navy body fat estimate
#[derive(Args)]
pub struct BodyFatArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub sex: Option<Sex>,

    #[arg(long)]
    pub weight_kg: Option<Decimal>,

    #[arg(long)]
    pub height_cm: Option<Decimal>,

    /// Neck circumference in cm
    #[arg(long)]
    pub neck_cm: Option<Decimal>,

    /// Waist circumference in cm
    #[arg(long)]
    pub waist_cm: Option<Decimal>,

    /// Hip circumference in cm (female only)
    #[arg(long)]
    pub hip_cm: Option<Decimal>,
}

pub fn run_energy(args: EnergyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let metrics = match input::resolve::<BodyMetricsInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => {
            let defaults = MacroSplit::default();
            BodyMetricsInput {
                weight_kg: args
                    .weight_kg
                    .ok_or("--weight-kg is required (or provide --input)")?,
                height_cm: args
                    .height_cm
                    .ok_or("--height-cm is required (or provide --input)")?,
                age: args.age.ok_or("--age is required (or provide --input)")?,
                sex: args.sex.ok_or("--sex is required (or provide --input)")?,
                activity_factor: args.activity.factor(),
                macro_split: MacroSplit {
                    protein_percent: args.protein_percent.unwrap_or(defaults.protein_percent),
                    carbs_percent: args.carbs_percent.unwrap_or(defaults.carbs_percent),
                    fat_percent: args.fat_percent.unwrap_or(defaults.fat_percent),
                },
            }
        }
    };

    let result = metabolic::calculate_energy(&metrics)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_bmi(args: BmiArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bmi_input = match input::resolve::<BmiInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => BmiInput {
            weight_kg: args
                .weight_kg
                .ok_or("--weight-kg is required (or provide --input)")?,
            height_cm: args
                .height_cm
                .ok_or("--height-cm is required (or provide --input)")?,
        },
    };

    let result = bmi::calculate_bmi(&bmi_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_body_fat(args: BodyFatArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let body_fat_input = match input::resolve::<BodyFatInput>(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => BodyFatInput {
            sex: args.sex.ok_or("--sex is required (or provide --input)")?,
            weight_kg: args
                .weight_kg
                .ok_or("--weight-kg is required (or provide --input)")?,
            height_cm: args
                .height_cm
                .ok_or("--height-cm is required (or provide --input)")?,
            neck_cm: args.neck_cm.ok_or("--neck-cm is required (or provide --input)")?,
            waist_cm: args
                .waist_cm
                .ok_or("--waist-cm is required (or provide --input)")?,
            hip_cm: args.hip_cm,
        },
    };

    let result = body_fat::calculate_body_fat(&body_fat_input)?;
    Ok(serde_json::to_value(result)?)
}
