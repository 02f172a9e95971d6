use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CalcError;
use crate::input::{require_positive, require_range, FormValues};
use crate::types::{round_to, with_metadata, ComputationOutput, Percent, Sex};
use crate::CalcResult;

/// American Council on Exercise body-fat bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFatCategory {
    EssentialFat,
    Athletes,
    Fitness,
    Average,
    Obese,
}

impl BodyFatCategory {
    pub fn classify(body_fat_percent: Percent, sex: Sex) -> Self {
        let bands = match sex {
            Sex::Male => [dec!(6), dec!(14), dec!(18), dec!(25)],
            Sex::Female => [dec!(14), dec!(21), dec!(25), dec!(32)],
        };
        if body_fat_percent < bands[0] {
            BodyFatCategory::EssentialFat
        } else if body_fat_percent < bands[1] {
            BodyFatCategory::Athletes
        } else if body_fat_percent < bands[2] {
            BodyFatCategory::Fitness
        } else if body_fat_percent < bands[3] {
            BodyFatCategory::Average
        } else {
            BodyFatCategory::Obese
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BodyFatCategory::EssentialFat => "Essential fat",
            BodyFatCategory::Athletes => "Athletes",
            BodyFatCategory::Fitness => "Fitness",
            BodyFatCategory::Average => "Average",
            BodyFatCategory::Obese => "Obese",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyFatInput {
    pub sex: Sex,
    pub weight_kg: Decimal,
    pub height_cm: Decimal,
    pub neck_cm: Decimal,
    pub waist_cm: Decimal,
    /// Required for the female formula.
    #[serde(default)]
    pub hip_cm: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyFatOutput {
    pub body_fat_percent: Percent,
    pub body_fat_rounded: Percent,
    pub category: BodyFatCategory,
    pub fat_mass_kg: Decimal,
    pub lean_mass_kg: Decimal,
}

impl TryFrom<&FormValues> for BodyFatInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        Ok(BodyFatInput {
            sex: form.choice("sex")?,
            weight_kg: form.positive("weight_kg")?,
            height_cm: form.positive("height_cm")?,
            neck_cm: form.positive("neck_cm")?,
            waist_cm: form.positive("waist_cm")?,
            hip_cm: form.optional_positive("hip_cm")?,
        })
    }
}

fn log10(field: &str, value: Decimal) -> CalcResult<Decimal> {
    value
        .checked_log10()
        .ok_or_else(|| CalcError::invalid(field, "measurement must be positive"))
}

/// U.S. Navy circumference method, metric form.
pub fn calculate_body_fat(input: &BodyFatInput) -> CalcResult<ComputationOutput<BodyFatOutput>> {
    let start = Instant::now();

    require_range("weight_kg", input.weight_kg, dec!(20), dec!(500))?;
    require_range("height_cm", input.height_cm, dec!(50), dec!(280))?;
    require_positive("neck_cm", input.neck_cm)?;
    require_positive("waist_cm", input.waist_cm)?;

    let density = match input.sex {
        Sex::Male => {
            let girth = input.waist_cm - input.neck_cm;
            if girth <= Decimal::ZERO {
                return Err(CalcError::DomainError(
                    "waist must be larger than neck".into(),
                ));
            }
            dec!(1.0324) - dec!(0.19077) * log10("waist_cm", girth)?
                + dec!(0.15456) * log10("height_cm", input.height_cm)?
        }
        Sex::Female => {
            let hip = input
                .hip_cm
                .ok_or_else(|| CalcError::invalid("hip_cm", "hip measurement is required for women"))?;
            require_positive("hip_cm", hip)?;
            let girth = input
                .waist_cm
                .checked_add(hip)
                .ok_or_else(|| CalcError::invalid("hip_cm", "measurement is too large"))?
                - input.neck_cm;
            if girth <= Decimal::ZERO {
                return Err(CalcError::DomainError(
                    "waist plus hip must be larger than neck".into(),
                ));
            }
            dec!(1.29579) - dec!(0.35004) * log10("waist_cm", girth)?
                + dec!(0.22100) * log10("height_cm", input.height_cm)?
        }
    };

    if density <= Decimal::ZERO {
        return Err(CalcError::DivisionByZero {
            context: "body density".into(),
        });
    }

    let body_fat = dec!(495) / density - dec!(450);
    if body_fat <= Decimal::ZERO || body_fat >= dec!(75) {
        return Err(CalcError::DomainError(
            "these measurements do not give a plausible body fat percentage".into(),
        ));
    }

    let fat_mass = input.weight_kg * body_fat / dec!(100);
    let output = BodyFatOutput {
        body_fat_percent: body_fat,
        body_fat_rounded: round_to(body_fat, 1),
        category: BodyFatCategory::classify(body_fat, input.sex),
        fat_mass_kg: fat_mass,
        lean_mass_kg: input.weight_kg - fat_mass,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "U.S. Navy circumference method",
        input,
        Vec::new(),
        elapsed,
        output,
    ))
}
