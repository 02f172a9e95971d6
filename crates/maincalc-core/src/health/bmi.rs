use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CalcError;
use crate::input::{require_range, FormValues};
use crate::types::{round_to, with_metadata, ComputationOutput};
use crate::CalcResult;

const HEALTHY_MIN: Decimal = dec!(18.5);
const HEALTHY_MAX: Decimal = dec!(24.9);
/// Upper limit of the normal range, used for BMI Prime.
const BMI_PRIME_REFERENCE: Decimal = dec!(25);

/// WHO adult classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    SevereThinness,
    ModerateThinness,
    MildThinness,
    Normal,
    Overweight,
    ObeseClassI,
    ObeseClassII,
    ObeseClassIII,
}

impl BmiCategory {
    pub fn from_bmi(bmi: Decimal) -> Self {
        if bmi < dec!(16) {
            BmiCategory::SevereThinness
        } else if bmi < dec!(17) {
            BmiCategory::ModerateThinness
        } else if bmi < dec!(18.5) {
            BmiCategory::MildThinness
        } else if bmi < dec!(25) {
            BmiCategory::Normal
        } else if bmi < dec!(30) {
            BmiCategory::Overweight
        } else if bmi < dec!(35) {
            BmiCategory::ObeseClassI
        } else if bmi < dec!(40) {
            BmiCategory::ObeseClassII
        } else {
            BmiCategory::ObeseClassIII
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BmiCategory::SevereThinness => "Severe Thinness",
            BmiCategory::ModerateThinness => "Moderate Thinness",
            BmiCategory::MildThinness => "Mild Thinness",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::ObeseClassI => "Obese Class I",
            BmiCategory::ObeseClassII => "Obese Class II",
            BmiCategory::ObeseClassIII => "Obese Class III",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiInput {
    pub weight_kg: Decimal,
    pub height_cm: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiOutput {
    pub bmi: Decimal,
    pub bmi_rounded: Decimal,
    pub category: BmiCategory,
    pub bmi_prime: Decimal,
    pub healthy_weight_min_kg: Decimal,
    pub healthy_weight_max_kg: Decimal,
    /// Positive: kg above the healthy range. Negative: kg below it.
    pub weight_to_healthy_kg: Decimal,
}

impl TryFrom<&FormValues> for BmiInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        Ok(BmiInput {
            weight_kg: form.positive("weight_kg")?,
            height_cm: form.positive("height_cm")?,
        })
    }
}

pub fn calculate_bmi(input: &BmiInput) -> CalcResult<ComputationOutput<BmiOutput>> {
    let start = Instant::now();

    require_range("weight_kg", input.weight_kg, dec!(2), dec!(500))?;
    require_range("height_cm", input.height_cm, dec!(40), dec!(280))?;

    let height_m = input.height_cm / dec!(100);
    let height_sq = height_m * height_m;
    let bmi = input.weight_kg / height_sq;

    let healthy_min = HEALTHY_MIN * height_sq;
    let healthy_max = HEALTHY_MAX * height_sq;
    let weight_to_healthy = if input.weight_kg > healthy_max {
        input.weight_kg - healthy_max
    } else if input.weight_kg < healthy_min {
        input.weight_kg - healthy_min
    } else {
        Decimal::ZERO
    };

    let output = BmiOutput {
        bmi,
        bmi_rounded: round_to(bmi, 1),
        category: BmiCategory::from_bmi(bmi),
        bmi_prime: bmi / BMI_PRIME_REFERENCE,
        healthy_weight_min_kg: healthy_min,
        healthy_weight_max_kg: healthy_max,
        weight_to_healthy_kg: weight_to_healthy,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "BMI = kg / m², WHO adult categories",
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

    #[test]
    fn test_bmi_normal() {
        let input = BmiInput {
            weight_kg: dec!(70),
            height_cm: dec!(175),
        };
        let r = calculate_bmi(&input).unwrap().result;
        assert_eq!(r.bmi_rounded, dec!(22.9));
        assert_eq!(r.category, BmiCategory::Normal);
        assert_eq!(r.weight_to_healthy_kg, Decimal::ZERO);
    }

    #[test]
    fn test_bmi_overweight_distance_to_range() {
        let input = BmiInput {
            weight_kg: dec!(90),
            height_cm: dec!(180),
        };
        let r = calculate_bmi(&input).unwrap().result;
        assert_eq!(r.category, BmiCategory::Overweight);
        // 24.9 × 1.8² = 80.676
        assert_eq!(r.healthy_weight_max_kg, dec!(80.676));
        assert_eq!(r.weight_to_healthy_kg, dec!(9.324));
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(BmiCategory::from_bmi(dec!(18.5)), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(dec!(25)), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(dec!(40)), BmiCategory::ObeseClassIII);
        assert_eq!(BmiCategory::from_bmi(dec!(15.9)), BmiCategory::SevereThinness);
    }

    #[test]
    fn test_zero_height_rejected() {
        let input = BmiInput {
            weight_kg: dec!(70),
            height_cm: Decimal::ZERO,
        };
        assert!(calculate_bmi(&input).is_err());
    }
}
