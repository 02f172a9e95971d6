use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

use crate::error::CalcError;
use crate::input::{require_range, FormValues};
use crate::types::{round_to, with_metadata, ComputationOutput, Percent, Sex};
use crate::CalcResult;

pub const KCAL_PER_GRAM_PROTEIN: Decimal = dec!(4);
pub const KCAL_PER_GRAM_CARBS: Decimal = dec!(4);
pub const KCAL_PER_GRAM_FAT: Decimal = dec!(9);

/// Daily deficit/surplus for about 0.5 kg (1 lb) per week.
const WEEKLY_HALF_KG_KCAL: Decimal = dec!(500);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Standard activity multipliers applied to BMR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
    Custom(Decimal),
}

impl ActivityLevel {
    pub fn factor(self) -> Decimal {
        match self {
            ActivityLevel::Sedentary => dec!(1.2),
            ActivityLevel::Light => dec!(1.375),
            ActivityLevel::Moderate => dec!(1.55),
            ActivityLevel::Active => dec!(1.725),
            ActivityLevel::VeryActive => dec!(1.9),
            ActivityLevel::Custom(f) => f,
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = String;

    /// Accepts a preset name or a bare multiplier such as "1.45".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" | "lightly_active" => Ok(ActivityLevel::Light),
            "moderate" | "moderately_active" => Ok(ActivityLevel::Moderate),
            "active" => Ok(ActivityLevel::Active),
            "very_active" | "extra_active" => Ok(ActivityLevel::VeryActive),
            other => Decimal::from_str(other)
                .map(ActivityLevel::Custom)
                .map_err(|_| format!("unknown activity level '{other}'")),
        }
    }
}

/// Share of TDEE assigned to each macronutrient, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein_percent: Percent,
    pub carbs_percent: Percent,
    pub fat_percent: Percent,
}

impl Default for MacroSplit {
    fn default() -> Self {
        MacroSplit {
            protein_percent: dec!(30),
            carbs_percent: dec!(40),
            fat_percent: dec!(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMetricsInput {
    pub weight_kg: Decimal,
    pub height_cm: Decimal,
    pub age: u32,
    pub sex: Sex,
    pub activity_factor: Decimal,
    #[serde(default)]
    pub macro_split: MacroSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroTarget {
    pub calories: Decimal,
    pub grams: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein: MacroTarget,
    pub carbs: MacroTarget,
    pub fat: MacroTarget,
}

/// Daily calorie targets around maintenance, whole kcal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieGoals {
    pub extreme_loss: Decimal,
    pub loss: Decimal,
    pub mild_loss: Decimal,
    pub maintain: Decimal,
    pub mild_gain: Decimal,
    pub gain: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyOutput {
    pub bmr: Decimal,
    pub bmr_rounded: Decimal,
    pub tdee: Decimal,
    pub tdee_rounded: Decimal,
    pub activity_factor: Decimal,
    pub goals: CalorieGoals,
    pub macros: MacroTargets,
}

impl TryFrom<&FormValues> for BodyMetricsInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        let activity: ActivityLevel = form.choice_or("activity", ActivityLevel::Sedentary)?;
        let defaults = MacroSplit::default();
        Ok(BodyMetricsInput {
            weight_kg: form.positive("weight_kg")?,
            height_cm: form.positive("height_cm")?,
            age: form.whole("age")?,
            sex: form.choice("sex")?,
            activity_factor: activity.factor(),
            macro_split: MacroSplit {
                protein_percent: form.optional_non_negative("protein_percent")?.unwrap_or(defaults.protein_percent),
                carbs_percent: form.optional_non_negative("carbs_percent")?.unwrap_or(defaults.carbs_percent),
                fat_percent: form.optional_non_negative("fat_percent")?.unwrap_or(defaults.fat_percent),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Mifflin-St Jeor resting energy: `10w + 6.25h − 5a + (5 | −161)` kcal/day.
pub fn bmr_mifflin_st_jeor(weight_kg: Decimal, height_cm: Decimal, age: u32, sex: Sex) -> Decimal {
    let base = dec!(10) * weight_kg + dec!(6.25) * height_cm - dec!(5) * Decimal::from(age);
    match sex {
        Sex::Male => base + dec!(5),
        Sex::Female => base - dec!(161),
    }
}

/// Split daily calories into grams of protein, carbs and fat.
pub fn macro_targets(tdee: Decimal, split: &MacroSplit) -> CalcResult<MacroTargets> {
    let total = split
        .protein_percent
        .checked_add(split.carbs_percent)
        .and_then(|sum| sum.checked_add(split.fat_percent));
    match total {
        Some(total) if total == dec!(100) => {}
        Some(total) => {
            return Err(CalcError::invalid(
                "macro_split",
                format!("percentages must add up to 100 (got {total})"),
            ))
        }
        None => {
            return Err(CalcError::invalid("macro_split", "percentages must add up to 100"));
        }
    }

    let target = |pct: Decimal, kcal_per_gram: Decimal| {
        let calories = tdee * pct / dec!(100);
        MacroTarget {
            calories: round_to(calories, 0),
            grams: round_to(calories / kcal_per_gram, 0),
        }
    };

    Ok(MacroTargets {
        protein: target(split.protein_percent, KCAL_PER_GRAM_PROTEIN),
        carbs: target(split.carbs_percent, KCAL_PER_GRAM_CARBS),
        fat: target(split.fat_percent, KCAL_PER_GRAM_FAT),
    })
}

/// BMR, TDEE, calorie goals and macro targets for one person.
pub fn calculate_energy(input: &BodyMetricsInput) -> CalcResult<ComputationOutput<EnergyOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    require_range("weight_kg", input.weight_kg, dec!(20), dec!(500))?;
    require_range("height_cm", input.height_cm, dec!(50), dec!(280))?;
    require_range("age", Decimal::from(input.age), dec!(1), dec!(120))?;
    require_range("activity_factor", input.activity_factor, dec!(1.0), dec!(2.5))?;

    if input.age < 18 {
        warnings.push("Mifflin-St Jeor is validated for adults; results for minors are estimates".into());
    }

    debug!(weight_kg = %input.weight_kg, height_cm = %input.height_cm, age = input.age, "calculating energy");

    let bmr = bmr_mifflin_st_jeor(input.weight_kg, input.height_cm, input.age, input.sex);
    if bmr <= Decimal::ZERO {
        return Err(CalcError::DomainError(
            "these measurements give a non-positive BMR".into(),
        ));
    }
    let tdee = bmr * input.activity_factor;
    let macros = macro_targets(tdee, &input.macro_split)?;

    let tdee_rounded = round_to(tdee, 0);
    let goals = CalorieGoals {
        extreme_loss: tdee_rounded - WEEKLY_HALF_KG_KCAL * dec!(2),
        loss: tdee_rounded - WEEKLY_HALF_KG_KCAL,
        mild_loss: tdee_rounded - WEEKLY_HALF_KG_KCAL / dec!(2),
        maintain: tdee_rounded,
        mild_gain: tdee_rounded + WEEKLY_HALF_KG_KCAL / dec!(2),
        gain: tdee_rounded + WEEKLY_HALF_KG_KCAL,
    };

    let floor = match input.sex {
        Sex::Male => dec!(1500),
        Sex::Female => dec!(1200),
    };
    if goals.extreme_loss < floor {
        warnings.push(format!(
            "Extreme loss target of {} kcal is below the commonly advised minimum of {} kcal",
            goals.extreme_loss, floor
        ));
    }

    let output = EnergyOutput {
        bmr,
        bmr_rounded: round_to(bmr, 0),
        tdee,
        tdee_rounded,
        activity_factor: input.activity_factor,
        goals,
        macros,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Mifflin-St Jeor BMR scaled by activity factor",
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

    fn default_input() -> BodyMetricsInput {
        BodyMetricsInput {
            weight_kg: dec!(70),
            height_cm: dec!(170),
            age: 30,
            sex: Sex::Male,
            activity_factor: dec!(1.2),
            macro_split: MacroSplit::default(),
        }
    }

    #[test]
    fn test_bmr_male() {
        let bmr = bmr_mifflin_st_jeor(dec!(70), dec!(170), 30, Sex::Male);
        assert_eq!(bmr, dec!(1617.5));
    }

    #[test]
    fn test_bmr_female_offset() {
        let male = bmr_mifflin_st_jeor(dec!(60), dec!(165), 25, Sex::Male);
        let female = bmr_mifflin_st_jeor(dec!(60), dec!(165), 25, Sex::Female);
        assert_eq!(male - female, dec!(166));
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let r = calculate_energy(&default_input()).unwrap().result;
        assert_eq!(r.bmr_rounded, dec!(1618));
        assert_eq!(r.tdee, dec!(1941.0));
        assert_eq!(r.tdee_rounded, dec!(1941));
    }

    #[test]
    fn test_macro_grams() {
        let macros = macro_targets(dec!(2000), &MacroSplit::default()).unwrap();
        assert_eq!(macros.protein.grams, dec!(150));
        assert_eq!(macros.carbs.grams, dec!(200));
        assert_eq!(macros.fat.calories, dec!(600));
        assert_eq!(macros.fat.grams, dec!(67));
    }

    #[test]
    fn test_macro_split_must_total_100() {
        let split = MacroSplit {
            protein_percent: dec!(40),
            carbs_percent: dec!(40),
            fat_percent: dec!(30),
        };
        assert!(macro_targets(dec!(2000), &split).is_err());
    }

    #[test]
    fn test_goals_bracket_maintenance() {
        let r = calculate_energy(&default_input()).unwrap().result;
        assert_eq!(r.goals.loss, r.goals.maintain - dec!(500));
        assert_eq!(r.goals.gain, r.goals.maintain + dec!(500));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut input = default_input();
        input.activity_factor = dec!(3);
        assert!(calculate_energy(&input).is_err());

        let mut input = default_input();
        input.weight_kg = dec!(5);
        assert!(calculate_energy(&input).is_err());
    }

    #[test]
    fn test_activity_level_parsing() {
        assert_eq!("Very Active".parse::<ActivityLevel>().unwrap(), ActivityLevel::VeryActive);
        assert_eq!(
            "1.45".parse::<ActivityLevel>().unwrap().factor(),
            dec!(1.45)
        );
        assert!("couch".parse::<ActivityLevel>().is_err());
    }

    #[test]
    fn test_form_conversion_uses_preset() {
        let form = FormValues::new()
            .with("weight_kg", "70")
            .with("height_cm", "170")
            .with("age", "30")
            .with("sex", "male")
            .with("activity", "moderate");
        let input = BodyMetricsInput::try_from(&form).unwrap();
        assert_eq!(input.activity_factor, dec!(1.55));
        assert_eq!(input.macro_split, MacroSplit::default());
    }
}
