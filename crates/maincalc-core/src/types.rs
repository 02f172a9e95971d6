use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Dollar amounts.
pub type Money = Decimal;

/// Per-period rates expressed as decimals (0.005 = 0.5% per month).
pub type Rate = Decimal;

/// Values the user types as percentages (6 = 6%).
pub type Percent = Decimal;

/// Biological sex, used by the metabolic and body-composition formulas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

impl std::str::FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            other => Err(format!("unknown sex '{other}', expected male or female")),
        }
    }
}

/// What every calculator returns: the result record plus how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Round half away from zero, the way the site's displays round.
pub fn round_to(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_to_midpoint_goes_away_from_zero() {
        assert_eq!(round_to(dec!(1673.5), 0), dec!(1674));
        assert_eq!(round_to(dec!(-2.345), 2), dec!(-2.35));
        assert_eq!(round_to(dec!(2.344), 2), dec!(2.34));
    }

    #[test]
    fn test_sex_from_str() {
        assert_eq!("Female".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!(" m ".parse::<Sex>().unwrap(), Sex::Male);
        assert!("other".parse::<Sex>().is_err());
    }

    #[test]
    fn test_with_metadata_carries_warnings() {
        let out = with_metadata("test", &"inputs", vec!["w".into()], 5, dec!(1));
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.metadata.computation_time_us, 5);
        assert_eq!(out.result, dec!(1));
    }
}
