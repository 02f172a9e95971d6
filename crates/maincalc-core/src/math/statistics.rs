use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

use crate::error::CalcError;
use crate::input::{require_range, FormValues};
use crate::types::{with_metadata, ComputationOutput, Percent};
use crate::CalcResult;

/// Tukey fence multiplier for outliers.
const OUTLIER_FENCE: Decimal = dec!(1.5);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleInput {
    pub values: Vec<Decimal>,
    /// Extra percentiles to report, 0–100.
    #[serde(default)]
    pub percentiles: Vec<Percent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: Percent,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub sum: Decimal,
    pub mean: Decimal,
    pub median: Decimal,
    /// Every value sharing the highest frequency; empty when all values are unique.
    pub modes: Vec<Decimal>,
    pub min: Decimal,
    pub max: Decimal,
    pub range: Decimal,
    pub population_variance: Decimal,
    pub population_std_dev: Decimal,
    pub sample_variance: Option<Decimal>,
    pub sample_std_dev: Option<Decimal>,
    pub q1: Decimal,
    pub q3: Decimal,
    pub iqr: Decimal,
    pub outliers: Vec<Decimal>,
    pub skewness: Option<Decimal>,
    pub excess_kurtosis: Option<Decimal>,
    pub coefficient_of_variation: Option<Percent>,
    pub percentiles: Vec<PercentileValue>,
    pub sorted: Vec<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationInput {
    pub x: Vec<Decimal>,
    pub y: Vec<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    VeryStrong,
    Strong,
    Moderate,
    Weak,
    Negligible,
}

impl CorrelationStrength {
    pub fn from_r(r: Decimal) -> Self {
        let a = r.abs();
        if a >= dec!(0.9) {
            CorrelationStrength::VeryStrong
        } else if a >= dec!(0.7) {
            CorrelationStrength::Strong
        } else if a >= dec!(0.4) {
            CorrelationStrength::Moderate
        } else if a >= dec!(0.1) {
            CorrelationStrength::Weak
        } else {
            CorrelationStrength::Negligible
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CorrelationStrength::VeryStrong => "Very strong",
            CorrelationStrength::Strong => "Strong",
            CorrelationStrength::Moderate => "Moderate",
            CorrelationStrength::Weak => "Weak",
            CorrelationStrength::Negligible => "Negligible",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationOutput {
    pub n: usize,
    pub pearson_r: Decimal,
    pub r_squared: Decimal,
    pub covariance: Decimal,
    pub mean_x: Decimal,
    pub mean_y: Decimal,
    pub std_dev_x: Decimal,
    pub std_dev_y: Decimal,
    /// Least-squares line y = slope·x + intercept.
    pub slope: Decimal,
    pub intercept: Decimal,
    pub strength: CorrelationStrength,
}

impl TryFrom<&FormValues> for SampleInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        let percentiles = match form.raw("percentiles") {
            Some(_) => form.list("percentiles")?,
            None => Vec::new(),
        };
        Ok(SampleInput {
            values: form.list("values")?,
            percentiles,
        })
    }
}

impl TryFrom<&FormValues> for CorrelationInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        Ok(CorrelationInput {
            x: form.list("x")?,
            y: form.list("y")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sqrt(value: Decimal) -> CalcResult<Decimal> {
    value
        .sqrt()
        .ok_or_else(|| CalcError::DomainError(format!("cannot take the square root of {value}")))
}

fn too_large() -> CalcError {
    CalcError::DomainError("values are too large to summarise".into())
}

fn checked_sum<'a>(values: impl IntoIterator<Item = &'a Decimal>) -> CalcResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(too_large)
}

fn sorted_copy(values: &[Decimal]) -> Vec<Decimal> {
    let mut sorted = values.to_vec();
    sorted.sort();
    sorted
}

pub fn mean(values: &[Decimal]) -> CalcResult<Decimal> {
    if values.is_empty() {
        return Err(CalcError::DomainError("the data set is empty".into()));
    }
    Ok(checked_sum(values)? / Decimal::from(values.len()))
}

/// Midpoint of a sorted slice, averaging the middle pair for even lengths.
pub fn median_sorted(sorted: &[Decimal]) -> CalcResult<Decimal> {
    let n = sorted.len();
    if n == 0 {
        return Err(CalcError::DomainError("the data set is empty".into()));
    }
    if n % 2 == 1 {
        Ok(sorted[n / 2])
    } else {
        let (a, b) = (sorted[n / 2 - 1], sorted[n / 2]);
        Ok(a.checked_add(b)
            .map(|s| s / dec!(2))
            .unwrap_or_else(|| a / dec!(2) + b / dec!(2)))
    }
}

/// Q1 and Q3 as medians of the lower and upper halves. For odd counts the
/// median belongs to both halves.
pub fn quartiles_sorted(sorted: &[Decimal]) -> CalcResult<(Decimal, Decimal)> {
    let n = sorted.len();
    if n == 0 {
        return Err(CalcError::DomainError("the data set is empty".into()));
    }
    let (lower, upper) = if n % 2 == 1 {
        (&sorted[..=n / 2], &sorted[n / 2..])
    } else {
        (&sorted[..n / 2], &sorted[n / 2..])
    };
    Ok((median_sorted(lower)?, median_sorted(upper)?))
}

/// All values tied for the highest frequency.
pub fn modes(values: &[Decimal]) -> Vec<Decimal> {
    let mut counts: BTreeMap<Decimal, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v.normalize()).or_insert(0) += 1;
    }
    let top = counts.values().copied().max().unwrap_or(0);
    if top <= 1 {
        return Vec::new();
    }
    counts
        .into_iter()
        .filter(|(_, c)| *c == top)
        .map(|(v, _)| v)
        .collect()
}

/// Percentile by linear interpolation between order statistics at rank
/// `p/100 · (n − 1)`.
pub fn percentile_sorted(sorted: &[Decimal], p: Percent) -> CalcResult<Decimal> {
    require_range("percentile", p, Decimal::ZERO, dec!(100))?;
    if sorted.is_empty() {
        return Err(CalcError::DomainError("the data set is empty".into()));
    }
    if sorted.len() == 1 {
        return Ok(sorted[0]);
    }

    let last = sorted.len() - 1;
    let rank = p / dec!(100) * Decimal::from(last);
    let lower_idx = rank.floor().to_usize().unwrap_or(0).min(last);
    let upper_idx = (lower_idx + 1).min(last);
    let fraction = rank - Decimal::from(lower_idx);

    let (lower, upper) = (sorted[lower_idx], sorted[upper_idx]);
    upper
        .checked_sub(lower)
        .and_then(|gap| gap.checked_mul(fraction))
        .and_then(|step| lower.checked_add(step))
        .ok_or_else(too_large)
}

pub fn percentile(values: &[Decimal], p: Percent) -> CalcResult<Decimal> {
    percentile_sorted(&sorted_copy(values), p)
}

/// Central moment `Σ((x − mean) / scale)^k / n`. Pass `scale = σ` for the
/// standardised moments so high powers stay in range.
fn central_moment(values: &[Decimal], mean: Decimal, scale: Decimal, k: u32) -> CalcResult<Decimal> {
    let mut total = Decimal::ZERO;
    for v in values {
        let d = v
            .checked_sub(mean)
            .and_then(|d| d.checked_div(scale))
            .ok_or_else(too_large)?;
        let term = (0..k)
            .try_fold(Decimal::ONE, |acc, _| acc.checked_mul(d))
            .ok_or_else(too_large)?;
        total = total.checked_add(term).ok_or_else(too_large)?;
    }
    Ok(total / Decimal::from(values.len()))
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Summary statistics for one sample.
pub fn describe(input: &SampleInput) -> CalcResult<ComputationOutput<DescriptiveStats>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let values = &input.values;
    let n = values.len();
    if n == 0 {
        return Err(CalcError::DomainError("enter at least one number".into()));
    }
    debug!(count = n, "describing sample");

    let sorted = sorted_copy(values);
    let n_dec = Decimal::from(n);
    let sum = checked_sum(values)?;
    let avg = sum / n_dec;

    let m2 = central_moment(values, avg, Decimal::ONE, 2)?;
    let population_std_dev = sqrt(m2)?;

    let (sample_variance, sample_std_dev) = if n >= 2 {
        let var = m2
            .checked_mul(n_dec)
            .ok_or_else(too_large)?
            / Decimal::from(n - 1);
        (Some(var), Some(sqrt(var)?))
    } else {
        warnings.push("Sample variance needs at least two values".into());
        (None, None)
    };

    let skewness = if n >= 3 && !population_std_dev.is_zero() {
        let g1 = central_moment(values, avg, population_std_dev, 3)?;
        let adjust = sqrt(n_dec * (n_dec - Decimal::ONE))? / (n_dec - dec!(2));
        Some(g1 * adjust)
    } else {
        None
    };

    let excess_kurtosis = if n >= 4 && !population_std_dev.is_zero() {
        let g2 = central_moment(values, avg, population_std_dev, 4)? - dec!(3);
        let adjust = (n_dec - Decimal::ONE) / ((n_dec - dec!(2)) * (n_dec - dec!(3)));
        Some(((n_dec + Decimal::ONE) * g2 + dec!(6)) * adjust)
    } else {
        None
    };

    let (q1, q3) = quartiles_sorted(&sorted)?;
    let iqr = q3.checked_sub(q1).ok_or_else(too_large)?;
    // Fences past the Decimal range mean nothing can fall outside them.
    let reach = iqr.checked_mul(OUTLIER_FENCE);
    let low_fence = reach.and_then(|r| q1.checked_sub(r)).unwrap_or(Decimal::MIN);
    let high_fence = reach.and_then(|r| q3.checked_add(r)).unwrap_or(Decimal::MAX);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < low_fence || *v > high_fence)
        .collect();

    let percentiles = input
        .percentiles
        .iter()
        .map(|p| {
            Ok(PercentileValue {
                percentile: *p,
                value: percentile_sorted(&sorted, *p)?,
            })
        })
        .collect::<CalcResult<Vec<_>>>()?;

    let coefficient_of_variation = if avg.is_zero() {
        None
    } else {
        population_std_dev
            .checked_div(avg.abs())
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
    };

    let min = sorted[0];
    let max = sorted[n - 1];
    let range = max.checked_sub(min).ok_or_else(too_large)?;
    let output = DescriptiveStats {
        count: n,
        sum,
        mean: avg,
        median: median_sorted(&sorted)?,
        modes: modes(values),
        min,
        max,
        range,
        population_variance: m2,
        population_std_dev,
        sample_variance,
        sample_std_dev,
        q1,
        q3,
        iqr,
        outliers,
        skewness,
        excess_kurtosis,
        coefficient_of_variation,
        percentiles,
        sorted,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Population moments; quartiles by median split; bias-corrected skewness and kurtosis",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Pearson correlation of two equally long samples, paired by position.
pub fn correlation(input: &CorrelationInput) -> CalcResult<ComputationOutput<CorrelationOutput>> {
    let start = Instant::now();

    let n = input.x.len();
    if n != input.y.len() {
        return Err(CalcError::DomainError(format!(
            "both data sets need the same number of values ({} vs {})",
            n,
            input.y.len()
        )));
    }
    if n < 2 {
        return Err(CalcError::DomainError(
            "correlation needs at least two pairs".into(),
        ));
    }

    let mean_x = mean(&input.x)?;
    let mean_y = mean(&input.y)?;
    let n_dec = Decimal::from(n);

    let mut co_moment = Decimal::ZERO;
    for (x, y) in input.x.iter().zip(&input.y) {
        co_moment = x
            .checked_sub(mean_x)
            .zip(y.checked_sub(mean_y))
            .and_then(|(dx, dy)| dx.checked_mul(dy))
            .and_then(|p| co_moment.checked_add(p))
            .ok_or_else(too_large)?;
    }
    let covariance = co_moment / n_dec;
    let var_x = central_moment(&input.x, mean_x, Decimal::ONE, 2)?;
    let var_y = central_moment(&input.y, mean_y, Decimal::ONE, 2)?;

    if var_x.is_zero() || var_y.is_zero() {
        return Err(CalcError::DomainError(
            "correlation is undefined when a data set has no variation".into(),
        ));
    }

    let std_x = sqrt(var_x)?;
    let std_y = sqrt(var_y)?;
    // Rounding in the square roots can push |r| a hair past 1.
    let r = (covariance / std_x / std_y).clamp(-Decimal::ONE, Decimal::ONE);
    let slope = covariance.checked_div(var_x).ok_or_else(too_large)?;
    let intercept = slope
        .checked_mul(mean_x)
        .and_then(|s| mean_y.checked_sub(s))
        .ok_or_else(too_large)?;

    let output = CorrelationOutput {
        n,
        pearson_r: r,
        r_squared: r * r,
        covariance,
        mean_x,
        mean_y,
        std_dev_x: std_x,
        std_dev_y: std_y,
        slope,
        intercept,
        strength: CorrelationStrength::from_r(r),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Pearson r = cov(x, y) / (σx·σy), population moments",
        input,
        Vec::new(),
        elapsed,
        output,
    ))
}
