use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::debug;

use crate::error::CalcError;
use crate::input::FormValues;
use crate::types::{with_metadata, ComputationOutput};
use crate::CalcResult;

/// Trial division stays fast well below this bound.
pub const MAX_VALUE: u64 = 1_000_000_000_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcfInput {
    pub numbers: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimePower {
    pub prime: u64,
    pub exponent: u32,
}

/// One line of the Euclidean algorithm: `dividend = divisor × quotient + remainder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EuclidStep {
    pub dividend: u64,
    pub divisor: u64,
    pub quotient: u64,
    pub remainder: u64,
}

impl fmt::Display for EuclidStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} × {} + {}",
            self.dividend, self.divisor, self.quotient, self.remainder
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFactors {
    pub number: u64,
    pub factors: Vec<u64>,
    pub prime_factors: Vec<PrimePower>,
    pub factorization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcfOutput {
    pub gcf: u64,
    /// `None` when the least common multiple overflows 64 bits.
    pub lcm: Option<u64>,
    pub common_factors: Vec<u64>,
    pub numbers: Vec<NumberFactors>,
    /// Euclid steps for the first two numbers.
    pub euclid_steps: Vec<EuclidStep>,
    pub euclid_trace: Vec<String>,
}

impl TryFrom<&FormValues> for GcfInput {
    type Error = CalcError;

    fn try_from(form: &FormValues) -> CalcResult<Self> {
        let numbers = form
            .list("numbers")?
            .into_iter()
            .map(|value| {
                if !value.fract().is_zero() {
                    return Err(CalcError::invalid("numbers", "use whole numbers only"));
                }
                value
                    .to_u64()
                    .ok_or_else(|| CalcError::invalid("numbers", "numbers cannot be negative"))
            })
            .collect::<CalcResult<Vec<_>>>()?;
        Ok(GcfInput { numbers })
    }
}

// ---------------------------------------------------------------------------
// Number theory helpers
// ---------------------------------------------------------------------------

/// Every positive divisor of `n`, ascending. Empty for zero.
pub fn factors(n: u64) -> Vec<u64> {
    let mut low = Vec::new();
    let mut high = Vec::new();
    let mut d = 1u64;
    while d <= n / d {
        if n % d == 0 {
            low.push(d);
            if d != n / d {
                high.push(n / d);
            }
        }
        d += 1;
    }
    low.extend(high.into_iter().rev());
    low
}

pub fn prime_factorization(mut n: u64) -> Vec<PrimePower> {
    let mut out = Vec::new();
    if n < 2 {
        return out;
    }

    let mut push = |prime: u64, n: &mut u64| {
        let mut exponent = 0;
        while *n % prime == 0 {
            *n /= prime;
            exponent += 1;
        }
        if exponent > 0 {
            out.push(PrimePower { prime, exponent });
        }
    };

    push(2, &mut n);
    let mut d = 3u64;
    while d <= n / d {
        push(d, &mut n);
        d += 2;
    }
    if n > 1 {
        out.push(PrimePower { prime: n, exponent: 1 });
    }
    out
}

/// `2^2 × 3` style rendering. Zero and one have no prime factors.
pub fn render_factorization(n: u64, powers: &[PrimePower]) -> String {
    if powers.is_empty() {
        return n.to_string();
    }
    powers
        .iter()
        .map(|p| {
            if p.exponent == 1 {
                p.prime.to_string()
            } else {
                format!("{}^{}", p.prime, p.exponent)
            }
        })
        .collect::<Vec<_>>()
        .join(" × ")
}

pub fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Least common multiple; `None` on overflow, zero if either is zero.
pub fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

pub fn euclid_trace(a: u64, b: u64) -> Vec<EuclidStep> {
    let (mut dividend, mut divisor) = if a >= b { (a, b) } else { (b, a) };
    let mut steps = Vec::new();
    while divisor != 0 {
        let quotient = dividend / divisor;
        let remainder = dividend % divisor;
        steps.push(EuclidStep {
            dividend,
            divisor,
            quotient,
            remainder,
        });
        dividend = divisor;
        divisor = remainder;
    }
    steps
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

pub fn calculate_gcf(input: &GcfInput) -> CalcResult<ComputationOutput<GcfOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.numbers.len() < 2 {
        return Err(CalcError::invalid("numbers", "enter at least two numbers"));
    }
    if let Some(big) = input.numbers.iter().find(|n| **n > MAX_VALUE) {
        return Err(CalcError::invalid(
            "numbers",
            format!("{big} is larger than {MAX_VALUE}"),
        ));
    }
    if input.numbers.iter().all(|n| *n == 0) {
        return Err(CalcError::DomainError("both numbers cannot be zero".into()));
    }

    debug!(count = input.numbers.len(), "greatest common factor");

    let gcf = input.numbers.iter().copied().fold(0, gcd);
    let lcm_value = input
        .numbers
        .iter()
        .try_fold(1u64, |acc, n| lcm(acc, *n));
    if lcm_value.is_none() {
        warnings.push("Least common multiple is too large to display".into());
    }
    if input.numbers.contains(&0) {
        warnings.push("Zero is divisible by every number, so it does not limit the GCF".into());
    }

    let numbers = input
        .numbers
        .iter()
        .map(|n| {
            let prime_factors = prime_factorization(*n);
            NumberFactors {
                number: *n,
                factors: factors(*n),
                factorization: render_factorization(*n, &prime_factors),
                prime_factors,
            }
        })
        .collect();

    let euclid_steps = euclid_trace(input.numbers[0], input.numbers[1]);
    let euclid_trace = euclid_steps.iter().map(ToString::to_string).collect();

    let output = GcfOutput {
        gcf,
        lcm: lcm_value,
        common_factors: factors(gcf),
        numbers,
        euclid_steps,
        euclid_trace,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Euclidean algorithm; factors by trial division",
        input,
        warnings,
        elapsed,
        output,
    ))
}
