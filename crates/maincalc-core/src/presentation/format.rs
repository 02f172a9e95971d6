//! Display strings for result cards and summaries.

use rust_decimal::Decimal;

use crate::types::{round_to, Money, Percent};

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Fixed decimal places, half away from zero, no grouping: `3.10`.
pub fn rounded(value: Decimal, dp: u32) -> String {
    let r = round_to(value, dp);
    let r = if r.is_zero() { Decimal::ZERO } else { r };
    format!("{:.*}", dp as usize, r)
}

/// Fixed decimal places with `,` grouping: `1,234,567.9`.
pub fn thousands(value: Decimal, dp: u32) -> String {
    let text = rounded(value.abs(), dp);
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };
    let sign = if value < Decimal::ZERO && !round_to(value, dp).is_zero() {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{}.{f}", group_thousands(int_part)),
        None => format!("{sign}{}", group_thousands(int_part)),
    }
}

/// `$1,234.57`, or `-$1,234.57`.
pub fn currency(value: Money) -> String {
    with_dollar(thousands(value, 2))
}

/// Whole dollars: `$1,235`.
pub fn currency_whole(value: Money) -> String {
    with_dollar(thousands(value, 0))
}

fn with_dollar(text: String) -> String {
    match text.strip_prefix('-') {
        Some(rest) => format!("-${rest}"),
        None => format!("${text}"),
    }
}

/// Value already in percent units: `percent(6.25, 2)` → `6.25%`.
pub fn percent(value: Percent, dp: u32) -> String {
    format!("{}%", thousands(value, dp))
}

/// `$2.1M`, `$450K`, `$50` for chart axes.
pub fn compact_currency(value: Money) -> String {
    let abs = value.abs();
    let sign = if value < Decimal::ZERO { "-" } else { "" };
    if abs >= Decimal::from(1_000_000) {
        format!("{sign}${}M", rounded(abs / Decimal::from(1_000_000), 1))
    } else if abs >= Decimal::from(1_000) {
        format!("{sign}${}K", rounded(abs / Decimal::from(1_000), 0))
    } else {
        format!("{sign}${}", rounded(abs, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency() {
        assert_eq!(currency(dec!(1234.567)), "$1,234.57");
        assert_eq!(currency(dec!(-1234.567)), "-$1,234.57");
        assert_eq!(currency(dec!(0.004)), "$0.00");
        assert_eq!(currency(dec!(-0.004)), "$0.00");
        assert_eq!(currency(dec!(599.55)), "$599.55");
        assert_eq!(currency(dec!(1000000)), "$1,000,000.00");
        assert_eq!(currency_whole(dec!(1234.5)), "$1,235");
    }

    #[test]
    fn test_thousands_and_rounded() {
        assert_eq!(thousands(dec!(1234567.891), 1), "1,234,567.9");
        assert_eq!(thousands(dec!(999), 0), "999");
        assert_eq!(thousands(dec!(-12345), 0), "-12,345");
        assert_eq!(rounded(dec!(3.1), 2), "3.10");
        assert_eq!(rounded(dec!(1617.5), 0), "1618");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(dec!(6.25), 2), "6.25%");
        assert_eq!(percent(dec!(12.6825), 2), "12.68%");
    }

    #[test]
    fn test_compact_currency() {
        assert_eq!(compact_currency(dec!(2100000)), "$2.1M");
        assert_eq!(compact_currency(dec!(450000)), "$450K");
        assert_eq!(compact_currency(dec!(-50)), "-$50");
    }
}
