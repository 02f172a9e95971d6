use serde_json::Value;

use super::{cell, result_of};

/// Headline figure of each calculator, most specific first.
const PRIORITY_KEYS: [&str; 15] = [
    "total_monthly_payment",
    "monthly_payment",
    "future_value",
    "tdee_rounded",
    "bmi_rounded",
    "body_fat_rounded",
    "gcf",
    "pearson_r",
    "mean",
    "answer",
    "speedometer_error_percent",
    "diameter_mm",
    "horsepower",
    "remaining_amount",
    "half_life",
];

/// Print only the answer a user would read off the page.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Value::Object(map) = result {
        // Solvers name the quantity they solved for.
        if let Some(val) = map
            .get("solved_for")
            .and_then(Value::as_str)
            .and_then(|key| map.get(key))
        {
            println!("{}", cell(val));
            return;
        }
        if let Some(val) = PRIORITY_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|val| !val.is_null())
        {
            println!("{}", cell(val));
            return;
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    println!("{}", cell(result));
}
