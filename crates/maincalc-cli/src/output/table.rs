use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, first_record_list, headers, is_scalar};

/// Field/value table for the headline numbers, then the first record list
/// (schedule, yearly growth, decay curve) as its own table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(envelope) => match envelope.get("result") {
            Some(Value::Object(result)) => {
                print_fields(result);
                print_records(result);
                print_notes(envelope);
            }
            _ => {
                print_fields(envelope);
                print_records(envelope);
            }
        },
        Value::Array(rows) => print_record_table(rows),
        _ => println!("{}", cell(value)),
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    push_fields(&mut builder, "", map);
    println!("{}", Table::from(builder));
}

/// Nested objects are flattened into `parent.child` rows.
fn push_fields(builder: &mut Builder, prefix: &str, map: &Map<String, Value>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => push_fields(builder, &name, inner),
            Value::Array(items) if !items.iter().all(is_scalar) => {
                builder.push_record([name, format!("({} rows)", items.len())]);
            }
            _ => builder.push_record([name, cell(val)]),
        }
    }
}

fn print_records(map: &Map<String, Value>) {
    if let Some((name, rows)) = first_record_list(map) {
        println!("\n{name}:");
        print_record_table(rows);
    }
}

fn print_record_table(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    let columns = headers(rows);
    if columns.is_empty() {
        for row in rows {
            println!("{}", cell(row));
        }
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        builder.push_record(
            columns
                .iter()
                .map(|c| row.get(c.as_str()).map(cell).unwrap_or_default()),
        );
    }
    println!("{}", Table::from(builder));
}

fn print_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(methodology)) = envelope.get("methodology") {
        println!("\nMethodology: {methodology}");
    }
}
