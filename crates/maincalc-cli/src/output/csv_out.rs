use serde_json::{Map, Value};
use std::io::{self, Write};

use super::{cell, first_record_list, headers, is_scalar, result_of};

/// CSV on stdout. A result carrying a record list (schedule, yearly growth,
/// decay curve) is written as that list; otherwise as field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match result_of(value) {
        Value::Object(map) => match first_record_list(map) {
            Some((_, rows)) => write_records(&mut wtr, rows),
            None => write_fields(&mut wtr, map),
        },
        Value::Array(rows) => write_records(&mut wtr, rows),
        other => wtr.write_record([cell(other)]),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("cannot write CSV: {e}");
    }
}

fn write_fields<W: Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map.iter().filter(|(_, v)| is_scalar(v)) {
        wtr.write_record([key.as_str(), &cell(val)])?;
    }
    Ok(())
}

fn write_records<W: Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let columns = headers(rows);
    if columns.is_empty() {
        for row in rows {
            wtr.write_record([cell(row)])?;
        }
        return Ok(());
    }

    wtr.write_record(&columns)?;
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|c| row.get(c.as_str()).map(cell).unwrap_or_default())
            .collect();
        wtr.write_record(&record)?;
    }
    Ok(())
}
