//! Converts CSV on stdin (or a file) into JSON lines on stdout.
//!
//! Nested fields are not possible in CSV, so this example fakes some: any
//! column named like `address:city` is folded into an `address` mapping, then
//! flattened back out with `flatten` to show the round trip.
//!
//! Run with: cargo run --example csv_to_json -- people.csv

use rowflow::row::{flatten, stringify_arrays, Row, Value};
use rowflow::sink::JsonSink;
use rowflow::table::{CsvConfig, CsvTable};
use rowflow::{BoxError, Transformer};

fn nest_columns(row: Row) -> Result<Row, BoxError> {
    let mut nested = Row::new();
    for (key, value) in row {
        match key.split_once(':') {
            Some((parent, child)) => {
                let entry = match nested.remove(parent) {
                    Some(Value::Object(mut fields)) => {
                        fields.insert(child.to_string(), value);
                        Value::Object(fields)
                    }
                    Some(other) => return Err(format!("'{parent}' is both a column and a group: {other}").into()),
                    None => {
                        let mut fields = serde_json::Map::new();
                        fields.insert(child.to_string(), value);
                        Value::Object(fields)
                    }
                };
                nested.insert(parent, entry);
            }
            None => {
                nested.insert(key, value);
            }
        }
    }
    Ok(nested)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logs
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let table = match std::env::args().nth(1) {
        Some(path) => CsvTable::from_path(path, &CsvConfig::default()),
        None => CsvTable::new(std::io::stdin()),
    };

    Transformer::new(table)
        .map(nest_columns)
        .map(flatten)
        .map(stringify_arrays)
        .sink(JsonSink::new(std::io::stdout()))
        .await?;

    Ok(())
}
