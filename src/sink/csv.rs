use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use async_trait::async_trait;

use super::Sink;
use crate::row::{Row, Value};
use crate::types::Error;

/// Writes rows as comma-separated text.
///
/// The header is the first row's field names in lexicographic order and is
/// written just before that row. Later rows are laid out against it: a
/// missing field becomes an empty cell, an extra field is rejected with
/// [`Error::UnknownField`]. Nothing at all is written for an empty table.
///
/// Strings are written as is, null as an empty cell, and every other value
/// as its compact JSON text.
pub struct CsvSink<W: Write> {
    writer: Option<::csv::Writer<W>>,
    header: Option<Vec<String>>,
}

impl CsvSink<File> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(output: W) -> Self {
        CsvSink {
            writer: Some(::csv::Writer::from_writer(output)),
            header: None,
        }
    }

    /// Columns chosen so far, `None` until the first row arrives.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }
}

fn cell(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(text) => Cow::Borrowed(text),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

#[async_trait]
impl<W: Write + Send> Sink for CsvSink<W> {
    async fn write(&mut self, row: Row) -> Result<(), Error> {
        let writer = self.writer.as_mut().ok_or(Error::SinkClosed)?;

        let header = match &mut self.header {
            Some(header) => header,
            empty => {
                let names: Vec<String> = row.keys().cloned().collect();
                writer.write_record(&names)?;
                empty.insert(names)
            }
        };

        // header is sorted, it was built from a row's keys
        if let Some(extra) = row.keys().find(|key| header.binary_search(*key).is_err()) {
            return Err(Error::UnknownField(extra.clone()));
        }

        let record: Vec<Cow<'_, str>> = header
            .iter()
            .map(|name| row.get(name).map_or(Cow::Borrowed(""), cell))
            .collect();
        writer.write_record(record.iter().map(|field| field.as_bytes()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
