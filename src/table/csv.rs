use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use async_trait::async_trait;
use derive_builder::Builder;

use super::stream::{Producer, StreamTable, TableState};
use super::Table;
use crate::row::{Row, Value};
use crate::types::Error;

/// Dialect of the delimited text read by a [`CsvTable`].
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct CsvConfig {
    /// Field separator
    #[builder(default = "b','")]
    pub(crate) delimiter: u8,

    /// Quote character
    #[builder(default = "b'\"'")]
    pub(crate) quote: u8,

    /// Trim surrounding whitespace from headers and fields
    #[builder(default = "false")]
    pub(crate) trim: bool,

    /// Lines starting with this byte are skipped
    #[builder(default = "None")]
    pub(crate) comment: Option<u8>,
}

impl CsvConfig {
    #[inline]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    #[inline]
    pub fn quote(&self) -> u8 {
        self.quote
    }

    #[inline]
    pub fn trim(&self) -> bool {
        self.trim
    }

    #[inline]
    pub fn comment(&self) -> Option<u8> {
        self.comment
    }

    fn reader<R: Read>(&self, input: R) -> ::csv::Reader<R> {
        ::csv::ReaderBuilder::new()
            .has_headers(false)
            // field counts are checked against the header by the table
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .trim(if self.trim {
                ::csv::Trim::All
            } else {
                ::csv::Trim::None
            })
            .comment(self.comment)
            .from_reader(input)
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        CsvConfig {
            delimiter: b',',
            quote: b'"',
            trim: false,
            comment: None,
        }
    }
}

/// A [`Table`] over header-first delimited text.
///
/// The first record names the fields. Every following record becomes a row
/// mapping each header name to the field at the same position, as a string.
/// A record whose field count differs from the header's ends the table with
/// [`Error::FieldCount`]. If the header repeats a name, the later column
/// wins.
pub struct CsvTable {
    inner: StreamTable,
}

impl CsvTable {
    /// Reads comma-separated text from `input`.
    pub fn new<R: Read + Send + 'static>(input: R) -> Self {
        Self::with_config(input, &CsvConfig::default())
    }

    pub fn with_config<R: Read + Send + 'static>(input: R, config: &CsvConfig) -> Self {
        Self::with_reader(config.reader(input))
    }

    /// Scans the records of an already configured reader.
    ///
    /// If the reader was built with `has_headers(true)` its header record is
    /// used, otherwise the first record read is taken as the header.
    pub fn with_reader<R: Read + Send + 'static>(reader: ::csv::Reader<R>) -> Self {
        CsvTable {
            inner: StreamTable::spawn_blocking(move |producer| produce(reader, producer)),
        }
    }

    /// Reads the file at `path`. Failing to open it is the table's error.
    pub fn from_path(path: impl Into<PathBuf>, config: &CsvConfig) -> Self {
        let path = path.into();
        let config = config.clone();
        CsvTable {
            inner: StreamTable::spawn_blocking(move |producer| {
                let file = File::open(&path)?;
                produce(config.reader(file), producer)
            }),
        }
    }

    pub fn state(&self) -> TableState {
        self.inner.state()
    }
}

fn produce<R: Read>(mut reader: ::csv::Reader<R>, producer: &Producer) -> Result<(), Error> {
    let mut record = ::csv::StringRecord::new();
    let header: Vec<String> = if reader.has_headers() {
        reader.headers()?.iter().map(str::to_owned).collect()
    } else {
        if !reader.read_record(&mut record)? {
            return Ok(());
        }
        record.iter().map(str::to_owned).collect()
    };

    while !producer.is_stopped() {
        if !reader.read_record(&mut record)? {
            break;
        }
        if record.len() != header.len() {
            return Err(Error::FieldCount {
                line: record.position().map_or(0, |pos| pos.line()),
                expected: header.len(),
                found: record.len(),
            });
        }
        let row: Row = header
            .iter()
            .zip(record.iter())
            .map(|(name, field)| (name.as_str(), Value::String(field.to_owned())))
            .collect();
        if !producer.blocking_send(row) {
            break;
        }
    }
    Ok(())
}

#[async_trait]
impl Table for CsvTable {
    async fn next(&mut self) -> Option<Row> {
        self.inner.next().await
    }

    fn err(&self) -> Option<Error> {
        self.inner.err()
    }

    fn stop(&self) {
        self.inner.stop()
    }
}
