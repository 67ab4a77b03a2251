use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use async_trait::async_trait;

use super::Sink;
use crate::row::Row;
use crate::types::Error;

/// Writes one compact JSON object per line, keys in lexicographic order.
pub struct JsonSink<W: Write> {
    writer: Option<BufWriter<W>>,
}

impl JsonSink<File> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonSink<W> {
    pub fn new(output: W) -> Self {
        JsonSink {
            writer: Some(BufWriter::new(output)),
        }
    }
}

#[async_trait]
impl<W: Write + Send> Sink for JsonSink<W> {
    async fn write(&mut self, row: Row) -> Result<(), Error> {
        let writer = self.writer.as_mut().ok_or(Error::SinkClosed)?;
        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
