pub mod csv;
pub mod json;

use async_trait::async_trait;

use crate::row::Row;
use crate::table::Table;
use crate::transformer::Transformer;
use crate::types::Error;

pub use self::csv::CsvSink;
pub use json::JsonSink;

/// Terminal consumer of a pipeline.
///
/// The driver calls [`write`](Sink::write) once per row and then
/// [`close`](Sink::close) exactly once, on success and on failure alike.
/// Implementations treat a second `close` as a no-op.
///
/// # Blocking
///
/// [`CsvSink`] and [`JsonSink`] write to a blocking [`std::io::Write`] from
/// inside these async methods, through a buffer that is flushed on `close`.
/// That suits stdout, files and in-memory buffers. For a writer that can
/// stall (pipes, network sockets), implement `Sink` over an async writer or
/// hand the work to [`tokio::task::spawn_blocking`] in the implementation.
#[async_trait]
pub trait Sink: Send {
    /// Persists one row.
    async fn write(&mut self, row: Row) -> Result<(), Error>;

    /// Flushes and releases the underlying resource.
    async fn close(&mut self) -> Result<(), Error>;
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Box<S> {
    async fn write(&mut self, row: Row) -> Result<(), Error> {
        (**self).write(row).await
    }

    async fn close(&mut self) -> Result<(), Error> {
        (**self).close().await
    }
}

/// Drains `table` into `sink`.
///
/// The table's own error takes precedence over a failure to close the sink.
pub async fn drain<T, S>(table: T, sink: S) -> Result<(), Error>
where
    T: Table + 'static,
    S: Sink,
{
    Transformer::new(table).sink(sink).await
}
