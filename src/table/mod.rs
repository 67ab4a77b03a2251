pub mod csv;
pub mod stream;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};

use crate::row::Row;
use crate::types::Error;

pub use self::csv::{CsvConfig, CsvConfigBuilder, CsvTable};
pub use stream::{Producer, StreamTable, TableState};

/// A cancellable, single-pass producer of rows.
///
/// # Protocol
///
/// 1. Call [`next`](Table::next) until it returns `None`.
/// 2. Call [`err`](Table::err) to tell clean exhaustion from failure.
///
/// [`stop`](Table::stop) may be called at any point, any number of times.
/// Once it has been called no further row is observable.
#[async_trait]
pub trait Table: Send {
    /// Pulls the next row, or `None` once the table has ended.
    async fn next(&mut self) -> Option<Row>;

    /// The terminal error, if the table ended because of a fault.
    ///
    /// Only meaningful after [`next`](Table::next) has returned `None`.
    fn err(&self) -> Option<Error>;

    /// Asks the producer to cease emitting rows.
    fn stop(&self);
}

#[async_trait]
impl<T: Table + ?Sized> Table for Box<T> {
    async fn next(&mut self) -> Option<Row> {
        (**self).next().await
    }

    fn err(&self) -> Option<Error> {
        (**self).err()
    }

    fn stop(&self) {
        (**self).stop()
    }
}

/// Convenience adapters available on every [`Table`].
pub trait TableExt: Table {
    /// The remaining rows as a [`Stream`](futures::Stream).
    ///
    /// Check [`err`](Table::err) once the stream has ended.
    fn rows(&mut self) -> BoxStream<'_, Row> {
        futures::stream::unfold(self, |table| async move {
            let row = table.next().await?;
            Some((row, table))
        })
        .boxed()
    }

    /// Drains the table into memory, or returns its terminal error.
    fn collect_rows(mut self) -> BoxFuture<'static, Result<Vec<Row>, Error>>
    where
        Self: Sized + 'static,
    {
        async move {
            let mut rows = Vec::new();
            while let Some(row) = self.next().await {
                rows.push(row);
            }
            match self.err() {
                Some(err) => Err(err),
                None => Ok(rows),
            }
        }
        .boxed()
    }
}

impl<T: Table + ?Sized> TableExt for T {}
