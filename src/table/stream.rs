use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Table;
use crate::row::Row;
use crate::types::Error;

/// Lifecycle of a channel-backed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// The producer is emitting rows.
    Running,
    /// A consumer asked for a stop the producer has not finished honoring.
    StopRequested,
    /// The producer is done and the row stream is closed.
    Stopped,
}

/// State shared by a [`StreamTable`] and its producer task.
#[derive(Default)]
struct Shared {
    err: OnceLock<Error>,
    stop: CancellationToken,
    finished: AtomicBool,
}

impl Shared {
    fn finish(&self, outcome: Result<(), Error>) {
        if let Err(err) = outcome {
            debug!(error = %err, "table producer failed");
            // first failure wins
            let _ = self.err.set(err);
        }
        self.finished.store(true, Ordering::Release);
    }
}

/// A row in flight, with the signal that tells its producer it was taken.
type Handoff = (Row, oneshot::Sender<()>);

/// Write half of a [`StreamTable`], owned by the producer task.
pub struct Producer {
    tx: mpsc::Sender<Handoff>,
    stop: CancellationToken,
}

impl Producer {
    /// Whether the consumer has asked the table to stop.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Resolves once the consumer asks the table to stop.
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }

    /// Hands one row to the consumer and waits until it has been taken.
    ///
    /// Returns `false` when the row was not delivered because the table was
    /// stopped or dropped; the producer should return at that point.
    pub async fn send(&self, row: Row) -> bool {
        if self.stop.is_cancelled() {
            return false;
        }
        let (taken_tx, taken_rx) = oneshot::channel();
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => false,
            taken = async {
                self.tx.send((row, taken_tx)).await.is_ok() && taken_rx.await.is_ok()
            } => taken,
        }
    }

    /// [`send`](Producer::send) for producers running on a blocking thread.
    ///
    /// Must not be called from an async context.
    pub fn blocking_send(&self, row: Row) -> bool {
        futures::executor::block_on(self.send(row))
    }
}

/// A [`Table`] fed by a producer task through a rendezvous handoff.
///
/// [`Producer::send`] returns only once the consumer has taken the row, so
/// the producer never runs ahead and cannot record a terminal error while a
/// row is still waiting. Dropping the table requests a stop.
pub struct StreamTable {
    rows: mpsc::Receiver<Handoff>,
    shared: Arc<Shared>,
}

impl StreamTable {
    fn channel() -> (StreamTable, Producer, mpsc::Sender<Handoff>) {
        let (tx, rows) = mpsc::channel(1);
        let shared = Arc::new(Shared::default());
        let producer = Producer {
            tx: tx.clone(),
            stop: shared.stop.clone(),
        };
        (StreamTable { rows, shared }, producer, tx)
    }

    /// Starts `produce` as a Tokio task feeding the returned table.
    ///
    /// An `Err` from the producer becomes the table's terminal error. Must be
    /// called from within a Tokio runtime.
    pub fn spawn<F, Fut>(produce: F) -> Self
    where
        F: FnOnce(Producer) -> Fut,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let (table, producer, tx) = Self::channel();
        let shared = Arc::clone(&table.shared);
        let work = produce(producer);

        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(work)
                .catch_unwind()
                .await
                .unwrap_or(Err(Error::ProducerPanicked));
            shared.finish(outcome);
            // the stream closes only once the terminal error is recorded
            drop(tx);
        });
        table
    }

    /// Starts a synchronous `produce` on Tokio's blocking pool.
    ///
    /// Use [`Producer::blocking_send`] to emit rows from it.
    pub fn spawn_blocking<F>(produce: F) -> Self
    where
        F: FnOnce(&Producer) -> Result<(), Error> + Send + 'static,
    {
        let (table, producer, tx) = Self::channel();
        let shared = Arc::clone(&table.shared);

        tokio::task::spawn_blocking(move || {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| produce(&producer)))
                .unwrap_or(Err(Error::ProducerPanicked));
            drop(producer);
            shared.finish(outcome);
            drop(tx);
        });
        table
    }

    /// A table over rows already in memory.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Row>,
        I::IntoIter: Send + 'static,
    {
        let rows = rows.into_iter();
        Self::spawn(move |producer| async move {
            for row in rows {
                if !producer.send(row).await {
                    break;
                }
            }
            Ok(())
        })
    }

    pub fn state(&self) -> TableState {
        if self.shared.finished.load(Ordering::Acquire) {
            TableState::Stopped
        } else if self.shared.stop.is_cancelled() {
            TableState::StopRequested
        } else {
            TableState::Running
        }
    }
}

#[async_trait]
impl Table for StreamTable {
    async fn next(&mut self) -> Option<Row> {
        if !self.shared.stop.is_cancelled() {
            tokio::select! {
                biased;
                _ = self.shared.stop.cancelled() => {}
                handoff = self.rows.recv() => {
                    let (row, taken) = handoff?;
                    let _ = taken.send(());
                    return Some(row);
                }
            }
        }
        self.rows.close();
        None
    }

    fn err(&self) -> Option<Error> {
        self.shared.err.get().cloned()
    }

    fn stop(&self) {
        self.shared.stop.cancel();
    }
}

impl Drop for StreamTable {
    fn drop(&mut self) {
        self.shared.stop.cancel();
    }
}
