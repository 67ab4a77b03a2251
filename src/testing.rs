//! Fakes shared by the unit tests.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::row::Row;
use crate::sink::Sink;
use crate::table::Table;
use crate::types::Error;

/// Rows numbered `0..n` under the field `id`.
pub(crate) fn numbered(n: usize) -> Vec<Row> {
    (0..n).map(|i| Row::new().with("id", i)).collect()
}

/// Polls `done` until it holds, panicking after a second.
pub(crate) async fn eventually(done: impl Fn() -> bool) {
    let wait = async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(1), wait)
        .await
        .expect("condition not reached in time");
}

/// An in-memory table that counts how often it was stopped.
pub(crate) struct ScriptedTable {
    rows: VecDeque<Row>,
    err: Option<Error>,
    stopped: bool,
    pub(crate) stops: Arc<AtomicUsize>,
}

impl ScriptedTable {
    pub(crate) fn new(rows: Vec<Row>) -> Self {
        ScriptedTable {
            rows: rows.into(),
            err: None,
            stopped: false,
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Ends with `err` once the rows are used up.
    pub(crate) fn failing(rows: Vec<Row>, err: Error) -> Self {
        ScriptedTable {
            err: Some(err),
            ..Self::new(rows)
        }
    }
}

#[async_trait]
impl Table for ScriptedTable {
    async fn next(&mut self) -> Option<Row> {
        if self.stopped || self.stops.load(Ordering::SeqCst) > 0 {
            return None;
        }
        let row = self.rows.pop_front();
        if row.is_none() {
            self.stopped = true;
        }
        row
    }

    fn err(&self) -> Option<Error> {
        if self.stopped {
            self.err.clone()
        } else {
            None
        }
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A sink keeping rows in memory, with optional scripted failures.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) rows: Arc<Mutex<Vec<Row>>>,
    pub(crate) closes: Arc<AtomicUsize>,
    /// Fail the write of the row at this position.
    pub(crate) fail_write_at: Option<usize>,
    pub(crate) fail_close: bool,
}

#[async_trait]
impl Sink for RecordingSink {
    async fn write(&mut self, row: Row) -> Result<(), Error> {
        let mut rows = self.rows.lock().unwrap();
        if self.fail_write_at == Some(rows.len()) {
            return Err(Error::from(std::io::Error::other("write refused")));
        }
        rows.push(row);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(Error::from(std::io::Error::other("close refused")));
        }
        Ok(())
    }
}

/// A cloneable in-memory writer.
#[derive(Clone, Default)]
pub(crate) struct SharedBuf {
    data: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8(self.data.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.data.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
