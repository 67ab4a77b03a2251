//! # rowflow
//!
//! Streaming row pipelines built on Tokio: pull rows from a table, run them
//! through a chain of transforms, write them to a sink.
//!
//! ## Features
//!
//! - **Single-pass streaming** with one row in flight per stage
//! - **Backpressure** via a rendezvous handoff between producer and consumer
//! - **Cooperative cancellation** with idempotent `stop`
//! - **First failure wins** across source, transforms and sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rowflow::row::{flatten, stringify_arrays};
//! use rowflow::sink::CsvSink;
//! use rowflow::table::CsvTable;
//! use rowflow::transformer::Transformer;
//!
//! let input = std::fs::File::open("students.csv")?;
//! Transformer::new(CsvTable::new(input))
//!     .map(flatten)
//!     .map(stringify_arrays)
//!     .sink(CsvSink::create("students.out.csv")?)
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`row`] - The row value type and row-to-row transforms
//! - [`table`] - Row sources: the [`Table`] contract, CSV and in-memory tables
//! - [`transformer`] - Lazy transform chains over a table
//! - [`sink`] - Terminal consumers writing CSV or JSON lines
//! - [`manager`] - Running independent pipelines concurrently

pub mod manager;
pub mod row;
pub mod sink;
pub mod table;
pub mod transformer;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use manager::{ManagerError, PipelineManager};
pub use row::{Row, Value};
pub use sink::Sink;
pub use table::{Table, TableExt};
pub use transformer::Transformer;
pub use types::{BoxError, Error};
