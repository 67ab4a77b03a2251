use tracing::{debug, warn};

use crate::row::Row;
use crate::sink::Sink;
use crate::table::{Producer, StreamTable, Table};
use crate::types::{BoxError, Error};

type MapFn = Box<dyn Fn(Row) -> Result<Row, BoxError> + Send + Sync>;
type SelectFn = Box<dyn Fn(&Row) -> bool + Send + Sync>;
type EachFn = Box<dyn Fn(&Row) + Send + Sync>;

enum Step {
    Map(MapFn),
    Select(SelectFn),
    Each(EachFn),
}

/// The queued steps of a [`Transformer`], applied in insertion order.
#[derive(Default)]
struct Chain {
    steps: Vec<Step>,
}

impl Chain {
    /// Runs one row through every step.
    ///
    /// `Ok(None)` means a `select` step dropped the row.
    fn apply(&self, mut row: Row) -> Result<Option<Row>, Error> {
        for (index, step) in self.steps.iter().enumerate() {
            match step {
                Step::Map(f) => row = f(row).map_err(|source| Error::transform(index, source))?,
                Step::Select(keep) => {
                    if !keep(&row) {
                        return Ok(None);
                    }
                }
                Step::Each(f) => f(&row),
            }
        }
        Ok(Some(row))
    }
}

/// Lazily chains row functions onto a [`Table`].
///
/// Adding steps only records them. Nothing runs until the chain is
/// materialized with [`table`](Transformer::table) or driven into a sink
/// with [`sink`](Transformer::sink).
///
/// ```rust,ignore
/// let result = Transformer::new(CsvTable::new(input))
///     .map(flatten)
///     .map(stringify_arrays)
///     .sink(JsonSink::new(std::io::stdout()))
///     .await;
/// ```
pub struct Transformer {
    source: Box<dyn Table>,
    chain: Chain,
}

impl Transformer {
    pub fn new<T: Table + 'static>(source: T) -> Self {
        Transformer {
            source: Box::new(source),
            chain: Chain::default(),
        }
    }

    /// Appends a fallible row transform.
    ///
    /// An error returned by `f` ends the pipeline. To tolerate bad rows,
    /// handle them inside `f` or drop them with [`select`](Transformer::select).
    pub fn map<F, E>(mut self, f: F) -> Self
    where
        F: Fn(Row) -> Result<Row, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.chain.steps.push(Step::Map(Box::new(
            move |row: Row| -> Result<Row, BoxError> { f(row).map_err(Into::into) },
        )));
        self
    }

    /// Appends a filter: rows for which `keep` is false are dropped.
    pub fn select<F>(mut self, keep: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        self.chain.steps.push(Step::Select(Box::new(keep)));
        self
    }

    /// Appends an observer called with every row that reaches this step.
    pub fn each<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) + Send + Sync + 'static,
    {
        self.chain.steps.push(Step::Each(Box::new(f)));
        self
    }

    /// Materializes the chain as a new table.
    ///
    /// A failing step becomes the new table's terminal error. The source is
    /// stopped whenever the new table ends before the source does.
    pub fn table(self) -> StreamTable {
        let Transformer { mut source, chain } = self;
        StreamTable::spawn(move |producer| async move {
            let result = pump(&mut source, &chain, &producer).await;
            source.stop();
            result
        })
    }

    /// Drives every row through the chain into `sink`.
    ///
    /// Returns the first error from the source, a step, or the sink. The sink
    /// is closed exactly once whatever the outcome; a close error is only
    /// reported when nothing failed before it.
    pub async fn sink<S: Sink>(self, mut sink: S) -> Result<(), Error> {
        let Transformer { mut source, chain } = self;

        let result = drive(&mut source, &chain, &mut sink).await;
        if let Err(err) = &result {
            warn!(error = %err, "pipeline failed, stopping source");
            source.stop();
        }

        let closed = sink.close().await;
        result.and(closed)
    }
}

async fn pump(source: &mut Box<dyn Table>, chain: &Chain, producer: &Producer) -> Result<(), Error> {
    loop {
        let next = tokio::select! {
            biased;
            _ = producer.stopped() => return Ok(()),
            next = source.next() => next,
        };
        let Some(row) = next else {
            return match source.err() {
                Some(err) => Err(err),
                None => Ok(()),
            };
        };
        if let Some(row) = chain.apply(row)? {
            if !producer.send(row).await {
                debug!("transformed table stopped by its consumer");
                return Ok(());
            }
        }
    }
}

async fn drive<S: Sink>(source: &mut Box<dyn Table>, chain: &Chain, sink: &mut S) -> Result<(), Error> {
    while let Some(row) = source.next().await {
        if let Some(row) = chain.apply(row)? {
            sink.write(row).await?;
        }
    }
    match source.err() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
