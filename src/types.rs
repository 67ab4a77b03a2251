use std::sync::Arc;

use thiserror::Error;

/// Boxed error accepted from caller-supplied transform functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can end a table, a transform chain or a sink.
///
/// The terminal error of a table is read by the consumer while the producer
/// task still owns its copy, so every variant is cheap to clone. Sources that
/// are not `Clone` themselves are kept behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The CSV reader or writer failed.
    #[error("csv error: {0}")]
    Csv(#[source] Arc<csv::Error>),

    /// A data line did not have as many fields as the header.
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Reading or writing the underlying resource failed.
    #[error("io error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// A row could not be serialized as JSON.
    #[error("json error: {0}")]
    Json(#[source] Arc<serde_json::Error>),

    /// A transform step rejected a row.
    ///
    /// `step` is the zero-based position of the step in its chain.
    #[error("transform step {step} failed: {source}")]
    Transform {
        step: usize,
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// A nested mapping was deeper than flattening allows.
    #[error("nesting under '{key}' exceeds {limit} levels")]
    NestingTooDeep { key: String, limit: usize },

    /// A row carried a field the sink's header does not have.
    #[error("field '{0}' is not part of the sink header")]
    UnknownField(String),

    /// A row was written after the sink was closed.
    #[error("sink already closed")]
    SinkClosed,

    /// The task producing a table's rows panicked.
    #[error("table producer panicked")]
    ProducerPanicked,
}

impl Error {
    /// Wraps an error returned by the transform step at `step`.
    pub fn transform(step: usize, source: impl Into<BoxError>) -> Self {
        Error::Transform {
            step,
            source: Arc::from(source.into()),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(Arc::new(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_transform_error_preserves_source() {
        let err = Error::transform(1, "bad row");

        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "transform step 1 failed: bad row");
    }

    #[test]
    fn test_error_display() {
        let err = Error::FieldCount {
            line: 3,
            expected: 2,
            found: 4,
        };
        assert_eq!(err.to_string(), "line 3: expected 2 fields, found 4");

        let err = Error::UnknownField("age".to_string());
        assert_eq!(err.to_string(), "field 'age' is not part of the sink header");
    }

    #[test]
    fn test_clone_shares_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = Error::from(io);
        let copy = err.clone();

        assert_eq!(err.to_string(), copy.to_string());
        assert!(copy.source().is_some());
    }
}
