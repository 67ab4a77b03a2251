use crate::types::Error;

/// Errors reported by [`PipelineManager::run_all`](super::PipelineManager::run_all).
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("pipeline '{name}' failed: {source}")]
    PipelineFailed {
        name: String,
        #[source]
        source: Error,
    },

    #[error("pipeline '{0}' panicked")]
    Panicked(String),

    #[error("pipeline '{0}' cancelled")]
    Cancelled(String),
}

impl ManagerError {
    /// Name of the pipeline this error is about.
    pub fn pipeline(&self) -> &str {
        match self {
            ManagerError::PipelineFailed { name, .. }
            | ManagerError::Panicked(name)
            | ManagerError::Cancelled(name) => name,
        }
    }
}
