use thiserror::Error;

/// Failures of the revision pipeline. Every variant aborts the enclosing
/// transaction.
#[derive(Debug, Error)]
pub enum RevisionError {
    /// A referenced entity, revision or editor does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The edit would not change anything
    #[error("Entity did not change")]
    NoChange,

    /// The request is inconsistent with stored state (e.g. the merge queue)
    #[error("Validation conflict: {0}")]
    ValidationConflict(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl RevisionError {
    pub fn not_found(what: impl Into<String>) -> Self {
        RevisionError::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        RevisionError::ValidationConflict(what.into())
    }
}

impl From<serde_json::Error> for RevisionError {
    fn from(err: serde_json::Error) -> Self {
        RevisionError::Unexpected(err.into())
    }
}

pub type RevisionResult<T> = std::result::Result<T, RevisionError>;
