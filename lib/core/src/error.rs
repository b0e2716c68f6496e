use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// External service a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    Embedding,
    Structuring,
    Store,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Embedding => write!(f, "embedding service"),
            Collaborator::Structuring => write!(f, "structuring service"),
            Collaborator::Store => write!(f, "candidate store"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Structuring service error: {0}")]
    Structuring(String),

    #[error("Candidate store error: {0}")]
    Store(String),

    #[error("{collaborator} timed out after {timeout_ms}ms")]
    Timeout {
        collaborator: Collaborator,
        timeout_ms: u64,
    },

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Candidate already exists: {0}")]
    Duplicate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// The collaborator responsible for an infrastructure failure, if any.
    pub fn collaborator(&self) -> Option<Collaborator> {
        match self {
            Error::Embedding(_) => Some(Collaborator::Embedding),
            Error::Structuring(_) => Some(Collaborator::Structuring),
            Error::Store(_) => Some(Collaborator::Store),
            Error::Timeout { collaborator, .. } => Some(*collaborator),
            _ => None,
        }
    }

    /// True when a collaborator failed or timed out. Callers decide on retry.
    pub fn is_infrastructure(&self) -> bool {
        self.collaborator().is_some()
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
