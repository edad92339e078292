use assay_core::errors::{ConfigError, DomainError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Batch service call '{operation}' failed: {message}")]
    Batch {
        operation: &'static str,
        message: String,
    },

    #[error("Batch service returned an unreadable job definition reference '{0}'")]
    InvalidDefinitionRef(String),
}

impl ExecutorError {
    pub fn batch(operation: &'static str, message: impl Into<String>) -> Self {
        ExecutorError::Batch {
            operation,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutorError::Domain(e) => e.kind(),
            ExecutorError::Config(_)
            | ExecutorError::Batch { .. }
            | ExecutorError::InvalidDefinitionRef(_) => ErrorKind::Downstream,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
