use assay_core::errors::{ConfigError, DomainError, ErrorKind};
use assay_executor::ExecutorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("Record store call '{operation}' failed: {message}")]
    Store {
        operation: &'static str,
        message: String,
    },

    #[error("Failed to start workflow '{workflow}': {message}")]
    Workflow { workflow: String, message: String },

    #[error("Failed to encode workflow payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ClientError {
    pub fn store(operation: &'static str, message: impl Into<String>) -> Self {
        ClientError::Store {
            operation,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Domain(e) => e.kind(),
            ClientError::Executor(e) => e.kind(),
            ClientError::Config(_)
            | ClientError::Store { .. }
            | ClientError::Workflow { .. }
            | ClientError::Payload(_) => ErrorKind::Downstream,
        }
    }

    /// Reason list carried by not-found errors.
    pub fn reasons(&self) -> &[String] {
        match self {
            ClientError::Domain(e) => e.reasons(),
            ClientError::Executor(ExecutorError::Domain(e)) => e.reasons(),
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::model::AnalysisId;

    #[test]
    fn test_kind_follows_wrapped_domain_error() {
        let conflict: ClientError = DomainError::conflict(&AnalysisId::from("a"), "canceling").into();
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let nested: ClientError =
            ExecutorError::from(DomainError::validation("bad")).into();
        assert_eq!(nested.kind(), ErrorKind::Validation);

        assert_eq!(
            ClientError::store("UpdateItem", "throttled").kind(),
            ErrorKind::Downstream
        );
    }

    #[test]
    fn test_reasons_reach_through_executor() {
        let err: ClientError = ExecutorError::from(DomainError::NotFound {
            what: "Job",
            reasons: vec!["job 'x' is unknown".to_string()],
        })
        .into();
        assert_eq!(err.reasons().len(), 1);
    }
}
