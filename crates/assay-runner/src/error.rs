use assay_core::errors::ErrorKind;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] assay_core::errors::ConfigError),

    #[error(transparent)]
    Client(#[from] assay_client::ClientError),

    #[error(transparent)]
    Executor(#[from] assay_executor::ExecutorError),

    #[error("Failed to read event: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    InvalidEvent(serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidArgument(String),

    #[error("Failed to encode result: {0}")]
    Output(serde_json::Error),
}

impl CliError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CliError::Client(e) => e.kind(),
            CliError::Executor(e) => e.kind(),
            CliError::Io(_) | CliError::InvalidEvent(_) | CliError::InvalidArgument(_) => {
                ErrorKind::Validation
            }
            CliError::Config(_) | CliError::Output(_) => ErrorKind::Downstream,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Conflict => 3,
            kind if kind.is_client_fault() => 2,
            _ => 1,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let reasons = match self {
            CliError::Client(e) => e.reasons().to_vec(),
            CliError::Executor(assay_executor::ExecutorError::Domain(e)) => e.reasons().to_vec(),
            _ => Vec::new(),
        };
        ErrorBody {
            error_type: self.kind().as_str(),
            message: self.to_string(),
            reasons,
        }
    }
}

/// Error payload returned to the invoker.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "errorType")]
    pub error_type: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}
