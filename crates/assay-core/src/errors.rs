use crate::model::AnalysisId;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse error class surfaced to callers so they can branch without
/// inspecting error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Downstream,
}

impl ErrorKind {
    pub fn is_client_fault(&self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::NotFound)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::Downstream => "DownstreamError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path '{path}': {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    General(String),

    #[error("Could not determine the XDG {0} directory.")]
    XdgDirectoryNotFound(&'static str),

    #[error("Failed to lock state file '{path}': {reason}")]
    StateLock { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{what} not found: {}", reasons.join("; "))]
    NotFound {
        what: &'static str,
        reasons: Vec<String>,
    },

    #[error("Analysis '{analysis_id}' was modified concurrently: {reason}")]
    Conflict {
        analysis_id: AnalysisId,
        reason: String,
    },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub fn not_found(what: &'static str, reason: impl Into<String>) -> Self {
        DomainError::NotFound {
            what,
            reasons: vec![reason.into()],
        }
    }

    pub fn conflict(analysis_id: &AnalysisId, reason: impl Into<String>) -> Self {
        DomainError::Conflict {
            analysis_id: analysis_id.clone(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Conflict { .. } => ErrorKind::Conflict,
        }
    }

    pub fn reasons(&self) -> &[String] {
        match self {
            DomainError::NotFound { reasons, .. } => reasons,
            _ => &[],
        }
    }
}
