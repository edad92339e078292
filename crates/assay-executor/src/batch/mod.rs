mod ledger;
pub mod local;
pub mod memory;

pub use ledger::BatchLedger;
pub use local::LocalBatchService;
pub use memory::InMemoryBatchService;

use crate::error::{ExecutorError, Result};
use assay_core::model::JobStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerProperties {
    pub image: String,
    pub vcpus: u32,
    pub memory_mib: u64,
    pub command: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_role_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinitionRequest {
    pub name: String,
    pub container: ContainerProperties,
}

/// `<name>:<revision>` as returned by a registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobDefinitionRef {
    pub name: String,
    pub revision: u32,
}

impl fmt::Display for JobDefinitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.revision)
    }
}

impl FromStr for JobDefinitionRef {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, revision) = s
            .rsplit_once(':')
            .ok_or_else(|| ExecutorError::InvalidDefinitionRef(s.to_string()))?;
        let revision = revision
            .parse()
            .map_err(|_| ExecutorError::InvalidDefinitionRef(s.to_string()))?;
        if name.is_empty() {
            return Err(ExecutorError::InvalidDefinitionRef(s.to_string()));
        }
        Ok(JobDefinitionRef {
            name: name.to_string(),
            revision,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub job_name: String,
    pub job_queue: String,
    pub job_definition: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetail {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
}

/// Container batch-execution backend.
///
/// `describe_jobs` may return details in any order and silently omit ids it
/// does not know.
#[async_trait]
pub trait BatchService: Send + Sync {
    async fn register_job_definition(&self, request: JobDefinitionRequest)
        -> Result<JobDefinitionRef>;

    async fn submit_job(&self, request: SubmitJobRequest) -> Result<String>;

    async fn describe_jobs(&self, job_ids: &[String]) -> Result<Vec<JobDetail>>;

    async fn terminate_job(&self, job_id: &str, reason: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_ref_round_trip() {
        let parsed: JobDefinitionRef = "pipe-7-0:12".parse().unwrap();
        assert_eq!(parsed.name, "pipe-7-0");
        assert_eq!(parsed.revision, 12);
        assert_eq!(parsed.to_string(), "pipe-7-0:12");
    }

    #[test]
    fn test_definition_ref_rejects_missing_revision() {
        assert!("pipe-7-0".parse::<JobDefinitionRef>().is_err());
        assert!("pipe-7-0:latest".parse::<JobDefinitionRef>().is_err());
        assert!(":3".parse::<JobDefinitionRef>().is_err());
    }
}
