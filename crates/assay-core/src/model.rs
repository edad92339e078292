use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Dataset id used by pipelines for labels the caller must bind at submission.
pub const NIL_DATASET_ID: Uuid = Uuid::nil();

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct AnalysisId(pub String);

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AnalysisId {
    fn from(s: String) -> Self {
        AnalysisId(s)
    }
}

impl From<&str> for AnalysisId {
    fn from(s: &str) -> Self {
        AnalysisId(s.to_string())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct PipelineId(pub String);

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PipelineId {
    fn from(s: String) -> Self {
        PipelineId(s)
    }
}

impl From<&str> for PipelineId {
    fn from(s: &str) -> Self {
        PipelineId(s.to_string())
    }
}

/// Label → dataset id. Ordered so that rendered payloads are stable.
pub type DatasetMap = BTreeMap<String, Uuid>;

/// Lifecycle stage of one batch job, in precedence order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Submitted,
    Pending,
    Runnable,
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Submitted,
        JobStatus::Pending,
        JobStatus::Runnable,
        JobStatus::Starting,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Pending => "PENDING",
            JobStatus::Runnable => "RUNNABLE",
            JobStatus::Starting => "STARTING",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Form stored in an analysis record's `jobs` list.
    pub fn to_lowercase(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseJobStatusError(pub String);

impl fmt::Display for ParseJobStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid job status: '{}'. Valid values are: SUBMITTED, PENDING, RUNNABLE, STARTING, RUNNING, SUCCEEDED, FAILED",
            self.0
        )
    }
}

impl std::error::Error for ParseJobStatusError {}

impl FromStr for JobStatus {
    type Err = ParseJobStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMITTED" => Ok(JobStatus::Submitted),
            "PENDING" => Ok(JobStatus::Pending),
            "RUNNABLE" => Ok(JobStatus::Runnable),
            "STARTING" => Ok(JobStatus::Starting),
            "RUNNING" => Ok(JobStatus::Running),
            "SUCCEEDED" => Ok(JobStatus::Succeeded),
            "FAILED" => Ok(JobStatus::Failed),
            _ => Err(ParseJobStatusError(s.to_string())),
        }
    }
}

/// Status of a job as reported by the batch service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl JobReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            reason: Some(reason.into()),
        }
    }
}

impl From<JobStatus> for JobReport {
    fn from(status: JobStatus) -> Self {
        JobReport::new(status)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Created,
    Submitted,
    Pending,
    Running,
    Failing,
    Failed,
    Succeeded,
    Canceling,
}

impl AnalysisStatus {
    /// Statuses from which a new execution may be submitted.
    pub const RESUBMITTABLE: [AnalysisStatus; 3] = [
        AnalysisStatus::Created,
        AnalysisStatus::Failed,
        AnalysisStatus::Succeeded,
    ];

    /// Statuses of an execution that is still in flight.
    pub const IN_FLIGHT: [AnalysisStatus; 4] = [
        AnalysisStatus::Submitted,
        AnalysisStatus::Pending,
        AnalysisStatus::Running,
        AnalysisStatus::Failing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Created => "created",
            AnalysisStatus::Submitted => "submitted",
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Running => "running",
            AnalysisStatus::Failing => "failing",
            AnalysisStatus::Failed => "failed",
            AnalysisStatus::Succeeded => "succeeded",
            AnalysisStatus::Canceling => "canceling",
        }
    }

    pub fn accepts_submission(&self) -> bool {
        Self::RESUBMITTABLE.contains(self)
    }

    pub fn is_in_flight(&self) -> bool {
        Self::IN_FLIGHT.contains(self)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAnalysisStatusError(pub String);

impl fmt::Display for ParseAnalysisStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid analysis status: '{}'", self.0)
    }
}

impl std::error::Error for ParseAnalysisStatusError {}

impl FromStr for AnalysisStatus {
    type Err = ParseAnalysisStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(AnalysisStatus::Created),
            "submitted" => Ok(AnalysisStatus::Submitted),
            "pending" => Ok(AnalysisStatus::Pending),
            "running" => Ok(AnalysisStatus::Running),
            "failing" => Ok(AnalysisStatus::Failing),
            "failed" => Ok(AnalysisStatus::Failed),
            "succeeded" => Ok(AnalysisStatus::Succeeded),
            "canceling" => Ok(AnalysisStatus::Canceling),
            _ => Err(ParseAnalysisStatusError(s.to_string())),
        }
    }
}

fn default_cores() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub app: String,
    pub args: String,
    #[serde(default = "default_cores")]
    pub cores: u32,
    /// Gigabytes. `None` falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    #[serde(default)]
    pub datasets: DatasetMap,
    pub steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Labels still bound to the nil sentinel.
    pub fn unbound_labels(&self) -> Vec<&str> {
        self.datasets
            .iter()
            .filter(|(_, id)| id.is_nil())
            .map(|(label, _)| label.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: AnalysisId,
    #[serde(default)]
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<PipelineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasets: Option<DatasetMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_ids: Option<Vec<String>>,
}

impl Analysis {
    pub fn new(id: AnalysisId, created_by: impl Into<String>) -> Self {
        Self {
            id,
            description: String::new(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            updated_at: None,
            status: AnalysisStatus::Created,
            pipeline_id: None,
            datasets: None,
            error: None,
            jobs: None,
            job_ids: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_precedence_order() {
        let mut shuffled = vec![
            JobStatus::Failed,
            JobStatus::Running,
            JobStatus::Submitted,
            JobStatus::Succeeded,
            JobStatus::Starting,
            JobStatus::Pending,
            JobStatus::Runnable,
        ];
        shuffled.sort();
        assert_eq!(shuffled, JobStatus::ALL.to_vec());
    }

    #[test]
    fn test_job_status_from_str_rejects_lowercase() {
        assert!(JobStatus::from_str("running").is_err());
        assert_eq!(JobStatus::from_str("RUNNING").unwrap(), JobStatus::Running);
    }

    #[test]
    fn test_job_report_deserialize_without_reason() {
        let report: JobReport = serde_json::from_str(r#"{"status":"STARTING"}"#).unwrap();
        assert_eq!(report, JobReport::new(JobStatus::Starting));
    }

    #[test]
    fn test_job_report_rejects_unknown_status() {
        assert!(serde_json::from_str::<JobReport>(r#"{"status":"DONE"}"#).is_err());
        assert!(serde_json::from_str::<JobReport>(r#"{"status":3}"#).is_err());
        assert!(
            serde_json::from_str::<JobReport>(r#"{"status":"FAILED","reason":7}"#).is_err()
        );
    }

    #[test]
    fn test_analysis_status_round_trips_through_str() {
        for status in [
            AnalysisStatus::Created,
            AnalysisStatus::Failing,
            AnalysisStatus::Canceling,
        ] {
            assert_eq!(AnalysisStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_submission_acceptance() {
        assert!(AnalysisStatus::Created.accepts_submission());
        assert!(AnalysisStatus::Failed.accepts_submission());
        assert!(AnalysisStatus::Succeeded.accepts_submission());
        assert!(!AnalysisStatus::Running.accepts_submission());
        assert!(!AnalysisStatus::Canceling.accepts_submission());
    }

    #[test]
    fn test_pipeline_step_defaults() {
        let step: PipelineStep =
            serde_json::from_str(r#"{"app":"bwa:0.7.17","args":"mem [/Ref/hg38.fa]:i"}"#)
                .unwrap();
        assert_eq!(step.cores, 1);
        assert!(step.memory.is_none());
    }

    #[test]
    fn test_pipeline_unbound_labels() {
        let mut datasets = DatasetMap::new();
        datasets.insert("Reads".to_string(), NIL_DATASET_ID);
        datasets.insert("Ref".to_string(), Uuid::new_v4());
        let pipeline = Pipeline {
            id: "p1".into(),
            name: "align".to_string(),
            datasets,
            steps: vec![],
        };
        assert_eq!(pipeline.unbound_labels(), vec!["Reads"]);
    }
}
