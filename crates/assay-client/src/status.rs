use crate::error::Result;
use crate::store::{AnalysisUpdate, CasResult, Condition, Patch, Store};
use assay_core::{
    engine::{self, CheckJobsUpdatedRequest},
    errors::{DomainError, ErrorKind},
    model::{AnalysisId, AnalysisStatus, JobReport},
};
use assay_executor::{describe_jobs, BatchService, DescribeJobsRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub analysis_id: AnalysisId,
    pub analysis: StatusChange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JobReport>>,
}

impl UpdateStatusRequest {
    pub fn validate(&self) -> std::result::Result<(), DomainError> {
        if self.analysis_id.0.trim().is_empty() {
            return Err(DomainError::validation("'analysis_id' must not be empty"));
        }
        Ok(())
    }

    fn to_update(&self) -> AnalysisUpdate {
        let error = match &self.analysis.error {
            Some(error) if !error.is_empty() => Patch::Set(error.clone()),
            _ => Patch::Keep,
        };
        let jobs = match &self.jobs {
            Some(jobs) => Patch::Set(jobs.iter().map(|j| j.status.to_lowercase()).collect()),
            None => Patch::Keep,
        };
        AnalysisUpdate {
            status: Some(self.analysis.status),
            error,
            jobs,
            ..AnalysisUpdate::default()
        }
    }
}

fn canceled_conflict(analysis_id: &AnalysisId, result: CasResult) -> DomainError {
    let reason = match result {
        CasResult::ConditionFailed {
            actual: Some(status),
        } => format!("analysis is {}", status),
        _ => "analysis record does not exist".to_string(),
    };
    DomainError::conflict(analysis_id, reason)
}

/// Commits an aggregate status unless the analysis is being canceled.
/// Returns the error string that was supplied, or an empty string.
pub async fn update_status(store: &dyn Store, request: &UpdateStatusRequest) -> Result<String> {
    request.validate()?;

    let result = store
        .update_analysis(
            &request.analysis_id,
            request.to_update(),
            Condition::StatusNot(AnalysisStatus::Canceling),
        )
        .await?;
    if !result.is_applied() {
        tracing::warn!(
            "Status update for analysis '{}' rejected: {:?}",
            request.analysis_id,
            result
        );
        return Err(canceled_conflict(&request.analysis_id, result).into());
    }

    tracing::info!(
        "Analysis '{}' is now {}",
        request.analysis_id,
        request.analysis.status
    );
    Ok(request.analysis.error.clone().unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordJobsRequest {
    pub analysis_id: AnalysisId,
    #[serde(rename = "jobIds")]
    pub job_ids: Vec<String>,
}

/// Stores the submitted job ids so later steps can describe or terminate them.
///
/// A canceling analysis still gets its ids, so that `terminate_jobs` reaches
/// jobs submitted after the cancel, but the call fails with a conflict.
pub async fn record_jobs(store: &dyn Store, request: &RecordJobsRequest) -> Result<()> {
    if request.job_ids.is_empty() {
        return Err(DomainError::validation("'jobIds' must not be empty").into());
    }
    let update = AnalysisUpdate {
        job_ids: Patch::Set(request.job_ids.clone()),
        ..AnalysisUpdate::default()
    };
    let result = store
        .update_analysis(
            &request.analysis_id,
            update.clone(),
            Condition::StatusNot(AnalysisStatus::Canceling),
        )
        .await?;
    match result {
        CasResult::Applied(_) => {}
        CasResult::ConditionFailed {
            actual: Some(AnalysisStatus::Canceling),
        } => {
            let kept = store
                .update_analysis(
                    &request.analysis_id,
                    update,
                    Condition::StatusIn(vec![AnalysisStatus::Canceling]),
                )
                .await?;
            if kept.is_applied() {
                tracing::warn!(
                    "Analysis '{}' is canceling; kept {} jobs for termination",
                    request.analysis_id,
                    request.job_ids.len()
                );
            }
            return Err(canceled_conflict(&request.analysis_id, result).into());
        }
        other => return Err(canceled_conflict(&request.analysis_id, other).into()),
    }
    tracing::debug!(
        "Recorded {} jobs on analysis '{}'",
        request.job_ids.len(),
        request.analysis_id
    );
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRequest {
    pub analysis_id: AnalysisId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Vec<JobReport>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum PollOutcome {
    Unchanged,
    Updated {
        status: AnalysisStatus,
        error: String,
    },
    Canceled,
}

impl PollOutcome {
    pub fn keep_polling(&self) -> bool {
        match self {
            PollOutcome::Unchanged => true,
            PollOutcome::Updated { status, .. } => matches!(
                status,
                AnalysisStatus::Pending | AnalysisStatus::Running | AnalysisStatus::Failing
            ),
            PollOutcome::Canceled => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    #[serde(flatten)]
    pub outcome: PollOutcome,
    pub jobs: Vec<JobReport>,
    pub keep_polling: bool,
}

impl PollResponse {
    fn new(outcome: PollOutcome, jobs: Vec<JobReport>) -> Self {
        let keep_polling = outcome.keep_polling();
        Self {
            outcome,
            jobs,
            keep_polling,
        }
    }
}

/// One poller iteration: describe, diff against `previous`, aggregate, commit.
pub async fn poll_analysis(
    store: &dyn Store,
    batch: &dyn BatchService,
    request: &PollRequest,
) -> Result<PollResponse> {
    let analysis = store
        .get_analysis(&request.analysis_id)
        .await?
        .ok_or_else(|| {
            DomainError::not_found(
                "Analysis",
                format!("analysis '{}' does not exist", request.analysis_id),
            )
        })?;
    if analysis.status == AnalysisStatus::Canceling {
        return Ok(PollResponse::new(PollOutcome::Canceled, Vec::new()));
    }

    let job_ids = analysis.job_ids.unwrap_or_default();
    if job_ids.is_empty() {
        return Err(DomainError::validation(format!(
            "analysis '{}' has no recorded jobs",
            request.analysis_id
        ))
        .into());
    }

    let jobs = describe_jobs(
        batch,
        &DescribeJobsRequest {
            analysis_id: request.analysis_id.clone(),
            job_ids,
        },
    )
    .await?;

    if let Some(previous) = &request.previous {
        let changed = engine::check_jobs_updated(&CheckJobsUpdatedRequest {
            jobs: jobs.clone(),
            old_jobs: previous.clone(),
        })?;
        if !changed {
            tracing::debug!("No job changes for analysis '{}'", request.analysis_id);
            return Ok(PollResponse::new(PollOutcome::Unchanged, jobs));
        }
    }

    let summary = engine::aggregate_status(&jobs);
    let update = UpdateStatusRequest {
        analysis_id: request.analysis_id.clone(),
        analysis: StatusChange {
            status: summary.status,
            error: Some(summary.error.clone()),
        },
        jobs: Some(jobs.clone()),
    };
    match update_status(store, &update).await {
        Ok(_) => Ok(PollResponse::new(
            PollOutcome::Updated {
                status: summary.status,
                error: summary.error,
            },
            jobs,
        )),
        Err(e) if e.kind() == ErrorKind::Conflict => {
            tracing::info!(
                "Analysis '{}' was canceled while polling",
                request.analysis_id
            );
            Ok(PollResponse::new(PollOutcome::Canceled, jobs))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::model::JobStatus;

    #[test]
    fn test_empty_error_is_not_written() {
        let request = UpdateStatusRequest {
            analysis_id: "an-1".into(),
            analysis: StatusChange {
                status: AnalysisStatus::Running,
                error: Some(String::new()),
            },
            jobs: None,
        };
        let update = request.to_update();
        assert_eq!(update.error, Patch::Keep);
        assert_eq!(update.jobs, Patch::Keep);
    }

    #[test]
    fn test_jobs_written_lowercase_in_order() {
        let request = UpdateStatusRequest {
            analysis_id: "an-1".into(),
            analysis: StatusChange {
                status: AnalysisStatus::Failed,
                error: Some("boom".to_string()),
            },
            jobs: Some(vec![
                JobReport::new(JobStatus::Succeeded),
                JobReport::failed("boom"),
            ]),
        };
        let update = request.to_update();
        assert_eq!(update.error, Patch::Set("boom".to_string()));
        assert_eq!(
            update.jobs,
            Patch::Set(vec!["succeeded".to_string(), "failed".to_string()])
        );
    }

    #[test]
    fn test_keep_polling_only_for_non_terminal_outcomes() {
        assert!(PollOutcome::Unchanged.keep_polling());
        assert!(!PollOutcome::Canceled.keep_polling());
        let updated = |status| PollOutcome::Updated {
            status,
            error: String::new(),
        };
        assert!(updated(AnalysisStatus::Failing).keep_polling());
        assert!(!updated(AnalysisStatus::Failed).keep_polling());
        assert!(!updated(AnalysisStatus::Succeeded).keep_polling());
    }

    #[test]
    fn test_poll_response_serializes_flat() {
        let response = PollResponse::new(
            PollOutcome::Updated {
                status: AnalysisStatus::Running,
                error: String::new(),
            },
            vec![JobReport::new(JobStatus::Running)],
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["outcome"], "updated");
        assert_eq!(value["status"], "running");
        assert_eq!(value["keep_polling"], true);
        assert_eq!(value["jobs"][0]["status"], "RUNNING");
    }
}
