use crate::errors::DomainError;
use crate::model::{AnalysisStatus, JobReport, JobStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateStatusRequest {
    pub jobs: Vec<JobReport>,
}

impl CalculateStatusRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.jobs.is_empty() {
            return Err(DomainError::validation("'jobs' must not be empty"));
        }
        Ok(())
    }
}

/// Aggregate status plus the error surfaced to the user (empty when none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub status: AnalysisStatus,
    pub error: String,
}

impl StatusSummary {
    fn clean(status: AnalysisStatus) -> Self {
        Self {
            status,
            error: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckJobsUpdatedRequest {
    pub jobs: Vec<JobReport>,
    #[serde(rename = "oldJobs")]
    pub old_jobs: Vec<JobReport>,
}

impl CheckJobsUpdatedRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.jobs.is_empty() {
            return Err(DomainError::validation("'jobs' must not be empty"));
        }
        if self.old_jobs.is_empty() {
            return Err(DomainError::validation("'oldJobs' must not be empty"));
        }
        if self.jobs.len() != self.old_jobs.len() {
            return Err(DomainError::validation(format!(
                "'jobs' has {} entries but 'oldJobs' has {}; the job count of an execution never changes",
                self.jobs.len(),
                self.old_jobs.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StatusCounts {
    before_running: usize,
    running: usize,
    succeeded: usize,
    failed: usize,
}

impl StatusCounts {
    fn tally(jobs: &[JobReport]) -> Self {
        let mut counts = StatusCounts::default();
        for job in jobs {
            match job.status {
                JobStatus::Submitted
                | JobStatus::Pending
                | JobStatus::Runnable
                | JobStatus::Starting => counts.before_running += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Succeeded => counts.succeeded += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    fn total(&self) -> usize {
        self.before_running + self.running + self.succeeded + self.failed
    }

    fn unfinished(&self) -> usize {
        self.before_running + self.running
    }
}

fn first_failure_reason(jobs: &[JobReport]) -> String {
    jobs.iter()
        .find(|job| job.status == JobStatus::Failed)
        .and_then(|job| job.reason.clone())
        .unwrap_or_default()
}

/// Reduces the statuses of one execution's jobs into the analysis status.
///
/// Job order only matters for picking which failure reason is surfaced: the
/// first FAILED job in input order wins.
pub fn aggregate_status(jobs: &[JobReport]) -> StatusSummary {
    let counts = StatusCounts::tally(jobs);

    if counts.before_running == counts.total() {
        StatusSummary::clean(AnalysisStatus::Pending)
    } else if counts.failed == 0 && counts.succeeded < counts.total() {
        StatusSummary::clean(AnalysisStatus::Running)
    } else if counts.failed > 0 && counts.unfinished() > 0 {
        StatusSummary {
            status: AnalysisStatus::Failing,
            error: first_failure_reason(jobs),
        }
    } else if counts.failed > 0 {
        StatusSummary {
            status: AnalysisStatus::Failed,
            error: first_failure_reason(jobs),
        }
    } else {
        StatusSummary::clean(AnalysisStatus::Succeeded)
    }
}

pub fn calculate_status(request: &CalculateStatusRequest) -> Result<StatusSummary, DomainError> {
    request.validate()?;
    let summary = aggregate_status(&request.jobs);
    tracing::debug!(
        "Aggregated {} job statuses into '{}'",
        request.jobs.len(),
        summary.status
    );
    Ok(summary)
}

/// True when any job's status differs from the same position in `old`.
pub fn jobs_changed(jobs: &[JobReport], old: &[JobReport]) -> bool {
    jobs.len() != old.len()
        || jobs
            .iter()
            .zip(old.iter())
            .any(|(current, previous)| current.status != previous.status)
}

pub fn check_jobs_updated(request: &CheckJobsUpdatedRequest) -> Result<bool, DomainError> {
    request.validate()?;
    Ok(jobs_changed(&request.jobs, &request.old_jobs))
}
