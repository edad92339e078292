use crate::batch::{BatchService, JobDetail};
use crate::error::Result;
use assay_core::{
    errors::DomainError,
    model::{AnalysisId, JobReport, JobStatus},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeJobsRequest {
    pub analysis_id: AnalysisId,
    #[serde(rename = "jobIds")]
    pub job_ids: Vec<String>,
}

impl DescribeJobsRequest {
    pub fn validate(&self) -> std::result::Result<(), DomainError> {
        if self.job_ids.is_empty() {
            return Err(DomainError::validation("'jobIds' must not be empty"));
        }
        Ok(())
    }
}

fn report_for(detail: &JobDetail) -> JobReport {
    match detail.status {
        JobStatus::Failed => JobReport {
            status: JobStatus::Failed,
            reason: detail.status_reason.clone(),
        },
        status => JobReport::new(status),
    }
}

/// Current status of each requested job, in request order.
pub async fn describe_jobs(
    batch: &dyn BatchService,
    request: &DescribeJobsRequest,
) -> Result<Vec<JobReport>> {
    request.validate()?;

    let by_id: HashMap<String, JobDetail> = batch
        .describe_jobs(&request.job_ids)
        .await?
        .into_iter()
        .map(|detail| (detail.job_id.clone(), detail))
        .collect();

    let mut missing = Vec::new();
    let mut reports = Vec::with_capacity(request.job_ids.len());
    for job_id in &request.job_ids {
        match by_id.get(job_id) {
            Some(detail) => reports.push(report_for(detail)),
            None => missing.push(format!("job '{}' is unknown to the batch service", job_id)),
        }
    }

    if !missing.is_empty() {
        return Err(DomainError::NotFound {
            what: "Job",
            reasons: missing,
        }
        .into());
    }

    tracing::debug!(
        "Described {} jobs for analysis '{}'",
        reports.len(),
        request.analysis_id
    );
    Ok(reports)
}
