use crate::batch::{BatchService, SubmitJobRequest};
use crate::error::Result;
use assay_core::{config::Config, errors::DomainError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitJobsRequest {
    #[serde(rename = "jobDefinitions")]
    pub job_definitions: Vec<String>,
    #[serde(rename = "jobQueue", default, skip_serializing_if = "Option::is_none")]
    pub job_queue: Option<String>,
}

impl SubmitJobsRequest {
    pub fn validate(&self) -> std::result::Result<(), DomainError> {
        if self.job_definitions.is_empty() {
            return Err(DomainError::validation("'jobDefinitions' must not be empty"));
        }
        if self.job_definitions.iter().any(|d| d.trim().is_empty()) {
            return Err(DomainError::validation(
                "'jobDefinitions' contains an empty identifier",
            ));
        }
        if matches!(&self.job_queue, Some(queue) if queue.trim().is_empty()) {
            return Err(DomainError::validation("'jobQueue' must not be empty"));
        }
        Ok(())
    }

    fn queue<'a>(&'a self, config: &'a Config) -> &'a str {
        self.job_queue.as_deref().unwrap_or(&config.job_queue)
    }
}

/// Batch job names may not contain ':'.
pub fn job_name_for(definition: &str) -> String {
    definition.replace(':', "-")
}

/// Submits one job per definition, in order, each depending on the previous
/// job. Returns the job ids in submission order.
pub async fn submit_jobs(
    batch: &dyn BatchService,
    config: &Config,
    request: &SubmitJobsRequest,
) -> Result<Vec<String>> {
    request.validate()?;
    let queue = request.queue(config);

    let mut job_ids: Vec<String> = Vec::with_capacity(request.job_definitions.len());
    for definition in &request.job_definitions {
        let depends_on = job_ids.last().cloned().into_iter().collect();
        let job_id = batch
            .submit_job(SubmitJobRequest {
                job_name: job_name_for(definition),
                job_queue: queue.to_string(),
                job_definition: definition.clone(),
                depends_on,
            })
            .await?;
        tracing::debug!("Submitted job '{}' for definition '{}'", job_id, definition);
        job_ids.push(job_id);
    }

    tracing::info!("Submitted {} chained jobs to queue '{}'", job_ids.len(), queue);
    Ok(job_ids)
}
