use super::{ContainerProperties, JobDefinitionRef, JobDefinitionRequest, JobDetail, SubmitJobRequest};
use crate::error::{ExecutorError, Result};
use assay_core::model::JobStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEPENDENCY_FAILED: &str = "Dependent Job failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub request: SubmitJobRequest,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
}

/// Bookkeeping shared by the in-memory and local batch backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLedger {
    #[serde(default)]
    pub definitions: BTreeMap<String, Vec<ContainerProperties>>,
    #[serde(default)]
    pub jobs: BTreeMap<String, JobRecord>,
}

impl BatchLedger {
    pub fn register(&mut self, request: JobDefinitionRequest) -> JobDefinitionRef {
        let revisions = self.definitions.entry(request.name.clone()).or_default();
        revisions.push(request.container);
        JobDefinitionRef {
            name: request.name,
            revision: revisions.len() as u32,
        }
    }

    pub fn definition(&self, reference: &JobDefinitionRef) -> Option<&ContainerProperties> {
        let index = (reference.revision as usize).checked_sub(1)?;
        self.definitions.get(&reference.name)?.get(index)
    }

    pub fn submit(&mut self, request: SubmitJobRequest, job_id: String) -> Result<String> {
        let reference: JobDefinitionRef = request.job_definition.parse()?;
        if self.definition(&reference).is_none() {
            return Err(ExecutorError::batch(
                "SubmitJob",
                format!("job definition '{}' is not registered", reference),
            ));
        }
        if let Some(missing) = request
            .depends_on
            .iter()
            .find(|dep| !self.jobs.contains_key(*dep))
        {
            return Err(ExecutorError::batch(
                "SubmitJob",
                format!("dependency '{}' does not exist", missing),
            ));
        }

        let dependency_failed = request.depends_on.iter().any(|dep| {
            self.jobs
                .get(dep)
                .is_some_and(|job| job.status == JobStatus::Failed)
        });
        let (status, status_reason) = if dependency_failed {
            (JobStatus::Failed, Some(DEPENDENCY_FAILED.to_string()))
        } else if request.depends_on.is_empty() {
            (JobStatus::Submitted, None)
        } else {
            (JobStatus::Pending, None)
        };

        self.jobs.insert(
            job_id.clone(),
            JobRecord {
                request,
                status,
                status_reason,
            },
        );
        Ok(job_id)
    }

    pub fn describe(&self, job_ids: &[String]) -> Vec<JobDetail> {
        self.jobs
            .iter()
            .filter(|(id, _)| job_ids.contains(id))
            .map(|(id, job)| JobDetail {
                job_id: id.clone(),
                status: job.status,
                status_reason: job.status_reason.clone(),
            })
            .collect()
    }

    /// Moves a job to `status`; a failure cascades to every job waiting on it.
    pub fn set_status(
        &mut self,
        job_id: &str,
        status: JobStatus,
        reason: Option<String>,
    ) -> Result<()> {
        let job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ExecutorError::batch("UpdateJob", format!("job '{}' does not exist", job_id)))?;
        job.status = status;
        job.status_reason = reason;
        if status == JobStatus::Failed {
            self.fail_dependents(job_id);
        }
        Ok(())
    }

    pub fn terminate(&mut self, job_id: &str, reason: &str) -> Result<()> {
        let job = self.jobs.get(job_id).ok_or_else(|| {
            ExecutorError::batch("TerminateJob", format!("job '{}' does not exist", job_id))
        })?;
        if job.status.is_terminal() {
            return Ok(());
        }
        self.set_status(job_id, JobStatus::Failed, Some(reason.to_string()))
    }

    fn fail_dependents(&mut self, failed_id: &str) {
        let mut frontier = vec![failed_id.to_string()];
        while let Some(current) = frontier.pop() {
            for (id, job) in self.jobs.iter_mut() {
                if !job.status.is_terminal() && job.request.depends_on.contains(&current) {
                    job.status = JobStatus::Failed;
                    job.status_reason = Some(DEPENDENCY_FAILED.to_string());
                    frontier.push(id.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> ContainerProperties {
        ContainerProperties {
            image: "registry/assay/tool:1".to_string(),
            vcpus: 1,
            memory_mib: 512,
            command: vec!["tool".to_string()],
            environment: BTreeMap::new(),
            job_role_arn: None,
        }
    }

    fn submit(ledger: &mut BatchLedger, id: &str, deps: &[&str]) {
        ledger
            .submit(
                SubmitJobRequest {
                    job_name: id.to_string(),
                    job_queue: "q".to_string(),
                    job_definition: "def:1".to_string(),
                    depends_on: deps.iter().map(|d| d.to_string()).collect(),
                },
                id.to_string(),
            )
            .unwrap();
    }

    fn ledger_with_definition() -> BatchLedger {
        let mut ledger = BatchLedger::default();
        ledger.register(JobDefinitionRequest {
            name: "def".to_string(),
            container: container(),
        });
        ledger
    }

    #[test]
    fn test_register_bumps_revision() {
        let mut ledger = BatchLedger::default();
        let first = ledger.register(JobDefinitionRequest {
            name: "p-0".to_string(),
            container: container(),
        });
        let second = ledger.register(JobDefinitionRequest {
            name: "p-0".to_string(),
            container: container(),
        });
        assert_eq!(first.to_string(), "p-0:1");
        assert_eq!(second.to_string(), "p-0:2");
        assert!(ledger.definition(&second).is_some());
    }

    #[test]
    fn test_submit_rejects_unknown_definition() {
        let mut ledger = BatchLedger::default();
        let result = ledger.submit(
            SubmitJobRequest {
                job_name: "j".to_string(),
                job_queue: "q".to_string(),
                job_definition: "missing:1".to_string(),
                depends_on: vec![],
            },
            "j".to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dependent_jobs_start_pending() {
        let mut ledger = ledger_with_definition();
        submit(&mut ledger, "a", &[]);
        submit(&mut ledger, "b", &["a"]);
        assert_eq!(ledger.jobs["a"].status, JobStatus::Submitted);
        assert_eq!(ledger.jobs["b"].status, JobStatus::Pending);
    }

    #[test]
    fn test_failure_cascades_down_the_chain() {
        let mut ledger = ledger_with_definition();
        submit(&mut ledger, "a", &[]);
        submit(&mut ledger, "b", &["a"]);
        submit(&mut ledger, "c", &["b"]);

        ledger.terminate("a", "canceled").unwrap();

        assert_eq!(ledger.jobs["a"].status_reason.as_deref(), Some("canceled"));
        assert_eq!(ledger.jobs["b"].status, JobStatus::Failed);
        assert_eq!(ledger.jobs["c"].status, JobStatus::Failed);
    }

    #[test]
    fn test_terminate_leaves_finished_jobs_alone() {
        let mut ledger = ledger_with_definition();
        submit(&mut ledger, "a", &[]);
        ledger.set_status("a", JobStatus::Succeeded, None).unwrap();
        ledger.terminate("a", "canceled").unwrap();
        assert_eq!(ledger.jobs["a"].status, JobStatus::Succeeded);
    }
}
