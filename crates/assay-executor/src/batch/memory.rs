use super::{
    BatchLedger, BatchService, JobDefinitionRef, JobDefinitionRequest, JobDetail, SubmitJobRequest,
};
use crate::error::{ExecutorError, Result};
use assay_core::model::JobStatus;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

fn poison_err<T>(_: PoisonError<T>) -> ExecutorError {
    ExecutorError::batch("lock", "in-memory batch state poisoned")
}

/// Batch backend kept in process memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryBatchService {
    ledger: RwLock<BatchLedger>,
    registration_delays: HashMap<String, Duration>,
    failing_operations: RwLock<HashSet<&'static str>>,
    submissions: RwLock<Vec<SubmitJobRequest>>,
}

impl InMemoryBatchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays registration of the named definition, so callers can observe
    /// completions arriving out of order.
    pub fn with_registration_delay(mut self, name: impl Into<String>, delay: Duration) -> Self {
        self.registration_delays.insert(name.into(), delay);
        self
    }

    /// Makes every subsequent call of `operation` fail (e.g. `"SubmitJob"`).
    pub fn fail_operation(&self, operation: &'static str) -> Result<()> {
        self.failing_operations
            .write()
            .map_err(poison_err)?
            .insert(operation);
        Ok(())
    }

    pub fn set_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        self.ledger
            .write()
            .map_err(poison_err)?
            .set_status(job_id, status, reason.map(str::to_string))
    }

    pub fn ledger(&self) -> Result<BatchLedger> {
        Ok(self.ledger.read().map_err(poison_err)?.clone())
    }

    /// Submissions in the order they were received.
    pub fn submissions(&self) -> Result<Vec<SubmitJobRequest>> {
        Ok(self.submissions.read().map_err(poison_err)?.clone())
    }

    fn check_failure(&self, operation: &'static str) -> Result<()> {
        if self
            .failing_operations
            .read()
            .map_err(poison_err)?
            .contains(operation)
        {
            return Err(ExecutorError::batch(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchService for InMemoryBatchService {
    async fn register_job_definition(
        &self,
        request: JobDefinitionRequest,
    ) -> Result<JobDefinitionRef> {
        if let Some(delay) = self.registration_delays.get(&request.name) {
            tokio::time::sleep(*delay).await;
        }
        self.check_failure("RegisterJobDefinition")?;
        Ok(self.ledger.write().map_err(poison_err)?.register(request))
    }

    async fn submit_job(&self, request: SubmitJobRequest) -> Result<String> {
        self.check_failure("SubmitJob")?;
        let job_id = uuid::Uuid::new_v4().to_string();
        let mut ledger = self.ledger.write().map_err(poison_err)?;
        let job_id = ledger.submit(request.clone(), job_id)?;
        drop(ledger);
        self.submissions.write().map_err(poison_err)?.push(request);
        Ok(job_id)
    }

    async fn describe_jobs(&self, job_ids: &[String]) -> Result<Vec<JobDetail>> {
        self.check_failure("DescribeJobs")?;
        Ok(self.ledger.read().map_err(poison_err)?.describe(job_ids))
    }

    async fn terminate_job(&self, job_id: &str, reason: &str) -> Result<()> {
        self.check_failure("TerminateJob")?;
        self.ledger
            .write()
            .map_err(poison_err)?
            .terminate(job_id, reason)
    }
}
