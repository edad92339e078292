use super::{
    BatchLedger, BatchService, JobDefinitionRef, JobDefinitionRequest, JobDetail, SubmitJobRequest,
};
use crate::error::{ExecutorError, Result};
use assay_core::{constants::state, model::JobStatus, state as state_file};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Batch backend persisted as a JSON ledger under the state directory.
///
/// Nothing is executed; job statuses only move when `set_job_status` or
/// `terminate_job` is called. Used by the local invocation harness.
#[derive(Debug, Clone)]
pub struct LocalBatchService {
    ledger_path: PathBuf,
}

impl LocalBatchService {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            ledger_path: state_dir.join(state::BATCH),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut BatchLedger) -> Result<R>) -> Result<R> {
        let path = self.ledger_path.clone();
        state_file::with_locked_json(&path, |ledger: &mut Option<BatchLedger>| {
            f(ledger.get_or_insert_with(BatchLedger::default))
        })
    }

    pub fn ledger(&self) -> Result<BatchLedger> {
        Ok(state_file::read_json(&self.ledger_path)?.unwrap_or_default())
    }

    pub fn set_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        reason: Option<String>,
    ) -> Result<()> {
        tracing::info!("Setting local job '{}' to {}", job_id, status);
        self.update(|ledger| ledger.set_status(job_id, status, reason))
    }
}

async fn blocking<R: Send + 'static>(
    f: impl FnOnce() -> Result<R> + Send + 'static,
) -> Result<R> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExecutorError::batch("local", format!("ledger task failed: {}", e)))?
}

#[async_trait]
impl BatchService for LocalBatchService {
    async fn register_job_definition(
        &self,
        request: JobDefinitionRequest,
    ) -> Result<JobDefinitionRef> {
        let this = self.clone();
        blocking(move || this.update(|ledger| Ok(ledger.register(request)))).await
    }

    async fn submit_job(&self, request: SubmitJobRequest) -> Result<String> {
        let this = self.clone();
        let job_id = uuid::Uuid::new_v4().to_string();
        blocking(move || this.update(|ledger| ledger.submit(request, job_id))).await
    }

    async fn describe_jobs(&self, job_ids: &[String]) -> Result<Vec<JobDetail>> {
        let this = self.clone();
        let job_ids = job_ids.to_vec();
        blocking(move || Ok(this.ledger()?.describe(&job_ids))).await
    }

    async fn terminate_job(&self, job_id: &str, reason: &str) -> Result<()> {
        let this = self.clone();
        let job_id = job_id.to_string();
        let reason = reason.to_string();
        blocking(move || this.update(|ledger| ledger.terminate(&job_id, &reason))).await
    }
}
