use crate::cancel::{self, CancelRequest, TerminateJobsResponse};
use crate::error::Result;
use crate::status::{self, PollRequest, PollResponse, RecordJobsRequest, UpdateStatusRequest};
use crate::store::{CasResult, Condition, LocalStore, Store};
use crate::submission::{self, SubmitAnalysisRequest, SubmitAnalysisResponse};
use crate::workflow::{LocalWorkflow, WorkflowOrchestrator};
use assay_core::{
    config::Config,
    engine::{self, CalculateStatusRequest, CheckJobsUpdatedRequest, StatusSummary},
    errors::DomainError,
    model::{Analysis, AnalysisId, JobReport, Pipeline},
    rewrite,
};
use assay_executor::{
    BatchService, DefineJobsRequest, DescribeJobsRequest, LocalBatchService, SubmitJobsRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAnalysisRequest {
    #[serde(default)]
    pub analysis_id: Option<AnalysisId>,
    #[serde(default)]
    pub description: String,
    pub created_by: String,
}

/// Entry point for every analysis-execution handler.
#[derive(Clone)]
pub struct AnalysisService {
    store: Arc<dyn Store>,
    batch: Arc<dyn BatchService>,
    workflow: Arc<dyn WorkflowOrchestrator>,
    config: Arc<Config>,
}

impl AnalysisService {
    pub fn new(
        store: Arc<dyn Store>,
        batch: Arc<dyn BatchService>,
        workflow: Arc<dyn WorkflowOrchestrator>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            batch,
            workflow,
            config,
        }
    }

    /// File-backed backends rooted at the configured state directory.
    pub fn local(config: Config) -> Self {
        let state_dir = config.state_dir.clone();
        tracing::debug!("Using local state in {}", state_dir.display());
        Self::new(
            Arc::new(LocalStore::new(&state_dir)),
            Arc::new(LocalBatchService::new(&state_dir)),
            Arc::new(LocalWorkflow::new(&state_dir)),
            Arc::new(config),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub async fn define_jobs(&self, request: &DefineJobsRequest) -> Result<Vec<String>> {
        Ok(assay_executor::define_jobs(self.batch.as_ref(), &self.config, request).await?)
    }

    pub async fn submit_jobs(&self, request: &SubmitJobsRequest) -> Result<Vec<String>> {
        Ok(assay_executor::submit_jobs(self.batch.as_ref(), &self.config, request).await?)
    }

    pub async fn describe_jobs(&self, request: &DescribeJobsRequest) -> Result<Vec<JobReport>> {
        Ok(assay_executor::describe_jobs(self.batch.as_ref(), request).await?)
    }

    pub fn check_jobs_updated(&self, request: &CheckJobsUpdatedRequest) -> Result<bool> {
        Ok(engine::check_jobs_updated(request)?)
    }

    pub fn calculate_status(&self, request: &CalculateStatusRequest) -> Result<StatusSummary> {
        Ok(engine::calculate_status(request)?)
    }

    pub async fn update_status(&self, request: &UpdateStatusRequest) -> Result<String> {
        status::update_status(self.store.as_ref(), request).await
    }

    pub async fn record_jobs(&self, request: &RecordJobsRequest) -> Result<()> {
        status::record_jobs(self.store.as_ref(), request).await
    }

    pub async fn poll_analysis(&self, request: &PollRequest) -> Result<PollResponse> {
        status::poll_analysis(self.store.as_ref(), self.batch.as_ref(), request).await
    }

    pub async fn submit_analysis(
        &self,
        request: &SubmitAnalysisRequest,
    ) -> Result<SubmitAnalysisResponse> {
        submission::submit_analysis(
            self.store.as_ref(),
            self.workflow.as_ref(),
            &self.config,
            request,
        )
        .await
    }

    pub async fn cancel_analysis(&self, request: &CancelRequest) -> Result<()> {
        cancel::cancel_analysis(self.store.as_ref(), request).await
    }

    pub async fn terminate_jobs(&self, request: &CancelRequest) -> Result<TerminateJobsResponse> {
        cancel::terminate_jobs(self.store.as_ref(), self.batch.as_ref(), request).await
    }

    /// Creates a record in `created`; an existing id is a conflict.
    pub async fn create_analysis(&self, request: &CreateAnalysisRequest) -> Result<Analysis> {
        if request.created_by.trim().is_empty() {
            return Err(DomainError::validation("'created_by' must not be empty").into());
        }
        let id = request
            .analysis_id
            .clone()
            .unwrap_or_else(|| AnalysisId(uuid::Uuid::new_v4().to_string()));
        let mut analysis = Analysis::new(id, request.created_by.clone());
        analysis.description = request.description.clone();

        match self
            .store
            .put_analysis(&analysis, Condition::NotExists)
            .await?
        {
            CasResult::Applied(analysis) => {
                tracing::info!("Created analysis '{}'", analysis.id);
                Ok(analysis)
            }
            _ => Err(DomainError::conflict(&analysis.id, "analysis already exists").into()),
        }
    }

    pub async fn get_analysis(&self, analysis_id: &AnalysisId) -> Result<Analysis> {
        Ok(self.store.get_analysis(analysis_id).await?.ok_or_else(|| {
            DomainError::not_found("Analysis", format!("analysis '{}' does not exist", analysis_id))
        })?)
    }

    /// Stores a pipeline. Dataset ids may still be the nil sentinel.
    pub async fn put_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        if pipeline.steps.is_empty() {
            return Err(DomainError::validation("pipeline 'steps' must not be empty").into());
        }
        if let Some(label) = pipeline
            .datasets
            .keys()
            .find(|label| !rewrite::is_valid_label(label))
        {
            return Err(DomainError::validation(format!("invalid dataset label '{}'", label)).into());
        }
        self.store.put_pipeline(pipeline).await?;
        tracing::info!("Stored pipeline '{}'", pipeline.id);
        Ok(())
    }
}
