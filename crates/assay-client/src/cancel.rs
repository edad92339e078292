use crate::error::Result;
use crate::store::{AnalysisUpdate, CasResult, Condition, Patch, Store};
use assay_core::{
    constants::messages,
    errors::DomainError,
    model::{Analysis, AnalysisId, AnalysisStatus},
};
use assay_executor::BatchService;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub analysis_id: AnalysisId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminateJobsResponse {
    pub terminated: usize,
}

async fn load(store: &dyn Store, analysis_id: &AnalysisId) -> Result<Analysis> {
    Ok(store.get_analysis(analysis_id).await?.ok_or_else(|| {
        DomainError::not_found("Analysis", format!("analysis '{}' does not exist", analysis_id))
    })?)
}

fn rejected(analysis_id: &AnalysisId, result: CasResult, expected: &str) -> DomainError {
    let reason = match result {
        CasResult::ConditionFailed {
            actual: Some(status),
        } => format!("analysis is {}, expected {}", status, expected),
        _ => "analysis record does not exist".to_string(),
    };
    DomainError::conflict(analysis_id, reason)
}

/// Moves an in-flight analysis to `canceling`. Once there, no status update
/// succeeds until `terminate_jobs` clears it.
pub async fn cancel_analysis(store: &dyn Store, request: &CancelRequest) -> Result<()> {
    load(store, &request.analysis_id).await?;

    let result = store
        .update_analysis(
            &request.analysis_id,
            AnalysisUpdate::status(AnalysisStatus::Canceling),
            Condition::StatusIn(AnalysisStatus::IN_FLIGHT.to_vec()),
        )
        .await?;
    if !result.is_applied() {
        return Err(rejected(&request.analysis_id, result, "an in-flight status").into());
    }
    tracing::info!("Canceling analysis '{}'", request.analysis_id);
    Ok(())
}

/// Terminates every job of a canceling analysis, then marks it failed.
pub async fn terminate_jobs(
    store: &dyn Store,
    batch: &dyn BatchService,
    request: &CancelRequest,
) -> Result<TerminateJobsResponse> {
    let analysis = load(store, &request.analysis_id).await?;
    if analysis.status != AnalysisStatus::Canceling {
        return Err(DomainError::conflict(
            &request.analysis_id,
            format!("analysis is {}, expected canceling", analysis.status),
        )
        .into());
    }

    let job_ids = analysis.job_ids.unwrap_or_default();
    for job_id in &job_ids {
        tracing::debug!("Terminating job '{}'", job_id);
        batch.terminate_job(job_id, messages::CANCELED).await?;
    }

    let update = AnalysisUpdate {
        status: Some(AnalysisStatus::Failed),
        error: Patch::Set(messages::CANCELED.to_string()),
        ..AnalysisUpdate::default()
    };
    let result = store
        .update_analysis(
            &request.analysis_id,
            update,
            Condition::StatusIn(vec![AnalysisStatus::Canceling]),
        )
        .await?;
    if !result.is_applied() {
        return Err(rejected(&request.analysis_id, result, "canceling").into());
    }

    tracing::info!(
        "Terminated {} jobs of analysis '{}'",
        job_ids.len(),
        request.analysis_id
    );
    Ok(TerminateJobsResponse {
        terminated: job_ids.len(),
    })
}
