use crate::error::Result;
use crate::store::{AnalysisUpdate, CasResult, Condition, Patch, Store};
use crate::workflow::WorkflowOrchestrator;
use assay_core::{
    config::Config,
    errors::DomainError,
    model::{AnalysisId, AnalysisStatus, DatasetMap, Pipeline, PipelineId, PipelineStep},
    rewrite,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAnalysisRequest {
    pub analysis_id: AnalysisId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<PipelineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasets: Option<DatasetMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAnalysisResponse {
    pub execution_id: String,
}

/// Input of the analysis workflow; the first state feeds it to `define_jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPayload {
    pub analysis_id: AnalysisId,
    pub pipeline_id: PipelineId,
    pub datasets: DatasetMap,
    pub steps: Vec<PipelineStep>,
    #[serde(rename = "jobQueue")]
    pub job_queue: String,
}

/// Overlays the request bindings on the pipeline's own mapping.
pub fn bind_datasets(
    pipeline: &Pipeline,
    overrides: Option<&DatasetMap>,
) -> std::result::Result<DatasetMap, DomainError> {
    let mut bound = pipeline.datasets.clone();
    if let Some(overrides) = overrides {
        let unknown: Vec<&str> = overrides
            .keys()
            .filter(|label| !pipeline.datasets.contains_key(*label))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(DomainError::validation(format!(
                "pipeline '{}' has no dataset labels {}",
                pipeline.id,
                unknown.join(", ")
            )));
        }
        bound.extend(overrides.iter().map(|(label, id)| (label.clone(), *id)));
    }
    rewrite::validate_datasets(&bound)?;
    Ok(bound)
}

pub async fn submit_analysis(
    store: &dyn Store,
    workflow: &dyn WorkflowOrchestrator,
    config: &Config,
    request: &SubmitAnalysisRequest,
) -> Result<SubmitAnalysisResponse> {
    let analysis_id = &request.analysis_id;
    let analysis = store.get_analysis(analysis_id).await?.ok_or_else(|| {
        DomainError::not_found("Analysis", format!("analysis '{}' does not exist", analysis_id))
    })?;
    if !analysis.status.accepts_submission() {
        return Err(DomainError::conflict(
            analysis_id,
            format!("analysis is {} and cannot be submitted", analysis.status),
        )
        .into());
    }

    let pipeline_id = request
        .pipeline_id
        .clone()
        .or(analysis.pipeline_id)
        .ok_or_else(|| DomainError::validation("'pipeline_id' is required"))?;
    let pipeline = store.get_pipeline(&pipeline_id).await?.ok_or_else(|| {
        DomainError::not_found("Pipeline", format!("pipeline '{}' does not exist", pipeline_id))
    })?;
    if pipeline.steps.is_empty() {
        return Err(DomainError::validation(format!("pipeline '{}' has no steps", pipeline_id)).into());
    }

    let datasets = bind_datasets(&pipeline, request.datasets.as_ref())?;

    let update = AnalysisUpdate {
        status: Some(AnalysisStatus::Submitted),
        pipeline_id: Some(pipeline_id.clone()),
        datasets: Some(datasets.clone()),
        error: Patch::Clear,
        jobs: Patch::Clear,
        job_ids: Patch::Clear,
    };
    let result = store
        .update_analysis(
            analysis_id,
            update,
            Condition::StatusIn(AnalysisStatus::RESUBMITTABLE.to_vec()),
        )
        .await?;
    let reason = match result {
        CasResult::Applied(_) => None,
        CasResult::ConditionFailed {
            actual: Some(status),
        } => Some(format!("analysis moved to {} during submission", status)),
        CasResult::ConditionFailed { actual: None } | CasResult::NotFound => {
            Some("analysis was removed during submission".to_string())
        }
    };
    if let Some(reason) = reason {
        return Err(DomainError::conflict(analysis_id, reason).into());
    }

    let payload = serde_json::to_value(ExecutionPayload {
        analysis_id: analysis_id.clone(),
        pipeline_id: pipeline_id.clone(),
        datasets,
        steps: pipeline.steps,
        job_queue: config.job_queue.clone(),
    })?;

    match workflow
        .start_execution(&config.workflow_name, &analysis_id.0, payload)
        .await
    {
        Ok(execution_id) => {
            tracing::info!(
                "Submitted analysis '{}' (pipeline '{}') as execution '{}'",
                analysis_id,
                pipeline_id,
                execution_id
            );
            Ok(SubmitAnalysisResponse { execution_id })
        }
        Err(e) => {
            tracing::error!("Workflow start for analysis '{}' failed: {}", analysis_id, e);
            let rollback = AnalysisUpdate {
                status: Some(AnalysisStatus::Failed),
                error: Patch::Set(e.to_string()),
                ..AnalysisUpdate::default()
            };
            match store
                .update_analysis(
                    analysis_id,
                    rollback,
                    Condition::StatusIn(vec![AnalysisStatus::Submitted]),
                )
                .await
            {
                Ok(CasResult::Applied(_)) => {}
                Ok(other) => tracing::warn!(
                    "Rollback of analysis '{}' skipped: {:?}",
                    analysis_id,
                    other
                ),
                Err(rollback_err) => tracing::warn!(
                    "Rollback of analysis '{}' failed: {}",
                    analysis_id,
                    rollback_err
                ),
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn pipeline() -> Pipeline {
        let mut datasets = DatasetMap::new();
        datasets.insert("Reads".to_string(), Uuid::nil());
        datasets.insert("Ref".to_string(), Uuid::new_v4());
        Pipeline {
            id: "p-1".into(),
            name: "align".to_string(),
            datasets,
            steps: vec![],
        }
    }

    #[test]
    fn test_bind_overlays_request_labels() {
        let reads = Uuid::new_v4();
        let mut overrides = DatasetMap::new();
        overrides.insert("Reads".to_string(), reads);
        let bound = bind_datasets(&pipeline(), Some(&overrides)).unwrap();
        assert_eq!(bound["Reads"], reads);
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn test_bind_reports_unbound_labels() {
        let err = bind_datasets(&pipeline(), None).unwrap_err();
        assert_eq!(err.reasons().len(), 1);
        assert!(err.reasons()[0].contains("Reads"));
    }

    #[test]
    fn test_bind_rejects_unknown_labels() {
        let mut overrides = DatasetMap::new();
        overrides.insert("Reads".to_string(), Uuid::new_v4());
        overrides.insert("Typo".to_string(), Uuid::new_v4());
        assert!(matches!(
            bind_datasets(&pipeline(), Some(&overrides)),
            Err(DomainError::Validation(_))
        ));
    }
}
