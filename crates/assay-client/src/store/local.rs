use super::{cas_put, cas_update, AnalysisUpdate, CasResult, Condition, Store};
use crate::error::{ClientError, Result};
use assay_core::{
    constants::state,
    errors::DomainError,
    model::{Analysis, AnalysisId, Pipeline, PipelineId},
    state as state_file,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// One JSON file per record under the state directory, each guarded by its
/// own file lock.
#[derive(Debug, Clone)]
pub struct LocalStore {
    analyses_dir: PathBuf,
    pipelines_dir: PathBuf,
}

fn record_path(dir: &Path, id: &str) -> Result<PathBuf> {
    let usable = !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(|c: char| c == '/' || c == '\\' || c.is_control());
    if !usable {
        return Err(DomainError::validation(format!("'{}' is not a usable record id", id)).into());
    }
    Ok(dir.join(format!("{}.json", id)))
}

async fn blocking<R: Send + 'static>(
    f: impl FnOnce() -> Result<R> + Send + 'static,
) -> Result<R> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ClientError::store("local", format!("store task failed: {}", e)))?
}

impl LocalStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            analyses_dir: state_dir.join(state::ANALYSES),
            pipelines_dir: state_dir.join(state::PIPELINES),
        }
    }

    fn analysis_path(&self, id: &AnalysisId) -> Result<PathBuf> {
        record_path(&self.analyses_dir, &id.0)
    }

    fn pipeline_path(&self, id: &PipelineId) -> Result<PathBuf> {
        record_path(&self.pipelines_dir, &id.0)
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn get_analysis(&self, id: &AnalysisId) -> Result<Option<Analysis>> {
        let path = self.analysis_path(id)?;
        blocking(move || Ok(state_file::read_json::<Analysis>(&path)?)).await
    }

    async fn put_analysis(&self, analysis: &Analysis, condition: Condition) -> Result<CasResult> {
        let path = self.analysis_path(&analysis.id)?;
        let analysis = analysis.clone();
        blocking(move || {
            state_file::with_locked_json(&path, |slot: &mut Option<Analysis>| {
                Ok::<_, ClientError>(cas_put(slot, &analysis, &condition))
            })
        })
        .await
    }

    async fn update_analysis(
        &self,
        id: &AnalysisId,
        update: AnalysisUpdate,
        condition: Condition,
    ) -> Result<CasResult> {
        let path = self.analysis_path(id)?;
        blocking(move || {
            state_file::with_locked_json(&path, |slot: &mut Option<Analysis>| {
                Ok::<_, ClientError>(cas_update(slot, update, &condition))
            })
        })
        .await
    }

    async fn get_pipeline(&self, id: &PipelineId) -> Result<Option<Pipeline>> {
        let path = self.pipeline_path(id)?;
        blocking(move || Ok(state_file::read_json::<Pipeline>(&path)?)).await
    }

    async fn put_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        let path = self.pipeline_path(&pipeline.id)?;
        let pipeline = pipeline.clone();
        blocking(move || {
            state_file::with_locked_json(&path, |slot: &mut Option<Pipeline>| {
                *slot = Some(pipeline);
                Ok::<_, ClientError>(())
            })
        })
        .await
    }
}
