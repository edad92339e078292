use super::{cas_put, cas_update, AnalysisUpdate, CasResult, Condition, Store};
use crate::error::{ClientError, Result};
use assay_core::model::{Analysis, AnalysisId, Pipeline, PipelineId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

fn poison_err<T>(_: PoisonError<T>) -> ClientError {
    ClientError::store("lock", "in-memory store poisoned")
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    analyses: RwLock<HashMap<AnalysisId, Analysis>>,
    pipelines: RwLock<HashMap<PipelineId, Pipeline>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slot<R>(&self, id: &AnalysisId, f: impl FnOnce(&mut Option<Analysis>) -> R) -> Result<R> {
        let mut analyses = self.analyses.write().map_err(poison_err)?;
        let mut slot = analyses.remove(id);
        let result = f(&mut slot);
        if let Some(analysis) = slot {
            analyses.insert(id.clone(), analysis);
        }
        Ok(result)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_analysis(&self, id: &AnalysisId) -> Result<Option<Analysis>> {
        Ok(self.analyses.read().map_err(poison_err)?.get(id).cloned())
    }

    async fn put_analysis(&self, analysis: &Analysis, condition: Condition) -> Result<CasResult> {
        self.with_slot(&analysis.id, |slot| cas_put(slot, analysis, &condition))
    }

    async fn update_analysis(
        &self,
        id: &AnalysisId,
        update: AnalysisUpdate,
        condition: Condition,
    ) -> Result<CasResult> {
        self.with_slot(id, |slot| cas_update(slot, update, &condition))
    }

    async fn get_pipeline(&self, id: &PipelineId) -> Result<Option<Pipeline>> {
        Ok(self.pipelines.read().map_err(poison_err)?.get(id).cloned())
    }

    async fn put_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        self.pipelines
            .write()
            .map_err(poison_err)?
            .insert(pipeline.id.clone(), pipeline.clone());
        Ok(())
    }
}
