//! Record storage for analyses and pipelines.
//!
//! Analysis records are shared between concurrently running handlers, so
//! every mutation goes through a conditional write on the stored status.

pub mod local;
pub mod memory;

pub use local::LocalStore;
pub use memory::InMemoryStore;

use crate::error::Result;
use assay_core::model::{
    Analysis, AnalysisId, AnalysisStatus, DatasetMap, Pipeline, PipelineId,
};
use async_trait::async_trait;
use chrono::Utc;

/// Precondition on the stored analysis for a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Always,
    NotExists,
    StatusIn(Vec<AnalysisStatus>),
    /// Also fails when the record is absent.
    StatusNot(AnalysisStatus),
}

impl Condition {
    pub fn holds(&self, current: Option<&Analysis>) -> bool {
        match self {
            Condition::Always => true,
            Condition::NotExists => current.is_none(),
            Condition::StatusIn(allowed) => current.is_some_and(|a| allowed.contains(&a.status)),
            Condition::StatusNot(status) => current.is_some_and(|a| a.status != *status),
        }
    }
}

/// Change applied to one optional attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Patch<T> {
    fn apply_to(self, field: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Set(value) => *field = Some(value),
            Patch::Clear => *field = None,
        }
    }
}

/// Partial update of an analysis record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisUpdate {
    pub status: Option<AnalysisStatus>,
    pub pipeline_id: Option<PipelineId>,
    pub datasets: Option<DatasetMap>,
    pub error: Patch<String>,
    pub jobs: Patch<Vec<String>>,
    pub job_ids: Patch<Vec<String>>,
}

impl AnalysisUpdate {
    pub fn status(status: AnalysisStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(self, analysis: &mut Analysis) {
        if let Some(status) = self.status {
            analysis.status = status;
        }
        if let Some(pipeline_id) = self.pipeline_id {
            analysis.pipeline_id = Some(pipeline_id);
        }
        if let Some(datasets) = self.datasets {
            analysis.datasets = Some(datasets);
        }
        self.error.apply_to(&mut analysis.error);
        self.jobs.apply_to(&mut analysis.jobs);
        self.job_ids.apply_to(&mut analysis.job_ids);
        analysis.updated_at = Some(Utc::now());
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub enum CasResult {
    Applied(Analysis),
    /// An update targeted a record that does not exist.
    NotFound,
    ConditionFailed { actual: Option<AnalysisStatus> },
}

impl CasResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, CasResult::Applied(_))
    }
}

/// Conditional put shared by the store backends.
pub(crate) fn cas_put(
    slot: &mut Option<Analysis>,
    analysis: &Analysis,
    condition: &Condition,
) -> CasResult {
    if !condition.holds(slot.as_ref()) {
        return CasResult::ConditionFailed {
            actual: slot.as_ref().map(|a| a.status),
        };
    }
    *slot = Some(analysis.clone());
    CasResult::Applied(analysis.clone())
}

/// Conditional partial update shared by the store backends.
pub(crate) fn cas_update(
    slot: &mut Option<Analysis>,
    update: AnalysisUpdate,
    condition: &Condition,
) -> CasResult {
    if !condition.holds(slot.as_ref()) {
        return CasResult::ConditionFailed {
            actual: slot.as_ref().map(|a| a.status),
        };
    }
    match slot {
        Some(analysis) => {
            update.apply(analysis);
            CasResult::Applied(analysis.clone())
        }
        None => CasResult::NotFound,
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_analysis(&self, id: &AnalysisId) -> Result<Option<Analysis>>;

    async fn put_analysis(&self, analysis: &Analysis, condition: Condition) -> Result<CasResult>;

    async fn update_analysis(
        &self,
        id: &AnalysisId,
        update: AnalysisUpdate,
        condition: Condition,
    ) -> Result<CasResult>;

    async fn get_pipeline(&self, id: &PipelineId) -> Result<Option<Pipeline>>;

    async fn put_pipeline(&self, pipeline: &Pipeline) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(status: AnalysisStatus) -> Analysis {
        let mut analysis = Analysis::new("an-1".into(), "alice");
        analysis.status = status;
        analysis
    }

    #[test]
    fn test_status_not_fails_on_absent_record() {
        assert!(!Condition::StatusNot(AnalysisStatus::Canceling).holds(None));
        assert!(Condition::StatusNot(AnalysisStatus::Canceling)
            .holds(Some(&analysis(AnalysisStatus::Running))));
        assert!(!Condition::StatusNot(AnalysisStatus::Canceling)
            .holds(Some(&analysis(AnalysisStatus::Canceling))));
    }

    #[test]
    fn test_status_in_and_not_exists() {
        let allowed = Condition::StatusIn(AnalysisStatus::RESUBMITTABLE.to_vec());
        assert!(allowed.holds(Some(&analysis(AnalysisStatus::Failed))));
        assert!(!allowed.holds(Some(&analysis(AnalysisStatus::Running))));
        assert!(!allowed.holds(None));
        assert!(Condition::NotExists.holds(None));
        assert!(!Condition::NotExists.holds(Some(&analysis(AnalysisStatus::Created))));
    }

    #[test]
    fn test_cas_update_applies_patches() {
        let mut stored = analysis(AnalysisStatus::Failed);
        stored.error = Some("old".to_string());
        stored.jobs = Some(vec!["failed".to_string()]);
        let mut slot = Some(stored);

        let update = AnalysisUpdate {
            status: Some(AnalysisStatus::Submitted),
            error: Patch::Clear,
            jobs: Patch::Clear,
            job_ids: Patch::Set(vec!["j-1".to_string()]),
            ..AnalysisUpdate::default()
        };
        let result = cas_update(&mut slot, update, &Condition::Always);
        assert!(result.is_applied());

        let stored = slot.unwrap();
        assert_eq!(stored.status, AnalysisStatus::Submitted);
        assert_eq!(stored.error, None);
        assert_eq!(stored.jobs, None);
        assert_eq!(stored.job_ids, Some(vec!["j-1".to_string()]));
        assert!(stored.updated_at.is_some());
    }

    #[test]
    fn test_cas_update_reports_actual_status_on_mismatch() {
        let mut slot = Some(analysis(AnalysisStatus::Canceling));
        let result = cas_update(
            &mut slot,
            AnalysisUpdate::status(AnalysisStatus::Running),
            &Condition::StatusNot(AnalysisStatus::Canceling),
        );
        assert_eq!(
            result,
            CasResult::ConditionFailed {
                actual: Some(AnalysisStatus::Canceling)
            }
        );
        assert_eq!(slot.unwrap().status, AnalysisStatus::Canceling);
    }

    #[test]
    fn test_cas_update_on_absent_record() {
        let mut slot = None;
        assert_eq!(
            cas_update(&mut slot, AnalysisUpdate::default(), &Condition::Always),
            CasResult::NotFound
        );
        assert_eq!(
            cas_update(
                &mut slot,
                AnalysisUpdate::default(),
                &Condition::StatusNot(AnalysisStatus::Canceling)
            ),
            CasResult::ConditionFailed { actual: None }
        );
    }
}
