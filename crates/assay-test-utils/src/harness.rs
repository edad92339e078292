use crate::fixtures;
use assay_client::{
    store::{InMemoryStore, Store},
    workflow::InMemoryWorkflow,
    AnalysisService, CreateAnalysisRequest,
};
use assay_core::{
    config::Config,
    model::{Analysis, AnalysisId, DatasetMap, JobStatus},
};
use assay_executor::InMemoryBatchService;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory backends plus the service wired to them.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub batch: Arc<InMemoryBatchService>,
    pub workflow: Arc<InMemoryWorkflow>,
    pub service: AnalysisService,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_parts(InMemoryBatchService::new(), InMemoryWorkflow::new())
    }

    pub fn with_parts(batch: InMemoryBatchService, workflow: InMemoryWorkflow) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let batch = Arc::new(batch);
        let workflow = Arc::new(workflow);
        let service = AnalysisService::new(
            store.clone(),
            batch.clone(),
            workflow.clone(),
            Arc::new(Config::default()),
        );
        Self {
            store,
            batch,
            workflow,
            service,
        }
    }

    pub async fn create_analysis(&self, id: &str) -> Analysis {
        self.service
            .create_analysis(&CreateAnalysisRequest {
                analysis_id: Some(id.into()),
                description: "fixture".to_string(),
                created_by: "tester".to_string(),
            })
            .await
            .expect("Failed to create analysis")
    }

    /// Stores the sample pipeline and returns a binding for its open label.
    pub async fn seed_pipeline(&self, id: &str) -> DatasetMap {
        self.service
            .put_pipeline(&fixtures::sample_pipeline(id))
            .await
            .expect("Failed to store pipeline");
        let mut binding = DatasetMap::new();
        binding.insert(fixtures::READS_LABEL.to_string(), Uuid::new_v4());
        binding
    }

    pub async fn analysis(&self, id: &str) -> Analysis {
        self.store
            .get_analysis(&AnalysisId::from(id))
            .await
            .expect("Store read failed")
            .expect("Analysis missing")
    }

    pub fn set_job(&self, job_id: &str, status: JobStatus, reason: Option<&str>) {
        self.batch
            .set_job_status(job_id, status, reason)
            .expect("Failed to set job status");
    }
}

/// Temporary state directory and config file for the `assay` binary.
pub struct LocalContext {
    pub _temp_dir: tempfile::TempDir,
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
}

impl Default for LocalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalContext {
    pub fn new() -> Self {
        let temp_dir = tempfile::Builder::new()
            .prefix("assay-test-")
            .tempdir()
            .expect("Failed to create temp dir");
        let state_dir = temp_dir.path().join("state");
        fs::create_dir_all(&state_dir).expect("Failed to create state dir");

        let config_path = temp_dir.path().join("config.toml");
        let config_content = format!(
            r#"
state-dir = "{}"
job-queue = "test-queue"
image-registry = "registry.test"
stack-name = "ci"
"#,
            state_dir.display()
        );
        fs::write(&config_path, config_content).expect("Failed to write config");

        Self {
            _temp_dir: temp_dir,
            state_dir,
            config_path,
        }
    }

    pub fn write_event(&self, name: &str, event: &serde_json::Value) -> PathBuf {
        let path = self._temp_dir.path().join(format!("{}.json", name));
        fs::write(&path, event.to_string()).expect("Failed to write event");
        path
    }
}
