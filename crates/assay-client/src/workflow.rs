use crate::error::{ClientError, Result};
use assay_core::{constants::state, state as state_file};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A started orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub execution_id: String,
    pub workflow: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl WorkflowExecution {
    fn start(workflow: &str, name: &str, payload: serde_json::Value) -> Self {
        Self {
            execution_id: format!("{}-{}", name, uuid::Uuid::new_v4()),
            workflow: workflow.to_string(),
            name: name.to_string(),
            started_at: Utc::now(),
            payload,
        }
    }
}

#[async_trait]
pub trait WorkflowOrchestrator: Send + Sync {
    /// Starts `workflow` with an opaque JSON payload and returns the
    /// execution id.
    async fn start_execution(
        &self,
        workflow: &str,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<String>;
}

#[derive(Debug, Default)]
pub struct InMemoryWorkflow {
    executions: RwLock<Vec<WorkflowExecution>>,
    unavailable: bool,
}

impl InMemoryWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// An orchestrator that rejects every start request.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn executions(&self) -> Result<Vec<WorkflowExecution>> {
        self.executions
            .read()
            .map(|e| e.clone())
            .map_err(|_| ClientError::store("lock", "in-memory workflow log poisoned"))
    }
}

#[async_trait]
impl WorkflowOrchestrator for InMemoryWorkflow {
    async fn start_execution(
        &self,
        workflow: &str,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<String> {
        if self.unavailable {
            return Err(ClientError::Workflow {
                workflow: workflow.to_string(),
                message: "orchestrator unavailable".to_string(),
            });
        }
        let execution = WorkflowExecution::start(workflow, name, payload);
        let execution_id = execution.execution_id.clone();
        self.executions
            .write()
            .map_err(|_| ClientError::store("lock", "in-memory workflow log poisoned"))?
            .push(execution);
        Ok(execution_id)
    }
}

/// Records each execution as a JSON file; nothing is run.
#[derive(Debug, Clone)]
pub struct LocalWorkflow {
    executions_dir: PathBuf,
}

impl LocalWorkflow {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            executions_dir: state_dir.join(state::EXECUTIONS),
        }
    }

    pub fn execution(&self, execution_id: &str) -> Result<Option<WorkflowExecution>> {
        let path = self.executions_dir.join(format!("{}.json", execution_id));
        Ok(state_file::read_json(&path)?)
    }
}

#[async_trait]
impl WorkflowOrchestrator for LocalWorkflow {
    async fn start_execution(
        &self,
        workflow: &str,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<String> {
        let execution = WorkflowExecution::start(workflow, name, payload);
        let execution_id = execution.execution_id.clone();
        let path = self.executions_dir.join(format!("{}.json", execution_id));

        tokio::task::spawn_blocking(move || {
            state_file::with_locked_json(&path, |slot: &mut Option<WorkflowExecution>| {
                *slot = Some(execution);
                Ok::<_, ClientError>(())
            })
        })
        .await
        .map_err(|e| ClientError::Workflow {
            workflow: workflow.to_string(),
            message: e.to_string(),
        })??;

        tracing::info!("Started workflow '{}' execution '{}'", workflow, execution_id);
        Ok(execution_id)
    }
}
