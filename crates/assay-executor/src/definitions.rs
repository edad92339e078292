use crate::batch::{BatchService, ContainerProperties, JobDefinitionRequest};
use crate::error::Result;
use crate::resources;
use assay_core::{
    config::Config,
    constants::env as env_keys,
    errors::DomainError,
    model::{AnalysisId, DatasetMap, PipelineId, PipelineStep},
    rewrite,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefineJobsRequest {
    pub analysis_id: AnalysisId,
    pub pipeline_id: PipelineId,
    pub datasets: DatasetMap,
    pub steps: Vec<PipelineStep>,
}

impl DefineJobsRequest {
    pub fn validate(&self) -> std::result::Result<(), DomainError> {
        if self.steps.is_empty() {
            return Err(DomainError::validation("'steps' must not be empty"));
        }
        if let Some(index) = self.steps.iter().position(|s| s.app.trim().is_empty()) {
            return Err(DomainError::validation(format!(
                "step {} has an empty 'app'",
                index
            )));
        }
        rewrite::validate_datasets(&self.datasets)
    }
}

pub fn definition_name(pipeline_id: &PipelineId, index: usize) -> String {
    format!("{}-{}", pipeline_id, index)
}

/// Builds the registration request for one step of an execution.
pub fn build_definition(
    config: &Config,
    request: &DefineJobsRequest,
    index: usize,
    step: &PipelineStep,
) -> std::result::Result<JobDefinitionRequest, DomainError> {
    let sizing = resources::resolve_for_step(index, step, config)?;
    let args = rewrite::rewrite_args(&step.args, &request.datasets, &request.analysis_id);

    let mut environment = BTreeMap::new();
    environment.insert(
        env_keys::ANALYSIS_ID.to_string(),
        request.analysis_id.to_string(),
    );
    environment.insert(env_keys::STEP_INDEX.to_string(), index.to_string());

    Ok(JobDefinitionRequest {
        name: definition_name(&request.pipeline_id, index),
        container: ContainerProperties {
            image: config.image_for(&step.app),
            vcpus: sizing.vcpus,
            memory_mib: sizing.memory_mib,
            command: args.split_whitespace().map(str::to_string).collect(),
            environment,
            job_role_arn: config.job_role_arn.clone(),
        },
    })
}

/// Registers one job definition per step and returns `name:revision`
/// identifiers in step order.
///
/// Every request is built before the first registration is issued, so a bad
/// step never leaves a partial set of definitions behind.
pub async fn define_jobs(
    batch: &dyn BatchService,
    config: &Config,
    request: &DefineJobsRequest,
) -> Result<Vec<String>> {
    request.validate()?;

    let definitions = request
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| build_definition(config, request, index, step))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    tracing::info!(
        "Registering {} job definitions for analysis '{}' (pipeline '{}')",
        definitions.len(),
        request.analysis_id,
        request.pipeline_id
    );

    let registered = try_join_all(
        definitions
            .into_iter()
            .map(|definition| batch.register_job_definition(definition)),
    )
    .await?;

    Ok(registered.iter().map(ToString::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request() -> DefineJobsRequest {
        let mut datasets = DatasetMap::new();
        datasets.insert(
            "Reads".to_string(),
            Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap(),
        );
        DefineJobsRequest {
            analysis_id: "an-1".into(),
            pipeline_id: "pipe-9".into(),
            datasets,
            steps: vec![PipelineStep {
                app: "fastqc:0.12.1".to_string(),
                args: "fastqc [/Reads/r1.fq]:i -o [qc]:o".to_string(),
                cores: 2,
                memory: Some(1.5),
            }],
        }
    }

    #[test]
    fn test_build_definition_fills_container() {
        let config = Config {
            image_registry: "registry.example".to_string(),
            stack_name: "dev".to_string(),
            job_role_arn: Some("arn:aws:iam::1:role/jobs".to_string()),
            ..Config::default()
        };
        let request = request();
        let definition = build_definition(&config, &request, 0, &request.steps[0]).unwrap();

        assert_eq!(definition.name, "pipe-9-0");
        assert_eq!(definition.container.image, "registry.example/dev/fastqc:0.12.1");
        assert_eq!(definition.container.vcpus, 2);
        assert_eq!(definition.container.memory_mib, 1536);
        assert_eq!(
            definition.container.command,
            vec![
                "fastqc",
                "[/0f8fad5b-d9cb-469f-a165-70867728950e-d/r1.fq]:i",
                "-o",
                "[/an-1-a/qc]:o"
            ]
        );
        assert_eq!(definition.container.environment["ASSAY_STEP_INDEX"], "0");
        assert_eq!(definition.container.environment["ASSAY_ANALYSIS_ID"], "an-1");
        assert!(definition.container.job_role_arn.is_some());
    }

    #[test]
    fn test_validate_rejects_empty_steps() {
        let mut request = request();
        request.steps.clear();
        assert!(matches!(request.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_app() {
        let mut request = request();
        request.steps[0].app = " ".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nil_dataset() {
        let mut request = request();
        request.datasets.insert("Ref".to_string(), Uuid::nil());
        assert!(matches!(
            request.validate(),
            Err(DomainError::NotFound { .. })
        ));
    }
}
