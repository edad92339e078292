use assay_core::{
    config::Config,
    model::{DatasetMap, JobStatus, PipelineStep},
};
use assay_executor::{
    batch::JobDefinitionRef, define_jobs, describe_jobs, submit_jobs, BatchService,
    DefineJobsRequest, DescribeJobsRequest, ExecutorError, InMemoryBatchService,
    LocalBatchService, SubmitJobsRequest,
};
use std::time::Duration;
use uuid::Uuid;

fn steps(n: usize) -> Vec<PipelineStep> {
    (0..n)
        .map(|i| PipelineStep {
            app: format!("tool-{}:1.0", i),
            args: format!("run [/Reads/in.fq]:i [step{}]:o", i),
            cores: 1,
            memory: Some(0.5),
        })
        .collect()
}

fn define_request(n: usize) -> DefineJobsRequest {
    let mut datasets = DatasetMap::new();
    datasets.insert("Reads".to_string(), Uuid::new_v4());
    DefineJobsRequest {
        analysis_id: "an-42".into(),
        pipeline_id: "pipe-7".into(),
        datasets,
        steps: steps(n),
    }
}

#[tokio::test]
async fn test_definitions_keep_step_order_when_registrations_finish_out_of_order() {
    let batch = InMemoryBatchService::new()
        .with_registration_delay("pipe-7-0", Duration::from_millis(60))
        .with_registration_delay("pipe-7-1", Duration::from_millis(30));
    let config = Config::default();

    let definitions = define_jobs(&batch, &config, &define_request(3))
        .await
        .unwrap();

    assert_eq!(definitions, vec!["pipe-7-0:1", "pipe-7-1:1", "pipe-7-2:1"]);
}

#[tokio::test]
async fn test_redefining_a_pipeline_bumps_the_revision() {
    let batch = InMemoryBatchService::new();
    let config = Config::default();
    define_jobs(&batch, &config, &define_request(1)).await.unwrap();
    let second = define_jobs(&batch, &config, &define_request(1)).await.unwrap();
    assert_eq!(second, vec!["pipe-7-0:2"]);
}

#[tokio::test]
async fn test_registration_failure_fails_the_whole_call() {
    let batch = InMemoryBatchService::new();
    batch.fail_operation("RegisterJobDefinition").unwrap();
    let err = define_jobs(&batch, &Config::default(), &define_request(2))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Batch { .. }));
}

#[tokio::test]
async fn test_invalid_step_registers_nothing() {
    let batch = InMemoryBatchService::new();
    let mut request = define_request(3);
    request.steps[2].cores = 0;

    assert!(define_jobs(&batch, &Config::default(), &request).await.is_err());
    assert!(batch.ledger().unwrap().definitions.is_empty());
}

#[tokio::test]
async fn test_each_job_depends_only_on_its_predecessor() {
    let batch = InMemoryBatchService::new();
    let config = Config::default();
    let definitions = define_jobs(&batch, &config, &define_request(3))
        .await
        .unwrap();

    let job_ids = submit_jobs(
        &batch,
        &config,
        &SubmitJobsRequest {
            job_definitions: definitions.clone(),
            job_queue: Some("high-mem".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(job_ids.len(), 3);

    let submissions = batch.submissions().unwrap();
    assert!(submissions[0].depends_on.is_empty());
    assert_eq!(submissions[1].depends_on, vec![job_ids[0].clone()]);
    assert_eq!(submissions[2].depends_on, vec![job_ids[1].clone()]);
    for (submission, definition) in submissions.iter().zip(&definitions) {
        assert_eq!(submission.job_queue, "high-mem");
        assert_eq!(&submission.job_definition, definition);
        assert!(!submission.job_name.contains(':'));
    }
}

#[tokio::test]
async fn test_submission_error_stops_the_chain() {
    let batch = InMemoryBatchService::new();
    let config = Config::default();
    let definitions = define_jobs(&batch, &config, &define_request(2))
        .await
        .unwrap();
    batch.fail_operation("SubmitJob").unwrap();

    let result = submit_jobs(
        &batch,
        &config,
        &SubmitJobsRequest {
            job_definitions: definitions,
            job_queue: None,
        },
    )
    .await;
    assert!(result.is_err());
    assert!(batch.submissions().unwrap().is_empty());
}

#[tokio::test]
async fn test_describe_returns_request_order_and_failure_reasons() {
    let batch = InMemoryBatchService::new();
    let config = Config::default();
    let definitions = define_jobs(&batch, &config, &define_request(3))
        .await
        .unwrap();
    let job_ids = submit_jobs(
        &batch,
        &config,
        &SubmitJobsRequest {
            job_definitions: definitions,
            job_queue: None,
        },
    )
    .await
    .unwrap();

    batch
        .set_job_status(&job_ids[0], JobStatus::Succeeded, None)
        .unwrap();
    batch
        .set_job_status(&job_ids[1], JobStatus::Failed, Some("OutOfMemoryError"))
        .unwrap();

    let reversed: Vec<String> = job_ids.iter().rev().cloned().collect();
    let reports = describe_jobs(
        &batch,
        &DescribeJobsRequest {
            analysis_id: "an-42".into(),
            job_ids: reversed,
        },
    )
    .await
    .unwrap();

    assert_eq!(reports[0].status, JobStatus::Failed);
    assert_eq!(reports[0].reason.as_deref(), Some("Dependent Job failed"));
    assert_eq!(reports[1].status, JobStatus::Failed);
    assert_eq!(reports[1].reason.as_deref(), Some("OutOfMemoryError"));
    assert_eq!(reports[2].status, JobStatus::Succeeded);
    assert_eq!(reports[2].reason, None);
}

#[tokio::test]
async fn test_describe_unknown_job_is_not_found() {
    let batch = InMemoryBatchService::new();
    let err = describe_jobs(
        &batch,
        &DescribeJobsRequest {
            analysis_id: "an-42".into(),
            job_ids: vec!["no-such-job".to_string()],
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), assay_core::errors::ErrorKind::NotFound);
}

#[tokio::test]
async fn test_local_backend_runs_the_same_chain() {
    let dir = tempfile::tempdir().unwrap();
    let batch = LocalBatchService::new(dir.path());
    let config = Config::default();

    let definitions = define_jobs(&batch, &config, &define_request(2))
        .await
        .unwrap();
    let reference: JobDefinitionRef = definitions[1].parse().unwrap();
    let ledger = batch.ledger().unwrap();
    let container = ledger.definition(&reference).unwrap();
    assert_eq!(container.memory_mib, 512);
    assert_eq!(container.image, "localhost:5000/assay/tool-1:1.0");

    let job_ids = submit_jobs(
        &batch,
        &config,
        &SubmitJobsRequest {
            job_definitions: definitions,
            job_queue: None,
        },
    )
    .await
    .unwrap();
    batch.terminate_job(&job_ids[0], "stop").await.unwrap();

    let details = batch.describe_jobs(&job_ids).await.unwrap();
    assert_eq!(details.len(), 2);
    assert!(details.iter().all(|d| d.status == JobStatus::Failed));
}
