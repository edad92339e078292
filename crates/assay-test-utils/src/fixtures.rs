use assay_core::model::{DatasetMap, JobReport, JobStatus, Pipeline, PipelineStep, NIL_DATASET_ID};
use uuid::Uuid;

/// Left unbound in `sample_pipeline`; callers must supply it at submission.
pub const READS_LABEL: &str = "Reads";
pub const REF_LABEL: &str = "Ref";

pub fn reference_dataset() -> Uuid {
    Uuid::from_u128(0x5f1c_9a2e_0000_4000_8000_0000_0000_00aa)
}

/// Two-step align/sort pipeline with one bound and one unbound dataset.
pub fn sample_pipeline(id: &str) -> Pipeline {
    let mut datasets = DatasetMap::new();
    datasets.insert(READS_LABEL.to_string(), NIL_DATASET_ID);
    datasets.insert(REF_LABEL.to_string(), reference_dataset());
    Pipeline {
        id: id.into(),
        name: "align-and-sort".to_string(),
        datasets,
        steps: vec![
            PipelineStep {
                app: "bwa:0.7.17".to_string(),
                args: "bwa mem -t 4 [/Ref/hg38.fa]:i [/Reads/r1.fq]:i -o [aligned.sam]:o"
                    .to_string(),
                cores: 4,
                memory: Some(8.0),
            },
            PipelineStep {
                app: "samtools:1.17".to_string(),
                args: "samtools sort [aligned.sam]:i -o [sorted.bam]:o".to_string(),
                cores: 1,
                memory: None,
            },
        ],
    }
}

/// Reports for `statuses`; FAILED entries get the reason "exit <index>".
pub fn jobs(statuses: &[JobStatus]) -> Vec<JobReport> {
    statuses
        .iter()
        .enumerate()
        .map(|(i, status)| match status {
            JobStatus::Failed => JobReport::failed(format!("exit {}", i)),
            other => JobReport::new(*other),
        })
        .collect()
}
