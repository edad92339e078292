pub mod prefixes {
    /// Appended to a dataset id to form its storage prefix.
    pub const DATASET_SUFFIX: &str = "-d";
    /// Appended to an analysis id to form its scratch/output prefix.
    pub const ANALYSIS_SUFFIX: &str = "-a";
}

pub mod env {
    pub const CONFIG: &str = "ASSAY_CONFIG";
    pub const LOG_LEVEL: &str = "ASSAY_LOG_LEVEL";
    pub const JOB_QUEUE: &str = "ASSAY_JOB_QUEUE";
    pub const STATE_DIR: &str = "ASSAY_STATE_DIR";
    pub const ANALYSIS_ID: &str = "ASSAY_ANALYSIS_ID";
    pub const STEP_INDEX: &str = "ASSAY_STEP_INDEX";
}

pub mod state {
    pub const ANALYSES: &str = "analyses";
    pub const PIPELINES: &str = "pipelines";
    pub const EXECUTIONS: &str = "executions";
    pub const BATCH: &str = "batch.json";
}

pub mod messages {
    pub const CANCELED: &str = "Analysis canceled";
}

/// Upper bound on dataset label length.
pub const MAX_LABEL_LEN: usize = 50;

pub const MIB_PER_GB: f64 = 1024.0;
