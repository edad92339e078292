pub mod fixtures;
pub mod harness;

pub use fixtures::{jobs, sample_pipeline, READS_LABEL, REF_LABEL};
pub use harness::{Harness, LocalContext};
