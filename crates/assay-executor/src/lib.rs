pub mod batch;
pub mod definitions;
pub mod describe;
mod error;
pub mod resources;
pub mod submission;

pub use batch::{BatchService, InMemoryBatchService, LocalBatchService};
pub use definitions::{define_jobs, DefineJobsRequest};
pub use describe::{describe_jobs, DescribeJobsRequest};
pub use error::{ExecutorError, Result};
pub use submission::{submit_jobs, SubmitJobsRequest};
