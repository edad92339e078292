pub mod cancel;
pub mod error;
pub mod service;
pub mod status;
pub mod store;
pub mod submission;
pub mod workflow;

pub use error::{ClientError, Result};
pub use service::{AnalysisService, CreateAnalysisRequest};
