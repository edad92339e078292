pub mod invoke;
pub mod set_job_status;
pub mod show;
