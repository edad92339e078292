use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "assay",
    author,
    version,
    about = "Local invocation harness for the assay analysis-execution handlers.",
    long_about = "Invokes the analysis-execution handlers against file-backed store, batch and workflow backends rooted at the configured state directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        help = "Path to a config.toml (defaults to $ASSAY_CONFIG or the XDG config home)"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity level (-v for debug, -vv for trace)")]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Invoke a handler with a JSON event and print the JSON result")]
    Invoke(InvokeArgs),

    #[command(about = "Show an analysis record")]
    Show(ShowArgs),

    #[command(about = "Move a job of the local batch backend to a new status")]
    SetJobStatus(SetJobStatusArgs),
}

#[derive(Args)]
pub struct InvokeArgs {
    #[arg(value_enum, help = "Handler to invoke")]
    pub handler: Handler,

    #[arg(
        short,
        long,
        default_value = "-",
        help = "Path to the JSON event, or '-' to read stdin"
    )]
    pub event: PathBuf,

    #[arg(long, help = "Pretty-print the JSON result")]
    pub pretty: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    #[arg(help = "Analysis id")]
    pub analysis_id: String,
}

#[derive(Args)]
pub struct SetJobStatusArgs {
    #[arg(help = "Batch job id")]
    pub job_id: String,

    #[arg(help = "New status, e.g. RUNNING or FAILED")]
    pub status: String,

    #[arg(long, help = "Status reason, kept for FAILED jobs")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Handler {
    #[value(name = "defineJobs")]
    DefineJobs,
    #[value(name = "submitJobs")]
    SubmitJobs,
    #[value(name = "describeJobs")]
    DescribeJobs,
    #[value(name = "checkJobsUpdated")]
    CheckJobsUpdated,
    #[value(name = "calculateStatus")]
    CalculateStatus,
    #[value(name = "updateStatus")]
    UpdateStatus,
    #[value(name = "recordJobs")]
    RecordJobs,
    #[value(name = "pollAnalysis")]
    PollAnalysis,
    #[value(name = "submitAnalysis")]
    SubmitAnalysis,
    #[value(name = "cancelAnalysis")]
    CancelAnalysis,
    #[value(name = "terminateJobs")]
    TerminateJobs,
    #[value(name = "createAnalysis")]
    CreateAnalysis,
    #[value(name = "putPipeline")]
    PutPipeline,
}
