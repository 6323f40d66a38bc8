use crate::reports::{
    run_canonicalize, run_machine_report, run_rework_report, CanonicalizeArgs, MachineReportArgs,
    ReworkReportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use line_insight::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Line Insight",
    about = "Analyze inspection throughput and rework logs from manufacturing line CSV exports",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Clean up near-duplicate labels
    Labels {
        #[command(subcommand)]
        command: LabelsCommand,
    },
    /// Summarize machine inspection data
    Machine {
        #[command(subcommand)]
        command: MachineCommand,
    },
    /// Summarize rework and defect logs
    Rework {
        #[command(subcommand)]
        command: ReworkCommand,
    },
}

#[derive(Subcommand, Debug)]
enum LabelsCommand {
    /// Print the canonical form chosen for each label
    Canonicalize(CanonicalizeArgs),
}

#[derive(Subcommand, Debug)]
enum MachineCommand {
    /// Hourly and daily throughput against the utilization-adjusted target
    Report(MachineReportArgs),
}

#[derive(Subcommand, Debug)]
enum ReworkCommand {
    /// Defect Pareto with typo cleanup, optionally exporting a table
    Report(ReworkReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Labels {
            command: LabelsCommand::Canonicalize(args),
        } => run_canonicalize(args),
        Command::Machine {
            command: MachineCommand::Report(args),
        } => run_machine_report(args),
        Command::Rework {
            command: ReworkCommand::Report(args),
        } => run_rework_report(args),
    }
}
