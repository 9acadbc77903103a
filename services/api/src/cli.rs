use clap::{Args, Parser, Subcommand};

use crate::demo::{run_demo, run_tuv_report, DemoArgs, TuvReportArgs};
use crate::server;
use fleetcheck::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "FleetCheck",
    about = "Run the FleetCheck inspection service and demos from the command line",
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
    /// Inspect TÜV certification deadlines
    Tuv {
        #[command(subcommand)]
        command: TuvCommand,
    },
    /// Run an end-to-end CLI demo of one inspection cycle
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum TuvCommand {
    /// Print the deadline report for the demo fleet
    Report(TuvReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the in-memory store with the demo fleet on startup
    #[arg(long)]
    pub(crate) seed_demo: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Tuv {
            command: TuvCommand::Report(args),
        } => run_tuv_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
