use crate::demo::{run_demo, run_evaluate, DemoArgs, EvaluateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use provision_advisor::config::MAX_PROVISIONING_SECS;
use provision_advisor::error::AppError;
use std::num::NonZeroUsize;

#[derive(Parser, Debug)]
#[command(
    name = "Provision Advisor",
    about = "Score infrastructure requests for compliance and provision them in the background",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and worker pool (default command)
    Serve(ServeArgs),
    /// Print the compliance result for a request file without submitting it
    Evaluate(EvaluateArgs),
    /// Run the full pipeline in process and print each task's status transitions
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the number of provisioning workers
    #[arg(long)]
    pub(crate) workers: Option<NonZeroUsize>,
    /// Override the simulated provisioning duration, in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=MAX_PROVISIONING_SECS))]
    pub(crate) provisioning_secs: Option<u64>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
