use crate::demo::{run_bank_report, run_demo, BankReportArgs, DemoArgs};
use crate::server;
use crate::take::{run_take, TakeArgs};
use clap::{Args, Parser, Subcommand};
use recruitment::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Recruitment Assessment",
    about = "Serve the applicant and assessment API, or sit the timed assessment from a terminal",
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
    /// Take the timed assessment against a running server
    Take(TakeArgs),
    /// Inspect the configured question bank
    Bank {
        #[command(subcommand)]
        command: BankCommand,
    },
    /// Run an in-process walkthrough of the one-attempt guarantee
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum BankCommand {
    /// Validate a question bank and print its layout
    Report(BankReportArgs),
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
        Command::Take(args) => run_take(args).await,
        Command::Bank {
            command: BankCommand::Report(args),
        } => run_bank_report(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
