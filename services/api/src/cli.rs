use crate::commands::{run_decide, run_portfolio, DecideArgs, PortfolioArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use predaiot_ede::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "PredAIoT Economic Decision Engine",
    about = "Classify maintenance decisions and project their impact across a solar fleet",
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
    /// Classify a single decision input file and write the result
    Decide(DecideArgs),
    /// Project a plant yield export and write the impact report
    Portfolio(PortfolioArgs),
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
        Command::Decide(args) => run_decide(args),
        Command::Portfolio(args) => run_portfolio(args),
    }
}
