use crate::demo::{run_demo, run_distance, DemoArgs, DistanceArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use dirt_marketplace::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Dirt Marketplace",
    about = "Run the dirt marketplace API or explore it from the command line",
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
    /// Print the great-circle distance in miles between two points
    Distance(DistanceArgs),
    /// Seed an in-memory marketplace and walk through a trade
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
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Distance(args) => {
            run_distance(args);
            Ok(())
        }
        Command::Demo(args) => run_demo(args).await,
    }
}
