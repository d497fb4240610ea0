use crate::report::{
    run_dashboard, run_leaderboard, run_windows, DashboardArgs, LeaderboardArgs, WindowsArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scoreboard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Squad Scoreboard",
    about = "Serve and inspect cycle-scoped squad scoreboards from the command line",
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
    /// Print one member's dashboard from CSV exports
    Dashboard(DashboardArgs),
    /// Print the ranked population for a month and cycle
    Leaderboard(LeaderboardArgs),
    /// Print the cycle windows of a month
    Windows(WindowsArgs),
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
        Command::Dashboard(args) => run_dashboard(args).await,
        Command::Leaderboard(args) => run_leaderboard(args).await,
        Command::Windows(args) => run_windows(args),
    }
}
