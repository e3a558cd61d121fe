use std::time::Duration;

use clap::{Parser, ValueEnum};
use noughts_protocol::{GameMode, DEFAULT_WINS_NEEDED};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod board;
mod connection;
mod error;
mod game;
mod registry;
mod state;

use state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    SingleRound,
    BestOfN,
}

#[derive(Debug, Parser)]
#[command(
    name = "noughts-server",
    about = "Authoritative two-player noughts-and-crosses server"
)]
struct Args {
    /// Interface to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 5555)]
    port: u16,

    /// Starting game mode. The host can still change it before play starts.
    #[arg(long, value_enum, default_value = "single-round")]
    mode: ModeArg,

    /// Round wins needed to take a best-of-N match.
    #[arg(long, default_value_t = DEFAULT_WINS_NEEDED)]
    wins_needed: u32,

    /// Seconds a connection may stay silent before it is dropped. 0 disables.
    #[arg(long, default_value_t = 300)]
    idle_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mode = match args.mode {
        ModeArg::SingleRound => GameMode::SingleRound,
        ModeArg::BestOfN => GameMode::BestOfN {
            wins_needed: args.wins_needed,
        },
    };
    let idle_timeout =
        (args.idle_timeout_secs > 0).then(|| Duration::from_secs(args.idle_timeout_secs));

    let state = AppState::new(mode);
    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!(host = %args.host, port = args.port, %mode, "server listening");

    connection::run(listener, state, idle_timeout).await
}
