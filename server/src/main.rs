use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerConfig};
use server::session::DEFAULT_MAX_PLAYERS;
use shared::DEFAULT_PORT;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Largest number of players a setter may ask for
    #[arg(short, long, default_value_t = DEFAULT_MAX_PLAYERS)]
    max_players: u32,

    /// Eliminate an active player that does not pick within this many seconds
    #[arg(short, long)]
    turn_timeout_secs: Option<u64>,

    /// Exit after the first session instead of hosting sessions back to back
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), server::BoxError> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        addr: format!("{}:{}", args.host, args.port),
        max_players: args.max_players,
        turn_timeout: args.turn_timeout_secs.map(Duration::from_secs),
        once: args.once,
    };

    if let Some(limit) = config.turn_timeout {
        info!("Players are eliminated after {:?} without a pick", limit);
    }

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
