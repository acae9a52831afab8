use clap::Parser;
use client::input::{BotInput, InputManager, DEFAULT_BOT_PLAYERS};
use client::network::Client;
use client::rendering::Renderer;
use log::info;
use shared::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Let a simulated player pick the colors
    #[arg(short, long)]
    bot: bool,

    /// Number of players to request when this client is the setter
    #[arg(short, long)]
    players: Option<u32>,

    /// Chance that the bot picks a wrong color while replaying
    #[arg(short, long, default_value_t = 0.1)]
    mistake_rate: f64,

    /// Seed for the bot's random choices
    #[arg(long)]
    seed: Option<u64>,

    /// Do not print game events (useful with --bot)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), client::BoxError> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let input = if args.bot {
        let players = args.players.unwrap_or(DEFAULT_BOT_PLAYERS);
        info!(
            "Playing as a bot with mistake rate {:.2}",
            args.mistake_rate
        );
        let bot = match args.seed {
            Some(seed) => BotInput::seeded(seed, args.mistake_rate, players),
            None => BotInput::new(args.mistake_rate, players),
        };
        InputManager::bot(bot)
    } else {
        info!("Type a color number and press Enter when it is your turn");
        InputManager::terminal()
    };

    let mut client = Client::connect(&args.server, input, Renderer::new(!args.quiet))
        .await?
        .with_players(args.players);

    let role = client.run().await?;
    info!("Finished as {:?}", role);

    Ok(())
}
