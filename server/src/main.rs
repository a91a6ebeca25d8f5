use clap::Parser;
use log::{error, info};
use server::board::{Board, BoardConfig};
use server::network::Server;
use shared::DEFAULT_PORT;

/// Shared bulletin board server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Board width
    #[arg(value_parser = clap::value_parser!(i32).range(0..))]
    board_width: i32,

    /// Board height
    #[arg(value_parser = clap::value_parser!(i32).range(0..))]
    board_height: i32,

    /// Width of every note
    #[arg(value_parser = clap::value_parser!(i32).range(0..))]
    note_width: i32,

    /// Height of every note
    #[arg(value_parser = clap::value_parser!(i32).range(0..))]
    note_height: i32,

    /// Allowed note colors
    #[arg(required = true, num_args = 1..)]
    colors: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = BoardConfig::new(
        (args.board_width, args.board_height),
        (args.note_width, args.note_height),
        args.colors,
    )?;
    info!(
        "Board {:?}, notes {:?}, colors {}",
        config.board_size(),
        config.note_size(),
        config.colors().join(" ")
    );

    let address = format!("{}:{}", args.host, args.port);
    let server = match Server::bind(&address, Board::new(config)).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", address, e);
            return Err(e.into());
        }
    };

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            let clients = server.connected_clients().await;
            info!(
                "Received Ctrl+C, shutting down with {} clients connected",
                clients.len()
            );
            for (id, addr) in clients {
                info!("Dropping client {} at {}", id, addr);
            }
        }
    }

    Ok(())
}
