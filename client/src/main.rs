use clap::Parser;
use client::{Client, ClientError};
use log::{info, warn};
use shared::{Status, DEFAULT_PORT};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Print the whole board as JSON and exit
    #[arg(long)]
    snapshot: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    let mut client = Client::connect(&args.server).await?;

    if args.snapshot {
        let view = client.snapshot().await?;
        println!("{}", view.to_json()?);
        client.disconnect().await?;
        return Ok(());
    }

    println!("{}", client.handshake());
    repl(client).await?;

    Ok(())
}

/// Forwards stdin lines to the server and prints each reply until the
/// server acknowledges DISCONNECT or stdin ends.
async fn repl(mut client: Client) -> Result<(), ClientError> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = stdin.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match client.send_raw(&line).await {
            Ok(reply) => reply,
            Err(e @ ClientError::MultiLineRequest(_)) => {
                eprintln!("{}", e);
                continue;
            }
            Err(e) => return Err(e),
        };
        println!("{}", reply.status);
        for detail in &reply.details {
            println!("{}", detail);
        }

        if let Status::Error { code, .. } = &reply.status {
            warn!("Server refused {:?} with {}", line, code);
        }
        if reply.ends_session() {
            info!("Disconnected");
            return Ok(());
        }
    }

    info!("Input closed, disconnecting");
    client.disconnect().await
}
