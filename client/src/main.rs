use clap::Parser;
use client::network::Client;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to connect to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to connect to
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value = "30")]
    tick_rate: u32,
    /// Periodically send toggle/train actions to exercise the server
    #[clap(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate as f64);

    let mut client = Client::new(&addr, tick_duration, args.demo).await?;
    client.run().await
}
