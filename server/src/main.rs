use clap::Parser;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value = "30")]
    tick_rate: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate as f64);

    let mut server = Server::new(&addr, tick_duration).await?;
    server.run().await
}
