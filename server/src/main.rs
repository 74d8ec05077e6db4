use anyhow::Result;
use clap::Parser;
use searchpipe_server::build_app;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Crawl document store (JSONL file or directory)
    #[arg(long, default_value = "./sample_data/crawl.jsonl")]
    docs: String,
    /// JSON file of address -> importance score
    #[arg(long)]
    importance: Option<String>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let app = build_app(&args.docs, args.importance.as_deref())?;
    let addr = SocketAddr::from((args.host.parse::<IpAddr>()?, args.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, docs = %args.docs, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
