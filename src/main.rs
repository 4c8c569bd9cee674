use std::sync::Arc;

use clap::Parser;

use weft_runtime::scripted::ScriptedRuntime;
use weft_server::ServerConfig;

/// Serve a demo agent whose trace is replayed through the full
/// trace-to-protocol pipeline. Real deployments plug their own
/// `AgentRuntime` into `weft_server::start`.
#[derive(Parser)]
#[command(name = "weft", version, about = "Agent trace to UI protocol bridge")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Mirror every emitted protocol event to the log at debug level.
    #[arg(long)]
    debug_events: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.debug_events {
        std::env::set_var("WEFT_DEBUG", "1");
    }

    let runtime = Arc::new(ScriptedRuntime::canned(
        "Hello! This reply was traced, translated and streamed by weft.",
    ));

    let handle = weft_server::start(ServerConfig { port: args.port }, runtime).await?;
    tracing::info!(port = handle.port, "weft ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
