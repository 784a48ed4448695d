//! Thin CLI stub for the out-of-scope network request-handler layer.
//!
//! The TCP/WebSocket server and its JSON command protocol are external
//! collaborators this crate does not implement; this binary only documents
//! the contract (`serve --port N --project NAME`), initializes logging the
//! way a real server entry point would, and returns an explicit error.

use clap::Parser;
use relfeat::RuntimeConfig;

#[derive(Parser, Debug)]
#[command(name = "relfeat-serve", version, about = "Network entry point stub for relfeat")]
struct Args {
    /// Port the (unimplemented) request-handler layer would bind to.
    #[arg(long)]
    port: u16,

    /// Named project whose model artifacts would be served.
    #[arg(long)]
    project: String,
}

fn init_logging(config: &relfeat::config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = RuntimeConfig::load().unwrap_or_default();
    init_logging(&config.logging);

    tracing::info!(port = args.port, project = %args.project, "relfeat-serve starting");

    anyhow::bail!(
        "network layer not implemented in this crate: requested port {} for project '{}'",
        args.port,
        args.project
    );
}
