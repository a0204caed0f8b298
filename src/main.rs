use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use virtdeck::api;
use virtdeck::client::HttpTransport;
use virtdeck::context::Context;
use virtdeck::error::CommandError;
use virtdeck::registry::catalog;
use virtdeck::settings::Settings;

#[derive(Parser)]
#[command(name = "virtdeck", about = "Hypervisor command surface server", version)]
struct Args {
    /// Settings file (JSON). VIRTDECK_* environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8484")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!(error = %e, "startup failed");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CommandError> {
    // Registration drift aborts startup, not the first unlucky invocation.
    catalog::verify_registry()?;

    let settings = Settings::load(args.config.as_deref())?;
    tracing::info!(
        api_url = %settings.api_url,
        allow_mutations = settings.allow_mutations,
        commands = catalog::registry().len(),
        "starting"
    );
    if !settings.allow_mutations {
        tracing::info!("mutating commands are disabled (read-only mode)");
    }

    let transport = Arc::new(HttpTransport::new(&settings)?);
    let ctx = Context::new(settings, transport);
    api::serve(ctx, args.listen).await
}
