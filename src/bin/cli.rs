// CLI binary — panicking on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use virtdeck::client::HttpTransport;
use virtdeck::context::Context;
use virtdeck::registry::{catalog, execute};
use virtdeck::settings::Settings;

#[derive(Parser)]
#[command(name = "virtdeck-cli", about = "Invoke hypervisor commands from the shell", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (JSON). VIRTDECK_* environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output raw JSON instead of formatted text.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered command
    List,
    /// Show a command's description and parameter schema
    Describe { name: String },
    /// Invoke a command with JSON params
    Run {
        name: String,
        /// Params as a JSON object, e.g. '{"action": "list"}'
        #[arg(default_value = "{}")]
        params: String,
    },
    /// Serve the HTTP command surface (same as the server binary)
    Serve {
        #[arg(long, default_value = "127.0.0.1:8484")]
        listen: std::net::SocketAddr,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = catalog::verify_registry() {
        eprintln!("{e}");
        process::exit(1);
    }

    match cli.command {
        Commands::List => list(cli.json),
        Commands::Describe { name } => println!("{}", catalog::help_text(Some(&name))),
        Commands::Run { name, params } => run(&cli.config, cli.json, &name, &params).await,
        Commands::Serve { listen } => {
            let ctx = build_context(&cli.config);
            if let Err(e) = virtdeck::api::serve(ctx, listen).await {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    }
}

fn build_context(config: &Option<PathBuf>) -> Arc<Context> {
    let settings = match Settings::load(config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    let transport = match HttpTransport::new(&settings) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    Context::new(settings, transport)
}

fn list(json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&catalog::to_json_schema()).unwrap()
        );
        return;
    }
    for entry in catalog::registry().values() {
        println!(
            "{:<20} [{}] {}",
            entry.name,
            entry.category.slug(),
            entry.description
        );
    }
}

async fn run(config: &Option<PathBuf>, json: bool, name: &str, params: &str) {
    let params: Value = match serde_json::from_str(params) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("params is not valid JSON: {e}");
            process::exit(2);
        }
    };

    let ctx = build_context(config);
    let (envelope, data) = execute::invoke_detailed(&ctx, name, &params).await;
    if json {
        let mut doc = serde_json::to_value(&envelope).unwrap_or(Value::Null);
        if let (Some(obj), Some(data)) = (doc.as_object_mut(), data) {
            obj.insert("data".to_string(), data);
        }
        println!("{}", serde_json::to_string_pretty(&doc).unwrap());
    } else {
        println!("{}", envelope.message());
    }
    if envelope.is_error() {
        process::exit(1);
    }
}
