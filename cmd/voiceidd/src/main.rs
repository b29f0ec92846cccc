//! voiceidd - voice identity registry daemon.

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use voiceid_registry::{MemoryRegistry, RedbRegistry, Registry, RegistryStore};

/// Voice identity registry daemon.
///
/// Serves the profile registry over HTTP: enrollment sync, nearest-match
/// identification, search, and settings.
#[derive(Parser, Debug)]
#[command(name = "voiceidd")]
#[command(about = "Voice identity registry daemon")]
#[command(version)]
struct Args {
    /// Listen address (e.g. :8787 or 127.0.0.1:8787)
    #[arg(long, default_value = ":8787")]
    addr: String,

    /// Registry database file. Runs in-memory when omitted.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    let store: Arc<dyn RegistryStore> = match &args.store {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening registry store");
            Arc::new(RedbRegistry::open(path)?)
        }
        None => {
            tracing::warn!("no --store given, registry is in-memory only");
            Arc::new(MemoryRegistry::new())
        }
    };

    server::serve(&args.addr, Registry::new(store)).await
}
