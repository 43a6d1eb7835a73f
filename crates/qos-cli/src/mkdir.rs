use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use qos_catalog::Catalog;
use qos_cli::{init_tracing, load_config};
use qos_engine::{DirectoryBridge, MkdirRequest, Scheduler};
use qos_namespace::{LocalNamespace, NamespaceClient};

#[derive(Parser)]
#[command(
    name = "qos-mkdir",
    about = "Create grid directories, optionally backed by QoS-scheduled containers",
    version
)]
struct Cli {
    /// Create missing intermediate directories
    #[arg(short, long)]
    parents: bool,

    /// Directory service to create the backing resources on
    #[arg(long, value_name = "SERVICE_PATH")]
    rns_service: Option<String>,

    /// Spec files to schedule; the primary container hosts the
    /// new directories
    #[arg(long, value_name = "SPEC_FILE")]
    specs: Vec<String>,

    /// QoS manager host
    #[arg(long, default_value = "localhost")]
    qos_server: String,

    /// Catalog database file
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Directories to create (local: or grid paths)
    #[arg(required = true)]
    paths: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let config = load_config(None, cli.catalog.as_deref())?;

    let catalog = Catalog::open(&config.catalog_path)
        .with_context(|| format!("opening catalog {}", config.catalog_path.display()))?;
    let namespace: Arc<dyn NamespaceClient> = Arc::new(LocalNamespace::new());
    let scheduler = Scheduler::new(catalog, namespace.clone(), config.replication_cap);
    let bridge = DirectoryBridge::new(scheduler, namespace);

    let request = MkdirRequest {
        parents: cli.parents,
        rns_service: cli.rns_service,
        specs: cli.specs,
        qos_server: cli.qos_server,
    };
    if let Err(e) = bridge.make_directories(&request, &cli.paths) {
        error!(error = %e, "mkdir failed");
        eprintln!("Can't create directory: {e}");
        std::process::exit(1);
    }
    Ok(())
}
