use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser};
use tracing::warn;

use qos_catalog::Catalog;
use qos_cli::{init_tracing, load_config};
use qos_core::{ContainerStatus, QosSpec, parse_status_record};
use qos_engine::{Monitor, Scheduler, SpecSource};
use qos_namespace::{GridPath, LocalNamespace, NamespaceClient, PathKind};

#[derive(Parser)]
#[command(
    name = "qos-manager",
    about = "QoS-aware placement and monitoring for grid storage",
    version
)]
struct Cli {
    #[command(flatten)]
    action: Action,

    /// Catalog database file (overrides config and default)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Monitor pass interval in seconds; 0 runs a single pass
    #[arg(long, default_value_t = 0)]
    interval: u64,
}

/// Exactly one action per invocation.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct Action {
    /// Schedule a spec file (local: or grid path)
    #[arg(long, value_name = "SPEC_FILE")]
    schedule: Option<String>,

    /// Reschedule a spec already in the catalog
    #[arg(long, value_name = "SPEC_ID")]
    schedule_id: Option<String>,

    /// Remove a spec and release its reservations
    #[arg(long, value_name = "SPEC_ID")]
    rm_spec: Option<String>,

    /// Register a container from its status file
    #[arg(long, value_name = "STATUS_FILE")]
    add_container: Option<String>,

    /// Remove a container (refused while any spec is bound to it)
    #[arg(long, value_name = "CONTAINER_ID")]
    rm_container: Option<String>,

    /// Print a catalog summary
    #[arg(long)]
    show_db: bool,

    /// Print the full catalog as JSON lines
    #[arg(long)]
    show_db_verbose: bool,

    /// Delete and recreate the catalog
    #[arg(long)]
    clean_db: bool,

    /// Run a monitor pass, repeating at --interval seconds if nonzero
    #[arg(long)]
    monitor: bool,

    /// Wipe the catalog and run a scheduling round over synthetic data
    #[arg(long)]
    test_db: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.catalog.as_deref())?;

    let catalog = if cli.action.clean_db || cli.action.test_db {
        Catalog::init(&config.catalog_path)
    } else {
        Catalog::open(&config.catalog_path)
    }
    .with_context(|| format!("opening catalog {}", config.catalog_path.display()))?;

    let namespace: Arc<dyn NamespaceClient> = Arc::new(LocalNamespace::new());
    let scheduler = Scheduler::new(catalog.clone(), namespace.clone(), config.replication_cap);

    let action = &cli.action;
    if let Some(spec_file) = &action.schedule {
        run_schedule(&scheduler, &SpecSource::Path(spec_file.clone()))?;
    } else if let Some(spec_id) = &action.schedule_id {
        run_schedule(&scheduler, &SpecSource::Id(spec_id.clone()))?;
    } else if let Some(spec_id) = &action.rm_spec {
        catalog.remove_spec(spec_id)?;
        println!("removed spec {spec_id}");
    } else if let Some(status_file) = &action.add_container {
        add_container(&catalog, namespace.as_ref(), status_file)?;
    } else if let Some(container_id) = &action.rm_container {
        if catalog.remove_container(container_id)? {
            println!("removed container {container_id}");
        } else {
            warn!(container = %container_id, "container still bound, not removed");
            println!("container {container_id} still has specs bound to it, not removed");
        }
    } else if action.show_db {
        show_db(&catalog)?;
    } else if action.show_db_verbose {
        show_db_verbose(&catalog)?;
    } else if action.clean_db {
        println!("catalog reinitialized at {}", config.catalog_path.display());
    } else if action.monitor {
        let monitor = Monitor::new(catalog, namespace, config.replication_cap);
        if cli.interval == 0 {
            let report = monitor.monitor_all()?;
            println!(
                "checked {} containers ({} unreachable), rescheduled {} specs",
                report.containers_checked,
                report.containers_unreachable,
                report.specs_rescheduled
            );
        } else {
            monitor.run(Duration::from_secs(cli.interval))?;
        }
    } else if action.test_db {
        test_db(&catalog, &scheduler)?;
    }
    Ok(())
}

fn run_schedule(scheduler: &Scheduler, source: &SpecSource) -> anyhow::Result<()> {
    let placement = scheduler.schedule(source)?;
    if placement.is_empty() {
        println!("no satisfying container set; spec stored unbound");
    } else {
        println!(
            "scheduled on {} (estimated {:.4} per month)",
            placement.container_ids.join(", "),
            placement.estimated_monthly_cost
        );
    }
    Ok(())
}

fn add_container(
    catalog: &Catalog,
    namespace: &dyn NamespaceClient,
    status_file: &str,
) -> anyhow::Result<()> {
    let parsed = GridPath::parse(status_file);
    let text = match parsed.kind() {
        PathKind::Local => std::fs::read_to_string(parsed.path())
            .with_context(|| format!("reading {status_file}"))?,
        PathKind::Grid => namespace.read_to_string(status_file)?,
    };
    let mut status = parse_status_record(&text, status_file)?;
    let existing = catalog.get_status(&status.container_id)?;
    if let Some(old) = &existing {
        status.storage_reserved_mb = old.storage_reserved_mb;
    }
    catalog.upsert_container(&status, existing.is_none())?;
    println!("registered container {}", status.container_id);
    Ok(())
}

fn show_db(catalog: &Catalog) -> anyhow::Result<()> {
    let (specs, containers, bindings) = catalog.dump()?;
    println!("specifications ({}):", specs.len());
    for spec in &specs {
        println!("  {}", spec.spec_id);
    }
    println!("containers ({}):", containers.len());
    for status in &containers {
        println!(
            "  {} ({} MB free, {} MB reserved)",
            status.container_id,
            status.free_space_mb(),
            status.storage_reserved_mb
        );
    }
    println!("bindings ({}):", bindings.len());
    for (spec_id, container_ids) in &bindings {
        println!("  {} -> {}", spec_id, container_ids.join(", "));
    }
    Ok(())
}

fn show_db_verbose(catalog: &Catalog) -> anyhow::Result<()> {
    let (specs, containers, bindings) = catalog.dump()?;
    for spec in &specs {
        println!("{}", serde_json::to_string(spec)?);
    }
    for status in &containers {
        println!("{}", serde_json::to_string(status)?);
    }
    for binding in &bindings {
        println!("{}", serde_json::to_string(binding)?);
    }
    Ok(())
}

/// Seed a freshly wiped catalog with synthetic containers and a spec,
/// run one scheduling round, and dump the result.
fn test_db(catalog: &Catalog, scheduler: &Scheduler) -> anyhow::Result<()> {
    for (id, availability, cost) in [
        ("test-container-1", 990_000, 0.08),
        ("test-container-2", 990_000, 0.12),
        ("test-container-3", 900_000, 0.05),
    ] {
        let status = ContainerStatus {
            container_id: id.to_string(),
            storage_total_mb: 10_240,
            data_integrity: 500_000,
            reliability_ppm: 990_000,
            availability_ppm: availability,
            cost_per_gb_month: cost,
            physical_location: "/test/site/rack1".to_string(),
            ..ContainerStatus::default()
        };
        catalog.upsert_container(&status, true)?;
    }
    let spec = QosSpec {
        spec_id: "test-spec-1".to_string(),
        availability_ppm: 999_000,
        reliability_ppm: 990_000,
        reserved_size_mb: 512,
        data_integrity: 100_000,
        ..QosSpec::default()
    };
    catalog.add_scheduled(&spec, &[], true)?;
    run_schedule(scheduler, &SpecSource::Id(spec.spec_id.clone()))?;
    show_db(catalog)?;

    // Exercise the removal paths: bound containers must refuse to go,
    // removing the spec must release its reservations.
    for (spec_id, container_ids) in catalog.list_bindings()? {
        for id in &container_ids {
            if catalog.remove_container(id)? {
                anyhow::bail!("bound container {id} was removed");
            }
        }
        catalog.remove_spec(&spec_id)?;
    }
    for id in catalog.list_container_ids()? {
        let status = catalog
            .get_status(&id)?
            .ok_or_else(|| anyhow::anyhow!("container {id} vanished"))?;
        if status.storage_reserved_mb != 0 {
            anyhow::bail!("container {id} still reserves {} MB", status.storage_reserved_mb);
        }
        if !catalog.remove_container(&id)? {
            anyhow::bail!("unbound container {id} was not removable");
        }
    }
    println!("self-test passed");
    Ok(())
}
