use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use common::cluster::{ClusterSnapshot, InMemoryCluster, load_exclusions};
use common::config::Configuration;
use common::k8s::ObjectRef;
use common::status::handler_from_config;
use pruner::{DeletionReport, Pruner, cancellation};

#[derive(Parser)]
#[command(name = "kprune")]
#[command(about = "kprune - phase-ordered deletion of objects that left the desired state")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct SelectionArgs {
    #[arg(long, help = "Cluster snapshot to prune (YAML or JSON)")]
    snapshot: PathBuf,

    #[arg(long, help = "Refs of the desired state that must be kept")]
    exclude: Option<PathBuf>,

    #[arg(long, help = "Only some tags were deployed, honor skip-delete-if-tags")]
    partial_tags: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the objects that would be deleted, in deletion order
    Plan {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Delete every eligible object and print the report
    Prune {
        #[command(flatten)]
        selection: SelectionArgs,

        #[arg(long, help = "Return as soon as each delete is accepted")]
        no_wait: bool,

        #[arg(long, help = "Ask the cluster to validate deletions without persisting them")]
        dry_run: bool,

        #[arg(long, help = "Print the report in JSON format")]
        json: bool,
    },
    #[command(flatten)]
    Common(CommonCommands),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    utils::init_logging(&cli.common);

    let mut config = utils::load_config(cli.common.config.as_ref())?;

    match cli.command {
        Commands::Common(command) => utils::handle_common_command(&command, &config),
        Commands::Plan { selection } => plan(&config, &selection).await,
        Commands::Prune {
            selection,
            no_wait,
            dry_run,
            json,
        } => {
            apply_prune_flags(&mut config, no_wait, dry_run);
            prune(&config, &selection, json).await
        }
    }
}

/// Flags override the configuration only when given.
fn apply_prune_flags(config: &mut Configuration, no_wait: bool, dry_run: bool) {
    if no_wait {
        config.prune.wait_for_deletion = false;
    }
    config.prune.dry_run |= dry_run;
}

fn load_inputs(selection: &SelectionArgs) -> Result<(Arc<InMemoryCluster>, Vec<ObjectRef>)> {
    let snapshot = ClusterSnapshot::from_path(&selection.snapshot)
        .context("Failed to load cluster snapshot")?;
    log::info!(
        "Loaded {} objects from {}",
        snapshot.objects.len(),
        selection.snapshot.display()
    );

    let exclusions = match &selection.exclude {
        Some(path) => {
            let exclusions = load_exclusions(path).context("Failed to load exclusions")?;
            log::info!("Loaded {} exclusions from {}", exclusions.len(), path.display());
            exclusions
        }
        None => Vec::new(),
    };

    Ok((Arc::new(InMemoryCluster::from_snapshot(snapshot)), exclusions))
}

fn build_pruner(config: &Configuration, cluster: Arc<InMemoryCluster>) -> Result<Pruner> {
    config
        .prune
        .validate()
        .context("Invalid [prune] configuration")?;

    Ok(Pruner::new(cluster, config.prune.clone()).with_status(handler_from_config(&config.status)))
}

async fn plan(config: &Configuration, selection: &SelectionArgs) -> Result<()> {
    let (cluster, exclusions) = load_inputs(selection)?;
    let pruner = build_pruner(config, cluster)?;

    let refs = pruner
        .find_objects_for_delete(selection.partial_tags, &exclusions)
        .await
        .context("Failed to select objects for deletion")?;

    if refs.is_empty() {
        println!("Nothing to prune");
    }
    for reference in &refs {
        println!("{reference}");
    }
    Ok(())
}

async fn prune(config: &Configuration, selection: &SelectionArgs, json: bool) -> Result<()> {
    let (cluster, exclusions) = load_inputs(selection)?;

    let (handle, signal) = cancellation();
    let pruner = build_pruner(config, cluster)?.with_cancellation(signal);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling outstanding deletions");
            handle.cancel();
        }
    });

    let report = pruner
        .prune(selection.partial_tags, &exclusions)
        .await
        .context("Failed to select objects for deletion")?;

    print_report(&report, json)?;

    if report.has_errors() {
        anyhow::bail!(
            "{} of {} deletions failed",
            report.errors.len(),
            report.errors.len() + report.deleted.len()
        );
    }
    Ok(())
}

fn print_report(report: &DeletionReport, json: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(report)
            .context("Failed to serialize report to JSON")?;
        println!("{json}");
        return Ok(());
    }

    let mode = if report.dry_run { " (dry run)" } else { "" };
    println!("Prune report {}{mode}", report.run_id);
    println!("=====================");

    println!("Deleted: {}", report.deleted.len());
    for reference in &report.deleted {
        println!("  ✓ {reference}");
    }

    if !report.skipped.is_empty() {
        println!("Removed with their namespace: {}", report.skipped.len());
        for reference in &report.skipped {
            println!("  - {reference}");
        }
    }

    if !report.warnings.is_empty() {
        println!("Warnings: {}", report.warnings.len());
        for entry in &report.warnings {
            println!("  ⚠ {}: {}", entry.reference, entry.message);
        }
    }

    if !report.errors.is_empty() {
        println!("Errors: {}", report.errors.len());
        for entry in &report.errors {
            println!("  ✗ {}: {}", entry.reference, entry.message);
        }
    }

    Ok(())
}
