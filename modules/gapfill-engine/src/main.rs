use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use gapfill_common::catalog::AUDIT_LINKS;
use gapfill_common::config::log_redacted;
use gapfill_common::{Credentials, GapFillConfig, Phase};
use gapfill_engine::analysis::analyze_spec;
use gapfill_engine::export::{export_filename, write_connections};
use gapfill_engine::{apply_batch, plan, run_audit, GapFiller, RelationshipPersister, RunSummary};
use gapfill_graph::migrate::migrate;
use gapfill_graph::{GraphClient, RelationshipStore};

const DEFAULT_CONFIG: &str = "./config/gapfill.toml";

#[derive(Parser)]
#[command(name = "gapfill", about = "Embedding-based gap filling for the knowledge graph")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill gaps across the catalog and export the batch as CSV
    Run {
        /// Restrict to these years (repeatable)
        #[arg(long)]
        year: Vec<i64>,
        /// Restrict to these phases, e.g. build_oversight (repeatable)
        #[arg(long)]
        phase: Vec<Phase>,
        /// Persist connections as each spec completes
        #[arg(long)]
        apply: bool,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Apply an exported CSV batch to the graph
    Apply { csv: PathBuf },
    /// Report remaining orphans and bastards
    Audit {
        /// Exit non-zero when any gaps remain
        #[arg(long)]
        fail_on_gaps: bool,
    },
    /// Best-score distribution per relationship spec
    Analyze {
        #[arg(long)]
        year: Option<i64>,
        #[arg(long = "rel-type")]
        rel_type: Vec<String>,
    },
    /// Create the (id, year) and (year, level) indexes
    Migrate,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("gapfill=info".parse()?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let (path, required) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    let config = GapFillConfig::load(&path, required)?;
    let credentials = Credentials::from_env()?;
    log_redacted(&config.graph, &credentials);

    let client = GraphClient::connect(&config.graph, &credentials)
        .await
        .context("Failed to connect to graph store")?;
    client.ping().await.context("Graph store is unreachable")?;
    let client = Arc::new(client);

    match cli.command {
        Command::Run {
            year,
            phase,
            apply,
            output_dir,
        } => run(&config, client, year, phase, apply, output_dir).await,
        Command::Apply { csv } => {
            let persister = RelationshipPersister::new(
                client,
                config.run.max_in_flight_writes,
                config.run.progress_every,
            );
            let stats = apply_batch(&csv, &persister)
                .await
                .with_context(|| format!("Failed to apply batch {}", csv.display()))?;
            println!(
                "Created: {}  Failed: {}  Total: {}",
                stats.created, stats.failed, stats.attempted
            );
            Ok(())
        }
        Command::Audit { fail_on_gaps } => {
            let report = run_audit(client.as_ref(), AUDIT_LINKS).await?;
            println!("{report}");
            if fail_on_gaps && report.has_gaps() {
                let (orphans, bastards) = report.totals();
                anyhow::bail!("Audit found {orphans} orphans and {bastards} bastards");
            }
            Ok(())
        }
        Command::Analyze { year, rel_type } => {
            let year = match year {
                Some(y) => y,
                None => *config
                    .run
                    .years
                    .first()
                    .context("No year configured for analysis")?,
            };
            for spec in config
                .catalog()
                .iter()
                .filter(|s| rel_type.is_empty() || rel_type.contains(&s.rel_type))
            {
                if let Some(analysis) = analyze_spec(client.as_ref(), spec, year).await? {
                    println!("{analysis}");
                }
            }
            Ok(())
        }
        Command::Migrate => {
            let created = migrate(&client).await?;
            info!(statements = created, "Migration complete");
            Ok(())
        }
    }
}

async fn run(
    config: &GapFillConfig,
    client: Arc<GraphClient>,
    years: Vec<i64>,
    phases: Vec<Phase>,
    apply: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let years = if years.is_empty() {
        config.run.years.clone()
    } else {
        years
    };
    let tasks = plan(&config.catalog(), &years, &phases);
    info!(%run_id, tasks = tasks.len(), apply, "Gap-filling run starting");

    let mut filler = GapFiller::new(client.clone(), &config.matching);
    if apply {
        let store: Arc<dyn RelationshipStore> = client;
        let persister = RelationshipPersister::new(
            store,
            config.run.max_in_flight_writes,
            config.run.progress_every,
        );
        filler = filler.with_persister(Arc::new(persister));
    }

    let outcomes = filler
        .run(tasks, config.run.max_concurrent_specs)
        .await
        .context("Gap-filling run aborted")?;

    let output_dir = output_dir.unwrap_or_else(|| config.run.output_dir.clone());
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let csv_path = output_dir.join(export_filename(&Local::now()));

    let connections: Vec<_> = outcomes
        .iter()
        .flat_map(|o| o.connections.iter().cloned())
        .collect();
    write_connections(&csv_path, &connections)?;

    let mut summary = RunSummary::from_outcomes(run_id, started_at, &outcomes);
    summary.csv_path = Some(csv_path.display().to_string());
    let summary_path = csv_path.with_extension("summary.json");
    summary.write_json(&summary_path)?;

    println!("{summary}");
    info!(
        csv = %csv_path.display(),
        summary = %summary_path.display(),
        connections = connections.len(),
        "Run complete"
    );
    Ok(())
}
