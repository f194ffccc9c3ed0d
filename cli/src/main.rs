//! CLI for replaying AMLSim datasets onto a temporal transaction graph

use std::path::PathBuf;
use std::sync::Arc;

use aml_graph_core_rs::models::money::to_major_units;
use aml_graph_core_rs::{
    load_graph_local, AmlData, AttributedGraph, Device, GraphStore, Memory, TMGraph,
    TMGraphConfig, BALANCE,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "aml-graph-cli")]
#[command(about = "Replay AMLSim transactions onto a temporal graph", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step the graph through the transaction ledger
    Replay {
        /// Directory holding accounts.csv, transactions.csv and alerts.csv
        data_dir: PathBuf,

        /// Number of steps to apply (default: until the ledger is exhausted)
        #[arg(short, long)]
        steps: Option<usize>,

        /// Steps per period; a snapshot is kept at the end of every period
        #[arg(short, long, default_value_t = 7)]
        period: usize,

        /// Number of period snapshots to keep
        #[arg(short, long, default_value_t = 4)]
        memory: usize,

        /// Device to place the graph on (cpu, cuda, cuda:N)
        #[arg(short, long, default_value = "cpu")]
        device: Device,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show record counts and categorical dictionaries
    Inspect {
        /// Directory holding accounts.csv, transactions.csv and alerts.csv
        data_dir: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    steps_applied: usize,
    final_t: usize,
    transactions_applied: usize,
    value_moved: f64,
    num_nodes: usize,
    num_edges: usize,
    total_balance: f64,
    snapshots_kept: usize,
    fingerprint: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Replay {
            data_dir,
            steps,
            period,
            memory,
            device,
            json,
        } => replay(data_dir, steps, period, memory, device, json),
        Commands::Inspect { data_dir } => inspect(data_dir),
    }
}

fn replay(
    data_dir: PathBuf,
    steps: Option<usize>,
    period: usize,
    memory_size: usize,
    device: Device,
    json: bool,
) -> anyhow::Result<()> {
    if period == 0 || memory_size == 0 {
        bail!("--period and --memory must be positive");
    }

    let loaded = load_graph_local(&data_dir, false)
        .with_context(|| format!("failed to load {}", data_dir.display()))?;
    let config = TMGraphConfig {
        backup_initial: false,
        steps_per_period: period,
    };
    let mut tmg: TMGraph<AttributedGraph> =
        TMGraph::with_config(loaded.graph, loaded.ledger.map(Arc::new), config);
    tmg.graph_to(device);

    let mut memory = Memory::bounded(memory_size);
    let budget = steps.unwrap_or_else(|| tmg.remaining_steps());

    let mut steps_applied = 0;
    let mut transactions_applied = 0;
    let mut value_moved = 0i128;
    while steps_applied < budget && !tmg.is_exhausted() {
        let result = tmg
            .advance()
            .with_context(|| format!("step {} failed", tmg.t()))?;

        steps_applied += 1;
        transactions_applied += result.num_transactions;
        value_moved += i128::from(result.total_amount);

        if tmg.period_complete() {
            tmg.remember(&mut memory)
                .context("failed to keep period snapshot")?;
            info!(
                t = tmg.t(),
                edges = tmg.graph().num_edges(),
                "period snapshot kept"
            );
        }
    }

    let graph = tmg.graph();
    let report = ReplayReport {
        steps_applied,
        final_t: tmg.t(),
        transactions_applied,
        value_moved: to_major_units(value_moved),
        num_nodes: graph.num_nodes(),
        num_edges: graph.num_edges(),
        total_balance: to_major_units(graph.node_attr_sum(BALANCE).unwrap_or(0)),
        snapshots_kept: memory.len(),
        fingerprint: graph.fingerprint().context("failed to fingerprint graph")?,
    };

    if json {
        let out = serde_json::to_string_pretty(&report)?;
        println!("{}", out);
    } else {
        println!("Replay of {}", data_dir.display());
        println!("  steps applied:        {}", report.steps_applied);
        println!("  final t:              {}", report.final_t);
        println!("  transactions applied: {}", report.transactions_applied);
        println!("  value moved:          {:.2}", report.value_moved);
        println!("  nodes / edges:        {} / {}", report.num_nodes, report.num_edges);
        println!("  total balance:        {:.2}", report.total_balance);
        println!("  snapshots kept:       {}", report.snapshots_kept);
        println!("  fingerprint:          {}", report.fingerprint);
    }
    Ok(())
}

fn inspect(data_dir: PathBuf) -> anyhow::Result<()> {
    let data = AmlData::load(&data_dir)
        .with_context(|| format!("failed to load {}", data_dir.display()))?;
    let dicts = data.dicts();

    println!("Dataset {}", data_dir.display());
    println!("  accounts:     {}", data.num_accounts());
    println!("  transactions: {}", data.transaction_records().len());
    println!("  alerts:       {}", data.alert_records().len());
    println!("  customers:    {}", data.customer_accounts().len());
    println!("  SAR accounts: {}", data.sar_accounts().len());
    println!("  countries:    {}", dicts.country.labels().join(", "));
    println!("  account types: {}", dicts.account_type.labels().join(", "));
    println!("  tx types:     {}", dicts.tx_type.labels().join(", "));
    Ok(())
}
