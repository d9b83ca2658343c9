//! Causeway CLI
//!
//! - `causeway ges`: greedy equivalence search over a covariance matrix (or
//!   raw continuous data), writing the resulting pattern as JSON
//! - `causeway meek`: orient the implied edges of a partially directed graph

use anyhow::Result;
use causeway_graph::Graph;
use causeway_search::{Ges, GesConfig, Knowledge, MeekConfig, MeekRules};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::Level;

mod io;

#[derive(Parser)]
#[command(name = "causeway")]
#[command(author, version, about = "Causeway: score-based causal structure search")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run GES and print the pattern it finds.
    Ges(GesArgs),

    /// Apply the Meek rules to a graph until nothing more is implied.
    Meek(MeekArgs),
}

#[derive(Args)]
struct GesArgs {
    /// Covariance JSON (`variables`, `sample_size`, `matrix`) or data JSON
    /// (`variables`, `rows`).
    #[arg(long)]
    covariance: PathBuf,

    /// Background knowledge JSON.
    #[arg(long)]
    knowledge: Option<PathBuf>,

    /// Search configuration JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Largest T subset per insert (-1 for unlimited).
    #[arg(long, allow_hyphen_values = true)]
    depth: Option<i32>,

    #[arg(long)]
    penalty_discount: Option<f64>,

    /// Stop the forward phase at this many edges.
    #[arg(long)]
    max_edges: Option<usize>,

    /// Keep this many of the best patterns seen.
    #[arg(long)]
    store_patterns: Option<usize>,

    /// Score candidates on all cores.
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    prevent_cycles: bool,

    /// Output file (default: stdout).
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct MeekArgs {
    /// Graph JSON (`nodes`, `edges`).
    #[arg(long)]
    graph: PathBuf,

    #[arg(long)]
    knowledge: Option<PathBuf>,

    /// Refuse orientations that would close a directed cycle.
    #[arg(long)]
    prevent_cycles: bool,

    /// Output file (default: stdout).
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Ges(args) => cmd_ges(args),
        Commands::Meek(args) => cmd_meek(args),
    }
}

fn ges_config(args: &GesArgs) -> Result<GesConfig> {
    let mut config = match &args.config {
        Some(path) => io::load_config(path)?,
        None => GesConfig::default(),
    };
    if let Some(depth) = args.depth {
        config.depth = depth;
    }
    if let Some(c) = args.penalty_discount {
        config.penalty_discount = c;
    }
    if let Some(max) = args.max_edges {
        config.max_num_edges = Some(max);
    }
    if let Some(k) = args.store_patterns {
        config.num_patterns_to_store = k;
    }
    config.parallel |= args.parallel;
    config.aggressively_prevent_cycles |= args.prevent_cycles;
    config.validate()?;
    Ok(config)
}

fn load_knowledge(path: Option<&PathBuf>) -> Result<Knowledge> {
    match path {
        Some(path) => io::load_knowledge(path),
        None => Ok(Knowledge::new()),
    }
}

fn cmd_ges(args: GesArgs) -> Result<()> {
    let config = ges_config(&args)?;
    let covariances = io::load_covariance(&args.covariance)?;
    let knowledge = load_knowledge(args.knowledge.as_ref())?;

    let variables = covariances.dim();
    let mut ges = Ges::from_covariance(covariances, &config)?.with_knowledge(knowledge)?;
    let pattern = ges.search()?;

    eprintln!(
        "{} {} variables, {} edges, score {:.4} in {:.3}s",
        "ok".green().bold(),
        variables,
        pattern.num_edges(),
        ges.score(),
        ges.elapsed().as_secs_f64()
    );

    let report = io::GesReport::new(
        &pattern,
        ges.score(),
        ges.elapsed().as_millis() as u64,
        ges.top_graphs(),
    );
    io::write_json(&report, args.out.as_deref())?;
    report_written(args.out.as_ref());
    Ok(())
}

fn cmd_meek(args: MeekArgs) -> Result<()> {
    let mut graph: Graph = io::load_graph(&args.graph)?;
    let knowledge = load_knowledge(args.knowledge.as_ref())?;
    if let Some(violation) = knowledge.violations(&graph).into_iter().next() {
        return Err(violation.into());
    }

    let config = MeekConfig {
        aggressively_prevent_cycles: args.prevent_cycles,
        ..MeekConfig::default()
    };
    let touched = MeekRules::new(config)
        .with_knowledge(&knowledge)
        .orient_implied(&mut graph)?;

    eprintln!(
        "{} {} nodes touched, {} edges",
        "ok".green().bold(),
        touched.len(),
        graph.num_edges()
    );
    io::write_json(&graph.to_record(), args.out.as_deref())?;
    report_written(args.out.as_ref());
    Ok(())
}

fn report_written(out: Option<&PathBuf>) {
    if let Some(path) = out {
        eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
    }
}
