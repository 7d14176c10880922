//! tanimoto-search CLI
//!
//! - `query`: run a similarity query through one or more strategies and
//!   report match counts and timings
//! - `generate`: write a synthetic corpus as JSON lines
//!
//! Exit codes: 0 success, 2 item not found, 3 invalid threshold, 4 store
//! unavailable, 5 inconsistent item, 6 strategies disagree, 1 anything else.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tanimoto_search::benchmark::{generate_corpus, write_json_lines, CorpusSpec};
use tanimoto_search::{
    InMemoryStore, QueryOrchestrator, SearchConfig, SearchError, SearchReport, StrategyKind,
    Threshold,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "tanimoto-search")]
#[command(version)]
#[command(about = "Exact Tanimoto similarity search over sparse feature fingerprints")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find items at least `threshold` similar to a stored item
    Query(QueryArgs),
    /// Write a synthetic corpus (one JSON object per line)
    Generate(GenerateArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// Corpus file, one JSON item per line
    #[arg(long)]
    corpus: PathBuf,

    /// Id of the query item
    #[arg(long)]
    id: String,

    /// Similarity threshold in (0, 1]
    #[arg(long, allow_hyphen_values = true)]
    threshold: String,

    /// Strategies to run (repeatable); defaults to all
    #[arg(long = "strategy")]
    strategies: Vec<String>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run strategies concurrently
    #[arg(long)]
    parallel: bool,

    /// Per-strategy timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct GenerateArgs {
    /// Output file
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 10_000)]
    items: usize,

    #[arg(long, default_value_t = 1024)]
    vocabulary: u32,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn exit_code(err: &SearchError) -> u8 {
    match err {
        SearchError::ItemNotFound(_) => 2,
        SearchError::InvalidThreshold { .. } => 3,
        SearchError::StoreUnavailable(_) => 4,
        SearchError::InconsistentItem { .. } => 5,
        _ => 1,
    }
}

fn load_config(args: &QueryArgs) -> Result<SearchConfig, SearchError> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::default(),
    };
    if !args.strategies.is_empty() {
        config.strategies = args
            .strategies
            .iter()
            .map(|s| s.parse::<StrategyKind>())
            .collect::<Result<_, _>>()?;
    }
    if args.parallel {
        config.parallel = true;
    }
    if args.timeout_ms.is_some() {
        config.timeout_ms = args.timeout_ms;
    }
    config.validate()?;
    Ok(config)
}

fn run_query(args: &QueryArgs) -> Result<SearchReport, SearchError> {
    // Reject a bad threshold before touching the corpus.
    let threshold: Threshold = args.threshold.parse()?;
    let config = load_config(args)?;

    let store = InMemoryStore::from_json_lines_path(&args.corpus)?;
    let frequencies = store.frequency_index();
    QueryOrchestrator::new(&store, &frequencies)
        .with_config(config)
        .run_with(&args.id, threshold)
}

fn print_report(report: &SearchReport, json: bool) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, report).context("serializing report")?;
        writeln!(out)?;
        return Ok(());
    }

    let percent = (report.threshold.as_f64() * 1e6).round() / 1e4;
    writeln!(
        out,
        "Finding items at least {}% similar to {} ({}): {} distinct features",
        percent,
        report.query_id,
        report.label,
        report.query_size
    )?;
    writeln!(
        out,
        "size window [{}, {}], prefix of {} features\n",
        report.filter.min_size(),
        report.filter.max_size(),
        report.filter.prefix.len()
    )?;
    for run in &report.runs {
        writeln!(
            out,
            "{}: {} matches in {:.3} ms (store examined {}, returned {})",
            run.kind,
            run.matches.len(),
            run.elapsed.as_secs_f64() * 1000.0,
            run.stats.examined,
            run.stats.candidates
        )?;
    }
    for m in &report.mismatches {
        writeln!(
            out,
            "MISMATCH {} vs {}: only in {}: {:?}; only in {}: {:?}",
            m.baseline, m.other, m.baseline, m.only_in_baseline, m.other, m.only_in_other
        )?;
    }
    Ok(())
}

fn generate(args: &GenerateArgs) -> anyhow::Result<()> {
    let spec = CorpusSpec {
        n_items: args.items,
        vocabulary: args.vocabulary,
        ..CorpusSpec::default()
    };
    let items = generate_corpus(&spec, args.seed);
    let file = std::fs::File::create(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    write_json_lines(&items, std::io::BufWriter::new(file))
        .with_context(|| format!("writing {}", args.out.display()))?;
    tracing::info!(items = items.len(), path = %args.out.display(), "wrote corpus");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query(args) => match run_query(&args) {
            Ok(report) => {
                if let Err(e) = print_report(&report, args.json) {
                    eprintln!("error: {e:#}");
                    return ExitCode::FAILURE;
                }
                if report.is_consistent() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(6)
                }
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(exit_code(&e))
            }
        },
        Commands::Generate(args) => match generate(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
