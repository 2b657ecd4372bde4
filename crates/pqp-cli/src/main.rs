// crates/pqp-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pqp_core::{
    io::{ensure_parent_dir, read_record_auto, read_subsystems, stream_shots_auto, write_record_auto},
    io_jsonl::write_shots_jsonl,
    notation::{spread_out, ShadowExperiment},
    Aggregation, Strategy, Subset, TraceConfig, TraceEstimate, TraceEstimator,
};
use pqp_sim::{generator::generate_record, state::StateModel};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "pqp-cli",
    about = "Classical-shadow trace estimation CLI",
    long_about = "Classical-shadow trace estimation CLI.\n\nUse this tool to simulate shadow records, convert experiment dumps, and estimate subsystem purities.\nEstimator defaults can also be set through PQP_TRACE_STRATEGY, PQP_TRACE_THREADS, PQP_TRACE_PROGRESS and PQP_TRACE_MOM_GROUPS.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate a synthetic shadow record for a product state.
    Simulate {
        /// Number of shots M (>1)
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(2..))]
        shots: u64,

        /// Number of qubits N (>0)
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u64).range(1..))]
        qubits: u64,

        /// State model: pure | mixed | partial:<r>
        #[arg(long, default_value = "pure")]
        state: StateModel,

        /// RNG seed
        #[arg(long, default_value_t = pqp_sim::generator::DEFAULT_SEED)]
        seed: u64,

        /// Output path (JSON/CBOR/JSONL/TXT by extension)
        #[arg(long, default_value = "record.json")]
        out: PathBuf,
    },

    /// Estimate Tr(ρ_A²) for one or more qubit subsets.
    Estimate {
        /// Input record (JSON/CBOR/JSONL/TXT)
        #[arg(long)]
        record: PathBuf,

        /// Comma-separated subset, e.g. `0,2,3` (defaults to every qubit)
        #[arg(long, value_delimiter = ',', conflicts_with = "subsystems")]
        subs: Vec<usize>,

        /// Subsystem file (one subset per line)
        #[arg(long)]
        subsystems: Option<PathBuf>,

        /// Execution strategy (overrides PQP_TRACE_STRATEGY)
        #[arg(long, value_enum)]
        strategy: Option<StrategyOpt>,

        /// Worker threads for the parallel strategy (0 = all cores)
        #[arg(long)]
        threads: Option<usize>,

        /// Median-of-means group count (1 = plain mean)
        #[arg(long)]
        mom_groups: Option<usize>,

        /// Show a progress bar
        #[arg(long, default_value_t = false)]
        progress: bool,

        /// Print one JSON object per subset instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Convert a per-unitary experiment dump (JSON) into a shot record.
    Convert {
        /// Experiment JSON (`num_qubits`, `random_basis`, `counts`)
        #[arg(long)]
        input: PathBuf,

        /// Output record path (JSON/CBOR/JSONL/TXT)
        #[arg(long, default_value = "record.json")]
        out: PathBuf,
    },

    /// Convert any record (JSON/CBOR/JSONL/TXT) -> JSON Lines for streaming
    ExportJsonl {
        /// Input record path
        #[arg(long)]
        input: PathBuf,
        /// Output JSONL path
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum StrategyOpt {
    /// Single-threaded pair loop
    Sequential,
    /// Rayon-parallel pair loop
    Parallel,
}

impl From<StrategyOpt> for Strategy {
    fn from(s: StrategyOpt) -> Self {
        match s {
            StrategyOpt::Sequential => Self::Sequential,
            StrategyOpt::Parallel => Self::Parallel,
        }
    }
}

#[derive(Serialize)]
struct EstimateLine<'a> {
    subset: &'a [usize],
    #[serde(flatten)]
    estimate: &'a TraceEstimate,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Simulate {
            shots,
            qubits,
            state,
            seed,
            out,
        } => simulate(shots, qubits, state, seed, out),

        Cmd::Estimate {
            record,
            subs,
            subsystems,
            strategy,
            threads,
            mom_groups,
            progress,
            json,
        } => {
            let mut cfg = TraceConfig::from_env();
            if let Some(s) = strategy {
                cfg = cfg.with_strategy(s.into());
            }
            if let Some(t) = threads {
                cfg = cfg.with_threads(t);
            }
            if let Some(g) = mom_groups {
                cfg = cfg.with_aggregation(if g > 1 {
                    Aggregation::MedianOfMeans { groups: g }
                } else {
                    Aggregation::Mean
                });
            }
            if progress {
                cfg = cfg.with_progress(true);
            }
            estimate(record, subs, subsystems, cfg, json)
        }

        Cmd::Convert { input, out } => convert(input, out),

        Cmd::ExportJsonl { input, output } => export_jsonl(input, output),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn simulate(shots: u64, qubits: u64, state: StateModel, seed: u64, out: PathBuf) -> Result<()> {
    let shots = usize::try_from(shots).context("shot count does not fit in usize")?;
    let qubits = usize::try_from(qubits).context("qubit count does not fit in usize")?;

    info!(shots, qubits, %state, seed, "generating synthetic shadows");
    let record = generate_record(shots, qubits, state, seed)?;

    write_record_auto(&out, &record)
        .with_context(|| format!("writing record to {}", out.display()))?;

    println!(
        "Simulated {} shots × {} qubits ({state}, seed {seed}) → {}",
        record.num_shots(),
        record.num_qubits(),
        out.display()
    );
    Ok(())
}

fn estimate(
    record: PathBuf,
    subs: Vec<usize>,
    subsystems: Option<PathBuf>,
    cfg: TraceConfig,
    json: bool,
) -> Result<()> {
    let rec = read_record_auto(&record)
        .with_context(|| format!("reading record {}", record.display()))?;
    let n = rec.num_qubits();

    let subsets = match subsystems {
        Some(path) => {
            let (declared, subsets) = read_subsystems(&path)?;
            if declared != n {
                bail!(
                    "subsystem file {} is for {declared} qubits but the record has {n}",
                    path.display()
                );
            }
            subsets
        }
        None if subs.is_empty() => vec![Subset::full(n)?],
        None => vec![Subset::new(subs, n)?],
    };

    info!(record=%record.display(), shots = rec.num_shots(), qubits = n, subsets = subsets.len(), ?cfg, "estimating");
    let estimator = TraceEstimator::new(cfg);
    let estimates = estimator.estimate_many(&rec, &subsets)?;

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    for (subset, est) in subsets.iter().zip(&estimates) {
        if json {
            let line = EstimateLine {
                subset: subset.indices(),
                estimate: est,
            };
            serde_json::to_writer(&mut w, &line).context("serialize estimate")?;
            writeln!(w)?;
        } else {
            writeln!(
                w,
                "subset {:?}: {:.6} (pairs={}, shots={})",
                subset.indices(),
                est.value,
                est.pairs,
                est.shots
            )?;
        }
    }
    Ok(())
}

fn convert(input: PathBuf, out: PathBuf) -> Result<()> {
    info!(infile=%input.display(), outfile=%out.display(), "convert experiment dump");
    let f = File::open(&input).with_context(|| format!("open {}", input.display()))?;
    let exp: ShadowExperiment =
        serde_json::from_reader(BufReader::new(f)).context("parse experiment JSON")?;
    let record = spread_out(&exp).context("expanding counts into shots")?;

    write_record_auto(&out, &record)
        .with_context(|| format!("writing record to {}", out.display()))?;

    println!(
        "Converted {} unitaries → {} shots × {} qubits → {}",
        exp.counts.len(),
        record.num_shots(),
        record.num_qubits(),
        out.display()
    );
    Ok(())
}

/// Convert any record file into JSON Lines, one shot per line.
fn export_jsonl(input: PathBuf, output: PathBuf) -> Result<()> {
    info!(infile=%input.display(), outfile=%output.display(), "export to jsonl");
    let iter = stream_shots_auto(&input).context("open input stream")?;

    ensure_parent_dir(&output)?;
    let f = File::create(&output).with_context(|| format!("create {}", output.display()))?;
    let mut w = BufWriter::new(f);

    let mut n = 0usize;
    for item in iter {
        let shot = item?;
        write_shots_jsonl(&mut w, std::slice::from_ref(&shot))?;
        n += 1;
    }
    w.flush()?;

    println!("Exported {n} shots → {}", output.display());
    Ok(())
}
