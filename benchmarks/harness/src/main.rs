//! pqp-bench-harness
//!
//! Run end-to-end timing passes (generate -> record round-trip -> estimate)
//! and append CSV rows into `benchmarks/reports/bench-<unix>.csv`.
//!
//! Usage examples:
//!   cargo run -p pqp-bench-harness -- --profile benchmarks/configs/profiles/small.toml
//!   cargo run -p pqp-bench-harness -- --profile benchmarks/configs/profiles/medium.toml --strategy parallel

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Deserialize;

use pqp_core::io::{read_record_auto, write_record_auto};
use pqp_core::{Strategy, Subset, TraceConfig, TraceEstimator};
use pqp_sim::{
    generator::{generate_record, DEFAULT_SEED},
    state::StateModel,
};

#[derive(Debug, Deserialize)]
struct Profile {
    /// Shots per synthetic record
    shots: usize,
    /// Qubits per shot
    qubits: usize,
    /// Leading qubits included in the estimated subset
    subset: usize,
    /// Repetitions of the whole pipeline
    repeats: u32,
    /// State model (`pure`, `mixed`, `partial:<r>`)
    #[serde(default = "default_state")]
    state: String,
    #[serde(default = "default_seed")]
    seed: u64,
}

fn default_state() -> String {
    "pure".to_owned()
}

const fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn parse_flag(name: &str, default: &str) -> String {
    let mut it = std::env::args().skip(1);
    while let Some(k) = it.next() {
        if k == format!("--{name}") {
            return it.next().unwrap_or_else(|| default.to_string());
        }
    }
    default.to_string()
}

fn dur_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

fn main() -> Result<()> {
    let profile_path = PathBuf::from(parse_flag(
        "profile",
        "benchmarks/configs/profiles/small.toml",
    ));
    let strategy_str = parse_flag("strategy", "both");
    let strategies: Vec<(&str, Strategy)> = match strategy_str.as_str() {
        "sequential" => vec![("sequential", Strategy::Sequential)],
        "parallel" => vec![("parallel", Strategy::Parallel)],
        "both" => vec![
            ("sequential", Strategy::Sequential),
            ("parallel", Strategy::Parallel),
        ],
        other => anyhow::bail!("unknown --strategy {other} (use sequential|parallel|both)"),
    };

    let profile_src = fs::read_to_string(&profile_path)
        .with_context(|| format!("read profile {}", profile_path.display()))?;
    let profile: Profile = toml::from_str(&profile_src).context("parse profile toml")?;
    let model: StateModel = profile.state.parse()?;
    println!(
        "Profile: shots={}, qubits={}, subset={}, repeats={}, state={model}, strategy={strategy_str}",
        profile.shots, profile.qubits, profile.subset, profile.repeats
    );

    let subset = Subset::new((0..profile.subset).collect(), profile.qubits)
        .context("profile subset does not fit the qubit count")?;

    fs::create_dir_all("benchmarks/reports").ok();

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let csv_path = PathBuf::from(format!("benchmarks/reports/bench-{ts}.csv"));
    let mut csv = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&csv_path)?;
    writeln!(csv, "timestamp,strategy,shots,qubits,subset,repeat,stage,ms,extra")?;

    for rep in 0..profile.repeats {
        let record_path = PathBuf::from(format!("benchmarks/tmp-record-{ts}-{rep}.cbor"));
        let seed = profile.seed.wrapping_add(u64::from(rep));

        // 1) generate shadows
        let t0 = Instant::now();
        let record = generate_record(profile.shots, profile.qubits, model, seed)?;
        let t_gen = t0.elapsed();
        writeln!(
            csv,
            "{ts},-,{},{},{},{rep},gen,{:.3},seed={seed}",
            profile.shots,
            profile.qubits,
            profile.subset,
            dur_ms(t_gen)
        )?;

        // 2) CBOR round-trip
        let t0 = Instant::now();
        write_record_auto(&record_path, &record)?;
        let loaded = read_record_auto(&record_path)?;
        let t_io = t0.elapsed();
        let bytes = fs::metadata(&record_path).map(|m| m.len()).unwrap_or(0);
        writeln!(
            csv,
            "{ts},-,{},{},{},{rep},io,{:.3},bytes={bytes}",
            profile.shots,
            profile.qubits,
            profile.subset,
            dur_ms(t_io)
        )?;

        // 3) estimate under each strategy
        for (name, strategy) in &strategies {
            let estimator = TraceEstimator::new(TraceConfig::default().with_strategy(*strategy));
            let t0 = Instant::now();
            let est = estimator.estimate(&loaded, &subset)?;
            let t_est = t0.elapsed();
            writeln!(
                csv,
                "{ts},{name},{},{},{},{rep},estimate,{:.3},value={:.6};pairs={}",
                profile.shots,
                profile.qubits,
                profile.subset,
                dur_ms(t_est),
                est.value,
                est.pairs
            )?;
        }

        // cleanup temp files to avoid disk bloat
        let _ = fs::remove_file(&record_path);
    }

    println!("Wrote report → {}", csv_path.display());
    Ok(())
}
