//! Serialization helpers for [`ShadowRecord`]s and subsystem lists.
//!
//! Supported record formats, selected by extension (case-insensitive):
//!
//! | ext | format |
//! |---|---|
//! | `.json` | serde JSON of `ShadowRecord` |
//! | `.cbor` | serde CBOR of `ShadowRecord` (`ciborium`) |
//! | `.jsonl` / `.ndjson` | one shot per line, see [`crate::io_jsonl`] |
//! | `.txt` / `.pqp` | Predicting-Quantum-Properties measurement text |
//!
//! The measurement text format is:
//!
//! ```text
//! [system size N]
//! [basis] [spin] [basis] [spin] ...   (N pairs per shot, spin ∈ {1,-1})
//! ```
//!
//! and the subsystem file:
//!
//! ```text
//! [system size N]
//! [subsystem size k] [qubit 1] ... [qubit k]
//! ```
//!
//! Unknown/missing extensions are rejected for reads and default to JSON
//! for writes.

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::Path;

use crate::{Outcome, ShadowRecord, Subset};

/// Ensure the parent directory for a file exists (no-op if none).
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", display(path)))?;
        }
    }
    Ok(())
}

/* ---------------- JSON / CBOR ---------------- */

/// Read a record from **JSON**.
pub fn read_record_json<P: AsRef<Path>>(path: P) -> Result<ShadowRecord> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| "deserialize JSON shadow record")
}

/// Write a record to **JSON** (pretty).
pub fn write_record_json<P: AsRef<Path>>(path: P, v: &ShadowRecord) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, v).with_context(|| "serialize JSON shadow record")?;
    w.flush().with_context(|| "flush JSON writer")?;
    Ok(())
}

/// Read a record from **CBOR**.
pub fn read_record_cbor<P: AsRef<Path>>(path: P) -> Result<ShadowRecord> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let mut rdr = BufReader::new(f);
    ciborium::de::from_reader(&mut rdr).with_context(|| "deserialize CBOR shadow record")
}

/// Write a record to **CBOR**.
pub fn write_record_cbor<P: AsRef<Path>>(path: P, v: &ShadowRecord) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).with_context(|| "serialize CBOR shadow record")?;
    w.flush().with_context(|| "flush CBOR writer")?;
    Ok(())
}

/// Serialize any `T: Serialize` to **CBOR bytes**.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).with_context(|| "serialize CBOR (to_cbor)")?;
    Ok(buf)
}

/// Deserialize any `T: DeserializeOwned` from **CBOR bytes**.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut cur = Cursor::new(bytes);
    ciborium::de::from_reader(&mut cur).with_context(|| "deserialize CBOR (from_cbor)")
}

/* ---------------- PQP measurement text ---------------- */

/// Parse PQP measurement text into a record.
pub fn parse_pqp_measurements(src: &str) -> Result<ShadowRecord> {
    let mut lines = src.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines.next().ok_or_else(|| anyhow!("missing system size line"))?;
    let n: usize = header
        .parse()
        .with_context(|| format!("parse system size {header:?}"))?;

    let mut shots = Vec::new();
    for (row, line) in lines.enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 * n {
            bail!(
                "shot {row}: expected {} tokens for {n} qubits, found {}",
                2 * n,
                tokens.len()
            );
        }
        let shot = tokens
            .chunks_exact(2)
            .enumerate()
            .map(|(q, p)| {
                Outcome::from_pair(p[0], p[1]).map_err(|e| anyhow!("shot {row}, qubit {q}: {e}"))
            })
            .collect::<Result<Vec<_>>>()?;
        shots.push(shot);
    }
    Ok(ShadowRecord::new(shots)?)
}

/// Render a record as PQP measurement text.
#[must_use]
pub fn render_pqp_measurements(record: &ShadowRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", record.num_qubits());
    for shot in record.shots() {
        let line: Vec<String> = shot
            .iter()
            .map(|o| format!("{} {}", o.basis, o.spin))
            .collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}

/// Read PQP measurement text from a file.
pub fn read_record_pqp<P: AsRef<Path>>(path: P) -> Result<ShadowRecord> {
    let path_ref = path.as_ref();
    let src = fs::read_to_string(path_ref).with_context(|| format!("read {}", display(path_ref)))?;
    parse_pqp_measurements(&src).with_context(|| format!("parse {}", display(path_ref)))
}

/// Write PQP measurement text to a file.
pub fn write_record_pqp<P: AsRef<Path>>(path: P, record: &ShadowRecord) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    fs::write(path_ref, render_pqp_measurements(record))
        .with_context(|| format!("write {}", display(path_ref)))
}

/* ---------------- Subsystem file ---------------- */

/// Parse a subsystem file, returning the declared system size and subsets.
pub fn parse_subsystems(src: &str) -> Result<(usize, Vec<Subset>)> {
    let mut lines = src.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines.next().ok_or_else(|| anyhow!("missing system size line"))?;
    let n: usize = header
        .parse()
        .with_context(|| format!("parse system size {header:?}"))?;

    let mut subsets = Vec::new();
    for (i, line) in lines.enumerate() {
        let nums = line
            .split_whitespace()
            .map(str::parse::<usize>)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("subsystem {i}: parse integers"))?;
        let Some((&k, qubits)) = nums.split_first() else {
            continue;
        };
        if qubits.len() != k {
            bail!("subsystem {i}: declared size {k} but lists {} qubits", qubits.len());
        }
        subsets.push(Subset::new(qubits.to_vec(), n).with_context(|| format!("subsystem {i}"))?);
    }
    Ok((n, subsets))
}

/// Render subsets as a subsystem file for an N-qubit system.
#[must_use]
pub fn render_subsystems(num_qubits: usize, subsets: &[Subset]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{num_qubits}");
    for s in subsets {
        let _ = write!(out, "{}", s.len());
        for q in s.indices() {
            let _ = write!(out, " {q}");
        }
        out.push('\n');
    }
    out
}

/// Read a subsystem file.
pub fn read_subsystems<P: AsRef<Path>>(path: P) -> Result<(usize, Vec<Subset>)> {
    let path_ref = path.as_ref();
    let src = fs::read_to_string(path_ref).with_context(|| format!("read {}", display(path_ref)))?;
    parse_subsystems(&src).with_context(|| format!("parse {}", display(path_ref)))
}

/* --------------- Auto-detect by extension --------------- */

/// Auto-detect **read** by extension.
pub fn read_record_auto<P: AsRef<Path>>(path: P) -> Result<ShadowRecord> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_record_json(path),
        Some("cbor") => read_record_cbor(path),
        Some("jsonl" | "ndjson") => crate::io_jsonl::read_record_jsonl(path),
        Some("txt" | "pqp") => read_record_pqp(path),
        Some(other) => Err(anyhow!(
            "unsupported record extension: {} (supported: .json, .cbor, .jsonl, .ndjson, .txt, .pqp)",
            other
        )),
        None => Err(anyhow!(
            "path has no extension (expected .json, .cbor, .jsonl, .ndjson, .txt or .pqp)"
        )),
    }
}

/// Auto-detect **write** (defaults to JSON if unknown/missing).
pub fn write_record_auto<P: AsRef<Path>>(path: P, v: &ShadowRecord) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_record_cbor(path, v),
        Some("jsonl" | "ndjson") => {
            ensure_parent_dir(path.as_ref())?;
            crate::io_jsonl::write_record_jsonl(path, v)
        }
        Some("txt" | "pqp") => write_record_pqp(path, v),
        _ => write_record_json(path, v),
    }
}

/// Boxed iterator over shots for any supported format.
///
/// `.jsonl` / `.ndjson` stream line by line; the other formats are loaded
/// whole and then iterated.
pub fn stream_shots_auto<P: AsRef<Path>>(
    path: P,
) -> Result<Box<dyn Iterator<Item = Result<Vec<Outcome>>> + Send>> {
    let pb = path.as_ref().to_owned();
    match ext_lower(&pb).as_deref() {
        Some("jsonl" | "ndjson") => Ok(Box::new(crate::io_jsonl::stream_shots_jsonl(pb)?)),
        _ => {
            let rec = read_record_auto(&pb)?;
            Ok(Box::new(rec.into_shots().into_iter().map(Ok)))
        }
    }
}

/* ---------------- Small helpers ---------------- */

#[inline]
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
}

#[inline]
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
