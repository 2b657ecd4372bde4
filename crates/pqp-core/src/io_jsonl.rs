//! JSON Lines (NDJSON) helpers for streaming shot I/O.
//!
//! One shot per line, encoded as a JSON array of combined tokens:
//!
//! ```text
//! ["X+","Z-","Y+"]
//! ["Z+","Z+","X-"]
//! ```
//!
//! The reader is an owning iterator yielding `Result<Vec<Outcome>>` so
//! callers can surface per-line errors; [`read_record_jsonl`] collects it
//! into a validated [`ShadowRecord`]. We treat `.jsonl` and `.ndjson` as
//! equivalent.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::{Outcome, ShadowRecord};

/// Owning JSONL iterator over shots.
pub struct JsonlShotIter<R> {
    rdr: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> JsonlShotIter<R> {
    /// Wrap any buffered reader.
    pub fn new(rdr: R) -> Self {
        Self {
            rdr,
            buf: String::with_capacity(1 << 10),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for JsonlShotIter<R> {
    type Item = Result<Vec<Outcome>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.rdr.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let line = self.buf.trim();
                    // Trailing blank lines are common in hand-edited files.
                    if line.is_empty() {
                        continue;
                    }
                    return Some(parse_line(line, self.line_no));
                }
                Err(e) => {
                    return Some(Err(e).with_context(|| format!("read line {}", self.line_no + 1)))
                }
            }
        }
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Vec<Outcome>> {
    let tokens: Vec<String> =
        serde_json::from_str(line).with_context(|| format!("parse jsonl line {line_no}"))?;
    tokens
        .iter()
        .enumerate()
        .map(|(q, t)| {
            t.parse::<Outcome>()
                .map_err(|e| anyhow!("jsonl line {line_no}, qubit {q}: {e}"))
        })
        .collect()
}

/// Stream shots from a `.jsonl` file, one at a time.
pub fn stream_shots_jsonl<P: AsRef<Path>>(path: P) -> Result<JsonlShotIter<BufReader<File>>> {
    let f = File::open(path.as_ref())
        .with_context(|| format!("open {}", path.as_ref().display()))?;
    Ok(JsonlShotIter::new(BufReader::new(f)))
}

/// Collect a `.jsonl` file into a validated record.
pub fn read_record_jsonl<P: AsRef<Path>>(path: P) -> Result<ShadowRecord> {
    let shots = stream_shots_jsonl(path)?.collect::<Result<Vec<_>>>()?;
    Ok(ShadowRecord::new(shots)?)
}

/// Write one shot per line.
pub fn write_shots_jsonl<W: Write>(w: &mut W, shots: &[Vec<Outcome>]) -> Result<()> {
    for shot in shots {
        let tokens: Vec<String> = shot.iter().map(ToString::to_string).collect();
        serde_json::to_writer(&mut *w, &tokens).context("serialize shot to json")?;
        w.write_all(b"\n").context("write newline")?;
    }
    Ok(())
}

/// Write a record as JSON Lines.
pub fn write_record_jsonl<P: AsRef<Path>>(path: P, record: &ShadowRecord) -> Result<()> {
    let f = File::create(path.as_ref())
        .with_context(|| format!("create {}", path.as_ref().display()))?;
    let mut w = BufWriter::new(f);
    write_shots_jsonl(&mut w, record.shots())?;
    w.flush().context("flush writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn iterator_streams_and_skips_blank_lines() {
        let src = "[\"X+\",\"Z-\"]\n\n[\"Y-\",\"Z+\"]\n";
        let shots: Vec<_> = JsonlShotIter::new(Cursor::new(src))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(shots.len(), 2);
        assert_eq!(shots[1][0].to_string(), "Y-");
    }

    #[test]
    fn bad_token_reports_line_number() {
        let src = "[\"X+\"]\n[\"Q+\"]\n";
        let mut it = JsonlShotIter::new(Cursor::new(src));
        assert!(it.next().unwrap().is_ok());
        let err = it.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn writer_emits_one_line_per_shot() {
        let rec = ShadowRecord::from_tokens(
            &[vec!["X+", "Z-"], vec!["Y+", "Y+"]],
            crate::TokenLayout::Combined,
        )
        .unwrap();
        let mut buf = Vec::new();
        write_shots_jsonl(&mut buf, rec.shots()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "[\"X+\",\"Z-\"]\n[\"Y+\",\"Y+\"]\n");
    }
}
