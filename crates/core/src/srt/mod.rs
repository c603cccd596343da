//! SRT reading and writing.
//! The pipeline only ever rewrites cue text; indices and timing values are
//! parsed here and pass through untouched.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// One subtitle cue: stable index, timing in milliseconds and text payload.
/// Multi-line cues keep their embedded newlines in `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    pub index: u32,
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// Parse SRT text into an ordered list of records.
pub fn parse(input: &str) -> Result<Vec<SubtitleRecord>> {
    let mut records = Vec::new();
    let mut lines = input.lines();
    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let index: u32 = line
            .parse()
            .map_err(|_| anyhow!("expected cue index, got {line:?}"))?;
        let timing = lines
            .next()
            .ok_or_else(|| anyhow!("cue {index} is missing its timing line"))?;
        let (start_ms, end_ms) = parse_timing(timing)?;
        let mut text = Vec::new();
        for text_line in lines.by_ref() {
            if text_line.trim().is_empty() {
                break;
            }
            text.push(text_line);
        }
        records.push(SubtitleRecord {
            index,
            start_ms,
            end_ms,
            text: text.join("\n"),
        });
    }
    Ok(records)
}

/// Render records back to SRT text, blank-line separated.
pub fn compose(records: &[SubtitleRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            record.index,
            format_timestamp(record.start_ms),
            format_timestamp(record.end_ms),
            record.text
        ));
    }
    out
}

/// Split `HH:MM:SS,mmm --> HH:MM:SS,mmm` into start and end milliseconds.
fn parse_timing(line: &str) -> Result<(u64, u64)> {
    let (start, end) = line
        .trim()
        .split_once(" --> ")
        .ok_or_else(|| anyhow!("malformed timing line: {line:?}"))?;
    Ok((parse_timestamp(start)?, parse_timestamp(end)?))
}

/// Parse a single `HH:MM:SS,mmm` timestamp into milliseconds.
fn parse_timestamp(stamp: &str) -> Result<u64> {
    let parts: Vec<&str> = stamp.trim().split([':', ',']).collect();
    let [h, m, s, ms] = parts.as_slice() else {
        return Err(anyhow!("malformed timestamp: {stamp:?}"));
    };
    let h: u64 = h.parse()?;
    let m: u64 = m.parse()?;
    let s: u64 = s.parse()?;
    let ms: u64 = ms.parse()?;
    Ok(((h * 60 + m) * 60 + s) * 1000 + ms)
}

/// Inverse of [`parse_timestamp`].
fn format_timestamp(ms: u64) -> String {
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let ms = ms % 1000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}
