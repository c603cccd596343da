//! Persistence of partially translated runs.
//!
//! The manager owns one JSON snapshot per input file. The rest of the
//! pipeline never reads the file; it only receives the loaded state at
//! startup and hands back records to save after each completed batch.

use crate::srt::SubtitleRecord;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Snapshot of a run: the full record sequence plus the offset of the first
/// record not yet confirmed translated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub records: Vec<SubtitleRecord>,
    pub next_offset: usize,
}

#[derive(Serialize)]
struct CheckpointSnapshot<'a> {
    records: &'a [SubtitleRecord],
    next_offset: usize,
}

/// Reads, writes and clears the checkpoint for one input file.
pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    /// Manager whose file sits next to `input`, keyed by input stem and
    /// target language so runs over different files never share state.
    pub fn for_input(input: &Path, language: &str) -> Self {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        Self {
            path: input.with_file_name(format!("{stem}_{language}.checkpoint.json")),
        }
    }

    /// Manager over an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the whole record snapshot and the next untranslated offset.
    /// The write is O(total records) per batch; cheap at subtitle scale.
    pub fn save(&self, records: &[SubtitleRecord], next_offset: usize) -> Result<()> {
        let snapshot = CheckpointSnapshot {
            records,
            next_offset,
        };
        fs::write(&self.path, serde_json::to_string(&snapshot)?)?;
        debug!("saved checkpoint {} at offset {next_offset}", self.path.display());
        Ok(())
    }

    /// Read the checkpoint if one is present. Missing, unreadable and
    /// corrupt files all mean "no checkpoint"; a damaged file never blocks
    /// a fresh run.
    pub fn load(&self) -> Option<CheckpointState> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    warn!("ignoring unreadable checkpoint {}: {err}", self.path.display());
                }
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!("ignoring corrupt checkpoint {}: {err}", self.path.display());
                None
            }
        }
    }

    /// Remove the checkpoint after the file finished successfully.
    /// Never called on partial failure, so interrupted runs stay resumable.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(index: u32, text: &str) -> SubtitleRecord {
        SubtitleRecord {
            index,
            start_ms: u64::from(index) * 1000,
            end_ms: u64::from(index) * 1000 + 900,
            text: text.to_string(),
        }
    }

    #[test]
    fn derives_path_from_stem_and_language() {
        let manager = CheckpointManager::for_input(Path::new("/tmp/show.srt"), "French");
        assert_eq!(
            manager.path(),
            Path::new("/tmp/show_French.checkpoint.json")
        );
    }

    #[test]
    fn saves_and_loads_a_snapshot() {
        let dir = tempdir().unwrap();
        let manager = CheckpointManager::at(dir.path().join("cp.json"));
        let records = vec![record(1, "un"), record(2, "two")];
        manager.save(&records, 1).unwrap();

        let state = manager.load().unwrap();
        assert_eq!(state.next_offset, 1);
        assert_eq!(state.records, records);
    }

    #[test]
    fn missing_checkpoint_is_absent() {
        let dir = tempdir().unwrap();
        let manager = CheckpointManager::at(dir.path().join("missing.json"));
        assert!(manager.load().is_none());
    }

    #[test]
    fn corrupt_checkpoint_is_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cp.json");
        fs::write(&path, "{not json").unwrap();
        assert!(CheckpointManager::at(path).load().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let manager = CheckpointManager::at(dir.path().join("cp.json"));
        manager.save(&[record(1, "a")], 1).unwrap();
        manager.clear().unwrap();
        assert!(manager.load().is_none());
        manager.clear().unwrap();
    }
}
