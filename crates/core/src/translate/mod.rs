//! Translation pipeline: batching, dispatch, merging and checkpointing.
//!
//! Batches either run one at a time in offset order, checkpointing after
//! each, or fan out over a bounded worker pool and merge in completion
//! order. Merges land at disjoint offsets, so the final record store never
//! depends on completion order.

pub mod batch;
pub mod client;
pub mod openai;
pub mod retry;

use crate::checkpoint::{CheckpointManager, CheckpointState};
use crate::config::TranslateConfig;
use crate::srt::{self, SubtitleRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use batch::{plan, Batch, BatchLine};
use futures::pin_mut;
use futures::stream::{self, StreamExt};
use retry::translate_batch_reliable;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Translates one batch of subtitle lines into the target language,
/// preserving line boundaries.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_batch(
        &self,
        lines: &[BatchLine],
        target_language: &str,
    ) -> Result<Vec<String>>;
}

/// Write one batch result into the records it was cut from. Batches cover
/// disjoint offset ranges, so merge order never matters.
fn merge(records: &mut [SubtitleRecord], start: usize, texts: Vec<String>) {
    for (j, text) in texts.into_iter().enumerate() {
        records[start + j].text = text;
    }
}

/// Translate `records` in place, starting at `next_offset`.
///
/// Records before `next_offset` are assumed to already carry translated
/// text (a resumed run); batches overlapping the untranslated region are
/// redone in full. The checkpoint manager, when given, is written after
/// each completed batch in sequential mode only.
pub async fn translate_records<T>(
    records: &mut [SubtitleRecord],
    translator: &T,
    config: &TranslateConfig,
    next_offset: usize,
    checkpoint: Option<&CheckpointManager>,
) -> Result<()>
where
    T: Translator,
{
    config.validate()?;
    if records.is_empty() {
        return Ok(());
    }
    let batches = plan(records, config.batch_size);
    let total = batches.len();
    let pending: Vec<Batch> = batches
        .into_iter()
        .filter(|batch| batch.end() > next_offset)
        .collect();
    let done = total - pending.len();
    if done > 0 {
        info!("resuming: {done}/{total} batches already translated");
    }
    if config.workers == 1 {
        translate_sequential(records, translator, config, pending, total, done, checkpoint).await
    } else {
        if checkpoint.is_some() {
            warn!("checkpointing is disabled when translating with multiple workers");
        }
        translate_concurrent(records, translator, config, pending, total, done).await
    }
}

async fn translate_sequential<T: Translator>(
    records: &mut [SubtitleRecord],
    translator: &T,
    config: &TranslateConfig,
    pending: Vec<Batch>,
    total: usize,
    mut done: usize,
    checkpoint: Option<&CheckpointManager>,
) -> Result<()> {
    let mut batch_times = Vec::new();
    for batch in pending {
        info!("batch {}/{}", done + 1, total);
        let begin = Instant::now();
        let texts = translate_batch_reliable(
            translator,
            &batch,
            &config.target_language,
            config.retry,
            config.verbose,
        )
        .await?;
        batch_times.push(begin.elapsed().as_millis());
        let next = batch.end();
        merge(records, batch.start, texts);
        if let Some(manager) = checkpoint {
            manager.save(records, next)?;
        }
        done += 1;
        info!("completed {}%", next * 100 / records.len());
        if let Some(eta) = estimate_eta(&batch_times, total - done) {
            info!("ETA: {eta}");
        }
    }
    Ok(())
}

async fn translate_concurrent<T: Translator>(
    records: &mut [SubtitleRecord],
    translator: &T,
    config: &TranslateConfig,
    pending: Vec<Batch>,
    total: usize,
    mut done: usize,
) -> Result<()> {
    let results = stream::iter(pending)
        .map(|batch| async move {
            let result = translate_batch_reliable(
                translator,
                &batch,
                &config.target_language,
                config.retry,
                config.verbose,
            )
            .await;
            (batch, result)
        })
        .buffer_unordered(config.workers);
    pin_mut!(results);

    while let Some((batch, result)) = results.next().await {
        done += 1;
        match result {
            Ok(texts) => {
                merge(records, batch.start, texts);
                info!("batch {done}/{total}");
            }
            // Only a bounded retry policy can land here. The batch keeps its
            // untranslated text; sibling batches carry on.
            Err(err) => warn!("batch at offset {} left untranslated: {err:#}", batch.start),
        }
    }
    Ok(())
}

/// Average completed batch time multiplied by the remaining batch count.
fn estimate_eta(batch_times_ms: &[u128], remaining: usize) -> Option<String> {
    if batch_times_ms.is_empty() || remaining == 0 {
        return None;
    }
    let avg = batch_times_ms.iter().sum::<u128>() / batch_times_ms.len() as u128;
    let secs = avg * remaining as u128 / 1000;
    Some(if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    })
}

/// Output path for a translated file: `{stem}_{language}{ext}`, next to the
/// input.
pub fn translated_output_path(input: &Path, language: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    match input.extension() {
        Some(ext) => input.with_file_name(format!("{stem}_{language}.{}", ext.to_string_lossy())),
        None => input.with_file_name(format!("{stem}_{language}")),
    }
}

/// Translate one subtitle file and write the result next to it.
///
/// A checkpoint left by an interrupted run is picked up instead of the
/// source parse. The checkpoint is removed only after the output has been
/// written, so a run interrupted anywhere stays resumable.
pub async fn process_file<T>(
    input: &Path,
    translator: &T,
    config: &TranslateConfig,
) -> Result<PathBuf>
where
    T: Translator,
{
    config.validate()?;
    let manager = CheckpointManager::for_input(input, &config.target_language);
    let (mut records, next_offset) = match manager.load() {
        Some(CheckpointState {
            records,
            next_offset,
        }) => {
            info!("resuming {} from record {next_offset}", input.display());
            (records, next_offset)
        }
        None => {
            let content = fs::read_to_string(input)
                .with_context(|| format!("reading {}", input.display()))?;
            (srt::parse(&content)?, 0)
        }
    };

    // Completion order is not deterministic under a worker pool, so only
    // the sequential mode maintains the checkpoint.
    let checkpoint = (config.workers == 1).then_some(&manager);
    translate_records(&mut records, translator, config, next_offset, checkpoint).await?;

    let out_path = translated_output_path(input, &config.target_language);
    fs::write(&out_path, srt::compose(&records))
        .with_context(|| format!("writing {}", out_path.display()))?;
    manager.clear()?;
    info!("wrote {}", out_path.display());
    Ok(out_path)
}
