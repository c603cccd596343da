//! Splitting the record sequence into contiguous translation batches.

use crate::srt::SubtitleRecord;

/// One line of a batch, carrying its original subtitle index so the backend
/// can echo it back for correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLine {
    pub index: u32,
    pub text: String,
}

/// A contiguous slice of records queued for one translation request.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Offset into the record sequence where this batch starts.
    pub start: usize,
    pub lines: Vec<BatchLine>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Offset of the first record after this batch.
    pub fn end(&self) -> usize {
        self.start + self.lines.len()
    }
}

/// Split `records` into batches of at most `batch_size`, preserving order.
/// Batches are contiguous and non-overlapping; the last one may be short.
/// `batch_size >= 1` is a precondition enforced by config validation.
pub fn plan(records: &[SubtitleRecord], batch_size: usize) -> Vec<Batch> {
    debug_assert!(batch_size >= 1);
    records
        .chunks(batch_size)
        .enumerate()
        .map(|(chunk, slice)| Batch {
            start: chunk * batch_size,
            lines: slice
                .iter()
                .map(|record| BatchLine {
                    index: record.index,
                    text: record.text.clone(),
                })
                .collect(),
        })
        .collect()
}
