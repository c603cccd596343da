//! Batch subtitle translation pipeline.
//!
//! SRT files are parsed into records, chunked into ordered batches and sent
//! through a chat backend; replies are validated and retried until the line
//! count matches, then merged back at the offsets they came from. Timing is
//! never touched. Interrupted sequential runs resume from an on-disk
//! checkpoint.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod srt;
pub mod translate;
