//! Batch-parallel field extraction.
//!
//! Entries are independent once segmented, so a batch of raw entries is split
//! into one chunk per thread and the results are stitched back together in chunk
//! order. Output order is always the sequential order.

use std::thread;

use crate::error::Result;
use crate::model::Entry;
use crate::segment::RawEntry;
use crate::sources::DictionarySource;
use crate::vocab::Vocabulary;

/// Configuration for parallel extraction
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of threads to use; 1 extracts on the calling thread
    pub num_threads: usize,
    /// Raw entries handed out per round
    pub batch_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_threads: 1,
            batch_size: 1000,
        }
    }
}

impl ParallelConfig {
    /// `0` means one thread per available CPU.
    pub fn with_threads(threads: usize) -> Self {
        let num_threads = if threads == 0 {
            thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        } else {
            threads
        };
        Self {
            num_threads,
            ..Self::default()
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.num_threads > 1
    }
}

/// Extract every raw entry of a batch, keeping batch order.
pub fn extract_batch<S: DictionarySource>(
    source: &S,
    batch: &[RawEntry<S::Unit>],
    vocab: &Vocabulary,
    num_threads: usize,
) -> Vec<Result<Entry>> {
    if num_threads <= 1 || batch.len() < 2 {
        return batch.iter().map(|raw| source.extract(raw, vocab)).collect();
    }

    let chunk_size = batch.len().div_ceil(num_threads);
    thread::scope(|scope| {
        let handles: Vec<_> = batch
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|raw| source.extract(raw, vocab))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut results = Vec::with_capacity(batch.len());
        for handle in handles {
            match handle.join() {
                Ok(chunk_results) => results.extend(chunk_results),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        results
    })
}
