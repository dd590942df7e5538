//! Reader → segmenter → extractor → sink, with the bookkeeping for the end-of-run
//! summary.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::emit::RecordSink;
use crate::error::{ConvertError, Result};
use crate::parallel::{extract_batch, ParallelConfig};
use crate::segment::{locator, RawEntry, Segmenter};
use crate::sources::{DictionarySource, Document};
use crate::text::excerpt;
use crate::vocab::Vocabulary;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after this many entries.
    pub limit: Option<usize>,
    pub parallel: ParallelConfig,
    /// Show a spinner on stderr.
    pub progress: bool,
}

/// An entry candidate that did not make it into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub document: String,
    pub locator: String,
    pub reason: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Stats {
    pub documents: usize,
    pub units_read: usize,
    pub front_matter: usize,
    pub entries_written: usize,
    pub definitions_written: usize,
    pub skipped: usize,
    pub warnings: usize,
    /// Unmapped vocabulary markers and how often each was seen.
    pub unmapped: BTreeMap<String, usize>,
    pub skipped_entries: Vec<Skipped>,
    pub limit_reached: bool,
    pub elapsed: Duration,
}

impl Stats {
    fn skip(&mut self, skipped: Skipped) {
        warn!(
            "{}: skipped entry at {}: {} [{}]",
            skipped.document,
            skipped.locator,
            skipped.reason,
            excerpt(&skipped.text, 60)
        );
        self.skipped += 1;
        self.warnings += 1;
        self.skipped_entries.push(skipped);
    }
}

fn spinner(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap(),
    );
    pb
}

fn describe_raw<S: DictionarySource>(source: &S, raw: &RawEntry<S::Unit>) -> String {
    raw.parts
        .iter()
        .map(|unit| source.describe(unit))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert every document in order and write the entries to `sink`.
///
/// Malformed entries are skipped and recorded in the returned stats; a document
/// that cannot be read at all aborts the run.
pub fn run<S: DictionarySource>(
    source: &S,
    documents: &[Document],
    vocab: &Vocabulary,
    sink: &mut dyn RecordSink,
    options: &RunOptions,
) -> Result<Stats> {
    let start_time = Instant::now();
    let mut stats = Stats::default();
    let pb = spinner(options.progress);
    let batch_size = if options.parallel.is_parallel() {
        options.parallel.batch_size.max(1)
    } else {
        1
    };

    for document in documents {
        stats.documents += 1;
        pb.set_message(format!("Reading {}", document.name));
        let units = source.read(document)?;
        stats.units_read += units.len();

        let mut segmenter = Segmenter::new(units.into_iter(), |unit| source.classify(unit));
        let mut produced = 0usize;
        let skipped_before = stats.skipped;

        'batches: loop {
            let batch: Vec<RawEntry<S::Unit>> = segmenter.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let results = extract_batch(source, &batch, vocab, options.parallel.num_threads);

            for (raw, result) in batch.iter().zip(results) {
                let entry = match result {
                    Ok(entry) => entry,
                    Err(ConvertError::EntryParse { reason, .. }) => {
                        stats.skip(Skipped {
                            document: document.name.clone(),
                            locator: raw.locator(),
                            reason,
                            text: describe_raw(source, raw),
                        });
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                for tag in entry.unmapped_tags() {
                    let seen = stats.unmapped.entry(tag.raw.clone()).or_default();
                    *seen += 1;
                    if *seen == 1 {
                        info!(
                            "{}: unmapped marker {:?} at {} ({})",
                            document.name,
                            tag.raw,
                            raw.locator(),
                            entry.headword
                        );
                    }
                }

                stats.definitions_written += sink.write_entry(&entry)?;
                stats.entries_written += 1;
                produced += 1;

                if stats.entries_written % 1000 == 0 {
                    let rate = stats.entries_written as f64 / start_time.elapsed().as_secs_f64();
                    pb.set_message(format!(
                        "Entries: {} | Definitions: {} | Skipped: {} | Rate: {:.0} entries/s",
                        stats.entries_written, stats.definitions_written, stats.skipped, rate
                    ));
                }

                if options.limit.is_some_and(|limit| stats.entries_written >= limit) {
                    stats.limit_reached = true;
                    break 'batches;
                }
            }
        }

        let discarded = segmenter.discarded();
        if discarded > 0 {
            debug!("{}: discarded {} units of front matter", document.name, discarded);
        }
        stats.front_matter += discarded;

        for stray in segmenter.take_strays() {
            stats.skip(Skipped {
                document: document.name.clone(),
                locator: locator(stray.page.as_deref(), stray.line),
                reason: "text outside any entry".to_string(),
                text: source.describe(&stray.value),
            });
        }

        if produced == 0 && stats.skipped == skipped_before && !stats.limit_reached {
            warn!("{}: no entries found", document.name);
            stats.warnings += 1;
        }
        if stats.limit_reached {
            break;
        }
    }

    sink.finish()?;
    match options.limit {
        Some(limit) if stats.limit_reached => {
            pb.finish_with_message(format!("Reached limit of {} entries", limit))
        }
        _ => pb.finish_and_clear(),
    }
    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

/// Tab-separated list of skipped candidates for manual review.
pub fn write_skipped_report<W: Write>(out: W, skipped: &[Skipped]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    writer.write_record(["document", "locator", "reason", "text"])?;
    for s in skipped {
        writer.write_record([&s.document, &s.locator, &s.reason, &s.text])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn print_stats(stats: &Stats, source_label: &str) {
    println!();
    println!("============================================================");
    println!("Source: {}", source_label);
    println!("Documents read: {}", stats.documents);
    println!("Units read: {}", stats.units_read);
    println!("Entries written: {}", stats.entries_written);
    println!("Definitions written: {}", stats.definitions_written);
    println!(
        "Avg definitions/entry: {:.2}",
        stats.definitions_written as f64 / stats.entries_written.max(1) as f64
    );
    println!("------------------------------------------------------------");
    println!("Skipped entries: {}", stats.skipped);
    println!("Discarded front matter: {}", stats.front_matter);
    println!("Warnings: {}", stats.warnings);
    if stats.unmapped.is_empty() {
        println!("Unmapped markers: none");
    } else {
        let markers: Vec<&str> = stats.unmapped.keys().map(String::as_str).collect();
        println!("Unmapped markers ({}): {}", markers.len(), markers.join(", "));
    }
    if stats.limit_reached {
        println!("Stopped early at the entry limit");
    }
    println!(
        "Time: {}m {}s",
        stats.elapsed.as_secs() / 60,
        stats.elapsed.as_secs() % 60
    );
    println!("============================================================");
}
