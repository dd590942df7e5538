//! Converters for historical Malayalam dictionaries.
//!
//! Gundert (1872, TEI), Bailey (1849, OCR text) and Sabdatharavali (1917, XDXF) are
//! read into typed [`Entry`] records and written as dictpress import rows or as
//! SFM marker lines.

pub mod emit;
pub mod error;
pub mod model;
pub mod parallel;
pub mod pipeline;
pub mod segment;
pub mod sources;
pub mod text;
pub mod vocab;
pub mod xml;

pub use emit::{CsvSink, OutputFormat, Record, RecordSink, SfmSink};
pub use error::{ConvertError, Result};
pub use model::{CrossRef, Entry, Sense, SenseKind, VocabTag};
pub use pipeline::{run, RunOptions, Stats};
pub use sources::{DictionarySource, Document, SourceKind, SourceProfile};
pub use vocab::Vocabulary;
