//! Source readers and field extractors, one per dictionary edition.

pub mod bailey;
pub mod gundert;
pub mod stv;

use bzip2::read::BzDecoder;
use clap::ValueEnum;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};
use crate::model::Entry;
use crate::segment::{Boundary, Located, RawEntry};
use crate::vocab::Vocabulary;

pub use bailey::BaileySource;
pub use gundert::GundertSource;
pub use stv::StvSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Malayalam,
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malayalam => "malayalam",
            Self::English => "english",
        }
    }

    /// Postgres text search configuration; Malayalam has none.
    pub fn tsvector(&self) -> &'static str {
        match self {
            Self::Malayalam => "",
            Self::English => "english",
        }
    }
}

/// Fixed facts about one dictionary edition.
#[derive(Debug)]
pub struct SourceProfile {
    /// Identifier used in `meta_json` and as the part-of-speech table key.
    pub id: &'static str,
    pub label: &'static str,
    pub year: u16,
    pub author: Option<&'static str>,
    pub tags: &'static [&'static str],
    pub headword_language: Language,
    pub definition_language: Language,
    /// Add the etymology tag to the main row tags.
    pub tag_etymology: bool,
    /// Add the coarse grammar class to the main row tags.
    pub tag_grammar_class: bool,
    /// `definition_type` for English rows without a grammar tag.
    pub default_gloss_type: Option<&'static str>,
}

pub static GUNDERT: SourceProfile = SourceProfile {
    id: "gundert",
    label: "Gundert",
    year: 1872,
    author: Some("Hermann Gundert"),
    tags: &["gundert"],
    headword_language: Language::Malayalam,
    definition_language: Language::Malayalam,
    tag_etymology: true,
    tag_grammar_class: false,
    default_gloss_type: Some("noun"),
};

pub static BAILEY: SourceProfile = SourceProfile {
    id: "bailey",
    label: "Bailey",
    year: 1849,
    author: Some("Benjamin Bailey"),
    tags: &["bailey"],
    headword_language: Language::English,
    definition_language: Language::Malayalam,
    tag_etymology: false,
    tag_grammar_class: false,
    default_gloss_type: None,
};

pub static STV: SourceProfile = SourceProfile {
    id: "sabdatharavali",
    label: "STV",
    year: 1917,
    author: Some("Sreekanteswaram Padmanabha Pillai"),
    tags: &["stv", "sabdatharavali"],
    headword_language: Language::Malayalam,
    definition_language: Language::Malayalam,
    tag_etymology: false,
    tag_grammar_class: true,
    default_gloss_type: None,
};

/// Which edition a run converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Gundert 1872, TEI transcription
    Gundert,
    /// Bailey 1849, OCR plain text
    Bailey,
    /// Sabdatharavali 1917, XDXF
    Stv,
}

impl SourceKind {
    pub fn profile(&self) -> &'static SourceProfile {
        match self {
            Self::Gundert => &GUNDERT,
            Self::Bailey => &BAILEY,
            Self::Stv => &STV,
        }
    }
}

/// One input file, fully read.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Read a whole input file, decompressing `.bz2` on the fly.
pub fn read_document(path: &Path) -> Result<Document> {
    let name = path.display().to_string();
    let file = File::open(path)?;
    let mut reader: Box<dyn Read> = if name.ends_with(".bz2") {
        Box::new(BufReader::with_capacity(256 * 1024, BzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(256 * 1024, file))
    };
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = String::from_utf8(bytes).map_err(|e| {
        ConvertError::source_format(
            name.as_str(),
            format!("not UTF-8 (byte {})", e.utf8_error().valid_up_to()),
        )
    })?;
    Ok(Document { name, text })
}

/// Expand the input list: skip DTDs and process in sorted path order.
pub fn input_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = inputs
        .iter()
        .filter(|p| p.extension().map_or(true, |ext| ext != "dtd"))
        .cloned()
        .collect();
    paths.sort();
    paths
}

/// Reader, boundary classifier and field extractor for one edition.
///
/// `read` turns a document into located units, the segmenter groups them with
/// `classify`, and `extract` builds an [`Entry`] from each group. Extraction
/// only reads shared state, so it may run on several threads at once.
pub trait DictionarySource: Sync {
    type Unit: Send + Sync;

    fn profile(&self) -> &'static SourceProfile;

    fn read(&self, document: &Document) -> Result<Vec<Located<Self::Unit>>>;

    fn classify(&self, unit: &Self::Unit) -> Boundary;

    fn extract(&self, raw: &RawEntry<Self::Unit>, vocab: &Vocabulary) -> Result<Entry>;

    /// Plain text of a unit, for skip reports.
    fn describe(&self, unit: &Self::Unit) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_plain_and_bz2_documents() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("bailey.txt");
        std::fs::write(&plain, "Abandon, v. a. വിടുക.\n").unwrap();
        assert_eq!(read_document(&plain).unwrap().text, "Abandon, v. a. വിടുക.\n");

        let packed = dir.path().join("bailey.txt.bz2");
        let mut encoder = bzip2::write::BzEncoder::new(
            File::create(&packed).unwrap(),
            bzip2::Compression::default(),
        );
        encoder.write_all("Abandon, v. a. വിടുക.\n".as_bytes()).unwrap();
        encoder.finish().unwrap();
        assert_eq!(read_document(&packed).unwrap().text, "Abandon, v. a. വിടുക.\n");
    }

    #[test]
    fn invalid_utf8_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [b'a', 0xff, b'b']).unwrap();
        let err = read_document(&path).unwrap_err();
        assert!(matches!(err, ConvertError::SourceFormat { .. }));
    }

    #[test]
    fn input_paths_skip_dtd_and_sort() {
        let inputs = vec![
            PathBuf::from("stv/b.xml"),
            PathBuf::from("stv/xdxf.dtd"),
            PathBuf::from("stv/a.xml"),
        ];
        assert_eq!(
            input_paths(&inputs),
            vec![PathBuf::from("stv/a.xml"), PathBuf::from("stv/b.xml")]
        );
    }

    #[test]
    fn languages_map_to_tsvector_configs() {
        assert_eq!(Language::English.tsvector(), "english");
        assert_eq!(Language::Malayalam.tsvector(), "");
        assert_eq!(SourceKind::Stv.profile().id, "sabdatharavali");
    }
}
