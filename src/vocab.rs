//! Controlled vocabularies: etymology markers, citation sources, part-of-speech
//! abbreviations and display labels.
//!
//! The tables ship in `schema/vocabulary.yaml`, embedded at build time. A run may
//! point `--vocab` at another copy; either way the tables are loaded once into a
//! process-wide cell and never change afterwards.

use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{ConvertError, Result};
use crate::model::VocabTag;

const EMBEDDED_VOCABULARY: &str = include_str!("../schema/vocabulary.yaml");

static VOCABULARY: OnceCell<Vocabulary> = OnceCell::new();

/// A `--vocab` file: every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VocabularyOverlay {
    etymology: HashMap<String, String>,
    citations: HashMap<String, String>,
    part_of_speech: HashMap<String, HashMap<String, String>>,
    grammar_classes: Option<Vec<(String, String)>>,
    cross_reference_types: HashMap<String, String>,
    cross_reference_labels: HashMap<String, String>,
    default_cross_reference_label: Option<String>,
    example_labels: HashMap<String, String>,
    default_example_label: Option<String>,
    explanation_label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Vocabulary {
    etymology: HashMap<String, String>,
    citations: HashMap<String, String>,
    part_of_speech: HashMap<String, HashMap<String, String>>,
    grammar_classes: Vec<(String, String)>,
    cross_reference_types: HashMap<String, String>,
    cross_reference_labels: HashMap<String, String>,
    default_cross_reference_label: String,
    example_labels: HashMap<String, String>,
    default_example_label: String,
    explanation_label: String,

    // Derived after loading
    #[serde(skip)]
    etymology_by_tag: HashMap<String, String>,
    #[serde(skip)]
    citation_markers: Vec<String>,
}

impl Vocabulary {
    /// Tables compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(EMBEDDED_VOCABULARY, "embedded vocabulary.yaml")
    }

    /// Embedded tables with a user file laid over them.
    ///
    /// Table entries in the file add to or replace the embedded ones; label
    /// defaults and `grammar_classes` replace theirs outright.
    pub fn load(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConvertError::Vocabulary(format!("failed to read {}: {}", origin, e)))?;
        let overlay: VocabularyOverlay = serde_yaml::from_str(&contents)
            .map_err(|e| ConvertError::Vocabulary(format!("failed to parse {}: {}", origin, e)))?;

        let mut vocab: Vocabulary = serde_yaml::from_str(EMBEDDED_VOCABULARY).map_err(|e| {
            ConvertError::Vocabulary(format!("failed to parse embedded vocabulary.yaml: {}", e))
        })?;
        vocab.etymology.extend(overlay.etymology);
        vocab.citations.extend(overlay.citations);
        for (source, table) in overlay.part_of_speech {
            vocab.part_of_speech.entry(source).or_default().extend(table);
        }
        vocab.cross_reference_types.extend(overlay.cross_reference_types);
        vocab.cross_reference_labels.extend(overlay.cross_reference_labels);
        vocab.example_labels.extend(overlay.example_labels);
        if let Some(classes) = overlay.grammar_classes {
            vocab.grammar_classes = classes;
        }
        if let Some(label) = overlay.default_cross_reference_label {
            vocab.default_cross_reference_label = label;
        }
        if let Some(label) = overlay.default_example_label {
            vocab.default_example_label = label;
        }
        if let Some(label) = overlay.explanation_label {
            vocab.explanation_label = label;
        }
        vocab.index(&origin)
    }

    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self> {
        let vocab: Vocabulary = serde_yaml::from_str(yaml)
            .map_err(|e| ConvertError::Vocabulary(format!("failed to parse {}: {}", origin, e)))?;
        vocab.index(origin)
    }

    /// Build the reverse etymology index and the sorted citation markers.
    fn index(mut self, origin: &str) -> Result<Self> {
        for (raw, canonical) in &self.etymology {
            if let Some(previous) = self.etymology_by_tag.insert(canonical.clone(), raw.clone()) {
                return Err(ConvertError::Vocabulary(format!(
                    "{}: etymology tag '{}' used for both '{}' and '{}'",
                    origin, canonical, previous, raw
                )));
            }
        }

        // Longest first so "Si Pu." wins over a shorter marker ending the same way
        let mut markers: Vec<String> = self.citations.keys().cloned().collect();
        markers.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        self.citation_markers = markers;

        Ok(self)
    }

    pub fn etymology(&self, raw: &str) -> VocabTag {
        match self.etymology.get(raw) {
            Some(canonical) => VocabTag::mapped(raw, canonical.as_str()),
            None => VocabTag::unmapped(raw),
        }
    }

    pub fn is_etymology_marker(&self, raw: &str) -> bool {
        self.etymology.contains_key(raw)
    }

    /// Inverse of [`Vocabulary::etymology`] for values written as canonical tags.
    pub fn etymology_from_tag(&self, value: &str) -> VocabTag {
        match self.etymology_by_tag.get(value) {
            Some(raw) => VocabTag::mapped(raw.as_str(), value),
            None => self.etymology(value),
        }
    }

    pub fn citation(&self, raw: &str) -> Option<&str> {
        self.citations.get(raw).map(String::as_str)
    }

    /// Citation abbreviations, longest first.
    pub fn citation_markers(&self) -> &[String] {
        &self.citation_markers
    }

    /// Part-of-speech lookup in the table of one source.
    pub fn part_of_speech(&self, source: &str, raw: &str) -> VocabTag {
        match self.part_of_speech.get(source).and_then(|table| table.get(raw)) {
            Some(canonical) => VocabTag::mapped(raw, canonical.as_str()),
            None => VocabTag::unmapped(raw),
        }
    }

    /// Coarse word class for a free-form grammar note.
    pub fn grammar_class(&self, grammar: &str) -> Option<&str> {
        let lowered = grammar.to_lowercase();
        self.grammar_classes
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, class)| class.as_str())
    }

    /// Canonical relation for a source relation code; unknown codes pass through.
    pub fn cross_reference_type(&self, code: &str) -> String {
        self.cross_reference_types
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    pub fn cross_reference_label(&self, relation: &str) -> &str {
        self.cross_reference_labels
            .get(relation)
            .unwrap_or(&self.default_cross_reference_label)
    }

    pub fn example_label(&self, example_type: &str) -> &str {
        self.example_labels
            .get(example_type)
            .unwrap_or(&self.default_example_label)
    }

    pub fn explanation_label(&self) -> &str {
        &self.explanation_label
    }
}

/// Load the process-wide tables; `None` uses the embedded copy.
pub fn init_vocabulary(path: Option<&Path>) -> Result<&'static Vocabulary> {
    let vocab = match path {
        Some(p) => Vocabulary::load(p)?,
        None => Vocabulary::builtin()?,
    };
    VOCABULARY
        .set(vocab)
        .map_err(|_| ConvertError::Vocabulary("vocabulary already initialized".to_string()))?;
    Ok(vocabulary())
}

/// The process-wide tables, falling back to the embedded copy.
pub fn vocabulary() -> &'static Vocabulary {
    VOCABULARY.get_or_init(|| {
        Vocabulary::builtin().expect("embedded vocabulary.yaml must parse")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::builtin().unwrap()
    }

    #[test]
    fn embedded_tables_have_expected_sizes() {
        let v = vocab();
        assert_eq!(v.etymology.len(), 17);
        assert_eq!(v.citations.len(), 43);
        assert_eq!(v.part_of_speech["sabdatharavali"].len(), 8);
    }

    #[test]
    fn known_etymology_maps() {
        let tag = vocab().etymology("S.");
        assert_eq!(tag.canonical.as_deref(), Some("sanskrit"));
        assert_eq!(tag.tag(), "sanskrit");
    }

    #[test]
    fn unknown_etymology_passes_through() {
        let tag = vocab().etymology("Xy.");
        assert_eq!(tag.tag(), "Xy.");
        assert!(!tag.is_mapped());
    }

    #[test]
    fn etymology_reverse_lookup() {
        let v = vocab();
        assert_eq!(v.etymology_from_tag("tamil"), VocabTag::mapped("T.", "tamil"));
        assert_eq!(v.etymology_from_tag("Xy."), VocabTag::unmapped("Xy."));
    }

    #[test]
    fn citation_markers_longest_first() {
        let v = vocab();
        let markers = v.citation_markers();
        assert!(markers.windows(2).all(|w| w[0].len() >= w[1].len()));
        assert_eq!(v.citation("Si Pu."), Some("Si Pu"));
        assert_eq!(v.citation("S."), None);
    }

    #[test]
    fn part_of_speech_is_per_source() {
        let v = vocab();
        assert_eq!(v.part_of_speech("bailey", "v. a").tag(), "verb-transitive");
        assert_eq!(v.part_of_speech("sabdatharavali", "n.").tag(), "noun");
        assert!(!v.part_of_speech("bailey", "n.").is_mapped());
    }

    #[test]
    fn grammar_class_keywords() {
        let v = vocab();
        assert_eq!(v.grammar_class("നാമം"), Some("noun"));
        assert_eq!(v.grammar_class("adj."), Some("adjective"));
        assert_eq!(v.grammar_class("ഭേദകം"), None);
    }

    #[test]
    fn labels_fall_back_to_defaults() {
        let v = vocab();
        assert_eq!(v.cross_reference_type("syn"), "synonym");
        assert_eq!(v.cross_reference_type("xyz"), "xyz");
        assert_eq!(v.cross_reference_label("synonym"), "പര്യായം");
        assert_eq!(v.cross_reference_label("xyz"), "കാണുക");
        assert_eq!(v.example_label("poem"), "കവിത");
        assert_eq!(v.example_label("odd"), "ഉദാഹരണം");
    }

    #[test]
    fn duplicate_etymology_tags_rejected() {
        let yaml = EMBEDDED_VOCABULARY.replace("\"T.\": tamil", "\"T.\": sanskrit");
        assert!(Vocabulary::from_yaml_str(&yaml, "test").is_err());
    }

    // ─── User vocabulary files ─────────────────────────────────────────────────

    fn write_overlay(yaml: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.yaml");
        fs::write(&path, yaml).unwrap();
        (dir, path)
    }

    #[test]
    fn user_file_is_laid_over_embedded_tables() {
        let (_dir, path) = write_overlay(
            r#"
etymology:
  "Xy.": xylanese
  "T.": old-tamil
part_of_speech:
  bailey:
    "ad. naut": adverb-nautical
explanation_label: അർത്ഥം
"#,
        );
        let v = Vocabulary::load(&path).unwrap();
        assert_eq!(v.etymology("Xy.").tag(), "xylanese");
        assert_eq!(v.etymology("T.").tag(), "old-tamil");
        assert_eq!(v.etymology("S.").tag(), "sanskrit");
        assert_eq!(v.etymology_from_tag("xylanese"), VocabTag::mapped("Xy.", "xylanese"));
        assert_eq!(v.etymology.len(), 18);
        assert_eq!(v.part_of_speech("bailey", "ad. naut").tag(), "adverb-nautical");
        assert_eq!(v.part_of_speech("bailey", "v. a").tag(), "verb-transitive");
        assert_eq!(v.citations.len(), 43);
        assert_eq!(v.explanation_label(), "അർത്ഥം");
        assert_eq!(v.example_label("poem"), "കവിത");
    }

    #[test]
    fn empty_user_file_keeps_embedded_tables() {
        let (_dir, path) = write_overlay("{}\n");
        let v = Vocabulary::load(&path).unwrap();
        assert_eq!(v.etymology.len(), 17);
        assert_eq!(v.citation_markers().len(), 43);
    }

    #[test]
    fn user_file_errors_are_vocabulary_errors() {
        let (dir, path) = write_overlay("etymology: [");
        assert!(matches!(Vocabulary::load(&path), Err(ConvertError::Vocabulary(_))));
        let missing = dir.path().join("missing.yaml");
        assert!(matches!(Vocabulary::load(&missing), Err(ConvertError::Vocabulary(_))));

        let (_dir, clash) = write_overlay("etymology:\n  \"Xy.\": tamil\n");
        let err = Vocabulary::load(&clash).unwrap_err();
        assert!(err.to_string().contains("tamil"));
    }

    #[test]
    fn process_tables_are_set_once() {
        let shared = vocabulary();
        assert_eq!(shared.etymology("S.").tag(), "sanskrit");
        let err = init_vocabulary(None).unwrap_err();
        assert!(matches!(err, ConvertError::Vocabulary(_)));
        assert!(std::ptr::eq(shared, vocabulary()));
    }

    #[test]
    fn malformed_yaml_is_a_vocabulary_error() {
        let err = Vocabulary::from_yaml_str("etymology: [", "broken").unwrap_err();
        assert!(matches!(err, ConvertError::Vocabulary(_)));
    }
}
