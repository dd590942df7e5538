//! Turning entries into dictpress rows or SFM marker lines.

pub mod csv_sink;
pub mod sfm;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{CrossRef, Entry, Sense, SenseKind};
use crate::sources::{Language, SourceProfile};
use crate::vocab::Vocabulary;

pub use csv_sink::CsvSink;
pub use sfm::SfmSink;

/// dictpress import columns, in order.
pub const COLUMNS: [&str; 11] = [
    "type",
    "initial_letter",
    "content",
    "language",
    "notes",
    "tsvector_language",
    "tsvector_tokens",
    "tags",
    "phonetic",
    "definition_type",
    "meta_json",
];

pub const MAIN_ROW: &str = "-";
pub const DEFINITION_ROW: &str = "^";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// dictpress import CSV
    Csv,
    /// Standard Format Markers
    Sfm,
}

/// One dictpress import row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub row_type: String,
    pub initial_letter: String,
    pub content: String,
    pub language: String,
    pub notes: String,
    pub tsvector_language: String,
    pub tsvector_tokens: String,
    pub tags: String,
    pub phonetic: String,
    pub definition_type: String,
    pub meta_json: String,
}

#[derive(Serialize)]
struct EntryMeta<'a> {
    source: &'a str,
    year: u16,
    page: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    etymology: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grammar: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cognates: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

#[derive(Serialize)]
struct SenseMeta<'a> {
    sense: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    definition: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    cross_refs: &'a [CrossRef],
}

/// Definition text as shown in the content column, with its kind label.
pub fn sense_content(sense: &Sense, vocab: &Vocabulary) -> String {
    let body = sense
        .gloss
        .as_deref()
        .or(sense.definition.as_deref())
        .unwrap_or_default();
    let label = match &sense.kind {
        SenseKind::Definition => None,
        SenseKind::Explanation => Some(vocab.explanation_label()),
        SenseKind::Example(kind) => Some(vocab.example_label(kind)),
        SenseKind::CrossReference => Some(
            sense
                .cross_refs
                .first()
                .map_or_else(|| vocab.cross_reference_label(""), |r| vocab.cross_reference_label(&r.relation)),
        ),
    };
    match label {
        Some(label) => format!("[{}] {}", label, body),
        None => body.to_string(),
    }
}

fn main_record(entry: &Entry, profile: &SourceProfile, vocab: &Vocabulary) -> Result<Record> {
    let mut notes = format!("{} ({})", profile.label, profile.year);
    if let Some(page) = &entry.page {
        notes.push_str(&format!(" p.{}", page));
    }
    if let Some(grammar) = &entry.grammar {
        notes.push(' ');
        notes.push_str(&grammar.raw);
    }

    let mut tags: Vec<&str> = profile.tags.to_vec();
    if profile.tag_etymology {
        if let Some(etymology) = &entry.etymology {
            tags.push(etymology.tag());
        }
    }
    if profile.tag_grammar_class {
        if let Some(class) = entry.grammar.as_ref().and_then(|g| vocab.grammar_class(&g.raw)) {
            tags.push(class);
        }
    }

    let meta = EntryMeta {
        source: profile.id,
        year: profile.year,
        page: entry.page.as_deref(),
        etymology: entry.etymology.as_ref().map(|e| e.tag()),
        author: profile.author,
        grammar: entry.grammar.as_ref().map(|g| g.raw.as_str()),
        cognates: entry.cognates.iter().map(|c| c.tag()).collect(),
        note: entry.note.as_deref(),
    };

    Ok(Record {
        row_type: MAIN_ROW.to_string(),
        initial_letter: entry.initial(),
        content: entry.headword.clone(),
        language: profile.headword_language.as_str().to_string(),
        notes,
        tsvector_language: profile.headword_language.tsvector().to_string(),
        tsvector_tokens: String::new(),
        tags: tags.join("|"),
        phonetic: entry.romanization.clone().unwrap_or_default(),
        definition_type: String::new(),
        meta_json: serde_json::to_string(&meta)?,
    })
}

fn definition_record(
    entry: &Entry,
    sense: &Sense,
    profile: &SourceProfile,
    vocab: &Vocabulary,
) -> Result<Record> {
    let language = if sense.gloss.is_some() {
        Language::English
    } else {
        profile.definition_language
    };

    let definition_type = match (&sense.kind, &entry.grammar) {
        (SenseKind::CrossReference, _) => "",
        (_, Some(grammar)) => grammar.tag(),
        (_, None) if language == Language::English => profile.default_gloss_type.unwrap_or_default(),
        _ => "",
    };

    let accompanying = sense.gloss.as_ref().and(sense.definition.as_deref());
    let meta_json = if accompanying.is_some() || !sense.cross_refs.is_empty() {
        serde_json::to_string(&SenseMeta {
            sense: sense.index,
            definition: accompanying,
            cross_refs: &sense.cross_refs,
        })?
    } else {
        String::new()
    };

    Ok(Record {
        row_type: DEFINITION_ROW.to_string(),
        content: sense_content(sense, vocab),
        language: language.as_str().to_string(),
        notes: sense.citations.join(", "),
        tsvector_language: language.tsvector().to_string(),
        definition_type: definition_type.to_string(),
        meta_json,
        ..Record::default()
    })
}

/// The main row followed by one definition row per sense.
pub fn entry_records(entry: &Entry, profile: &SourceProfile, vocab: &Vocabulary) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(entry.senses.len() + 1);
    records.push(main_record(entry, profile, vocab)?);
    for sense in &entry.senses {
        records.push(definition_record(entry, sense, profile, vocab)?);
    }
    Ok(records)
}

/// Destination for converted entries.
pub trait RecordSink {
    /// Write one entry; returns the number of definition rows written.
    fn write_entry(&mut self, entry: &Entry) -> Result<usize>;

    fn finish(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VocabTag;
    use crate::sources::{BAILEY, GUNDERT, STV};

    fn vocab() -> Vocabulary {
        Vocabulary::builtin().unwrap()
    }

    fn gundert_entry() -> Entry {
        let mut entry = Entry::new("ആപ്പു").unwrap();
        entry.romanization = Some("āppu̥".into());
        entry.etymology = Some(VocabTag::mapped("T.", "tamil"));
        entry.cognates = vec![VocabTag::mapped("M.", "malayalam"), VocabTag::unmapped("Xy.")];
        entry.page = Some("105".into());
        entry.push_sense(
            SenseKind::Definition,
            Some("Wedge, plug.".into()),
            Some("ആപ്പും തട്ടി.".into()),
            vec!["TP".into(), "KR".into()],
            vec![],
        );
        entry.push_sense(
            SenseKind::Definition,
            Some("wad of gun.".into()),
            None,
            vec![],
            vec![CrossRef::new("see_also", "കേണി")],
        );
        entry
    }

    #[test]
    fn main_row_columns() {
        let records = entry_records(&gundert_entry(), &GUNDERT, &vocab()).unwrap();
        let main = &records[0];
        assert_eq!(main.row_type, "-");
        assert_eq!(main.initial_letter, "ആ");
        assert_eq!(main.content, "ആപ്പു");
        assert_eq!(main.language, "malayalam");
        assert_eq!(main.notes, "Gundert (1872) p.105");
        assert_eq!(main.tsvector_language, "");
        assert_eq!(main.tags, "gundert|tamil");
        assert_eq!(main.phonetic, "āppu̥");
        assert_eq!(
            main.meta_json,
            r#"{"source":"gundert","year":1872,"page":"105","etymology":"tamil","author":"Hermann Gundert","cognates":["malayalam","Xy."]}"#
        );
    }

    #[test]
    fn definition_rows_per_sense() {
        let records = entry_records(&gundert_entry(), &GUNDERT, &vocab()).unwrap();
        assert_eq!(records.len(), 3);
        let first = &records[1];
        assert_eq!(first.row_type, "^");
        assert_eq!(first.content, "Wedge, plug.");
        assert_eq!(first.language, "english");
        assert_eq!(first.tsvector_language, "english");
        assert_eq!(first.notes, "TP, KR");
        assert_eq!(first.definition_type, "noun");
        assert_eq!(first.meta_json, r#"{"sense":1,"definition":"ആപ്പും തട്ടി."}"#);

        let second = &records[2];
        assert_eq!(
            second.meta_json,
            r#"{"sense":2,"cross_refs":[{"type":"see_also","word":"കേണി"}]}"#
        );
    }

    #[test]
    fn page_is_null_when_unknown() {
        let mut entry = Entry::new("Abandon").unwrap();
        entry.grammar = Some(VocabTag::mapped("v. a", "verb-transitive"));
        entry.push_sense(SenseKind::Definition, None, Some("വിടുക".into()), vec![], vec![]);
        let records = entry_records(&entry, &BAILEY, &vocab()).unwrap();
        assert_eq!(records[0].notes, "Bailey (1849) v. a");
        assert_eq!(records[0].tsvector_language, "english");
        assert_eq!(
            records[0].meta_json,
            r#"{"source":"bailey","year":1849,"page":null,"author":"Benjamin Bailey","grammar":"v. a"}"#
        );
        assert_eq!(records[1].language, "malayalam");
        assert_eq!(records[1].definition_type, "verb-transitive");
        assert_eq!(records[1].meta_json, "");
    }

    #[test]
    fn labelled_senses_and_grammar_class_tag() {
        let mut entry = Entry::new("അംശം").unwrap();
        entry.grammar = Some(VocabTag::unmapped("നാമം"));
        entry.push_sense(SenseKind::Explanation, None, Some("പങ്കു".into()), vec![], vec![]);
        entry.push_sense(SenseKind::Example("prv".into()), None, Some("അംശം തരിക".into()), vec![], vec![]);
        entry.push_sense(
            SenseKind::CrossReference,
            None,
            Some("ഭാഗം".into()),
            vec![],
            vec![CrossRef::new("synonym", "ഭാഗം")],
        );
        let records = entry_records(&entry, &STV, &vocab()).unwrap();
        assert_eq!(records[0].tags, "stv|sabdatharavali|noun");
        assert_eq!(records[0].notes, "STV (1917) നാമം");
        assert_eq!(records[1].content, "[വിശദീകരണം] പങ്കു");
        assert_eq!(records[2].content, "[പഴഞ്ചൊൽ] അംശം തരിക");
        assert_eq!(records[3].content, "[പര്യായം] ഭാഗം");
        assert_eq!(records[1].definition_type, "നാമം");
        assert_eq!(records[3].definition_type, "");
    }
}
