//! Sreekanteswaram Padmanabha Pillai, *Sabdatharavali* (1917), XDXF.

use tracing::warn;

use super::{DictionarySource, Document, SourceProfile, STV};
use crate::error::{ConvertError, Result};
use crate::model::{CrossRef, Entry, SenseKind};
use crate::segment::{Boundary, Located, RawEntry};
use crate::vocab::Vocabulary;
use crate::xml::{parse_document, XmlElement};

const DEFAULT_EXAMPLE_TYPE: &str = "exm";
const DEFAULT_RELATION: &str = "rel";

#[derive(Debug, Clone, Default)]
pub struct StvSource;

/// Texts this short are OCR debris, not definitions.
fn push_text(entry: &mut Entry, kind: SenseKind, text: String) {
    if text.chars().count() >= 2 {
        entry.push_sense(kind, None, Some(text), vec![], vec![]);
    }
}

fn push_examples(entry: &mut Entry, parent: &XmlElement) {
    for ex in parent.children_named("ex") {
        let example_type = ex.attribute("type").unwrap_or(DEFAULT_EXAMPLE_TYPE);
        if let Some(orig) = ex.child("ex_orig") {
            push_text(entry, SenseKind::Example(example_type.to_string()), orig.text());
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

impl DictionarySource for StvSource {
    type Unit = XmlElement;

    fn profile(&self) -> &'static SourceProfile {
        &STV
    }

    fn read(&self, document: &Document) -> Result<Vec<Located<XmlElement>>> {
        let root = parse_document(&document.text, &document.name)?;
        let lexicon = if root.name == "lexicon" {
            Some(root)
        } else {
            root.into_child("lexicon")
        };
        let Some(lexicon) = lexicon else {
            warn!("{}: no <lexicon> element, nothing to convert", document.name);
            return Ok(Vec::new());
        };
        Ok(lexicon
            .into_elements()
            .enumerate()
            .map(|(i, element)| Located::new(None, i + 1, element))
            .collect())
    }

    fn classify(&self, element: &XmlElement) -> Boundary {
        if element.name == "ar" {
            Boundary::Start
        } else {
            Boundary::Noise
        }
    }

    fn extract(&self, raw: &RawEntry<XmlElement>, vocab: &Vocabulary) -> Result<Entry> {
        let locator = raw.locator();
        let ar = raw
            .parts
            .first()
            .ok_or_else(|| ConvertError::entry_parse(&locator, "empty article"))?;

        let headword = ar.child("k").map(XmlElement::text).unwrap_or_default();
        let mut entry = Entry::new(&headword)
            .map_err(|_| ConvertError::entry_parse(&locator, "article without <k> headword"))?;
        let def = ar.child("def").ok_or_else(|| {
            ConvertError::entry_parse(&locator, format!("no <def> block for {}", entry.headword))
        })?;

        entry.grammar = def
            .child("gr")
            .or_else(|| ar.child("gr"))
            .map(XmlElement::text)
            .and_then(non_empty)
            .map(|gr| vocab.part_of_speech(STV.id, &gr));
        entry.etymology = def
            .child("etm")
            .map(XmlElement::text)
            .and_then(non_empty)
            .map(|etm| vocab.etymology(&etm));

        for deftext in def.children_named("deftext") {
            push_text(&mut entry, SenseKind::Definition, deftext.text());
        }
        for sub in def.children_named("def") {
            for deftext in sub.children_named("deftext") {
                push_text(&mut entry, SenseKind::Definition, deftext.text());
            }
            for expl in sub.children_named("expl") {
                push_text(&mut entry, SenseKind::Explanation, expl.text());
            }
            push_examples(&mut entry, sub);
        }
        for expl in def.children_named("expl") {
            push_text(&mut entry, SenseKind::Explanation, expl.text());
        }
        push_examples(&mut entry, def);

        if let Some(sr) = def.child("sr") {
            for kref in sr.children_named("kref") {
                let word = kref.text();
                if word.is_empty() {
                    continue;
                }
                let relation =
                    vocab.cross_reference_type(kref.attribute("type").unwrap_or(DEFAULT_RELATION));
                let cross_ref = CrossRef::new(relation, word.as_str());
                entry.push_sense(SenseKind::CrossReference, None, Some(word), vec![], vec![cross_ref]);
            }
        }

        if entry.senses.is_empty() {
            return Err(ConvertError::entry_parse(
                &locator,
                format!("no definitions for {}", entry.headword),
            ));
        }
        entry.validate()?;
        Ok(entry)
    }

    fn describe(&self, element: &XmlElement) -> String {
        element.text()
    }
}
