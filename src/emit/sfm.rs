//! Standard Format Markers: one `\marker value` line per field, entries separated
//! by a blank line.
//!
//! Values escape `\` and line breaks, so every physical line is a marker line and
//! reading the output back gives the same entries.

use std::io::Write;
use tracing::debug;

use super::RecordSink;
use crate::error::{ConvertError, Result};
use crate::model::{CrossRef, Entry, SenseKind};
use crate::segment::{Boundary, Located, RawEntry, Segmenter};
use crate::sources::{DictionarySource, Document, SourceProfile};
use crate::vocab::Vocabulary;

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn marker(out: &mut String, name: &str, value: &str) {
    out.push('\\');
    out.push_str(name);
    out.push(' ');
    out.push_str(&escape(value));
    out.push('\n');
}

/// Marker lines for one entry, blank line included.
pub fn entry_to_sfm(entry: &Entry, profile: &SourceProfile) -> String {
    let mut out = String::new();
    marker(&mut out, "lx", &entry.headword);
    if let Some(romanization) = &entry.romanization {
        marker(&mut out, "ph", romanization);
    }
    for tag in entry.etymology.iter().chain(entry.cognates.iter()) {
        marker(&mut out, "et", tag.tag());
    }
    if let Some(grammar) = &entry.grammar {
        marker(&mut out, "ps", &grammar.raw);
    }
    if let Some(note) = &entry.note {
        marker(&mut out, "nt", note);
    }
    for sense in &entry.senses {
        marker(&mut out, "sn", &sense.index.to_string());
        if let Some(code) = sense.kind.code() {
            marker(&mut out, "sk", &code);
        }
        if let Some(gloss) = &sense.gloss {
            marker(&mut out, "ge", gloss);
        }
        if let Some(definition) = &sense.definition {
            marker(&mut out, "dn", definition);
        }
        for cross_ref in &sense.cross_refs {
            marker(&mut out, "cf", &format!("{}: {}", cross_ref.relation, cross_ref.word));
        }
        if !sense.citations.is_empty() {
            marker(&mut out, "so", &sense.citations.join("; "));
        }
    }
    if let Some(page) = &entry.page {
        marker(&mut out, "dt", &format!("{}/{}", page, profile.year));
        marker(&mut out, "rf", &format!("{} p.{}", profile.label, page));
    }
    out.push('\n');
    out
}

pub struct SfmSink<'a, W: Write> {
    out: W,
    profile: &'a SourceProfile,
}

impl<'a, W: Write> SfmSink<'a, W> {
    pub fn new(out: W, profile: &'a SourceProfile) -> Self {
        Self { out, profile }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for SfmSink<'_, W> {
    fn write_entry(&mut self, entry: &Entry) -> Result<usize> {
        self.out
            .write_all(entry_to_sfm(entry, self.profile).as_bytes())?;
        Ok(entry.senses.len())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

fn split_marker(line: &str) -> (&str, String) {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    match line.split_once(' ') {
        Some((name, value)) => (name, unescape(value)),
        None => (line, String::new()),
    }
}

#[derive(Default)]
struct PendingSense {
    index: usize,
    kind: SenseKind,
    gloss: Option<String>,
    definition: Option<String>,
    citations: Vec<String>,
    cross_refs: Vec<CrossRef>,
}

impl PendingSense {
    fn finish(self, entry: &mut Entry, locator: &str) -> Result<()> {
        let index = self.index;
        if !entry.push_sense(self.kind, self.gloss, self.definition, self.citations, self.cross_refs) {
            return Err(ConvertError::entry_parse(locator, format!("sense {} has no text", index)));
        }
        if entry.senses.len() != index {
            return Err(ConvertError::entry_parse(
                locator,
                format!("sense {} out of order", index),
            ));
        }
        Ok(())
    }
}

/// Reads marker files written by [`SfmSink`] back into entries.
#[derive(Debug, Clone, Copy)]
pub struct SfmSource {
    pub profile: &'static SourceProfile,
}

impl SfmSource {
    pub fn new(profile: &'static SourceProfile) -> Self {
        Self { profile }
    }
}

impl DictionarySource for SfmSource {
    type Unit = String;

    fn profile(&self) -> &'static SourceProfile {
        self.profile
    }

    fn read(&self, document: &Document) -> Result<Vec<Located<String>>> {
        Ok(document
            .text
            .lines()
            .enumerate()
            .map(|(i, line)| Located::new(None, i + 1, line.to_string()))
            .collect())
    }

    fn classify(&self, line: &String) -> Boundary {
        if line.trim().is_empty() {
            return Boundary::Noise;
        }
        match split_marker(line).0 {
            "\\lx" => Boundary::Start,
            "\\sn" => Boundary::Sense,
            name if name.starts_with('\\') => Boundary::Continuation,
            _ => Boundary::Stray,
        }
    }

    fn extract(&self, raw: &RawEntry<String>, vocab: &Vocabulary) -> Result<Entry> {
        let locator = raw.locator();
        let mut lines = raw.parts.iter().map(|line| split_marker(line));
        let headword = match lines.next() {
            Some((name, value)) if name == "\\lx" => value,
            _ => return Err(ConvertError::entry_parse(&locator, "entry does not start with \\lx")),
        };
        let mut entry = Entry::new(&headword)
            .map_err(|_| ConvertError::entry_parse(&locator, "empty \\lx"))?;
        let mut pending: Option<PendingSense> = None;
        let page_prefix = format!("{} p.", self.profile.label);

        for (name, value) in lines {
            let sense_field = || ConvertError::entry_parse(&locator, format!("{} outside a sense", name));
            match name {
                "\\ph" => entry.romanization = Some(value),
                "\\et" if entry.etymology.is_none() => {
                    entry.etymology = Some(vocab.etymology_from_tag(&value));
                }
                "\\et" => entry.cognates.push(vocab.etymology_from_tag(&value)),
                "\\ps" => entry.grammar = Some(vocab.part_of_speech(self.profile.id, &value)),
                "\\nt" => entry.note = Some(value),
                "\\sn" => {
                    if let Some(sense) = pending.take() {
                        sense.finish(&mut entry, &locator)?;
                    }
                    let index = value.trim().parse().map_err(|_| {
                        ConvertError::entry_parse(&locator, format!("bad sense number {:?}", value))
                    })?;
                    pending = Some(PendingSense {
                        index,
                        ..PendingSense::default()
                    });
                }
                "\\sk" => {
                    let kind = SenseKind::from_code(&value).ok_or_else(|| {
                        ConvertError::entry_parse(&locator, format!("unknown sense kind {:?}", value))
                    })?;
                    pending.as_mut().ok_or_else(sense_field)?.kind = kind;
                }
                "\\ge" => pending.as_mut().ok_or_else(sense_field)?.gloss = Some(value),
                "\\dn" => pending.as_mut().ok_or_else(sense_field)?.definition = Some(value),
                "\\cf" => {
                    let (relation, word) = value.split_once(": ").ok_or_else(|| {
                        ConvertError::entry_parse(&locator, format!("bad cross-reference {:?}", value))
                    })?;
                    pending
                        .as_mut()
                        .ok_or_else(sense_field)?
                        .cross_refs
                        .push(CrossRef::new(relation, word));
                }
                "\\so" => {
                    pending.as_mut().ok_or_else(sense_field)?.citations =
                        value.split("; ").map(str::to_string).collect();
                }
                "\\rf" => {
                    entry.page = Some(
                        value
                            .strip_prefix(page_prefix.as_str())
                            .unwrap_or(&value)
                            .to_string(),
                    );
                }
                "\\dt" => {}
                other => debug!("{}: ignoring marker {}", locator, other),
            }
        }
        if let Some(sense) = pending.take() {
            sense.finish(&mut entry, &locator)?;
        }
        entry.validate()?;
        Ok(entry)
    }

    fn describe(&self, line: &String) -> String {
        line.clone()
    }
}

/// Read every entry of a marker file; malformed entries come back as errors.
pub fn parse_entries(text: &str, profile: &'static SourceProfile, vocab: &Vocabulary) -> Vec<Result<Entry>> {
    let source = SfmSource::new(profile);
    let units = text
        .lines()
        .enumerate()
        .map(|(i, line)| Located::new(None, i + 1, line.to_string()));
    Segmenter::new(units, |line| source.classify(line))
        .map(|raw| source.extract(&raw, vocab))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VocabTag;
    use crate::sources::{BAILEY, GUNDERT, STV};

    fn vocab() -> Vocabulary {
        Vocabulary::builtin().unwrap()
    }

    fn sample() -> Entry {
        let mut entry = Entry::new("ആപ്പു").unwrap();
        entry.romanization = Some("āppu̥".into());
        entry.etymology = Some(VocabTag::mapped("T.", "tamil"));
        entry.cognates = vec![VocabTag::mapped("M.", "malayalam"), VocabTag::unmapped("Xy.")];
        entry.page = Some("105".into());
        entry.note = Some("(po.)".into());
        entry.push_sense(
            SenseKind::Definition,
            Some("Wedge, plug.".into()),
            Some("ആപ്പും\\തട്ടി\nകവാടം".into()),
            vec!["TP".into(), "Si Pu".into()],
            vec![CrossRef::new("see_also", "കേണി")],
        );
        entry.push_sense(SenseKind::Definition, Some("wad of gun.".into()), None, vec![], vec![]);
        entry
    }

    #[test]
    fn writes_expected_markers() {
        let text = entry_to_sfm(&sample(), &GUNDERT);
        let expected = "\\lx ആപ്പു\n\\ph āppu̥\n\\et tamil\n\\et malayalam\n\\et Xy.\n\\nt (po.)\n\
                        \\sn 1\n\\ge Wedge, plug.\n\\dn ആപ്പും\\\\തട്ടി\\nകവാടം\n\\cf see_also: കേണി\n\\so TP; Si Pu\n\
                        \\sn 2\n\\ge wad of gun.\n\\dt 105/1872\n\\rf Gundert p.105\n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn round_trip_reproduces_entries() {
        let vocab = vocab();
        let mut stv = Entry::new("അംശം").unwrap();
        stv.grammar = Some(vocab.part_of_speech("sabdatharavali", "n."));
        stv.etymology = Some(vocab.etymology("സം."));
        stv.push_sense(SenseKind::Explanation, None, Some("പങ്കു".into()), vec![], vec![]);
        stv.push_sense(SenseKind::Example("poem".into()), None, Some("അംശം തരിക".into()), vec![], vec![]);
        stv.push_sense(
            SenseKind::CrossReference,
            None,
            Some("ഭാഗം".into()),
            vec![],
            vec![CrossRef::new("synonym", "ഭാഗം")],
        );

        let gundert = sample();
        let text = format!("{}{}", entry_to_sfm(&gundert, &GUNDERT), entry_to_sfm(&gundert, &GUNDERT));
        let parsed: Vec<Entry> = parse_entries(&text, &GUNDERT, &vocab)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(parsed, vec![gundert.clone(), gundert]);

        let parsed = parse_entries(&entry_to_sfm(&stv, &STV), &STV, &vocab);
        assert_eq!(parsed.into_iter().next().unwrap().unwrap(), stv);
    }

    #[test]
    fn bailey_grammar_is_looked_up_again() {
        let vocab = vocab();
        let mut entry = Entry::new("Abandon").unwrap();
        entry.grammar = Some(vocab.part_of_speech("bailey", "v. a"));
        entry.push_sense(SenseKind::Definition, None, Some("വിടുക".into()), vec![], vec![]);
        let parsed = parse_entries(&entry_to_sfm(&entry, &BAILEY), &BAILEY, &vocab);
        assert_eq!(parsed[0].as_ref().unwrap(), &entry);
    }

    #[test]
    fn broken_entries_are_reported() {
        let text = "\\lx അ\n\\ge orphan gloss\n\n\\lx ആ\n\\sn 1\n\\dn രണ്ടാം\n\n";
        let parsed = parse_entries(text, &GUNDERT, &vocab());
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].as_ref().is_err_and(|e| e.is_recoverable()));
        assert_eq!(parsed[1].as_ref().unwrap().senses.len(), 1);
    }

    #[test]
    fn escapes_round_trip() {
        for value in ["a\\b", "line\nbreak", "trailing\\", "\\n literal"] {
            assert_eq!(unescape(&escape(value)), value);
        }
    }
}
