//! Gundert, *A Malayalam and English Dictionary* (1872), TEI transcription.
//!
//! Only the text of `<surface type="scan" n="…">` pages from the first dictionary
//! page onwards is read. Table cells, rows and paragraphs are separate blocks, so
//! the two printed columns never run together.

use lazy_static::lazy_static;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::debug;

use super::{DictionarySource, Document, SourceProfile, GUNDERT};
use crate::error::{ConvertError, Result};
use crate::model::{CrossRef, Entry, SenseKind};
use crate::segment::{Boundary, Located, RawEntry};
use crate::text::{
    contains_malayalam, join_lines, normalize_romanization, normalize_whitespace,
    rejoin_wrapped, split_sentences,
};
use crate::vocab::{vocabulary, Vocabulary};

/// First scan page carrying dictionary text; earlier pages are title and preface.
pub const DEFAULT_FIRST_PAGE: u32 = 23;

const BLOCK_ELEMENTS: &[&str] = &["p", "td", "tr", "table", "div"];
const SKIPPED_ELEMENTS: &[&str] = &["fw", "teiheader"];

// Short English words that open glosses and look like abbreviations
const GLOSS_WORDS: &[&str] = &[
    "A", "I", "O", "Ah", "An", "As", "At", "Be", "By", "Do", "Go", "He", "If", "In", "Is",
    "It", "Lo", "Me", "My", "Of", "Oh", "On", "Or", "To", "Up", "Us", "We",
];

lazy_static! {
    // Malayalam headword, then the romanization; it may carry inner hyphens and end
    // in `,;:`, but a final `.` makes it an abbreviation
    static ref HEADWORD_LINE: Regex = Regex::new(
        r"^([\x{0D00}-\x{0D7F}\x{200C}\x{200D}]+)\s+([A-Za-z\x{00C0}-\x{024F}\x{1E00}-\x{1EFF}\x{0300}-\x{036F}](?:[A-Za-z\x{00C0}-\x{024F}\x{1E00}-\x{1EFF}\x{0300}-\x{036F}'\-]*[A-Za-z\x{00C0}-\x{024F}\x{1E00}-\x{1EFF}\x{0300}-\x{036F}])?)[,;:]?(?:\s+|$)"
    ).unwrap();

    // Anything else opening with a Malayalam word and a Latin token
    static ref MALAYALAM_THEN_LATIN: Regex = Regex::new(
        r"^[\x{0D00}-\x{0D7F}\x{200C}\x{200D}]+\s+([A-Za-z\x{00C0}-\x{024F}\x{1E00}-\x{1EFF}]\S*)"
    ).unwrap();

    static ref SENSE_BLOCK: Regex = Regex::new(r"^\d{1,2}\.\s").unwrap();
    static ref SENSE_NUMBER: Regex = Regex::new(r"(?:^|\s)(\d{1,2})\.\s+").unwrap();

    // Bare page numbers, rules and stray punctuation
    static ref FURNITURE: Regex = Regex::new(r"^[\d\s.,:;*\-–—]*$").unwrap();

    // Language abbreviations missing from the vocabulary: "Xy.", "V3.", "Hg."
    static ref SHORT_MARKER: Regex = Regex::new(r"^(?:[A-Z][a-z]?\d?|[A-Z]{2,3})\.$").unwrap();

    static ref SYNONYM_REF: Regex =
        Regex::new(r"\(=\s*([\x{0D00}-\x{0D7F}\x{200C}\x{200D}A-Za-z]+)\)").unwrap();
    static ref SEE_REF: Regex =
        Regex::new(r"(?i)\bsee\s+([\x{0D00}-\x{0D7F}\x{200C}\x{200D}A-Za-z]+)").unwrap();
    static ref OPPOSITE_REF: Regex =
        Regex::new(r"\bopp\.\s+([\x{0D00}-\x{0D7F}\x{200C}\x{200D}A-Za-z]+)").unwrap();
}

#[derive(Debug, Clone)]
pub struct GundertSource {
    pub first_page: u32,
}

impl Default for GundertSource {
    fn default() -> Self {
        Self {
            first_page: DEFAULT_FIRST_PAGE,
        }
    }
}

impl GundertSource {
    pub fn new(first_page: u32) -> Self {
        Self { first_page }
    }

    /// Page number of a scan surface, `None` for front matter and other surfaces.
    fn scan_page(&self, surface: &BytesStart) -> Option<String> {
        let mut kind = None;
        let mut number = None;
        for attr in surface.attributes().with_checks(false).flatten() {
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match attr.key.as_ref() {
                b"type" => kind = Some(value),
                b"n" => number = Some(value),
                _ => {}
            }
        }
        if kind.as_deref() != Some("scan") {
            return None;
        }
        let number = number?;
        match number.trim().parse::<u32>() {
            Ok(n) if n >= self.first_page => Some(number.trim().to_string()),
            Ok(_) => {
                debug!("skipping front matter page {}", number);
                None
            }
            Err(_) => {
                debug!("skipping non-numeric page {:?}", number);
                None
            }
        }
    }
}

fn element_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).to_lowercase()
}

/// Text blocks of the pages currently being read.
#[derive(Default)]
struct BlockCollector {
    buffer: String,
    blocks: Vec<Located<String>>,
    unit: usize,
}

impl BlockCollector {
    fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn flush(&mut self, page: Option<&String>) {
        let text = normalize_whitespace(&rejoin_wrapped(&self.buffer));
        self.buffer.clear();
        if let (Some(page), false) = (page, text.is_empty()) {
            self.unit += 1;
            self.blocks.push(Located::new(Some(page.clone()), self.unit, text));
        }
    }
}

impl DictionarySource for GundertSource {
    type Unit = String;

    fn profile(&self) -> &'static SourceProfile {
        &GUNDERT
    }

    fn read(&self, document: &Document) -> Result<Vec<Located<String>>> {
        let mut reader = Reader::from_str(&document.text);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;

        let mut collector = BlockCollector::default();
        let mut page: Option<String> = None;
        let mut skipping = 0usize;

        loop {
            let event = reader.read_event().map_err(|e| {
                ConvertError::source_format(
                    document.name.as_str(),
                    format!("at byte {}: {}", reader.buffer_position(), e),
                )
            })?;
            match event {
                Event::Start(e) => {
                    let name = element_name(&e);
                    if SKIPPED_ELEMENTS.contains(&name.as_str()) {
                        skipping += 1;
                    } else if name == "surface" {
                        collector.flush(page.as_ref());
                        page = self.scan_page(&e);
                        collector.unit = 0;
                    } else if BLOCK_ELEMENTS.contains(&name.as_str()) {
                        collector.flush(page.as_ref());
                    } else if name == "br" {
                        collector.push(" ");
                    }
                }
                Event::Empty(e) => {
                    let name = element_name(&e);
                    if name == "br" {
                        collector.push(" ");
                    } else if BLOCK_ELEMENTS.contains(&name.as_str()) {
                        collector.flush(page.as_ref());
                    }
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                    if SKIPPED_ELEMENTS.contains(&name.as_str()) {
                        skipping = skipping.saturating_sub(1);
                    } else if name == "surface" {
                        collector.flush(page.as_ref());
                        page = None;
                    } else if BLOCK_ELEMENTS.contains(&name.as_str()) {
                        collector.flush(page.as_ref());
                    }
                }
                Event::Text(t) if skipping == 0 && page.is_some() => {
                    // HTML entities quick-xml does not know are kept as written
                    match t.unescape() {
                        Ok(text) => collector.push(&text),
                        Err(_) => collector.push(&String::from_utf8_lossy(&t)),
                    }
                }
                Event::CData(c) if skipping == 0 && page.is_some() => {
                    collector.push(&String::from_utf8_lossy(&c));
                }
                Event::Eof => {
                    collector.flush(page.as_ref());
                    break;
                }
                _ => {}
            }
        }
        Ok(collector.blocks)
    }

    fn classify(&self, block: &String) -> Boundary {
        if HEADWORD_LINE.is_match(block) {
            Boundary::Start
        } else if SENSE_BLOCK.is_match(block) {
            Boundary::Sense
        } else if FURNITURE.is_match(block) {
            Boundary::Noise
        } else if is_broken_headword(block, vocabulary()) {
            Boundary::Stray
        } else {
            Boundary::Continuation
        }
    }

    fn extract(&self, raw: &RawEntry<String>, vocab: &Vocabulary) -> Result<Entry> {
        let locator = raw.locator();
        let text = join_lines(&raw.parts);
        let caps = HEADWORD_LINE
            .captures(&text)
            .ok_or_else(|| ConvertError::entry_parse(&locator, "no headword and romanization"))?;

        let mut entry = Entry::new(&caps[1])
            .map_err(|_| ConvertError::entry_parse(&locator, "empty headword"))?;
        entry.romanization = Some(normalize_romanization(&caps[2]));
        entry.page = raw.page.clone();

        let mut rest = &text[caps.get(0).map_or(0, |m| m.end())..];
        let mut markers = Vec::new();
        while let Some(token) = rest.split_whitespace().next() {
            if !is_origin_marker(token, vocab) {
                break;
            }
            markers.push(vocab.etymology(token));
            rest = &rest.trim_start()[token.len()..];
        }
        let mut markers = markers.into_iter();
        entry.etymology = markers.next();
        entry.cognates = markers.collect();

        let rest = rest.trim();
        if rest.chars().count() < 3 {
            return Err(ConvertError::entry_parse(
                &locator,
                format!("definition text too short for {}", entry.headword),
            ));
        }

        let (lead, mut bodies) = split_senses(rest);
        if let Some(lead) = lead {
            if lead.starts_with('(') {
                entry.note = Some(lead.to_string());
            } else {
                bodies.insert(0, lead);
            }
        }

        // Citations of a sense without text go to the neighbouring sense
        let mut orphaned: Vec<String> = Vec::new();
        for (position, body) in bodies.iter().enumerate() {
            let mut sense = parse_sense(body, vocab);
            merge_citations(&mut sense.citations, std::mem::take(&mut orphaned));
            let citations = sense.citations.clone();
            if entry.push_sense(
                SenseKind::Definition,
                sense.gloss,
                sense.definition,
                sense.citations,
                sense.cross_refs,
            ) {
                continue;
            }
            match entry.senses.last_mut() {
                Some(previous) => merge_citations(&mut previous.citations, citations),
                None => orphaned = citations,
            }
            debug!(
                "{}: sense {} of {} has no text, dropped",
                locator,
                position + 1,
                entry.headword
            );
        }

        entry.validate()?;
        Ok(entry)
    }

    fn describe(&self, block: &String) -> String {
        block.clone()
    }
}

/// Language abbreviation directly after the romanization.
///
/// Citation abbreviations (`TP.`) are sources, not languages, unless the
/// etymology table also lists them.
fn is_origin_marker(token: &str, vocab: &Vocabulary) -> bool {
    if vocab.is_etymology_marker(token) {
        return true;
    }
    vocab.citation(token).is_none()
        && SHORT_MARKER.is_match(token)
        && !GLOSS_WORDS.contains(&token.trim_end_matches('.'))
}

/// A Malayalam word followed by a Latin token that is neither a romanization nor
/// a known abbreviation: an entry start too damaged to parse.
fn is_broken_headword(block: &str, vocab: &Vocabulary) -> bool {
    MALAYALAM_THEN_LATIN.captures(block).is_some_and(|caps| {
        let token = &caps[1];
        !is_origin_marker(token, vocab) && vocab.citation(token).is_none()
    })
}

fn merge_citations(into: &mut Vec<String>, codes: Vec<String>) {
    for code in codes {
        if !into.contains(&code) {
            into.push(code);
        }
    }
}

/// Split at `N. ` sense numbers into the lead text and the sense bodies.
fn split_senses(text: &str) -> (Option<&str>, Vec<&str>) {
    let numbers: Vec<_> = SENSE_NUMBER.find_iter(text).collect();
    if numbers.is_empty() {
        return (None, vec![text]);
    }

    let lead = text[..numbers[0].start()].trim();
    let bodies = numbers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = numbers.get(i + 1).map_or(text.len(), |next| next.start());
            text[m.end()..end].trim()
        })
        .collect();
    ((!lead.is_empty()).then_some(lead), bodies)
}

#[derive(Debug, Default, PartialEq)]
struct ParsedSense {
    gloss: Option<String>,
    definition: Option<String>,
    citations: Vec<String>,
    cross_refs: Vec<CrossRef>,
}

fn parse_sense(body: &str, vocab: &Vocabulary) -> ParsedSense {
    let cross_refs = cross_references(body);
    let citations = citations(body, vocab);
    let text = strip_trailing_citations(body, vocab);

    let mut malayalam = Vec::new();
    let mut english = Vec::new();
    for sentence in split_sentences(text) {
        if contains_malayalam(sentence) {
            malayalam.push(sentence);
        } else if sentence.chars().count() > 2 {
            english.push(sentence);
        }
    }

    ParsedSense {
        gloss: (!english.is_empty()).then(|| english.join(" ")),
        definition: (!malayalam.is_empty()).then(|| malayalam.join(" ")),
        citations,
        cross_refs,
    }
}

fn cross_references(text: &str) -> Vec<CrossRef> {
    let mut refs = Vec::new();
    for (pattern, relation) in [
        (&*SYNONYM_REF, "synonym"),
        (&*SEE_REF, "see_also"),
        (&*OPPOSITE_REF, "antonym"),
    ] {
        for caps in pattern.captures_iter(text) {
            refs.push(CrossRef::new(relation, &caps[1]));
        }
    }
    refs
}

fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.map_or(true, |c| !c.is_alphanumeric()) && after.map_or(true, |c| !c.is_alphanumeric())
}

/// Citation codes in order of first appearance, each once.
fn citations(text: &str, vocab: &Vocabulary) -> Vec<String> {
    let mut found: Vec<(usize, usize, &str)> = Vec::new();
    for marker in vocab.citation_markers() {
        let Some(code) = vocab.citation(marker) else {
            continue;
        };
        for (start, _) in text.match_indices(marker.as_str()) {
            let end = start + marker.len();
            let overlaps = found.iter().any(|(s, e, _)| start < *e && *s < end);
            if !overlaps && is_bounded(text, start, end) {
                found.push((start, end, code));
            }
        }
    }
    found.sort_by_key(|(start, _, _)| *start);

    let mut codes: Vec<String> = Vec::new();
    for (_, _, code) in found {
        if !codes.iter().any(|c| c == code) {
            codes.push(code.to_string());
        }
    }
    codes
}

/// Drop the run of citation abbreviations closing a sense.
fn strip_trailing_citations<'a>(text: &'a str, vocab: &Vocabulary) -> &'a str {
    let mut rest = text.trim_end();
    let mut stripped = false;
    loop {
        let trimmed = rest.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == ';');
        let stem = vocab.citation_markers().iter().find_map(|marker| {
            let stem = trimmed.strip_suffix(marker.as_str())?;
            stem.chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric())
                .then_some(stem)
        });
        match stem {
            Some(stem) => {
                rest = stem;
                stripped = true;
            }
            None if stripped => return trimmed,
            None => return rest,
        }
    }
}
