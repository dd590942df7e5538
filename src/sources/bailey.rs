//! Bailey, *A Dictionary, English and Malayalim* (1849), OCR plain text.
//!
//! One entry per line, `Headword, pos. മലയാളം, മലയാളം.`, occasionally wrapped onto
//! following lines that start with Malayalam. OCR damage around the headword comma
//! and the part-of-speech period is repaired line by line before segmenting.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use super::{DictionarySource, Document, SourceProfile, BAILEY};
use crate::error::{ConvertError, Result};
use crate::model::{Entry, SenseKind};
use crate::segment::{Boundary, Located, RawEntry};
use crate::text::{join_lines, starts_with_malayalam};
use crate::vocab::Vocabulary;

lazy_static! {
    // The period closing the part of speech, right before the Malayalam
    static ref POS_END: Regex = Regex::new(r"\.\s+[\x{0D00}-\x{0D7F}]").unwrap();

    static ref PERIOD_AFTER_HEADWORD: Regex =
        Regex::new(r"^([A-Za-z][A-Za-z\s\-']+)\.(\s+[a-z. &]+\.)(\s+[\x{0D00}-\x{0D7F}])").unwrap();
    static ref SEMICOLON_AFTER_HEADWORD: Regex =
        Regex::new(r"^([A-Za-z][A-Za-z\s\-']+);(\s+[a-z. &]+\.)(\s+[\x{0D00}-\x{0D7F}])").unwrap();
    static ref POS_WITHOUT_PERIOD: Regex =
        Regex::new(r"^(\s*)([a-z. &]{1,15})(\s+)([\x{0D00}-\x{0D7F}])").unwrap();
    static ref COMMA_AFTER_POS: Regex =
        Regex::new(r"^(\s*)([a-z. &]+),(\s+[\x{0D00}-\x{0D7F}])").unwrap();

    static ref POS_SPACING: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"\bv\.a\b").unwrap(), "v. a"),
        (Regex::new(r"\bv\.n\b").unwrap(), "v. n"),
        (Regex::new(r"\bv\s+\.\s+a\b").unwrap(), "v. a"),
        (Regex::new(r"\bv\s+\.\s+n\b").unwrap(), "v. n"),
        (Regex::new(r"\b([a-z]+)\s+\.(\s+[\x{0D00}-\x{0D7F}])").unwrap(), "${1}.${2}"),
        (Regex::new(r"\bv\.a\.").unwrap(), "v. a"),
        (Regex::new(r"\bv\.n\.").unwrap(), "v. n"),
    ];

    static ref POS_VARIANTS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\bv\s*\.\s*a\b").unwrap(), "v. a"),
        (Regex::new(r"(?i)\bv\s*\.\s*n\b").unwrap(), "v. n"),
        (Regex::new(r"(?i)\bv\s*\.\s*a\s*\.\s*&\s*n\b").unwrap(), "v. a. & n"),
        (Regex::new(r"(?i)\bv\s*\.\s*n\s*\.\s*&\s*a\b").unwrap(), "v. n. & a"),
        (Regex::new(r"(?i)\bs\s*\.\s*pl\b").unwrap(), "s. plural"),
        (Regex::new(r"(?i)\bs\s*\.\s*plu\b").unwrap(), "s. plural"),
        (Regex::new(r"(?i)\bpron\s*\.\s*poss\b").unwrap(), "pron. possessive"),
        (Regex::new(r"(?i)\bprep\s*\.\s*&\s*ad\b").unwrap(), "prep. & ad"),
        (Regex::new(r"(?i)\bad\s*\.\s*&\s*prep\b").unwrap(), "ad. & prep"),
    ];
}

#[derive(Debug, Clone)]
pub struct BaileySource {
    pub repair: bool,
}

impl Default for BaileySource {
    fn default() -> Self {
        Self { repair: true }
    }
}

/// Counts of OCR repairs applied while reading.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepairStats {
    pub lines: usize,
    pub blank: usize,
    pub section_headers: usize,
    pub unchanged: usize,
    pub period_to_comma: usize,
    pub semicolon_to_comma: usize,
    pub missing_pos_period: usize,
    pub comma_to_period: usize,
    pub spacing: usize,
    pub pos_variants: usize,
}

impl RepairStats {
    pub fn modified(&self) -> usize {
        self.lines - self.unchanged - self.blank - self.section_headers
    }

    fn log(&self) {
        info!(
            "repaired {} of {} lines: period→comma {}, semicolon→comma {}, missing POS period {}, comma→period {}, spacing {}, POS variants {}",
            self.modified(),
            self.lines,
            self.period_to_comma,
            self.semicolon_to_comma,
            self.missing_pos_period,
            self.comma_to_period,
            self.spacing,
            self.pos_variants
        );
    }
}

/// All-caps letter headings (`ABD`, `B`); Malayalam has no case and never counts.
fn is_section_header(line: &str) -> bool {
    let mut cased = false;
    for c in line.chars() {
        if c.is_lowercase() {
            return false;
        }
        cased |= c.is_uppercase();
    }
    cased
}

fn replace_all(line: String, rules: &[(Regex, &'static str)]) -> String {
    rules.iter().fold(line, |acc, (pattern, replacement)| {
        pattern.replace_all(&acc, *replacement).into_owned()
    })
}

fn fix_headword_separator(line: &str, pattern: &Regex) -> Option<String> {
    let caps = pattern.captures(line)?;
    let tail = caps.get(3)?.start();
    Some(format!("{},{}{}", &caps[1], &caps[2], &line[tail..]))
}

/// Repair one line of OCR text.
pub fn repair_line(line: &str, stats: &mut RepairStats) -> String {
    stats.lines += 1;
    if line.trim().is_empty() {
        stats.blank += 1;
        return line.to_string();
    }
    if is_section_header(line.trim()) {
        stats.section_headers += 1;
        return line.to_string();
    }

    let mut fixed = line.to_string();

    if let Some(repaired) = fix_headword_separator(&fixed, &PERIOD_AFTER_HEADWORD) {
        fixed = repaired;
        stats.period_to_comma += 1;
    }
    if let Some(repaired) = fix_headword_separator(&fixed, &SEMICOLON_AFTER_HEADWORD) {
        fixed = repaired;
        stats.semicolon_to_comma += 1;
    }

    if let Some(comma) = fixed.find(',') {
        let (head, rest) = fixed.split_at(comma + 1);
        let repaired = POS_WITHOUT_PERIOD.captures(rest).and_then(|caps| {
            let pos = caps[2].trim();
            if pos.ends_with('.') {
                return None;
            }
            let malayalam = caps.get(4)?.start();
            Some(format!("{}{}{}.{}{}", head, &caps[1], pos, &caps[3], &rest[malayalam..]))
        });
        if let Some(repaired) = repaired {
            fixed = repaired;
            stats.missing_pos_period += 1;
        }
    }

    if let Some(comma) = fixed.find(',') {
        let (head, rest) = fixed.split_at(comma + 1);
        let repaired = COMMA_AFTER_POS.captures(rest).and_then(|caps| {
            let tail = caps.get(3)?.start();
            Some(format!("{}{}{}.{}", head, &caps[1], &caps[2], &rest[tail..]))
        });
        if let Some(repaired) = repaired {
            fixed = repaired;
            stats.comma_to_period += 1;
        }
    }

    let spaced = replace_all(fixed.clone(), &POS_SPACING);
    if spaced != fixed {
        stats.spacing += 1;
    }
    let normalized = replace_all(spaced.clone(), &POS_VARIANTS);
    if normalized != spaced {
        stats.pos_variants += 1;
    }

    if normalized == line {
        stats.unchanged += 1;
    }
    normalized
}

struct EntryLine<'a> {
    headword: &'a str,
    pos: &'a str,
    definitions: &'a str,
}

/// `Headword, pos. definitions`, or `None` for anything else.
fn parse_entry_line(line: &str) -> Option<EntryLine<'_>> {
    let line = line.trim();
    if line.is_empty() || is_section_header(line) {
        return None;
    }
    let (headword, rest) = line.split_once(',')?;
    let headword = headword.trim();
    if !headword.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let rest = rest.trim();
    let pos_end = POS_END.find(rest)?.start();
    Some(EntryLine {
        headword,
        pos: rest[..pos_end].trim(),
        definitions: rest[pos_end + 1..].trim(),
    })
}

impl DictionarySource for BaileySource {
    type Unit = String;

    fn profile(&self) -> &'static SourceProfile {
        &BAILEY
    }

    fn read(&self, document: &Document) -> Result<Vec<Located<String>>> {
        let mut stats = RepairStats::default();
        let units = document
            .text
            .lines()
            .enumerate()
            .map(|(i, line)| {
                let line = if self.repair {
                    repair_line(line, &mut stats)
                } else {
                    line.to_string()
                };
                Located::new(None, i + 1, line)
            })
            .collect();
        if self.repair {
            stats.log();
        }
        Ok(units)
    }

    fn classify(&self, line: &String) -> Boundary {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_section_header(trimmed) {
            Boundary::Noise
        } else if parse_entry_line(trimmed).is_some() {
            Boundary::Start
        } else if starts_with_malayalam(trimmed) {
            Boundary::Continuation
        } else {
            Boundary::Stray
        }
    }

    fn extract(&self, raw: &RawEntry<String>, vocab: &Vocabulary) -> Result<Entry> {
        let locator = raw.locator();
        let first = raw
            .parts
            .first()
            .and_then(|line| parse_entry_line(line))
            .ok_or_else(|| ConvertError::entry_parse(&locator, "not a headword line"))?;

        let mut lines = vec![first.definitions];
        lines.extend(raw.parts.iter().skip(1).map(String::as_str));
        let mut definitions = join_lines(&lines);
        if let Some(stripped) = definitions.strip_suffix('.') {
            definitions = stripped.trim_end().to_string();
        }

        let mut entry = Entry::new(first.headword)
            .map_err(|_| ConvertError::entry_parse(&locator, "empty headword"))?;
        if !first.pos.is_empty() {
            entry.grammar = Some(vocab.part_of_speech(BAILEY.id, first.pos));
        }
        if !entry.push_sense(SenseKind::Definition, None, Some(definitions), vec![], vec![]) {
            return Err(ConvertError::entry_parse(
                &locator,
                format!("no definitions for {}", entry.headword),
            ));
        }
        entry.validate()?;
        Ok(entry)
    }

    fn describe(&self, line: &String) -> String {
        line.clone()
    }
}
