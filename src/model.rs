//! Typed dictionary records shared by every source.

use serde::Serialize;

use crate::error::{ConvertError, Result};

/// A raw abbreviation together with its canonical tag, if the vocabulary knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabTag {
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
}

impl VocabTag {
    pub fn mapped(raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            canonical: Some(canonical.into()),
        }
    }

    pub fn unmapped(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            canonical: None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.canonical.is_some()
    }

    /// Canonical tag, or the raw marker when the vocabulary has no entry for it.
    pub fn tag(&self) -> &str {
        self.canonical.as_deref().unwrap_or(&self.raw)
    }
}

/// Relation between a sense and another headword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossRef {
    #[serde(rename = "type")]
    pub relation: String,
    pub word: String,
}

impl CrossRef {
    pub fn new(relation: impl Into<String>, word: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            word: word.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SenseKind {
    #[default]
    Definition,
    Explanation,
    /// Usage example; carries the source's example type (`exm`, `poem`, `prv`, ...).
    Example(String),
    CrossReference,
}

impl SenseKind {
    /// Marker-line spelling, `None` for plain definitions.
    pub fn code(&self) -> Option<String> {
        match self {
            Self::Definition => None,
            Self::Explanation => Some("explanation".to_string()),
            Self::Example(kind) => Some(format!("example:{}", kind)),
            Self::CrossReference => Some("cross-reference".to_string()),
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "definition" => Some(Self::Definition),
            "explanation" => Some(Self::Explanation),
            "cross-reference" => Some(Self::CrossReference),
            _ => code
                .strip_prefix("example:")
                .map(|kind| Self::Example(kind.to_string())),
        }
    }
}

/// One numbered meaning within an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sense {
    pub index: usize,
    pub kind: SenseKind,
    pub gloss: Option<String>,
    pub definition: Option<String>,
    pub citations: Vec<String>,
    pub cross_refs: Vec<CrossRef>,
}

impl Sense {
    pub fn has_text(&self) -> bool {
        self.gloss.as_deref().is_some_and(|g| !g.trim().is_empty())
            || self.definition.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

/// One headword occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub headword: String,
    pub romanization: Option<String>,
    pub etymology: Option<VocabTag>,
    /// Further language markers after the first one (`T. M. C.` → tamil, then M., C.).
    pub cognates: Vec<VocabTag>,
    pub grammar: Option<VocabTag>,
    pub page: Option<String>,
    /// Lead text before the first numbered sense.
    pub note: Option<String>,
    pub senses: Vec<Sense>,
}

impl Entry {
    pub fn new(headword: &str) -> Result<Self> {
        let headword = headword.trim();
        if headword.is_empty() {
            return Err(ConvertError::entry_parse("?", "empty headword"));
        }
        Ok(Self {
            headword: headword.to_string(),
            romanization: None,
            etymology: None,
            cognates: Vec::new(),
            grammar: None,
            page: None,
            note: None,
            senses: Vec::new(),
        })
    }

    /// Append a sense, numbering it after the existing ones.
    ///
    /// Returns `false` (and leaves the entry untouched) when both texts are empty.
    pub fn push_sense(
        &mut self,
        kind: SenseKind,
        gloss: Option<String>,
        definition: Option<String>,
        citations: Vec<String>,
        cross_refs: Vec<CrossRef>,
    ) -> bool {
        let sense = Sense {
            index: self.senses.len() + 1,
            kind,
            gloss: gloss.filter(|g| !g.trim().is_empty()),
            definition: definition.filter(|d| !d.trim().is_empty()),
            citations,
            cross_refs,
        };
        if !sense.has_text() {
            return false;
        }
        self.senses.push(sense);
        true
    }

    /// Check the record invariants.
    pub fn validate(&self) -> Result<()> {
        let locator = self.page.as_deref().map_or_else(
            || self.headword.clone(),
            |page| format!("page {} ({})", page, self.headword),
        );
        if self.headword.trim().is_empty() {
            return Err(ConvertError::entry_parse(locator, "empty headword"));
        }
        if self.senses.is_empty() {
            return Err(ConvertError::entry_parse(locator, "no definition text"));
        }
        for (position, sense) in self.senses.iter().enumerate() {
            if sense.index != position + 1 {
                return Err(ConvertError::entry_parse(
                    locator,
                    format!("sense {} out of order", sense.index),
                ));
            }
            if !sense.has_text() {
                return Err(ConvertError::entry_parse(
                    locator,
                    format!("sense {} has neither gloss nor definition", sense.index),
                ));
            }
        }
        Ok(())
    }

    /// First character of the headword, used as the dictpress initial.
    pub fn initial(&self) -> String {
        self.headword
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    /// Every tag the vocabulary could not map.
    pub fn unmapped_tags(&self) -> impl Iterator<Item = &VocabTag> {
        self.etymology
            .iter()
            .chain(self.cognates.iter())
            .chain(self.grammar.iter())
            .filter(|tag| !tag.is_mapped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_headword_rejected() {
        assert!(Entry::new("   ").is_err());
    }

    #[test]
    fn senses_are_numbered_in_push_order() {
        let mut entry = Entry::new("അക്ഷം").unwrap();
        assert!(entry.push_sense(SenseKind::Definition, Some("Eye.".into()), None, vec![], vec![]));
        assert!(entry.push_sense(SenseKind::Definition, None, Some("അച്ചുതണ്ടു".into()), vec![], vec![]));
        let indexes: Vec<usize> = entry.senses.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![1, 2]);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn empty_sense_is_not_added() {
        let mut entry = Entry::new("x").unwrap();
        assert!(!entry.push_sense(SenseKind::Definition, Some("  ".into()), None, vec![], vec![]));
        assert!(entry.senses.is_empty());
        assert!(entry.validate().is_err());
    }

    #[test]
    fn unmapped_tag_renders_raw_marker() {
        let tag = VocabTag::unmapped("Xy.");
        assert_eq!(tag.tag(), "Xy.");
        assert!(!tag.is_mapped());
        assert_eq!(VocabTag::mapped("S.", "sanskrit").tag(), "sanskrit");
    }

    #[test]
    fn sense_kind_codes() {
        for kind in [
            SenseKind::Explanation,
            SenseKind::Example("poem".into()),
            SenseKind::CrossReference,
        ] {
            let code = kind.code().unwrap();
            assert_eq!(SenseKind::from_code(&code), Some(kind));
        }
        assert_eq!(SenseKind::Definition.code(), None);
    }

    #[test]
    fn initial_is_uppercased_first_char() {
        assert_eq!(Entry::new("abandon").unwrap().initial(), "A");
        assert_eq!(Entry::new("ആപ്പ").unwrap().initial(), "ആ");
    }
}
