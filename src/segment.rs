//! Entry boundary detection.
//!
//! Every source reader produces a flat stream of located units (XML blocks, text
//! lines, `<ar>` elements, marker lines). The segmenter groups them into raw entries
//! with a three-state machine:
//!
//! ```text
//!                 Start                Sense
//! BeforeFirstEntry ────▶ InEntry ◀──────▶ InSense
//!        ▲  │ other       │  ▲ Start/        │ Start closes the entry
//!        └──┘ discarded   └──┘ Continuation  └───────────────▶ InEntry
//! ```
//!
//! Anything before the first `Start` is front matter and is dropped; `Noise` is
//! ignored in every state.

/// How a unit relates to entry boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Opens a new entry.
    Start,
    /// Opens a new numbered sense inside the current entry.
    Sense,
    /// Belongs to the current entry.
    Continuation,
    /// Running header, blank line, bare page number.
    Noise,
    /// Looks like content but cannot belong anywhere; reported and dropped.
    Stray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    BeforeFirstEntry,
    InEntry,
    InSense,
}

/// A unit together with where it was found.
#[derive(Debug, Clone)]
pub struct Located<T> {
    pub page: Option<String>,
    pub line: usize,
    pub value: T,
}

impl<T> Located<T> {
    pub fn new(page: Option<String>, line: usize, value: T) -> Self {
        Self { page, line, value }
    }
}

/// The units of one entry, located at its first unit.
#[derive(Debug, Clone)]
pub struct RawEntry<T> {
    pub page: Option<String>,
    pub line: usize,
    pub parts: Vec<T>,
}

impl<T> RawEntry<T> {
    /// Human readable position for warnings.
    pub fn locator(&self) -> String {
        locator(self.page.as_deref(), self.line)
    }
}

pub fn locator(page: Option<&str>, line: usize) -> String {
    match page {
        Some(page) => format!("page {}, unit {}", page, line),
        None => format!("line {}", line),
    }
}

/// Lazily groups located units into raw entries.
pub struct Segmenter<I, T, F>
where
    I: Iterator<Item = Located<T>>,
    F: FnMut(&T) -> Boundary,
{
    units: I,
    classify: F,
    state: State,
    current: Option<RawEntry<T>>,
    discarded: usize,
    strays: Vec<Located<T>>,
}

impl<I, T, F> Segmenter<I, T, F>
where
    I: Iterator<Item = Located<T>>,
    F: FnMut(&T) -> Boundary,
{
    pub fn new(units: I, classify: F) -> Self {
        Self {
            units,
            classify,
            state: State::BeforeFirstEntry,
            current: None,
            discarded: 0,
            strays: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Units dropped before the first entry started.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Take the stray units collected so far.
    pub fn take_strays(&mut self) -> Vec<Located<T>> {
        std::mem::take(&mut self.strays)
    }
}

impl<I, T, F> Iterator for Segmenter<I, T, F>
where
    I: Iterator<Item = Located<T>>,
    F: FnMut(&T) -> Boundary,
{
    type Item = RawEntry<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(unit) = self.units.next() {
            let boundary = (self.classify)(&unit.value);
            match (self.state, boundary) {
                (_, Boundary::Noise) => {}
                (_, Boundary::Start) => {
                    let opened = RawEntry {
                        page: unit.page,
                        line: unit.line,
                        parts: vec![unit.value],
                    };
                    self.state = State::InEntry;
                    if let Some(finished) = self.current.replace(opened) {
                        return Some(finished);
                    }
                }
                (State::BeforeFirstEntry, _) => self.discarded += 1,
                (_, Boundary::Stray) => self.strays.push(unit),
                (_, Boundary::Sense) => {
                    self.state = State::InSense;
                    if let Some(current) = self.current.as_mut() {
                        current.parts.push(unit.value);
                    }
                }
                (_, Boundary::Continuation) => {
                    if let Some(current) = self.current.as_mut() {
                        current.parts.push(unit.value);
                    }
                }
            }
        }
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(s: &&str) -> Boundary {
        if s.is_empty() {
            Boundary::Noise
        } else if let Some(rest) = s.strip_prefix('#') {
            if rest.starts_with('#') {
                Boundary::Stray
            } else {
                Boundary::Start
            }
        } else if s.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            Boundary::Sense
        } else {
            Boundary::Continuation
        }
    }

    fn units(items: &[(&'static str, &str)]) -> Vec<Located<&'static str>> {
        items
            .iter()
            .enumerate()
            .map(|(i, (value, page))| Located::new(Some(page.to_string()), i + 1, *value))
            .collect()
    }

    #[test]
    fn front_matter_is_discarded() {
        let input = units(&[("title page", "1"), ("preface", "1"), ("#a", "2"), ("body", "2")]);
        let mut seg = Segmenter::new(input.into_iter(), classify);
        let entries: Vec<_> = seg.by_ref().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].parts, vec!["#a", "body"]);
        assert_eq!(seg.discarded(), 2);
    }

    #[test]
    fn entry_spanning_pages_keeps_first_page() {
        let input = units(&[("#a", "7"), ("1 one", "7"), ("2 two", "8"), ("more", "8"), ("#b", "8")]);
        let entries: Vec<_> = Segmenter::new(input.into_iter(), classify).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].page.as_deref(), Some("7"));
        assert_eq!(entries[0].parts, vec!["#a", "1 one", "2 two", "more"]);
        assert_eq!(entries[1].page.as_deref(), Some("8"));
    }

    #[test]
    fn states_follow_units() {
        let input = units(&[("#a", "1"), ("1 x", "1"), ("#b", "1")]);
        let mut seg = Segmenter::new(input.into_iter(), classify);
        assert_eq!(seg.state(), State::BeforeFirstEntry);
        let first = seg.next().unwrap();
        assert_eq!(first.parts, vec!["#a", "1 x"]);
        // "#b" was consumed to close the first entry
        assert_eq!(seg.state(), State::InEntry);
        assert!(seg.next().is_some());
        assert!(seg.next().is_none());
    }

    #[test]
    fn noise_and_strays_never_join_entries() {
        let input = units(&[("#a", "1"), ("", "1"), ("##junk", "1"), ("tail", "1")]);
        let mut seg = Segmenter::new(input.into_iter(), classify);
        let entries: Vec<_> = seg.by_ref().collect();
        assert_eq!(entries[0].parts, vec!["#a", "tail"]);
        let strays = seg.take_strays();
        assert_eq!(strays.len(), 1);
        assert_eq!(strays[0].line, 3);
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let mut seg = Segmenter::new(Vec::<Located<&str>>::new().into_iter(), classify);
        assert!(seg.next().is_none());
    }
}
