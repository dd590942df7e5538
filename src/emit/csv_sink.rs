//! dictpress import CSV: RFC 4180 quoting, `\n` row terminator, optional header.

use std::io::Write;

use super::{entry_records, Record, RecordSink, COLUMNS};
use crate::error::{ConvertError, Result};
use crate::model::Entry;
use crate::sources::SourceProfile;
use crate::vocab::Vocabulary;

/// Writes dictpress import rows.
pub struct CsvSink<'a, W: Write> {
    writer: csv::Writer<W>,
    profile: &'a SourceProfile,
    vocab: &'a Vocabulary,
}

impl<'a, W: Write> CsvSink<'a, W> {
    pub fn new(out: W, profile: &'a SourceProfile, vocab: &'a Vocabulary, header: bool) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(out);
        if header {
            writer.write_record(COLUMNS)?;
        }
        Ok(Self {
            writer,
            profile,
            vocab,
        })
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| ConvertError::Io(e.into_error()))
    }
}

impl<W: Write> RecordSink for CsvSink<'_, W> {
    fn write_entry(&mut self, entry: &Entry) -> Result<usize> {
        let records = entry_records(entry, self.profile, self.vocab)?;
        for record in &records {
            self.writer.serialize(record)?;
        }
        Ok(records.len() - 1)
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Parse rows written by [`CsvSink`] without a header.
pub fn read_records(data: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(data);
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SenseKind;
    use crate::sources::GUNDERT;

    #[test]
    fn quoting_round_trips() {
        let vocab = Vocabulary::builtin().unwrap();
        let mut entry = Entry::new("അക്ഷം").unwrap();
        entry.page = Some("30".into());
        entry.push_sense(
            SenseKind::Definition,
            Some(r#"Eye, "the" axle; a|b"#.into()),
            Some("അച്ചു,\nതണ്ടു".into()),
            vec!["TP".into()],
            vec![],
        );

        let mut sink = CsvSink::new(Vec::new(), &GUNDERT, &vocab, false).unwrap();
        assert_eq!(sink.write_entry(&entry).unwrap(), 1);
        sink.finish().unwrap();
        let bytes = sink.into_inner().unwrap();

        let parsed = read_records(&bytes).unwrap();
        let expected = entry_records(&entry, &GUNDERT, &vocab).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn header_row_is_optional() {
        let vocab = Vocabulary::builtin().unwrap();
        let sink = CsvSink::new(Vec::new(), &GUNDERT, &vocab, true).unwrap();
        let bytes = sink.into_inner().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "type,initial_letter,content,language,notes,tsvector_language,tsvector_tokens,tags,phonetic,definition_type,meta_json\n"
        );
    }
}
