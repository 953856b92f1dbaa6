//! Legacy archives: file names paired with raw INI bodies in 8-bit strings
//!

use coalesced_ini::read::{IniEntry, IniReader, IniReaderOptions};
use coalesced_ini::write::{IniWriter, IniWriterOptions, LineEnding};
use coalesced_ini::{CoalescedFormat, Document, File, Section};
use std::io::{BufReader, Read, Write};
use tracing::{debug, instrument, trace};

use crate::cursor::{count_i32, encode_legacy, BinaryCursor};
use crate::error::{Error, Result};
use crate::Codec;

/// Codec for legacy archives
///
/// The stream starts with a word that is ignored on read, and written as the number of
/// strings that follow. Each file is then stored as its name followed by its whole INI body.
#[derive(Debug, Default, Copy, Clone)]
pub struct LegacyCodec;

impl Codec for LegacyCodec {
    const FORMAT: CoalescedFormat = CoalescedFormat::Legacy;

    #[instrument(skip_all, err)]
    fn decode<R: Read>(&self, reader: R) -> Result<Document> {
        let mut bin = BinaryCursor::new(BufReader::new(reader), Self::FORMAT);
        let mut document = Document::new(Self::FORMAT);

        let header = bin.read_i32()?;
        debug!(header, "reading files");

        while !bin.at_end()? {
            let name = bin.read_string()?;
            let body = bin.read_string()?;
            trace!(file = %name, bytes = body.len(), offset = bin.position());

            document.files.push(parse_body(name, &body)?);
        }

        debug!(files = document.len(), bytes = bin.position(), "read legacy archive");
        Ok(document)
    }

    #[instrument(skip_all, err, fields(files = document.len()))]
    fn encode<W: Write>(&self, document: &Document, mut writer: W) -> Result<()> {
        let mut bin = BinaryCursor::new(Vec::new(), Self::FORMAT);

        let strings = document.len().saturating_mul(2);
        bin.write_i32(count_i32(strings, "string")?)?;

        for file in &document.files {
            bin.write_string(&file.name)?;

            // bodies keep their terminator even when empty
            let body = encode_legacy(&write_body(file)?)?;
            bin.write_i32(count_i32(body.len() + 1, "byte")?)?;
            bin.write_bytes(&body)?;
            bin.write_u8(0)?;
        }

        debug!(bytes = bin.position(), "wrote legacy archive");
        writer.write_all(&bin.into_inner())?;
        writer.flush()?;
        Ok(())
    }
}

/// Read the sections of one file from its stored INI body
fn parse_body(name: String, body: &str) -> Result<File> {
    let options = IniReaderOptions::builder()
        .embedded_file_names(false)
        .unescape(false)
        .build();
    let mut ini = IniReader::new(body.as_bytes(), options);
    let mut file = File::new(name);

    while let Some(entry) = ini.read_entry()? {
        match entry {
            IniEntry::Section { name, .. } => file.sections.push(Section::new(name)),
            IniEntry::Field { name, value } => {
                let section = file.sections.last_mut().ok_or(Error::IniError(
                    coalesced_ini::error::Error::NoCurrentSection {
                        line: ini.line_number(),
                    },
                ))?;
                section.push_value(&name, value);
            }
        }
    }

    Ok(file)
}

/// Write the sections of one file as a plain INI body
fn write_body(file: &File) -> Result<String> {
    let options = IniWriterOptions::builder()
        .line_ending(LineEnding::Lf)
        .blank_line_between_sections(false)
        .escape(false)
        .build();
    let mut ini = IniWriter::new(Vec::new(), options)?;

    for section in &file.sections {
        ini.write_section(None, &section.name)?;
        for field in &section.fields {
            for value in &field.values {
                ini.write_field(&field.name, value)?;
            }
        }
    }

    Ok(String::from_utf8(ini.finish()?)?)
}

#[cfg(test)]
mod test {
    use coalesced_ini::{CoalescedFormat, Document};
    use pretty_assertions::{assert_eq, assert_str_eq};
    use tracing_test::traced_test;

    use crate::error::{Error, ErrorKind, Result};
    use crate::legacy::LegacyCodec;
    use crate::Codec;

    #[rustfmt::skip]
    fn archive_bytes() -> Vec<u8> {
        let mut bytes = vec![
            // two strings follow
            0x02, 0x00, 0x00, 0x00,
            // "a.ini"
            0x06, 0x00, 0x00, 0x00,
            0x61, 0x2E, 0x69, 0x6E, 0x69, 0x00,
            // body
            0x17, 0x00, 0x00, 0x00,
        ];
        bytes.extend_from_slice(b"[Core]\nk=1\nk=\xE9\n[Next]\n\0");
        bytes
    }

    fn document() -> Document {
        let mut doc = Document::new(CoalescedFormat::Legacy);
        let section = doc.file_mut("a.ini").section_mut("Core");
        section.push_value("k", "1");
        section.push_value("k", "\u{e9}");
        doc.file_mut("a.ini").section_mut("Next");
        doc
    }

    #[traced_test]
    #[test]
    fn decode_archive() -> Result<()> {
        let doc = LegacyCodec.decode(archive_bytes().as_slice())?;
        assert_eq!(doc, document());

        Ok(())
    }

    #[traced_test]
    #[test]
    fn encode_archive() -> Result<()> {
        let mut bytes = Vec::new();
        LegacyCodec.encode(&document(), &mut bytes)?;

        assert_str_eq!(
            format!("{:02X?}", bytes),
            format!("{:02X?}", archive_bytes())
        );

        Ok(())
    }

    #[test]
    fn header_word_is_ignored() -> Result<()> {
        let mut bytes = archive_bytes();
        bytes[0] = 0x7F;
        assert_eq!(LegacyCodec.decode(bytes.as_slice())?, document());

        Ok(())
    }

    #[test]
    fn file_without_sections() -> Result<()> {
        let mut doc = Document::new(CoalescedFormat::Legacy);
        doc.file_mut("empty.ini");

        let mut bytes = Vec::new();
        LegacyCodec.encode(&doc, &mut bytes)?;
        assert_eq!(&bytes[bytes.len() - 5..], [0x01, 0x00, 0x00, 0x00, 0x00]);

        assert_eq!(LegacyCodec.decode(bytes.as_slice())?, doc);

        Ok(())
    }

    #[test]
    fn field_before_section() {
        #[rustfmt::skip]
        let mut bytes = vec![
            0x02, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00, 0x61, 0x00,
            0x05, 0x00, 0x00, 0x00,
        ];
        bytes.extend_from_slice(b"k=v\n\0");

        let err = LegacyCodec.decode(bytes.as_slice()).err();
        assert!(matches!(err, Some(Error::IniError(_))));
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Structural));
    }

    #[test]
    fn missing_body() {
        let bytes = [0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x61, 0x00];
        let err = LegacyCodec.decode(bytes.as_slice()).err();
        assert!(matches!(err, Some(Error::UnexpectedEof { offset: 10 })));
    }
}
