//! Compact archives: nested counts and UTF-16 strings
//!

use coalesced_ini::{CoalescedFormat, Document, File, Section};
use std::io::{Read, Write};
use tracing::{debug, instrument, trace};

use crate::cursor::{count_i32, BinaryCursor};
use crate::error::Result;
use crate::Codec;

/// Codec for compact archives
///
/// ```
/// # fn doit() -> coalesced_bin::error::Result<()> {
/// use coalesced_bin::{compact::CompactCodec, Codec};
/// use coalesced_ini::{CoalescedFormat, Document};
///
/// let mut doc = Document::new(CoalescedFormat::Compact);
/// doc.file_mut("engine.ini").section_mut("Core").push_value("Paths", "..");
///
/// let mut bytes = Vec::new();
/// CompactCodec.encode(&doc, &mut bytes)?;
/// assert_eq!(CompactCodec.decode(bytes.as_slice())?, doc);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Default, Copy, Clone)]
pub struct CompactCodec;

impl Codec for CompactCodec {
    const FORMAT: CoalescedFormat = CoalescedFormat::Compact;

    #[instrument(skip_all, err)]
    fn decode<R: Read>(&self, reader: R) -> Result<Document> {
        let mut bin = BinaryCursor::new(reader, Self::FORMAT);
        let mut document = Document::new(Self::FORMAT);

        let file_count = bin.read_count("file")?;
        debug!(file_count, "reading files");

        for _ in 0..file_count {
            let mut file = File::new(bin.read_string()?);
            let section_count = bin.read_count("section")?;
            trace!(file = %file.name, section_count, offset = bin.position());

            for _ in 0..section_count {
                let mut section = Section::new(bin.read_string()?);
                let value_count = bin.read_count("value")?;

                for _ in 0..value_count {
                    let name = bin.read_string()?;
                    let value = bin.read_string()?;
                    section.push_value(&name, value);
                }
                file.sections.push(section);
            }

            document.files.push(file);
        }

        debug!(bytes = bin.position(), "read compact archive");
        Ok(document)
    }

    #[instrument(skip_all, err, fields(files = document.len()))]
    fn encode<W: Write>(&self, document: &Document, mut writer: W) -> Result<()> {
        let mut bin = BinaryCursor::new(Vec::new(), Self::FORMAT);

        bin.write_i32(count_i32(document.len(), "file")?)?;
        for file in &document.files {
            bin.write_string(&file.name)?;
            bin.write_i32(count_i32(file.sections.len(), "section")?)?;

            for section in &file.sections {
                bin.write_string(&section.name)?;
                bin.write_i32(count_i32(section.value_count(), "value")?)?;

                for field in &section.fields {
                    for value in &field.values {
                        bin.write_string(&field.name)?;
                        bin.write_string(value)?;
                    }
                }
            }
        }

        debug!(bytes = bin.position(), "wrote compact archive");
        writer.write_all(&bin.into_inner())?;
        writer.flush()?;
        Ok(())
    }
}
