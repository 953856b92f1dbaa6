//! This library reads and writes the binary **Coalesced** archives that bundle the INI
//! configuration files of a game into a single file.
//!
//! # Coalesced Binary Format Documentation
//!
//! Three unrelated layouts exist. All of them decode into the same [`Document`], and all
//! multi-byte integers are stored little endian.
//!
//! ## Compact
//!
//! Nested counts followed by their entries. Strings are UTF-16.
//!
//! | Field          | Description                                                          |
//! |----------------|----------------------------------------------------------------------|
//! | File count     | 4 bytes: number of files                                             |
//! | File name      | String                                                               |
//! | Section count  | 4 bytes: number of sections in the file                              |
//! | Section name   | String                                                               |
//! | Value count    | 4 bytes: number of (name, value) pairs in the section                |
//! | Field name     | String, repeated for every value of the field                        |
//! | Value          | String                                                               |
//!
//! A string is a signed 4 byte prefix `-(units + 1)`, the UTF-16 code units and a NUL unit.
//! The empty string is a prefix of 0 and nothing else.
//!
//! ## Legacy
//!
//! | Field          | Description                                                          |
//! |----------------|----------------------------------------------------------------------|
//! | Header         | 4 bytes: number of strings that follow, ignored when reading         |
//! | File name      | String                                                               |
//! | File body      | String: the whole file as INI text, `[Section]` and `name=value`     |
//!
//! File names and bodies repeat until the end of the stream. A string is a 4 byte prefix
//! `bytes + 1`, Latin-1 bytes and a NUL byte.
//!
//! ## Compressed
//!
//! | Offset (bytes) | Field                  | Description                                    |
//! |----------------|------------------------|------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: "mrmf"                                |
//! | 0x0004         | Version                | 4 bytes: always 1                              |
//! | 0x0008         | Max name length        | 4 bytes: longest field name                    |
//! | 0x000C         | Max value length       | 4 bytes: longest value                         |
//! | 0x0010         | String table size      | 4 bytes                                        |
//! | 0x0014         | Huffman nodes size     | 4 bytes                                        |
//! | 0x0018         | Tree size              | 4 bytes                                        |
//! | 0x001C         | Compressed data size   | 4 bytes                                        |
//!
//! ### String Table
//!
//! Every file, section and field name, lower cased and sorted by the CRC-32 of the name. The
//! table starts with its own size and the number of strings, followed by a `(crc, offset)`
//! pair per string and then the strings themselves: a 2 byte length and UTF-8 bytes. Offsets
//! are counted from the first pair.
//!
//! ### Huffman Nodes
//!
//! A 2 byte count of internal nodes, then two signed 4 byte slots per node. A slot `>= 0`
//! is the index of another node and a slot `< 0` holds the symbol `-1 - slot`. The last node
//! is the root, and the symbol 0 ends a string.
//!
//! ### Tree
//!
//! A 2 byte count of files, then a `(string id, offset)` pair per file, followed by the
//! sections of each file in the same shape, the fields of each section, and finally the values
//! of each field: a 2 byte count and one 4 byte word per value. A value word holds the type
//! `4` in its high four bits and the bit offset of the value in the compressed data below.
//!
//! ### Compressed Data
//!
//! A 4 byte word holding the length of the data, then every distinct value huffman coded,
//! packed least significant bit first.
//!

use coalesced_ini::{CoalescedFormat, Document};
use std::io::{Read, Write};

pub mod compact;
pub mod compressed;
pub mod crc;
pub mod cursor;
pub mod detect;
pub mod error;
pub mod huffman;
pub mod legacy;
pub mod string_table;
pub mod types;

pub use compact::CompactCodec;
pub use compressed::CompressedCodec;
pub use cursor::BinaryCursor;
pub use detect::{detect, Detection, Direction};
pub use legacy::LegacyCodec;
pub use string_table::StringTable;

use crate::error::Result;

/// Conversion between one binary layout and a [`Document`]
pub trait Codec {
    /// Layout handled by this codec
    const FORMAT: CoalescedFormat;

    /// Read a whole archive.
    fn decode<R: Read>(&self, reader: R) -> Result<Document>;

    /// Write `document` as an archive.
    ///
    /// The archive is assembled in memory, so nothing reaches `writer` if encoding fails.
    fn encode<W: Write>(&self, document: &Document, writer: W) -> Result<()>;
}

/// Read an archive stored in `format`
///
/// A file stored without sections decodes to a [`coalesced_ini::File`] with no sections,
/// rather than one holding an empty placeholder section, so it encodes back to the same bytes.
///
/// ```
/// # fn doit() -> coalesced_bin::error::Result<()> {
/// use coalesced_ini::{CoalescedFormat, Document};
///
/// let mut doc = Document::new(CoalescedFormat::Legacy);
/// doc.file_mut("engine.ini").section_mut("Core").push_value("Paths", "..");
///
/// let mut bytes = Vec::new();
/// coalesced_bin::encode(&doc, &mut bytes)?;
/// assert_eq!(coalesced_bin::decode(CoalescedFormat::Legacy, bytes.as_slice())?, doc);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub fn decode<R: Read>(format: CoalescedFormat, reader: R) -> Result<Document> {
    match format {
        CoalescedFormat::Compact => CompactCodec.decode(reader),
        CoalescedFormat::Legacy => LegacyCodec.decode(reader),
        CoalescedFormat::Compressed => CompressedCodec.decode(reader),
    }
}

/// Write `document` in its own format
pub fn encode<W: Write>(document: &Document, writer: W) -> Result<()> {
    match document.format {
        CoalescedFormat::Compact => CompactCodec.encode(document, writer),
        CoalescedFormat::Legacy => LegacyCodec.encode(document, writer),
        CoalescedFormat::Compressed => CompressedCodec.encode(document, writer),
    }
}
