//! Compressed archives: a string table of names, huffman coded values and an id based tree
//!

use binrw::BinWrite;
use coalesced_ini::{CoalescedFormat, Document, Field, File, Section};
use std::io::{Cursor, Read, Write};
use tracing::{debug, instrument, trace};

use crate::crc;
use crate::cursor::{count_u16, BinaryCursor};
use crate::error::{Error, Result};
use crate::huffman::{HuffmanCompressor, HuffmanDecompressor, SymbolWidth};
use crate::string_table::StringTable;
use crate::types::{CompressedHeader, ValueType, COMPRESSED_HEADER_SIZE};
use crate::Codec;

/// Characters of the huffman tree are bytes of UTF-8
const SYMBOL_WIDTH: SymbolWidth = SymbolWidth::Byte;

/// Codec for compressed archives
///
/// Names are lower cased when written, as the string table is case insensitive.
///
/// ```
/// # fn doit() -> coalesced_bin::error::Result<()> {
/// use coalesced_bin::{compressed::CompressedCodec, Codec};
/// use coalesced_ini::{CoalescedFormat, Document};
///
/// let mut doc = Document::new(CoalescedFormat::Compressed);
/// doc.file_mut("engine.ini").section_mut("core").push_value("paths", "..");
///
/// let mut bytes = Vec::new();
/// CompressedCodec.encode(&doc, &mut bytes)?;
/// assert_eq!(&bytes[..4], b"mrmf");
/// assert_eq!(CompressedCodec.decode(bytes.as_slice())?, doc);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Default, Copy, Clone)]
pub struct CompressedCodec;

impl Codec for CompressedCodec {
    const FORMAT: CoalescedFormat = CoalescedFormat::Compressed;

    #[instrument(skip_all, err)]
    fn decode<R: Read>(&self, mut reader: R) -> Result<Document> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let mut decoder = Decoder::new(data);
        while decoder.advance()? != Stage::Done {}
        Ok(decoder.document)
    }

    #[instrument(skip_all, err, fields(files = document.len()))]
    fn encode<W: Write>(&self, document: &Document, mut writer: W) -> Result<()> {
        let bytes = encode_archive(document)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }
}

/// Sections of a compressed archive, in the order they are stored
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Header,
    StringTable,
    HuffmanNodes,
    Tree,
    CompressedData,
    Done,
}

struct Decoder {
    bin: BinaryCursor<Cursor<Vec<u8>>>,
    stage: Stage,
    header: CompressedHeader,
    strings: StringTable,
    nodes: Vec<i32>,
    offsets: Vec<u64>,
    document: Document,
}

impl Decoder {
    fn new(data: Vec<u8>) -> Self {
        Self {
            bin: BinaryCursor::new(Cursor::new(data), CoalescedFormat::Compressed),
            stage: Stage::Header,
            header: CompressedHeader::default(),
            strings: StringTable::default(),
            nodes: Vec::new(),
            offsets: Vec::new(),
            document: Document::new(CoalescedFormat::Compressed),
        }
    }

    /// Read the current section and move on to the next one
    fn advance(&mut self) -> Result<Stage> {
        let start = self.bin.position();

        self.stage = match self.stage {
            Stage::Header => {
                self.read_header()?;
                Stage::StringTable
            }
            Stage::StringTable => {
                self.read_string_table()?;
                Stage::HuffmanNodes
            }
            Stage::HuffmanNodes => {
                self.read_huffman_nodes()?;
                Stage::Tree
            }
            Stage::Tree => {
                self.read_tree()?;
                Stage::CompressedData
            }
            Stage::CompressedData => {
                self.read_compressed_data()?;
                Stage::Done
            }
            Stage::Done => Stage::Done,
        };

        debug!(start, end = self.bin.position(), next = ?self.stage, "read section");
        Ok(self.stage)
    }

    fn read_header(&mut self) -> Result<()> {
        self.header = CompressedHeader::read_validated(self.bin.get_mut())?;
        self.bin.goto(COMPRESSED_HEADER_SIZE)?;
        debug!(header = ?self.header, "read header");
        Ok(())
    }

    fn read_string_table(&mut self) -> Result<()> {
        let table_length = self.bin.read_i32()?;
        let count = self.bin.read_u32()?;
        debug!(table_length, count, "reading strings");

        let index_length = u64::from(count) * 8;
        let area_length = i64::from(table_length) - index_length as i64 - 8;
        if area_length < 0 {
            return Err(Error::InvalidSectionLength {
                what: "string",
                length: table_length.into(),
            });
        }

        let mut index = Vec::new();
        for _ in 0..count {
            let hash = self.bin.read_u32()?;
            let offset = self.bin.read_u32()?;
            index.push((hash, offset));
        }

        let area_start = self.bin.position();
        let area = self.bin.read_bytes(area_length as usize)?;

        let mut strings = Vec::with_capacity(index.len());
        for (id, &(stored, offset)) in index.iter().enumerate() {
            let relative = u64::from(offset)
                .checked_sub(index_length)
                .filter(|&relative| relative < area.len() as u64)
                .ok_or(Error::InvalidStringOffset { id, offset })?;

            let mut reader = BinaryCursor::with_position(
                &area[relative as usize..],
                CoalescedFormat::Compressed,
                area_start + relative,
            );
            let s = reader.read_string()?;

            let calculated = crc::hash(&s);
            if calculated != stored {
                return Err(Error::CrcMismatch {
                    id,
                    stored,
                    calculated,
                });
            }

            trace!(id, hash = stored, %s);
            strings.push(s);
        }

        self.strings = StringTable::from_stored(strings);
        Ok(())
    }

    fn read_huffman_nodes(&mut self) -> Result<()> {
        let pairs = self.bin.read_u16()?;
        debug!(pairs, "reading huffman nodes");

        self.nodes = (0..usize::from(pairs) * 2)
            .map(|_| self.bin.read_i32())
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn read_tree(&mut self) -> Result<()> {
        let bin = &mut self.bin;
        let strings = &self.strings;

        let file_count = bin.read_u16()?;
        debug!(file_count, "reading tree");

        let mut files = Vec::with_capacity(file_count.into());
        for _ in 0..file_count {
            let name = strings.get_string(bin.read_u16()?)?;
            bin.read_u32()?;
            files.push(File::new(name));
        }

        for file in &mut files {
            let section_count = bin.read_u16()?;
            for _ in 0..section_count {
                let name = strings.get_string(bin.read_u16()?)?;
                bin.read_u32()?;
                file.sections.push(Section::new(name));
            }

            for section in &mut file.sections {
                let field_count = bin.read_u16()?;
                for _ in 0..field_count {
                    let name = strings.get_string(bin.read_u16()?)?;
                    bin.read_u32()?;
                    section.fields.push(Field::new(name, Vec::new()));
                }

                for field in &mut section.fields {
                    let value_count = bin.read_u16()?;
                    for _ in 0..value_count {
                        let word = bin.read_u32()?;
                        let (_, offset) = ValueType::unpack(word, bin.value_position())?;
                        self.offsets.push(offset);
                        field.values.push(String::new());
                    }
                }
            }

            trace!(file = %file.name, sections = file.sections.len());
        }

        self.document.files = files;
        Ok(())
    }

    fn read_compressed_data(&mut self) -> Result<()> {
        let reserved = self.bin.read_u32()?;
        let length = self.header.compressed_data_length;
        debug!(reserved, length, "reading compressed data");

        let data = self.bin.read_bytes(length as usize)?;
        let huffman = HuffmanDecompressor::new(SYMBOL_WIDTH, &self.nodes, data)?;

        let values = self
            .document
            .files
            .iter_mut()
            .flat_map(|file| file.sections.iter_mut())
            .flat_map(|section| section.fields.iter_mut())
            .flat_map(|field| field.values.iter_mut());

        for (value, &offset) in values.zip(&self.offsets) {
            *value = huffman.get_string(offset)?;
        }
        Ok(())
    }
}

fn encode_archive(document: &Document) -> Result<Vec<u8>> {
    let mut strings = StringTable::new();
    let mut compressor = HuffmanCompressor::new(SYMBOL_WIDTH);
    let mut max_field_name_length = 0;
    let mut max_field_value_length = 0;

    strings.add("")?;
    for file in &document.files {
        strings.add(&file.name)?;
        for section in &file.sections {
            strings.add(&section.name)?;
            for field in &section.fields {
                strings.add(&field.name)?;
                max_field_name_length = max_field_name_length.max(utf16_length(&field.name));
                for value in &field.values {
                    compressor.add(value);
                    max_field_value_length = max_field_value_length.max(utf16_length(value));
                }
            }
        }
    }

    strings.sort();
    compressor.compress()?;

    let string_table = write_string_table(&strings)?;
    let huffman_nodes = write_huffman_nodes(&compressor)?;
    let tree = write_tree(document, &strings, &compressor)?;
    let compressed_data = compressor.compressed_data();

    let header = CompressedHeader {
        max_field_name_length: byte_length(max_field_name_length as u64)?,
        max_field_value_length: byte_length(max_field_value_length as u64)?,
        string_section_length: byte_length(string_table.len() as u64)?,
        huffman_section_length: byte_length(huffman_nodes.len() as u64)?,
        tree_section_length: byte_length(tree.len() as u64)?,
        compressed_data_length: byte_length(compressed_data.len() as u64)?,
        ..Default::default()
    };
    debug!(?header, strings = strings.len(), "writing compressed archive");

    let total = COMPRESSED_HEADER_SIZE as usize
        + string_table.len()
        + huffman_nodes.len()
        + tree.len()
        + 4
        + compressed_data.len();
    let mut out = Cursor::new(Vec::with_capacity(total));
    header.write(&mut out)?;

    let mut bin = BinaryCursor::with_position(out, CoalescedFormat::Compressed, COMPRESSED_HEADER_SIZE);
    bin.write_bytes(&string_table)?;
    bin.write_bytes(&huffman_nodes)?;
    bin.write_bytes(&tree)?;
    bin.write_u32(header.compressed_data_length)?;
    bin.write_bytes(compressed_data)?;

    Ok(bin.into_inner().into_inner())
}

fn write_string_table(strings: &StringTable) -> Result<Vec<u8>> {
    let mut index = BinaryCursor::new(Vec::new(), CoalescedFormat::Compressed);
    let mut area = BinaryCursor::new(Vec::new(), CoalescedFormat::Compressed);
    let index_length = strings.len() as u64 * 8;

    for s in strings.strings() {
        index.write_u32(crc::hash(s))?;
        index.write_u32(byte_length(index_length + area.position())?)?;
        area.write_string(s)?;
    }

    let index = index.into_inner();
    let area = area.into_inner();
    let table_length = index.len() + area.len() + 8;

    let mut table = BinaryCursor::new(
        Vec::with_capacity(table_length),
        CoalescedFormat::Compressed,
    );
    table.write_u32(byte_length(table_length as u64)?)?;
    table.write_u32(byte_length(strings.len() as u64)?)?;
    table.write_bytes(&index)?;
    table.write_bytes(&area)?;
    Ok(table.into_inner())
}

fn write_huffman_nodes(compressor: &HuffmanCompressor) -> Result<Vec<u8>> {
    let mut bin = BinaryCursor::new(Vec::new(), CoalescedFormat::Compressed);

    bin.write_u16(count_u16(compressor.nodes().len(), "huffman node")?)?;
    for slot in compressor.raw_nodes() {
        bin.write_i32(slot)?;
    }
    Ok(bin.into_inner())
}

/// Files, sections and fields by string id, each level followed by the blocks of its children.
///
/// Every id is paired with the offset of its child block, counted from the start of the
/// list the id is in.
fn write_tree(
    document: &Document,
    strings: &StringTable,
    compressor: &HuffmanCompressor,
) -> Result<Vec<u8>> {
    let mut tree = BinaryCursor::new(Vec::new(), CoalescedFormat::Compressed);
    let mut file_blocks = BinaryCursor::new(Vec::new(), CoalescedFormat::Compressed);

    let file_count = count_u16(document.len(), "file")?;
    tree.write_u16(file_count)?;

    for file in &document.files {
        tree.write_u16(strings.get_id(&file.name)?)?;
        tree.write_u32(child_offset(file_count, file_blocks.position())?)?;

        let section_count = count_u16(file.sections.len(), "section")?;
        let mut section_blocks = BinaryCursor::new(Vec::new(), CoalescedFormat::Compressed);
        file_blocks.write_u16(section_count)?;

        for section in &file.sections {
            file_blocks.write_u16(strings.get_id(&section.name)?)?;
            file_blocks.write_u32(child_offset(section_count, section_blocks.position())?)?;

            let field_count = count_u16(section.fields.len(), "field")?;
            let mut field_blocks = BinaryCursor::new(Vec::new(), CoalescedFormat::Compressed);
            section_blocks.write_u16(field_count)?;

            for field in &section.fields {
                section_blocks.write_u16(strings.get_id(&field.name)?)?;
                section_blocks.write_u32(child_offset(field_count, field_blocks.position())?)?;

                field_blocks.write_u16(count_u16(field.values.len(), "value")?)?;
                for value in &field.values {
                    let position = compressor.position(value)?;
                    field_blocks.write_u32(ValueType::String.pack(position)?)?;
                }
            }

            section_blocks.write_bytes(&field_blocks.into_inner())?;
        }

        file_blocks.write_bytes(&section_blocks.into_inner())?;
    }

    tree.write_bytes(&file_blocks.into_inner())?;
    Ok(tree.into_inner())
}

/// Offset of a child block: past the count and every (id, offset) pair of the list
fn child_offset(count: u16, block_position: u64) -> Result<u32> {
    byte_length(u64::from(count) * 6 + 2 + block_position)
}

fn byte_length(length: u64) -> Result<u32> {
    u32::try_from(length).map_err(|_| Error::TooManyEntries {
        what: "byte",
        count: length as usize,
        limit: u32::MAX as usize,
    })
}

fn utf16_length(s: &str) -> usize {
    s.encode_utf16().count()
}
