//! Base types for structure of compressed archives.

use binrw::{BinRead, BinWrite};
use std::io::{Read, Seek};

use crate::error::{Error, Result};

/// Only version of the compressed archive that exists
pub const COMPRESSED_VERSION: u32 = 1;

/// Size in bytes of [`CompressedHeader`], signature included
pub const COMPRESSED_HEADER_SIZE: u64 = 32;

/// Compressed archive header
///
/// Always starts with "mrmf" followed by the version, which is always 1.
/// All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(magic = b"mrmf", little)]
pub struct CompressedHeader {
    /// Format version
    pub version: u32,

    /// Longest field name, in UTF-16 code units
    pub max_field_name_length: u32,

    /// Longest field value, in UTF-16 code units
    pub max_field_value_length: u32,

    /// Size of the string table, including its own length field
    pub string_section_length: u32,

    /// Size of the huffman nodes, including the node count
    pub huffman_section_length: u32,

    /// Size of the tree of files, sections and fields
    pub tree_section_length: u32,

    /// Number of bytes of huffman coded values
    pub compressed_data_length: u32,
}

impl Default for CompressedHeader {
    fn default() -> Self {
        Self {
            version: COMPRESSED_VERSION,
            max_field_name_length: Default::default(),
            max_field_value_length: Default::default(),
            string_section_length: Default::default(),
            huffman_section_length: Default::default(),
            tree_section_length: Default::default(),
            compressed_data_length: Default::default(),
        }
    }
}

impl CompressedHeader {
    /// Read and validate the header, failing on a wrong signature or version.
    pub fn read_validated<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let header = Self::read(reader).map_err(|e| {
            if is_bad_magic(&e) {
                Error::InvalidSignature
            } else {
                e.into()
            }
        })?;

        if header.version != COMPRESSED_VERSION {
            return Err(Error::UnsupportedVersion(header.version));
        }

        Ok(header)
    }
}

fn is_bad_magic(e: &binrw::Error) -> bool {
    match e {
        binrw::Error::BadMagic { .. } => true,
        binrw::Error::Backtrace(backtrace) => is_bad_magic(&backtrace.error),
        _ => false,
    }
}

/// Type tag in the high four bits of a stored value
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum ValueType {
    /// Offset of a huffman coded string
    String = 4,
}

impl ValueType {
    const SHIFT: u32 = 28;

    /// Largest offset that fits next to the tag
    pub const MAX_OFFSET: u64 = (1 << Self::SHIFT) - 1;

    /// Pack an offset with this tag
    pub fn pack(self, offset: u64) -> Result<u32> {
        if offset > Self::MAX_OFFSET {
            return Err(Error::OffsetOutOfRange(offset));
        }
        Ok(offset as u32 | ((self as u32) << Self::SHIFT))
    }

    /// Split a stored word into its tag and offset
    pub fn unpack(word: u32, position: u64) -> Result<(ValueType, u64)> {
        let offset = u64::from(word) & Self::MAX_OFFSET;
        match word >> Self::SHIFT {
            4 => Ok((ValueType::String, offset)),
            value_type => Err(Error::UnsupportedValueType {
                value_type,
                offset: position,
            }),
        }
    }
}
