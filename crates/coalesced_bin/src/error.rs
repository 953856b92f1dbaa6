//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent warpper for [`std::string::FromUtf8Error`]
    #[error(transparent)]
    UTF8Error(#[from] std::string::FromUtf8Error),

    /// Transparent warpper for [`widestring::error::Utf16Error`]
    #[error(transparent)]
    UTF16Error(#[from] widestring::error::Utf16Error),

    /// Transparent warpper for [`coalesced_ini::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    IniError(#[from] coalesced_ini::error::Error),

    /// the stream ended while reading a value
    #[error("unexpected end of data at offset 0x{offset:08X}")]
    UnexpectedEof { offset: u64 },

    /// file does not start with the compressed archive signature
    #[error("file does not start with the `mrmf` signature; this may be the incorrect format")]
    InvalidSignature,

    /// compressed archive with a version other than 1
    #[error("file version {0} is not 1; this may be the incorrect format")]
    UnsupportedVersion(u32),

    /// string length prefix with a sign the format does not allow
    #[error("string prefix [{prefix}] is not valid at offset 0x{offset:08X}")]
    InvalidStringPrefix { prefix: i32, offset: u64 },

    /// negative element count
    #[error("{what} count [{count}] is negative at offset 0x{offset:08X}")]
    InvalidCount {
        what: &'static str,
        count: i32,
        offset: u64,
    },

    /// section length smaller than the data it must contain
    #[error("{what} section length [{length}] is too small")]
    InvalidSectionLength { what: &'static str, length: i64 },

    /// stored string does not hash to the value in the index
    #[error("CRC of string {id} in file {stored:08X} does not match calculated {calculated:08X}")]
    CrcMismatch {
        id: usize,
        stored: u32,
        calculated: u32,
    },

    /// string index entry points outside of the string data
    #[error("string {id} points to offset {offset}, outside of the string data")]
    InvalidStringOffset { id: usize, offset: u32 },

    /// tree refers to a string the table does not contain
    #[error("string id {id} is out of range for a table of {count} strings")]
    InvalidStringId { id: u16, count: usize },

    /// field value stored with a type other than string
    #[error("a field contains an unsupported value type of '{value_type}' at offset 0x{offset:08X}")]
    UnsupportedValueType { value_type: u32, offset: u64 },

    /// huffman tree refers to a node that does not exist
    #[error("huffman node {node} is out of range for a tree of {nodes} nodes")]
    HuffmanNodeOutOfRange { node: usize, nodes: usize },

    /// huffman leaf holding a value that is not a character
    #[error("huffman leaf [{0}] does not hold a valid character")]
    InvalidHuffmanLeaf(i32),

    /// value code starting where no code can start
    #[error("value at bit {offset} is outside of {bits} bits of compressed data")]
    ValueOffsetOutOfRange { offset: u64, bits: u64 },

    /// more distinct strings than a 16 bit id can address
    #[error("string table is limited to {} strings", u16::MAX)]
    TooManyStrings,

    /// more children than the count field can hold
    #[error("{what} count {count} exceeds the limit of {limit}")]
    TooManyEntries {
        what: &'static str,
        count: usize,
        limit: usize,
    },

    /// string does not fit the length prefix of the format
    #[error("string length {length} exceeds the limit of {limit}")]
    StringTooLong { length: usize, limit: usize },

    /// compressed position that does not fit in the 28 bits available
    #[error("compressed value position {0} does not fit in 28 bits")]
    OffsetOutOfRange(u64),

    /// huffman code deeper than supported
    #[error("huffman code is longer than 64 bits")]
    CodeTooLong,

    /// character without a code in the huffman tree
    #[error("no huffman code was built for character {0}")]
    MissingHuffmanCode(u16),

    /// string holds a character the 8-bit code page cannot represent
    #[error("string `{0}` contains characters that cannot be encoded as Latin-1")]
    UnencodableCharacter(String),

    /// string looked up in a compressor that never saw it
    #[error("string `{0}` was not added before compression")]
    UnknownString(String),

    /// string table used in the wrong phase
    #[error("string table must be sorted before ids are read, and cannot grow afterwards")]
    StringTablePhase,
}

/// Broad classes of failure, independent of the exact variant
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed prefix, signature, version or length
    Structural,

    /// Stored data contradicts itself
    Integrity,

    /// Document does not fit the limits of the binary format
    Capacity,

    /// The stream ended early
    EndOfData,

    /// Failure of the underlying reader or writer, or misuse of the API
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::IOError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                ErrorKind::EndOfData
            }
            Error::UnexpectedEof { .. } => ErrorKind::EndOfData,
            Error::BinRWError(e) if e.is_eof() => ErrorKind::EndOfData,
            Error::InvalidSignature
            | Error::UnsupportedVersion(_)
            | Error::InvalidStringPrefix { .. }
            | Error::InvalidCount { .. }
            | Error::InvalidSectionLength { .. }
            | Error::IniError(_) => ErrorKind::Structural,
            Error::UTF8Error(_)
            | Error::UTF16Error(_)
            | Error::CrcMismatch { .. }
            | Error::InvalidStringOffset { .. }
            | Error::InvalidStringId { .. }
            | Error::UnsupportedValueType { .. }
            | Error::HuffmanNodeOutOfRange { .. }
            | Error::InvalidHuffmanLeaf(_)
            | Error::ValueOffsetOutOfRange { .. }
            | Error::MissingHuffmanCode(_) => ErrorKind::Integrity,
            Error::TooManyStrings
            | Error::TooManyEntries { .. }
            | Error::StringTooLong { .. }
            | Error::OffsetOutOfRange(_)
            | Error::CodeTooLong
            | Error::UnencodableCharacter(_) => ErrorKind::Capacity,
            Error::IOError(_)
            | Error::BinRWError(_)
            | Error::UnknownString(_)
            | Error::StringTablePhase => ErrorKind::Io,
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
