//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// A section header did not name the file it belongs to
    #[error("a section was declared on line {line} but no file name is present")]
    NoFileName { line: usize },

    /// A field line had no name before the `=`
    #[error("no field name was included before a '=' on line {line}")]
    InvalidKeyName { line: usize },

    /// A field line appeared before any section header
    #[error("a value was declared on line {line} but no current section is set")]
    NoCurrentSection { line: usize },

    /// The text does not start with the line naming its binary format
    #[error("text does not declare which coalesced format it belongs to")]
    #[diagnostic(help("the first line should look like `;coalesced compressed`"))]
    MissingHeader,

    /// The format name is not one of the known variants
    #[error("unknown coalesced format `{0}`")]
    UnknownFormat(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
