//! This library holds the in-memory document for **Coalesced** configuration archives and the
//! text format used to edit them.
//!
//! # Coalesced Text Format Documentation
//!
//! A coalesced archive bundles many INI style configuration files into a single binary. Every
//! binary layout decodes into the same [`Document`]: an ordered list of files, each holding an
//! ordered list of sections, each holding an ordered list of fields with one or more values.
//!
//! ## File Structure
//!
//! The text export is line oriented. Blank lines and lines starting with `;` are ignored, apart
//! from the first line which records which binary format to encode back to.
//!
//! | Line                     | Description                                                  |
//! |--------------------------|--------------------------------------------------------------|
//! | `;coalesced <format>`    | Header: one of `compact`, `legacy` or `compressed`           |
//! | `[<file>\|<section>]`    | Starts `section` inside `file`                               |
//! | `[<file>\|]`             | Declares `file` without any section                          |
//! | `<name>=<value>`         | Adds `value` to field `name` of the current section          |
//!
//! A field repeated on consecutive lines is a single field holding several values, and
//! consecutive headers naming the same section continue that section.
//!
//! ### Escaping
//!
//! | Sequence | Character                                  |
//! |----------|--------------------------------------------|
//! | `\\`     | `\`                                        |
//! | `\r`     | carriage return                            |
//! | `\n`     | line feed                                  |
//! | `\p`     | `\|` (only needed in file names)           |
//! | `\e`     | `=` (only needed in field names)           |
//! | `\;`     | `;` (only at the start of a field name)    |
//! | `\[`     | `[` (only at the start of a field name)    |
//!
//! The legacy binary format embeds raw INI bodies; those are read and written with escaping
//! disabled and without file names in the section headers.
//!

pub mod error;
pub mod read;
pub mod types;
pub mod write;

pub use read::IniReader;
pub use types::{CoalescedFormat, Document, Field, File, Section};
pub use write::IniWriter;

/// Prefix of the first line of a text export, followed by the format name
pub const HEADER_PREFIX: &str = ";coalesced ";

pub(crate) const ESCAPE_CHAR: char = '\\';
