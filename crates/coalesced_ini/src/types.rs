//! Base types for the document shared by every coalesced format.

use derive_more::derive::{Display, IntoIterator};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifies which binary layout a document was read from, or should be written as
///
/// The three layouts are unrelated on disk, but all of them carry the same
/// files, sections, fields and values.
#[derive(Display, Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CoalescedFormat {
    /// Nested counts with UTF-16 strings behind a negative length prefix
    #[display("compact")]
    Compact,

    /// Pairs of file names and raw INI bodies stored as 8-bit strings
    #[display("legacy")]
    Legacy,

    /// String table, Huffman coded values and an id based tree
    #[default]
    #[display("compressed")]
    Compressed,
}

impl CoalescedFormat {
    /// All known formats, in detection order
    pub const ALL: [CoalescedFormat; 3] = [
        CoalescedFormat::Compressed,
        CoalescedFormat::Compact,
        CoalescedFormat::Legacy,
    ];

    /// The extension binary files of this format normally carry
    pub fn extension(&self) -> &'static str {
        match self {
            CoalescedFormat::Compact | CoalescedFormat::Compressed => "bin",
            CoalescedFormat::Legacy => "ini",
        }
    }
}

impl FromStr for CoalescedFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CoalescedFormat::ALL
            .into_iter()
            .find(|format| format.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownFormat(s.to_owned()))
    }
}

/// A whole coalesced archive held in memory
///
/// Order is significant everywhere: it decides the binary layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, IntoIterator)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Document {
    /// The format this document was read from
    pub format: CoalescedFormat,

    /// The configuration files stored in the archive
    #[into_iterator(owned, ref, ref_mut)]
    pub files: Vec<File>,
}

impl Document {
    pub fn new(format: CoalescedFormat) -> Self {
        Self {
            format,
            files: Vec::new(),
        }
    }

    /// Number of files contained in this document.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether this document contains no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the last file if it is named `name`, otherwise appends a new one.
    pub fn file_mut(&mut self, name: &str) -> &mut File {
        let reuse = self.files.last().is_some_and(|file| file.name == name);
        if !reuse {
            self.files.push(File::new(name));
        }
        let index = self.files.len() - 1;
        &mut self.files[index]
    }

    /// Iterate over every value with the names leading to it
    pub fn values(&self) -> impl Iterator<Item = (&File, &Section, &Field, &str)> {
        self.files.iter().flat_map(|file| {
            file.sections.iter().flat_map(move |section| {
                section.fields.iter().flat_map(move |field| {
                    field
                        .values
                        .iter()
                        .map(move |value| (file, section, field, value.as_str()))
                })
            })
        })
    }
}

/// A configuration file inside the archive
///
/// A file without sections is valid and is kept as an empty placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct File {
    pub name: String,
    pub sections: Vec<Section>,
}

impl File {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: Vec::new(),
        }
    }

    /// Returns the last section if it is named `name`, otherwise appends a new one.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        let reuse = self
            .sections
            .last()
            .is_some_and(|section| section.name == name);
        if !reuse {
            self.sections.push(Section::new(name));
        }
        let index = self.sections.len() - 1;
        &mut self.sections[index]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Section {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a value, extending the last field when it has the same name.
    ///
    /// Repeated keys stay one multi-valued field as long as they are consecutive.
    pub fn push_value(&mut self, name: &str, value: impl Into<String>) {
        match self.fields.last_mut() {
            Some(field) if field.name == name => field.values.push(value.into()),
            _ => self.fields.push(Field::new(name, vec![value.into()])),
        }
    }

    /// Total number of values across all fields
    pub fn value_count(&self) -> usize {
        self.fields.iter().map(|field| field.values.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Field {
    pub name: String,
    pub values: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::Result;
    use crate::types::{CoalescedFormat, Document, Field, Section};

    #[test]
    fn format_names() -> Result<()> {
        assert_eq!(CoalescedFormat::Compact.to_string(), "compact");
        assert_eq!("Legacy".parse::<CoalescedFormat>()?, CoalescedFormat::Legacy);
        assert_eq!(
            " compressed ".parse::<CoalescedFormat>()?,
            CoalescedFormat::Compressed
        );
        assert!("me3".parse::<CoalescedFormat>().is_err());

        Ok(())
    }

    #[test]
    fn consecutive_values_share_a_field() {
        let mut section = Section::new("Engine");
        section.push_value("Paths", "a");
        section.push_value("Paths", "b");
        section.push_value("Other", "c");
        section.push_value("Paths", "d");

        assert_eq!(
            section.fields,
            vec![
                Field::new("Paths", vec!["a".into(), "b".into()]),
                Field::new("Other", vec!["c".into()]),
                Field::new("Paths", vec!["d".into()]),
            ]
        );
        assert_eq!(section.value_count(), 4);
    }

    #[test]
    fn consecutive_files_and_sections_merge() {
        let mut doc = Document::new(CoalescedFormat::Compact);
        doc.file_mut("a.ini").section_mut("One").push_value("k", "1");
        doc.file_mut("a.ini").section_mut("One").push_value("k", "2");
        doc.file_mut("a.ini").section_mut("Two");
        doc.file_mut("b.ini");

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.files[0].sections.len(), 2);
        assert_eq!(doc.files[0].sections[0].fields[0].values, vec!["1", "2"]);
        assert!(doc.files[1].sections.is_empty());
        assert_eq!(doc.values().count(), 2);
    }
}
