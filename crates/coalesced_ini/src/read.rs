//! Types for reading coalesced text files
//!

use bon::Builder;
use std::io::BufRead;
use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};
use crate::types::{CoalescedFormat, Document};
use crate::{ESCAPE_CHAR, HEADER_PREFIX};

/// Options for how text should be interpreted
#[derive(Debug, Clone, Copy, Builder)]
pub struct IniReaderOptions {
    /// Section headers carry the owning file as `[file|section]`
    #[builder(default = true)]
    pub embedded_file_names: bool,

    /// Names and values use `\` escapes
    #[builder(default = true)]
    pub unescape: bool,
}

impl Default for IniReaderOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A single meaningful line of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IniEntry {
    /// `[file|name]`, or `[name]` when file names are not embedded
    Section { file: Option<String>, name: String },

    /// `name=value`
    Field { name: String, value: String },
}

/// Line oriented reader for coalesced text
///
/// ```
/// # fn doit() -> coalesced_ini::error::Result<()> {
/// use coalesced_ini::read::{IniEntry, IniReader, IniReaderOptions};
///
/// let text = ";coalesced compact\n[engine.ini|Core]\nPaths=..\\Content\n";
/// let mut ini = IniReader::new(text.as_bytes(), IniReaderOptions::default());
///
/// assert!(matches!(ini.read_entry()?, Some(IniEntry::Section { .. })));
/// assert_eq!(ini.format(), Some(coalesced_ini::CoalescedFormat::Compact));
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct IniReader<R: BufRead> {
    reader: R,
    options: IniReaderOptions,
    line_number: usize,
    format: Option<CoalescedFormat>,
    buffer: String,
}

impl<R: BufRead> IniReader<R> {
    pub fn new(reader: R, options: IniReaderOptions) -> Self {
        Self {
            reader,
            options,
            line_number: 0,
            format: None,
            buffer: String::new(),
        }
    }

    /// The line the last returned entry was read from
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// The format named by the header line, once it has been read
    pub fn format(&self) -> Option<CoalescedFormat> {
        self.format
    }

    /// Read the next section or field, skipping blank lines and comments.
    ///
    /// Returns `None` at the end of the stream.
    pub fn read_entry(&mut self) -> Result<Option<IniEntry>> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self
                .buffer
                .strip_suffix('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l))
                .unwrap_or(&self.buffer);

            if line.trim().is_empty() {
                continue;
            }

            if line.trim_start().starts_with(';') {
                if self.format.is_none() {
                    if let Some(name) = line.strip_prefix(HEADER_PREFIX) {
                        self.format = Some(name.parse()?);
                    }
                }
                continue;
            }

            let header = line
                .trim_end()
                .strip_prefix('[')
                .and_then(|l| l.strip_suffix(']'))
                .filter(|l| !l.is_empty());

            let entry = match header {
                Some(header) => self.parse_section(header)?,
                None => self.parse_field(line)?,
            };
            trace!(line = self.line_number, ?entry);

            return Ok(Some(entry));
        }
    }

    fn parse_section(&self, header: &str) -> Result<IniEntry> {
        if !self.options.embedded_file_names {
            return Ok(IniEntry::Section {
                file: None,
                name: self.decode(header),
            });
        }

        match header.split_once('|') {
            Some((file, name)) if !file.is_empty() => Ok(IniEntry::Section {
                file: Some(self.decode(file)),
                name: self.decode(name),
            }),
            _ => Err(Error::NoFileName {
                line: self.line_number,
            }),
        }
    }

    fn parse_field(&self, line: &str) -> Result<IniEntry> {
        match line.split_once('=') {
            Some((name, value)) if !name.is_empty() => Ok(IniEntry::Field {
                name: self.decode(name),
                value: self.decode(value),
            }),
            _ => Err(Error::InvalidKeyName {
                line: self.line_number,
            }),
        }
    }

    fn decode(&self, s: &str) -> String {
        if self.options.unescape {
            unescape(s)
        } else {
            s.to_owned()
        }
    }
}

impl<R: BufRead> Iterator for IniReader<R> {
    type Item = Result<IniEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_entry().transpose()
    }
}

/// Reverse the escaping applied by [`crate::write::escape`]
///
/// Unknown escape sequences are kept as they are.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != ESCAPE_CHAR {
            out.push(ch);
            continue;
        }

        let replacement = match chars.peek() {
            Some('\\') => '\\',
            Some('r') => '\r',
            Some('n') => '\n',
            Some('p') => '|',
            Some('e') => '=',
            Some(';') => ';',
            Some('[') => '[',
            _ => {
                out.push(ESCAPE_CHAR);
                continue;
            }
        };
        chars.next();
        out.push(replacement);
    }

    out
}

impl Document {
    /// Read a text export, taking the format from its header line.
    #[instrument(skip_all, err)]
    pub fn load<R: BufRead>(reader: R) -> Result<Document> {
        let (format, document) = Self::load_entries(reader)?;
        let format = format.ok_or(Error::MissingHeader)?;
        Ok(Document { format, ..document })
    }

    /// Read a text export as `format`, whatever its header line says.
    #[instrument(skip(reader), err)]
    pub fn load_as<R: BufRead>(reader: R, format: CoalescedFormat) -> Result<Document> {
        let (_, document) = Self::load_entries(reader)?;
        Ok(Document { format, ..document })
    }

    fn load_entries<R: BufRead>(reader: R) -> Result<(Option<CoalescedFormat>, Document)> {
        let mut ini = IniReader::new(reader, IniReaderOptions::default());
        let mut document = Document::default();
        let mut in_section = false;

        while let Some(entry) = ini.read_entry()? {
            match entry {
                IniEntry::Section { file, name } => {
                    let file = document.file_mut(file.as_deref().unwrap_or_default());
                    // `[file|]` only keeps the file alive
                    in_section = !name.is_empty();
                    if in_section {
                        file.section_mut(&name);
                    }
                }
                IniEntry::Field { name, value } => {
                    let section = document
                        .files
                        .last_mut()
                        .and_then(|file| file.sections.last_mut())
                        .filter(|_| in_section)
                        .ok_or(Error::NoCurrentSection {
                            line: ini.line_number(),
                        })?;
                    section.push_value(&name, value);
                }
            }
        }

        debug!(files = document.len(), lines = ini.line_number(), "loaded text");
        Ok((ini.format(), document))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::read::{unescape, IniEntry, IniReader, IniReaderOptions};
    use crate::types::{CoalescedFormat, Document, Field};

    #[test]
    fn unescape_sequences() {
        assert_eq!(unescape(r"a\\b\r\n\p\e"), "a\\b\r\n|=");
        assert_eq!(unescape(r"c:\temp\x"), r"c:\temp\x");
        assert_eq!(unescape("trailing\\"), "trailing\\");
        assert_eq!(unescape(""), "");
    }

    #[traced_test]
    #[test]
    fn read_entries() -> Result<()> {
        let text = ";coalesced legacy\r\n\r\n  ; comment\r\n[a.ini|Sec\\p1]  \r\nName\\e=x=y\r\n";
        let mut ini = IniReader::new(text.as_bytes(), IniReaderOptions::default());

        assert_eq!(
            ini.read_entry()?,
            Some(IniEntry::Section {
                file: Some("a.ini".into()),
                name: "Sec|1".into()
            })
        );
        assert_eq!(ini.line_number(), 4);
        assert_eq!(
            ini.read_entry()?,
            Some(IniEntry::Field {
                name: "Name=".into(),
                value: "x=y".into()
            })
        );
        assert_eq!(ini.read_entry()?, None);
        assert_eq!(ini.format(), Some(CoalescedFormat::Legacy));

        Ok(())
    }

    #[test]
    fn read_unescaped_body() -> Result<()> {
        let text = "[Core.System]\nPaths=..\\..\\Engine\\n\n";
        let options = IniReaderOptions::builder()
            .embedded_file_names(false)
            .unescape(false)
            .build();
        let entries = IniReader::new(text.as_bytes(), options).collect::<Result<Vec<_>>>()?;

        assert_eq!(
            entries,
            vec![
                IniEntry::Section {
                    file: None,
                    name: "Core.System".into()
                },
                IniEntry::Field {
                    name: "Paths".into(),
                    value: "..\\..\\Engine\\n".into()
                },
            ]
        );

        Ok(())
    }

    #[test]
    fn reject_malformed_lines() {
        let read = |text: &str| -> Result<Vec<IniEntry>> {
            IniReader::new(text.as_bytes(), IniReaderOptions::default()).collect()
        };

        assert!(matches!(
            read("[NoFile]\n"),
            Err(Error::NoFileName { line: 1 })
        ));
        assert!(matches!(
            read("[|Sec]\n"),
            Err(Error::NoFileName { line: 1 })
        ));
        assert!(matches!(
            read("[f|s]\n=value\n"),
            Err(Error::InvalidKeyName { line: 2 })
        ));
    }

    #[traced_test]
    #[test]
    fn load_document() -> Result<()> {
        let text = "\
;coalesced compressed
[engine.ini|Core]
Paths=a
Paths=b
Other=c

[engine.ini|Core]
Paths=d

[empty.ini|]

[game.ini|Main]
Key=A\\nB
";
        let doc = Document::load(text.as_bytes())?;

        assert_eq!(doc.format, CoalescedFormat::Compressed);
        assert_eq!(doc.len(), 3);

        let core = &doc.files[0].sections;
        assert_eq!(core.len(), 1);
        assert_eq!(
            core[0].fields,
            vec![
                Field::new("Paths", vec!["a".into(), "b".into()]),
                Field::new("Other", vec!["c".into()]),
                Field::new("Paths", vec!["d".into()]),
            ]
        );

        assert_eq!(doc.files[1].name, "empty.ini");
        assert!(doc.files[1].sections.is_empty());
        assert_eq!(doc.files[2].sections[0].fields[0].values, vec!["A\nB"]);

        Ok(())
    }

    #[test]
    fn load_requires_header() {
        assert!(matches!(
            Document::load("[a|b]\nc=d\n".as_bytes()),
            Err(Error::MissingHeader)
        ));
    }

    #[test]
    fn load_as_overrides_header() -> Result<()> {
        let doc = Document::load_as("[a|b]\nc=d\n".as_bytes(), CoalescedFormat::Compact)?;
        assert_eq!(doc.format, CoalescedFormat::Compact);
        assert_eq!(doc.files[0].sections[0].fields[0].values, vec!["d"]);

        Ok(())
    }

    #[test]
    fn field_after_placeholder_is_rejected() {
        assert!(matches!(
            Document::load(";coalesced compact\n[a|]\nc=d\n".as_bytes()),
            Err(Error::NoCurrentSection { line: 3 })
        ));
    }
}
