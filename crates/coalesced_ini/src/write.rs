//! Types for writing coalesced text files
//!

use bon::Builder;
use std::io::Write;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::types::{CoalescedFormat, Document};
use crate::{ESCAPE_CHAR, HEADER_PREFIX};

/// Line terminator used between entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`
    Lf,

    /// `\r\n`
    #[default]
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Options for how text should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct IniWriterOptions {
    /// The terminator written after every line
    #[builder(default)]
    pub line_ending: LineEnding,

    /// Separate a section from the fields of the previous one with an empty line
    #[builder(default = true)]
    pub blank_line_between_sections: bool,

    /// Escape names and values so any string survives a round trip
    #[builder(default = true)]
    pub escape: bool,

    /// Format to record in the first line, if any
    pub header: Option<CoalescedFormat>,
}

/// Line oriented writer for coalesced text
///
/// ```
/// # fn doit() -> coalesced_ini::error::Result<()> {
/// use coalesced_ini::write::{IniWriter, IniWriterOptions, LineEnding};
///
/// let options = IniWriterOptions::builder().line_ending(LineEnding::Lf).build();
/// let mut ini = IniWriter::new(Vec::new(), options)?;
/// ini.write_section(Some("engine.ini"), "Core")?;
/// ini.write_field("Paths", "..\\Content")?;
///
/// let text = ini.finish()?;
/// assert_eq!(text, b"[engine.ini|Core]\nPaths=..\\\\Content\n");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct IniWriter<W: Write> {
    inner: W,
    options: IniWriterOptions,
    fields_written: bool,
}

impl<W: Write> IniWriter<W> {
    /// Start a text file, writing the header line when one was requested.
    pub fn new(inner: W, options: IniWriterOptions) -> Result<Self> {
        let mut writer = Self {
            inner,
            options,
            fields_written: false,
        };

        if let Some(format) = options.header {
            let line = format!("{HEADER_PREFIX}{format}");
            writer.write_line(&line)?;
        }

        Ok(writer)
    }

    /// Write a section header.
    ///
    /// With a file name this is `[file|name]`, otherwise `[name]`.
    pub fn write_section(&mut self, file: Option<&str>, name: &str) -> Result<()> {
        if self.fields_written && self.options.blank_line_between_sections {
            self.write_line("")?;
        }
        self.fields_written = false;

        let line = match file {
            Some(file) => format!(
                "[{}|{}]",
                self.encode(file, Escape::Pipe),
                self.encode(name, Escape::None)
            ),
            None => format!("[{}]", self.encode(name, Escape::None)),
        };
        self.write_line(&line)
    }

    /// Write a single `name=value` line.
    pub fn write_field(&mut self, name: &str, value: &str) -> Result<()> {
        let line = format!(
            "{}={}",
            self.encode(name, Escape::Equals),
            self.encode(value, Escape::None)
        );
        self.fields_written = true;
        self.write_line(&line)
    }

    /// Flush and return the inner writer
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.inner.write_all(line.as_bytes())?;
        self.inner
            .write_all(self.options.line_ending.as_str().as_bytes())?;
        Ok(())
    }

    fn encode(&self, s: &str, extra: Escape) -> String {
        if self.options.escape {
            escape(s, extra)
        } else {
            s.to_owned()
        }
    }
}

/// Separator that must additionally be escaped for a given position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    None,
    /// `|` separates file and section names
    Pipe,
    /// `=` separates field names and values, and a name must not start a comment or header
    Equals,
}

/// Escape backslashes, line breaks and the separator selected by `extra`
pub fn escape(s: &str, extra: Escape) -> String {
    let mut out = String::with_capacity(s.len());
    let mut leading = extra == Escape::Equals;
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '|' if extra == Escape::Pipe => out.push_str("\\p"),
            '=' if extra == Escape::Equals => out.push_str("\\e"),
            ';' | '[' if leading => {
                out.push(ESCAPE_CHAR);
                out.push(ch);
            }
            _ => out.push(ch),
        }
        leading &= ch.is_whitespace();
    }
    out
}

impl Document {
    /// Write this document as a text export.
    ///
    /// Files without sections are written as `[file|]` so they are not lost.
    #[instrument(skip_all, err, fields(format = %self.format))]
    pub fn save<W: Write>(&self, writer: W) -> Result<W> {
        self.save_with(writer, LineEnding::default())
    }

    /// Write this document as a text export using the given line terminator.
    pub fn save_with<W: Write>(&self, writer: W, line_ending: LineEnding) -> Result<W> {
        let options = IniWriterOptions::builder()
            .line_ending(line_ending)
            .header(self.format)
            .build();
        let mut ini = IniWriter::new(writer, options)?;

        for file in &self.files {
            if file.sections.is_empty() {
                ini.write_section(Some(&file.name), "")?;
            }

            for section in &file.sections {
                ini.write_section(Some(&file.name), &section.name)?;
                for field in &section.fields {
                    for value in &field.values {
                        ini.write_field(&field.name, value)?;
                    }
                }
            }
        }

        debug!(files = self.len(), "saved text");
        ini.finish()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::{assert_eq, assert_str_eq};
    use tracing_test::traced_test;

    use crate::error::Result;
    use crate::types::{CoalescedFormat, Document};
    use crate::write::{escape, Escape, IniWriter, IniWriterOptions, LineEnding};

    #[test]
    fn escape_separators() {
        assert_eq!(escape("a|b=c", Escape::None), "a|b=c");
        assert_eq!(escape("a|b=c", Escape::Pipe), "a\\pb=c");
        assert_eq!(escape("a|b=c", Escape::Equals), "a|b\\ec");
        assert_eq!(escape("x\\y\r\n", Escape::None), "x\\\\y\\r\\n");
        assert_eq!(escape(";a;b", Escape::Equals), "\\;a;b");
        assert_eq!(escape(" [a]", Escape::Equals), " \\[a]");
        assert_eq!(escape(";a", Escape::None), ";a");
    }

    #[test]
    fn write_unescaped_body() -> Result<()> {
        let options = IniWriterOptions::builder()
            .line_ending(LineEnding::Lf)
            .blank_line_between_sections(false)
            .escape(false)
            .build();
        let mut ini = IniWriter::new(Vec::new(), options)?;
        ini.write_section(None, "Core.System")?;
        ini.write_field("Paths", "..\\Engine")?;
        ini.write_section(None, "Engine.Engine")?;

        assert_str_eq!(
            String::from_utf8_lossy(&ini.finish()?),
            "[Core.System]\nPaths=..\\Engine\n[Engine.Engine]\n"
        );

        Ok(())
    }

    #[traced_test]
    #[test]
    fn save_document() -> Result<()> {
        let mut doc = Document::new(CoalescedFormat::Compact);
        let section = doc.file_mut("a|b.ini").section_mut("Core");
        section.push_value("Key=", "line\nbreak");
        section.push_value("Key=", "second");
        doc.file_mut("a|b.ini").section_mut("Next");
        doc.file_mut("empty.ini");

        let text = doc.save_with(Vec::new(), LineEnding::Lf)?;

        assert_str_eq!(
            String::from_utf8_lossy(&text),
            "\
;coalesced compact
[a\\pb.ini|Core]
Key\\e=line\\nbreak
Key\\e=second

[a\\pb.ini|Next]
[empty.ini|]
"
        );

        Ok(())
    }

    #[traced_test]
    #[test]
    fn save_then_load() -> Result<()> {
        let mut doc = Document::new(CoalescedFormat::Legacy);
        let section = doc.file_mut("engine.ini").section_mut("Core|System");
        section.push_value("Paths", "..\\Content");
        section.push_value("Paths", "");
        section.push_value("Odd=Name", "tab\there\r\n");
        doc.file_mut("placeholder.ini");

        let text = doc.save(Vec::new())?;
        let loaded = Document::load(text.as_slice())?;

        assert_eq!(loaded, doc);

        Ok(())
    }
}
