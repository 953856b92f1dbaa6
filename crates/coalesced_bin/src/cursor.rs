//! Format aware reading and writing of primitive values
//!

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use coalesced_ini::CoalescedFormat;
use encoding_rs::mem::{decode_latin1, encode_latin1_lossy, is_str_latin1};
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use tracing::{trace, warn};
use widestring::U16Str;

use crate::error::{Error, Result};

/// Reads or writes little endian integers and the string encoding of one format,
/// keeping track of the byte offset for error reporting.
///
/// ```
/// # fn doit() -> coalesced_bin::error::Result<()> {
/// use coalesced_bin::BinaryCursor;
/// use coalesced_ini::CoalescedFormat;
///
/// let mut out = BinaryCursor::new(Vec::new(), CoalescedFormat::Compact);
/// out.write_string("Hi")?;
/// assert_eq!(out.into_inner(), [0xFD, 0xFF, 0xFF, 0xFF, b'H', 0, b'i', 0, 0, 0]);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct BinaryCursor<T> {
    inner: T,
    format: CoalescedFormat,
    position: u64,
    value_position: u64,
}

impl<T> BinaryCursor<T> {
    pub fn new(inner: T, format: CoalescedFormat) -> Self {
        Self::with_position(inner, format, 0)
    }

    /// Wrap a stream that is already `position` bytes in
    pub fn with_position(inner: T, format: CoalescedFormat, position: u64) -> Self {
        Self {
            inner,
            format,
            position,
            value_position: position,
        }
    }

    /// Current offset in bytes from the start of the stream
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Offset at which the last value read started
    pub fn value_position(&self) -> u64 {
        self.value_position
    }

    pub fn format(&self) -> CoalescedFormat {
        self.format
    }

    /// Access the wrapped stream. Reading through it does not move [`Self::position`].
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn eof(&self, e: io::Error) -> Error {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof {
                offset: self.value_position,
            }
        } else {
            e.into()
        }
    }
}

impl<T: Read> BinaryCursor<T> {
    pub fn read_u8(&mut self) -> Result<u8> {
        self.value_position = self.position;
        let value = self.inner.read_u8().map_err(|e| self.eof(e))?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.value_position = self.position;
        let value = self
            .inner
            .read_u16::<LittleEndian>()
            .map_err(|e| self.eof(e))?;
        self.position += 2;
        Ok(value)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.value_position = self.position;
        let value = self
            .inner
            .read_i16::<LittleEndian>()
            .map_err(|e| self.eof(e))?;
        self.position += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.value_position = self.position;
        let value = self
            .inner
            .read_u32::<LittleEndian>()
            .map_err(|e| self.eof(e))?;
        self.position += 4;
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.value_position = self.position;
        let value = self
            .inner
            .read_i32::<LittleEndian>()
            .map_err(|e| self.eof(e))?;
        self.position += 4;
        Ok(value)
    }

    /// Read a signed 32 bit element count, rejecting negative values.
    pub fn read_count(&mut self, what: &'static str) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| Error::InvalidCount {
            what,
            count,
            offset: self.value_position,
        })
    }

    /// Read exactly `length` bytes.
    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        self.value_position = self.position;

        // stored lengths are untrusted; allocate only what is actually read
        let mut buf = Vec::new();
        (&mut self.inner)
            .take(length as u64)
            .read_to_end(&mut buf)?;
        self.position += buf.len() as u64;

        if buf.len() != length {
            return Err(Error::UnexpectedEof {
                offset: self.value_position,
            });
        }
        Ok(buf)
    }

    /// Read a string in the encoding of the cursor's format.
    pub fn read_string(&mut self) -> Result<String> {
        let offset = self.position;

        let value = match self.format {
            CoalescedFormat::Compact => {
                let prefix = self.read_i32()?;
                if prefix > 0 {
                    return Err(Error::InvalidStringPrefix { prefix, offset });
                }

                // the terminator is part of the count; anything after an early NUL is padding
                let mut units = Vec::new();
                let mut terminated = false;
                for _ in 0..prefix.unsigned_abs() {
                    let unit = self.read_u16()?;
                    terminated |= unit == 0;
                    if !terminated {
                        units.push(unit);
                    }
                }
                let units = U16Str::from_slice(&units);
                units.to_string().unwrap_or_else(|error| {
                    warn!(offset, %error, "replacing unpaired surrogates");
                    units.to_string_lossy()
                })
            }
            CoalescedFormat::Legacy => {
                let prefix = self.read_i32()?;
                if prefix < 0 {
                    return Err(Error::InvalidStringPrefix { prefix, offset });
                }

                let mut bytes = self.read_bytes(prefix as usize)?;
                if let Some(end) = bytes.iter().position(|&b| b == 0) {
                    bytes.truncate(end);
                }
                decode_legacy(&bytes)
            }
            CoalescedFormat::Compressed => {
                let prefix = self.read_i16()?;
                if prefix < 0 {
                    return Err(Error::InvalidStringPrefix {
                        prefix: prefix.into(),
                        offset,
                    });
                }

                let bytes = self.read_bytes(prefix as usize)?;
                String::from_utf8(bytes)?
            }
        };

        self.value_position = offset;
        trace!(offset, %value, "read string");
        Ok(value)
    }
}

impl<T: BufRead> BinaryCursor<T> {
    /// Whether every byte of the stream has been consumed
    pub fn at_end(&mut self) -> Result<bool> {
        Ok(self.inner.fill_buf()?.is_empty())
    }
}

impl<T: Seek> BinaryCursor<T> {
    /// Move to an absolute offset in the stream.
    pub fn goto(&mut self, position: u64) -> Result<()> {
        self.position = self.inner.seek(SeekFrom::Start(position))?;
        Ok(())
    }
}

impl<T: Write> BinaryCursor<T> {
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_u8(value)?;
        self.position += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(value)?;
        self.position += 2;
        Ok(())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.inner.write_i16::<LittleEndian>(value)?;
        self.position += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Write a string in the encoding of the cursor's format.
    ///
    /// An empty string is a zero prefix without payload in every format.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        match self.format {
            CoalescedFormat::Compact => {
                let units = value.encode_utf16().collect::<Vec<_>>();
                if units.is_empty() {
                    return self.write_i32(0);
                }

                let prefix = prefix_with_terminator(units.len(), value)?;
                self.write_i32(-prefix)?;
                for unit in units {
                    self.write_u16(unit)?;
                }
                self.write_u16(0)
            }
            CoalescedFormat::Legacy => {
                let bytes = encode_legacy(value)?;
                if bytes.is_empty() {
                    return self.write_i32(0);
                }

                let prefix = prefix_with_terminator(bytes.len(), value)?;
                self.write_i32(prefix)?;
                self.write_bytes(&bytes)?;
                self.write_u8(0)
            }
            CoalescedFormat::Compressed => {
                let bytes = value.as_bytes();
                let length = i16::try_from(bytes.len()).map_err(|_| Error::StringTooLong {
                    length: bytes.len(),
                    limit: i16::MAX as usize,
                })?;
                self.write_i16(length)?;
                self.write_bytes(bytes)
            }
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Count stored as a signed 32 bit integer
pub(crate) fn count_i32(count: usize, what: &'static str) -> Result<i32> {
    i32::try_from(count).map_err(|_| Error::TooManyEntries {
        what,
        count,
        limit: i32::MAX as usize,
    })
}

/// Count stored as an unsigned 16 bit integer
pub(crate) fn count_u16(count: usize, what: &'static str) -> Result<u16> {
    u16::try_from(count).map_err(|_| Error::TooManyEntries {
        what,
        count,
        limit: u16::MAX as usize,
    })
}

/// Length prefix counting the NUL terminator
fn prefix_with_terminator(length: usize, value: &str) -> Result<i32> {
    i32::try_from(length + 1).map_err(|_| Error::StringTooLong {
        length: value.len(),
        limit: i32::MAX as usize - 1,
    })
}

/// Decode 8-bit legacy text; byte `n` is the character `U+00nn`.
pub(crate) fn decode_legacy(bytes: &[u8]) -> String {
    decode_latin1(bytes).into_owned()
}

/// Encode text for the legacy format, rejecting characters above `U+00FF`.
pub(crate) fn encode_legacy(value: &str) -> Result<Vec<u8>> {
    if !is_str_latin1(value) {
        return Err(Error::UnencodableCharacter(value.to_owned()));
    }
    Ok(encode_latin1_lossy(value).into_owned())
}
