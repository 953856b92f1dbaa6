//! Sniffing which coalesced format a stream holds from its first bytes
//!

use coalesced_ini::{CoalescedFormat, HEADER_PREFIX};
use tracing::debug;

/// Bytes [`detect`] needs to recognise every format
pub const DETECT_LENGTH: usize = 4 + 4 + 260;

/// Longest name a detected archive may start with, terminator included
const MAX_NAME_LENGTH: i32 = 260;

/// Which way a detected stream should be converted
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    /// A binary archive, to be exported as text
    ToText,
    /// A text export, to be encoded back to its binary format
    ToBinary,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Detection {
    pub format: CoalescedFormat,
    pub direction: Direction,
}

impl Detection {
    fn new(format: CoalescedFormat, direction: Direction) -> Self {
        Self { format, direction }
    }
}

/// Guess the format of a stream from up to [`DETECT_LENGTH`] of its first bytes.
///
/// ```
/// use coalesced_bin::detect::{detect, Direction};
/// use coalesced_ini::CoalescedFormat;
///
/// let detected = detect(b";coalesced legacy\n[a.ini|Core]\n");
/// assert_eq!(detected.map(|d| d.format), Some(CoalescedFormat::Legacy));
/// assert_eq!(detected.map(|d| d.direction), Some(Direction::ToBinary));
///
/// assert_eq!(detect(b"MZ\x90\x00"), None);
/// ```
pub fn detect(prefix: &[u8]) -> Option<Detection> {
    let detected = detect_compressed(prefix)
        .or_else(|| detect_text(prefix))
        .or_else(|| detect_compact(prefix))
        .or_else(|| detect_legacy(prefix));

    debug!(?detected, bytes = prefix.len(), "detected format");
    detected
}

fn detect_compressed(prefix: &[u8]) -> Option<Detection> {
    prefix
        .starts_with(b"mrmf")
        .then(|| Detection::new(CoalescedFormat::Compressed, Direction::ToText))
}

fn detect_text(prefix: &[u8]) -> Option<Detection> {
    let prefix = prefix.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(prefix);
    let line = prefix.split(|&b| b == b'\n').next()?;
    let line = std::str::from_utf8(line).ok()?;

    let format = line.strip_prefix(HEADER_PREFIX)?.trim().parse().ok()?;
    Some(Detection::new(format, Direction::ToBinary))
}

fn detect_compact(prefix: &[u8]) -> Option<Detection> {
    let files = read_i32(prefix, 0)?;
    let name = read_i32(prefix, 4)?;

    ((1..256).contains(&files) && (-MAX_NAME_LENGTH..0).contains(&name))
        .then(|| Detection::new(CoalescedFormat::Compact, Direction::ToText))
}

fn detect_legacy(prefix: &[u8]) -> Option<Detection> {
    let header = read_i32(prefix, 0)?;
    let name = read_i32(prefix, 4)?;
    if header < 0 || !(1..=MAX_NAME_LENGTH).contains(&name) {
        return None;
    }

    let (last, text) = prefix.get(8..8 + name as usize)?.split_last()?;
    let printable = text.iter().all(|b| b.is_ascii_graphic() || *b == b' ');

    (*last == 0 && printable).then(|| Detection::new(CoalescedFormat::Legacy, Direction::ToText))
}

fn read_i32(prefix: &[u8], at: usize) -> Option<i32> {
    let bytes = prefix.get(at..at + 4)?;
    Some(i32::from_le_bytes(bytes.try_into().ok()?))
}
