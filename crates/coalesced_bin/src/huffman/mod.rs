//! Huffman coding of the values stored in a compressed archive
//!
//! All distinct values share a single tree and are bit packed into one blob. A value is
//! referenced by the bit position its code starts at, and ends with the code of the NUL
//! character.
//!
//! ## Node Array
//!
//! Only internal nodes are stored, in post-order, so the root is always the last pair.
//!
//! | Offset | Name  | Description                                      |
//! |--------|-------|--------------------------------------------------|
//! | 0x0000 | Left  | 4 bytes: slot followed when the next bit is `0`  |
//! | 0x0004 | Right | 4 bytes: slot followed when the next bit is `1`  |
//!
//! A slot `>= 0` is the index of another pair, a slot `< 0` is a leaf holding the character
//! `-1 - slot`.
//!
//! ## Bit Order
//!
//! Bit `i` of the blob is `data[i / 8] & (1 << (i % 8))`. Codes are written first bit first,
//! where the first bit is the step taken from the root.

mod compress;
mod decompress;

pub use compress::HuffmanCompressor;
pub use decompress::HuffmanDecompressor;

use std::str::{Bytes, EncodeUtf16};
use widestring::U16Str;

use crate::error::{Error, Result};

/// What a single character of the tree is
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SymbolWidth {
    /// One byte of the UTF-8 encoding
    #[default]
    Byte,

    /// One UTF-16 code unit
    Unit,
}

impl SymbolWidth {
    /// Split a string into the characters of this width
    pub fn symbols<'a>(&self, s: &'a str) -> Symbols<'a> {
        match self {
            SymbolWidth::Byte => Symbols::Bytes(s.bytes()),
            SymbolWidth::Unit => Symbols::Units(s.encode_utf16()),
        }
    }

    /// Join decoded characters back into a string
    pub fn decode(&self, symbols: &[u16]) -> Result<String> {
        match self {
            SymbolWidth::Byte => {
                let bytes = symbols
                    .iter()
                    .map(|&symbol| {
                        u8::try_from(symbol)
                            .map_err(|_| Error::InvalidHuffmanLeaf(Slot::Leaf(symbol).to_raw()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(String::from_utf8(bytes)?)
            }
            SymbolWidth::Unit => Ok(U16Str::from_slice(symbols).to_string()?),
        }
    }
}

/// Iterator over the characters of a string, see [`SymbolWidth::symbols`]
pub enum Symbols<'a> {
    Bytes(Bytes<'a>),
    Units(EncodeUtf16<'a>),
}

impl Iterator for Symbols<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            Symbols::Bytes(bytes) => bytes.next().map(u16::from),
            Symbols::Units(units) => units.next(),
        }
    }
}

/// One side of an internal node
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Slot {
    /// A character
    Leaf(u16),

    /// Index of another internal node
    Internal(usize),
}

impl Slot {
    /// Encoding used in the node array
    pub fn to_raw(self) -> i32 {
        match self {
            Slot::Leaf(symbol) => -1 - i32::from(symbol),
            Slot::Internal(index) => index as i32,
        }
    }
}

impl TryFrom<i32> for Slot {
    type Error = Error;

    fn try_from(raw: i32) -> Result<Self> {
        if raw >= 0 {
            return Ok(Slot::Internal(raw as usize));
        }

        u16::try_from(-1 - raw)
            .map(Slot::Leaf)
            .map_err(|_| Error::InvalidHuffmanLeaf(raw))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::huffman::{Slot, SymbolWidth};

    #[test]
    fn slot_encoding() -> Result<()> {
        assert_eq!(Slot::Leaf(0).to_raw(), -1);
        assert_eq!(Slot::Leaf(0x41).to_raw(), -66);
        assert_eq!(Slot::Internal(0).to_raw(), 0);

        assert_eq!(Slot::try_from(-1)?, Slot::Leaf(0));
        assert_eq!(Slot::try_from(-65536)?, Slot::Leaf(u16::MAX));
        assert_eq!(Slot::try_from(7)?, Slot::Internal(7));
        assert!(matches!(
            Slot::try_from(-65538),
            Err(Error::InvalidHuffmanLeaf(-65538))
        ));

        Ok(())
    }

    #[test]
    fn symbol_widths() -> Result<()> {
        let s = "a\u{e9}";
        assert_eq!(
            SymbolWidth::Byte.symbols(s).collect::<Vec<_>>(),
            [0x61, 0xC3, 0xA9]
        );
        assert_eq!(SymbolWidth::Unit.symbols(s).collect::<Vec<_>>(), [0x61, 0xE9]);

        assert_eq!(SymbolWidth::Byte.decode(&[0x61, 0xC3, 0xA9])?, s);
        assert_eq!(SymbolWidth::Unit.decode(&[0x61, 0xE9])?, s);
        assert!(SymbolWidth::Byte.decode(&[0x100]).is_err());

        Ok(())
    }
}
