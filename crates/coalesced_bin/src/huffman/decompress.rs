use crate::error::{Error, Result};
use crate::huffman::{Slot, SymbolWidth};

/// Random access decoding of strings packed by [`super::HuffmanCompressor`]
#[derive(Debug, Clone)]
pub struct HuffmanDecompressor {
    width: SymbolWidth,
    nodes: Vec<[Slot; 2]>,
    data: Vec<u8>,
}

impl HuffmanDecompressor {
    /// Prepare a decoder from the signed node pairs stored on disk and the packed data.
    ///
    /// No pairs at all is a tree whose root is the terminator itself, written when every
    /// value is empty.
    pub fn new(width: SymbolWidth, raw_nodes: &[i32], data: Vec<u8>) -> Result<Self> {
        let nodes = raw_nodes
            .chunks_exact(2)
            .map(|pair| Ok([Slot::try_from(pair[0])?, Slot::try_from(pair[1])?]))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { width, nodes, data })
    }

    /// Number of internal nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no internal nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Decode the string whose code starts at `bit_offset`.
    ///
    /// Decoding stops at the terminator, or silently at the end of the data.
    pub fn get_string(&self, bit_offset: u64) -> Result<String> {
        let end = self.data.len() as u64 * 8;
        let Some(root) = self.nodes.len().checked_sub(1) else {
            // only the empty string has a code, and it takes no bits
            return match bit_offset {
                0 => Ok(String::new()),
                _ => Err(Error::ValueOffsetOutOfRange {
                    offset: bit_offset,
                    bits: end,
                }),
            };
        };

        let mut symbols = Vec::new();
        let mut node = root;
        let mut position = bit_offset;

        while position < end {
            let byte = self.data[(position / 8) as usize];
            let bit = byte & (1 << (position % 8)) != 0;
            position += 1;

            match self.nodes[node][usize::from(bit)] {
                Slot::Leaf(0) => break,
                Slot::Leaf(symbol) => {
                    symbols.push(symbol);
                    node = root;
                }
                Slot::Internal(next) if next < self.nodes.len() => node = next,
                Slot::Internal(next) => {
                    return Err(Error::HuffmanNodeOutOfRange {
                        node: next,
                        nodes: self.nodes.len(),
                    })
                }
            }
        }

        self.width.decode(&symbols)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, ErrorKind, Result};
    use crate::huffman::{HuffmanDecompressor, SymbolWidth};

    fn decompressor(raw: &[i32], data: &[u8]) -> Result<HuffmanDecompressor> {
        HuffmanDecompressor::new(SymbolWidth::Byte, raw, data.to_vec())
    }

    #[test]
    fn decode_known_bits() -> Result<()> {
        // node 0: 'a' | 'b', node 1 (root): NUL | node 0
        let huffman = decompressor(&[-98, -99, -1, 0], &[0x6D])?;

        assert_eq!(huffman.len(), 2);
        assert_eq!(huffman.get_string(0)?, "ab");
        assert_eq!(huffman.get_string(5)?, "b");
        assert_eq!(huffman.get_string(4)?, "");

        Ok(())
    }

    #[test]
    fn end_of_data_ends_the_string() -> Result<()> {
        // every bit is 1, so no terminator is ever reached
        let huffman = decompressor(&[-98, -99, -1, 0], &[0xFF])?;
        assert_eq!(huffman.get_string(0)?, "bbbb");
        assert_eq!(huffman.get_string(64)?, "");

        Ok(())
    }

    #[test]
    fn node_index_out_of_range() {
        let huffman = decompressor(&[-98, 9, -1, 0], &[0x03]);
        let err = huffman.and_then(|h| h.get_string(0)).err();

        assert!(matches!(
            err,
            Some(Error::HuffmanNodeOutOfRange { node: 9, nodes: 2 })
        ));
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Integrity));
    }

    #[test]
    fn empty_tree_holds_only_the_empty_string() -> Result<()> {
        let huffman = decompressor(&[], &[])?;

        assert!(huffman.is_empty());
        assert_eq!(huffman.get_string(0)?, "");

        let err = huffman.get_string(3).err();
        assert!(matches!(
            err,
            Some(Error::ValueOffsetOutOfRange { offset: 3, bits: 0 })
        ));
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Integrity));

        Ok(())
    }
}
