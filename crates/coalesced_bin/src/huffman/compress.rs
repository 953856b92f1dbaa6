use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::huffman::{Slot, SymbolWidth};

const TERMINATOR: u16 = 0;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        symbol: u16,
        weight: u64,
    },
    Internal {
        weight: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }
}

/// Path from the root to a leaf, first step in the lowest bit
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct ChainCode {
    bits: u64,
    length: u32,
}

impl ChainCode {
    fn left(self) -> Result<Self> {
        self.step(false)
    }

    fn right(self) -> Result<Self> {
        self.step(true)
    }

    fn step(self, bit: bool) -> Result<Self> {
        if self.length >= u64::BITS {
            return Err(Error::CodeTooLong);
        }

        Ok(Self {
            bits: self.bits | (u64::from(bit) << self.length),
            length: self.length + 1,
        })
    }
}

#[derive(Debug, Default)]
struct BitWriter {
    data: Vec<u8>,
    position: u64,
}

impl BitWriter {
    fn write(&mut self, code: ChainCode) {
        for i in 0..code.length {
            let bit = (self.position % 8) as u8;
            if bit == 0 {
                self.data.push(0);
            }
            if code.bits & (1 << i) != 0 {
                if let Some(byte) = self.data.last_mut() {
                    *byte |= 1 << bit;
                }
            }
            self.position += 1;
        }
    }
}

/// Builds a tree over every distinct string added and packs them into one blob
///
/// ```
/// # fn doit() -> coalesced_bin::error::Result<()> {
/// use coalesced_bin::huffman::{HuffmanCompressor, HuffmanDecompressor, SymbolWidth};
///
/// let mut compressor = HuffmanCompressor::new(SymbolWidth::Byte);
/// compressor.add("Hello");
/// compressor.add("World");
/// compressor.compress()?;
///
/// let decompressor = HuffmanDecompressor::new(
///     SymbolWidth::Byte,
///     &compressor.raw_nodes(),
///     compressor.compressed_data().to_vec(),
/// )?;
/// assert_eq!(decompressor.get_string(compressor.position("World")?)?, "World");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct HuffmanCompressor {
    width: SymbolWidth,
    strings: IndexMap<String, u64>,
    nodes: Vec<[Slot; 2]>,
    compressed: Vec<u8>,
}

impl HuffmanCompressor {
    pub fn new(width: SymbolWidth) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    /// Register a string; adding it again has no effect.
    pub fn add(&mut self, s: &str) {
        if !self.strings.contains_key(s) {
            self.strings.insert(s.to_owned(), 0);
        }
    }

    /// Number of distinct strings added
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether no strings were added
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Build the tree and pack every string, in the order they were first added.
    #[instrument(skip(self), err, fields(strings = self.strings.len()))]
    pub fn compress(&mut self) -> Result<()> {
        let root = build_tree(self.weights());

        let mut codes = HashMap::new();
        assign_codes(&root, ChainCode::default(), &mut codes)?;

        self.nodes.clear();
        flatten(&root, &mut self.nodes);

        let code = |symbol: u16| {
            codes
                .get(&symbol)
                .copied()
                .ok_or(Error::MissingHuffmanCode(symbol))
        };
        let terminator = code(TERMINATOR)?;

        let width = self.width;
        let mut bits = BitWriter::default();
        for (s, position) in self.strings.iter_mut() {
            *position = bits.position;
            for symbol in width.symbols(s) {
                bits.write(code(symbol)?);
            }
            bits.write(terminator);
        }

        debug!(
            nodes = self.nodes.len(),
            bits = bits.position,
            bytes = bits.data.len(),
            "compressed values"
        );
        self.compressed = bits.data;
        Ok(())
    }

    /// Bit position of a string in the compressed data
    pub fn position(&self, s: &str) -> Result<u64> {
        self.strings
            .get(s)
            .copied()
            .ok_or_else(|| Error::UnknownString(s.to_owned()))
    }

    /// Internal nodes in post-order, root last
    pub fn nodes(&self) -> &[[Slot; 2]] {
        &self.nodes
    }

    /// Node pairs flattened into the signed form stored on disk
    pub fn raw_nodes(&self) -> Vec<i32> {
        self.nodes
            .iter()
            .flat_map(|pair| pair.map(Slot::to_raw))
            .collect()
    }

    pub fn compressed_data(&self) -> &[u8] {
        &self.compressed
    }

    /// Occurrences of every character, plus one terminator per string, in first seen order
    fn weights(&self) -> IndexMap<u16, u64> {
        let mut weights = IndexMap::new();
        for s in self.strings.keys() {
            for symbol in self.width.symbols(s).chain([TERMINATOR]) {
                *weights.entry(symbol).or_insert(0) += 1;
            }
        }
        weights
    }
}

fn build_tree(weights: IndexMap<u16, u64>) -> Node {
    let mut leaves = weights
        .into_iter()
        .map(|(symbol, weight)| Node::Leaf { symbol, weight })
        .collect::<Vec<_>>();
    leaves.sort_by_key(Node::weight);

    let mut queue = VecDeque::from(leaves);
    loop {
        let left = queue.pop_front().unwrap_or(Node::Leaf {
            symbol: TERMINATOR,
            weight: 0,
        });

        let Some(right) = queue.pop_front() else {
            return match left {
                // a lone leaf still needs a node to hang from
                leaf @ Node::Leaf { .. } => Node::Internal {
                    weight: leaf.weight(),
                    left: Box::new(leaf.clone()),
                    right: Box::new(leaf),
                },
                root => root,
            };
        };

        let node = Node::Internal {
            weight: left.weight() + right.weight(),
            left: Box::new(left),
            right: Box::new(right),
        };

        // after every node of equal weight
        let index = queue
            .iter()
            .position(|n| n.weight() > node.weight())
            .unwrap_or(queue.len());
        queue.insert(index, node);
    }
}

fn assign_codes(node: &Node, code: ChainCode, codes: &mut HashMap<u16, ChainCode>) -> Result<()> {
    match node {
        Node::Leaf { symbol, .. } => {
            codes.entry(*symbol).or_insert(code);
            Ok(())
        }
        Node::Internal { left, right, .. } => {
            assign_codes(left, code.left()?, codes)?;
            assign_codes(right, code.right()?, codes)
        }
    }
}

fn flatten(node: &Node, nodes: &mut Vec<[Slot; 2]>) -> Slot {
    match node {
        Node::Leaf { symbol, .. } => Slot::Leaf(*symbol),
        Node::Internal { left, right, .. } => {
            let pair = [flatten(left, nodes), flatten(right, nodes)];
            nodes.push(pair);
            Slot::Internal(nodes.len() - 1)
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::{assert_eq, assert_str_eq};
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::huffman::{HuffmanCompressor, HuffmanDecompressor, Slot, SymbolWidth};

    fn compressed(width: SymbolWidth, strings: &[&str]) -> Result<HuffmanCompressor> {
        let mut compressor = HuffmanCompressor::new(width);
        for s in strings {
            compressor.add(s);
        }
        compressor.compress()?;
        Ok(compressor)
    }

    #[traced_test]
    #[test]
    fn known_tree_and_bits() -> Result<()> {
        let compressor = compressed(SymbolWidth::Byte, &["ab", "b", "ab"])?;

        assert_eq!(compressor.len(), 2);
        assert_eq!(
            compressor.nodes(),
            [
                [Slot::Leaf(b'a'.into()), Slot::Leaf(b'b'.into())],
                [Slot::Leaf(0), Slot::Internal(0)],
            ]
        );
        assert_eq!(compressor.raw_nodes(), [-98, -99, -1, 0]);

        // "ab" = 10 11 0, "b" = 11 0
        assert_str_eq!(
            format!("{:02X?}", compressor.compressed_data()),
            format!("{:02X?}", [0x6Du8])
        );
        assert_eq!(compressor.position("ab")?, 0);
        assert_eq!(compressor.position("b")?, 5);

        Ok(())
    }

    #[test]
    fn single_character_tree() -> Result<()> {
        let compressor = compressed(SymbolWidth::Byte, &["aaa"])?;

        assert_eq!(
            compressor.nodes(),
            [[Slot::Leaf(0), Slot::Leaf(b'a'.into())]]
        );
        assert_eq!(compressor.compressed_data(), [0x07]);

        Ok(())
    }

    #[test]
    fn lone_leaf_is_wrapped() -> Result<()> {
        let compressor = compressed(SymbolWidth::Byte, &[""])?;
        assert_eq!(compressor.nodes(), [[Slot::Leaf(0), Slot::Leaf(0)]]);
        assert_eq!(compressor.compressed_data(), [0x00]);

        let empty = compressed(SymbolWidth::Byte, &[])?;
        assert_eq!(empty.nodes(), [[Slot::Leaf(0), Slot::Leaf(0)]]);
        assert!(empty.compressed_data().is_empty());

        Ok(())
    }

    #[test]
    fn equal_weights_keep_first_seen_order() -> Result<()> {
        // every character appears once, as does the terminator
        let compressor = compressed(SymbolWidth::Byte, &["xy"])?;

        // x+y combine first, then the terminator joins them
        assert_eq!(
            compressor.nodes(),
            [
                [Slot::Leaf(b'x'.into()), Slot::Leaf(b'y'.into())],
                [Slot::Leaf(0), Slot::Internal(0)],
            ]
        );

        Ok(())
    }

    #[traced_test]
    #[test]
    fn every_string_decodes_from_its_position() -> Result<()> {
        let strings = [
            "..\\..\\Engine\\Config\\BaseEngine.ini",
            "True",
            "False",
            "(Name=\"Default\",Weight=1.0)",
            "",
            "caf\u{e9} \u{3042}",
            "tab\there\r\n",
        ];

        for width in [SymbolWidth::Byte, SymbolWidth::Unit] {
            let compressor = compressed(width, &strings)?;
            let decompressor = HuffmanDecompressor::new(
                width,
                &compressor.raw_nodes(),
                compressor.compressed_data().to_vec(),
            )?;

            for s in strings {
                assert_eq!(decompressor.get_string(compressor.position(s)?)?, s);
            }
        }

        Ok(())
    }

    #[test]
    fn unknown_string_has_no_position() -> Result<()> {
        let compressor = compressed(SymbolWidth::Byte, &["a"])?;
        assert!(matches!(
            compressor.position("b"),
            Err(Error::UnknownString(s)) if s == "b"
        ));

        Ok(())
    }
}
