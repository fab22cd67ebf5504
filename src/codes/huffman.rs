/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Huffman codes with an escape symbol.
//!
//! A [`HuffmanBuilder`] tallies the frequency of each symbol of a corpus and
//! decides, symbol by symbol, whether a dedicated code word pays for the space
//! its table entry takes. Symbols that do not pay are routed through a shared
//! escape symbol: they are written as the escape code followed by a literal
//! payload coded by the caller.
//!
//! Codes are read off the paths of the resulting tree (left is 0, right is 1),
//! and the tree is stored as an arena of nodes with parent links. Ties between
//! equal weights are broken by insertion order, so the same corpus always
//! yields the same table.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

use super::BitCode;
use crate::error::{Error, Result};
use crate::traits::{BitRead, BitWrite};

/// Default cost, in bits, of a table entry beyond the symbol itself.
pub const DEFAULT_ENTRY_OVERHEAD: usize = 8;

/// An estimate of the size, in bytes, of the serialized form of a symbol.
pub trait SizeEstimate {
    fn estimated_size(&self) -> usize;
}

macro_rules! impl_size_estimate {
    ($($ty:ty),*) => {$(
        impl SizeEstimate for $ty {
            #[inline(always)]
            fn estimated_size(&self) -> usize {
                core::mem::size_of::<$ty>()
            }
        }
    )*};
}

impl_size_estimate!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, char, bool, f32, f64
);

impl SizeEstimate for str {
    /// The bytes of the string plus a 32-bit length prefix.
    fn estimated_size(&self) -> usize {
        self.len() + core::mem::size_of::<u32>()
    }
}

impl SizeEstimate for String {
    fn estimated_size(&self) -> usize {
        self.as_str().estimated_size()
    }
}

impl SizeEstimate for [u8] {
    fn estimated_size(&self) -> usize {
        self.len() + core::mem::size_of::<u32>()
    }
}

impl SizeEstimate for Vec<u8> {
    fn estimated_size(&self) -> usize {
        self.as_slice().estimated_size()
    }
}

impl<T: SizeEstimate + ?Sized> SizeEstimate for &T {
    fn estimated_size(&self) -> usize {
        (**self).estimated_size()
    }
}

/// A node of a Huffman tree.
///
/// Leaves have a symbol and no children; internal nodes have two children and
/// no symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanNode<S> {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub parent: Option<usize>,
    pub symbol: Option<S>,
    pub weight: u64,
}

impl<S> HuffmanNode<S> {
    fn leaf(symbol: S, weight: u64) -> Self {
        Self {
            left: None,
            right: None,
            parent: None,
            symbol: Some(symbol),
            weight,
        }
    }

    /// Return whether the node is a leaf.
    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.symbol.is_some()
    }
}

/// Builds [`HuffmanTable`]s from a corpus of symbols.
///
/// A symbol `s` with frequency `f` and estimated size `b` bits
/// (`8 * s.estimated_size()`) gets its own code word only if
/// `b + entry_overhead < f * b`, that is, if storing it once in the table is
/// cheaper than repeating it as a literal after each escape code. In
/// particular, symbols occurring once are always escaped.
#[derive(Debug, Clone)]
pub struct HuffmanBuilder<S> {
    escape: S,
    entry_overhead: usize,
}

impl<S: SizeEstimate + Eq + Hash + Clone> HuffmanBuilder<S> {
    /// Create a builder using `escape` as escape symbol.
    pub fn new(escape: S) -> Self {
        Self {
            escape,
            entry_overhead: DEFAULT_ENTRY_OVERHEAD,
        }
    }

    /// Set the cost, in bits, of a table entry beyond the symbol itself.
    pub fn with_entry_overhead(mut self, bits: usize) -> Self {
        self.entry_overhead = bits;
        self
    }

    /// Return whether `symbol`, occurring `frequency` times, deserves a code
    /// word of its own.
    pub fn is_worth_coding(&self, symbol: &S, frequency: u64) -> bool {
        let bits = 8 * symbol.estimated_size() as u128;
        bits + (self.entry_overhead as u128) < frequency as u128 * bits
    }

    /// Tally the frequencies of `symbols`, in order of first appearance.
    pub fn count<I: IntoIterator<Item = S>>(&self, symbols: I) -> Vec<(S, u64)> {
        let mut index: HashMap<S, usize> = HashMap::new();
        let mut counts: Vec<(S, u64)> = Vec::new();
        for symbol in symbols {
            match index.get(&symbol) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(symbol.clone(), counts.len());
                    counts.push((symbol, 1));
                }
            }
        }
        counts
    }

    /// Build a table from a corpus of symbols.
    pub fn build<I: IntoIterator<Item = S>>(&self, symbols: I) -> Result<HuffmanTable<S>> {
        self.build_from_frequencies(self.count(symbols))
    }

    /// Build a table from `(symbol, frequency)` pairs.
    ///
    /// Leaves are created in the order of the pairs, with the escape leaf
    /// last; repeated symbols have their frequencies summed.
    pub fn build_from_frequencies<I: IntoIterator<Item = (S, u64)>>(
        &self,
        frequencies: I,
    ) -> Result<HuffmanTable<S>> {
        let mut index: HashMap<S, usize> = HashMap::new();
        let mut direct: Vec<(S, u64)> = Vec::new();
        for (symbol, frequency) in frequencies {
            match index.get(&symbol) {
                Some(&i) => direct[i].1 += frequency,
                None => {
                    index.insert(symbol.clone(), direct.len());
                    direct.push((symbol, frequency));
                }
            }
        }

        let mut escaped_weight = 0_u64;
        let mut nodes = Vec::with_capacity(2 * direct.len() + 1);
        for (symbol, frequency) in direct {
            if symbol != self.escape && self.is_worth_coding(&symbol, frequency) {
                nodes.push(HuffmanNode::leaf(symbol, frequency));
            } else {
                escaped_weight += frequency;
            }
        }
        nodes.push(HuffmanNode::leaf(self.escape.clone(), escaped_weight));
        let leaves = nodes.len();

        // node ids double as insertion sequence numbers
        let mut queue: BinaryHeap<Reverse<(u64, usize)>> = nodes
            .iter()
            .enumerate()
            .map(|(id, node)| Reverse((node.weight, id)))
            .collect();

        while let Some(Reverse((left_weight, left))) = queue.pop() {
            // the last node popped is the root
            let Some(Reverse((right_weight, right))) = queue.pop() else {
                break;
            };
            let id = nodes.len();
            nodes[left].parent = Some(id);
            nodes[right].parent = Some(id);
            let weight = left_weight + right_weight;
            nodes.push(HuffmanNode {
                left: Some(left),
                right: Some(right),
                parent: None,
                symbol: None,
                weight,
            });
            queue.push(Reverse((weight, id)));
        }
        let root = nodes.len() - 1;

        let mut entries = Vec::with_capacity(leaves);
        let mut index = HashMap::with_capacity(leaves);
        for leaf in 0..leaves {
            let code = path_code(&nodes, leaf)?;
            let symbol = nodes[leaf]
                .symbol
                .clone()
                .ok_or_else(|| Error::InvalidData("leaf without symbol".into()))?;
            index.insert(symbol.clone(), leaf);
            entries.push((symbol, code));
        }

        Ok(HuffmanTable {
            nodes,
            root,
            entries,
            index,
            escape: self.escape.clone(),
            escaped_weight,
        })
    }
}

/// Compute the code of a leaf by walking up to the root.
fn path_code<S>(nodes: &[HuffmanNode<S>], leaf: usize) -> Result<BitCode> {
    let mut value = 0_u64;
    let mut len = 0_usize;
    let mut current = leaf;
    while let Some(parent) = nodes[current].parent {
        if len == 64 {
            return Err(Error::InvalidData(
                "Huffman code longer than 64 bits".into(),
            ));
        }
        if nodes[parent].right == Some(current) {
            value |= 1 << len;
        }
        len += 1;
        current = parent;
    }
    Ok(BitCode::high(value, len as u8))
}

/// A Huffman code table together with its decoding tree.
///
/// Leaves are stored first in the node arena, in creation order, with the
/// escape leaf last among them; the root is the last node.
#[derive(Debug, Clone)]
pub struct HuffmanTable<S> {
    nodes: Vec<HuffmanNode<S>>,
    root: usize,
    entries: Vec<(S, BitCode)>,
    index: HashMap<S, usize>,
    escape: S,
    escaped_weight: u64,
}

impl<S: PartialEq> PartialEq for HuffmanTable<S> {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.nodes == other.nodes
            && self.entries == other.entries
            && self.escape == other.escape
            && self.escaped_weight == other.escaped_weight
    }
}

impl<S: Eq + Hash + Clone> HuffmanTable<S> {
    /// Return the code of `symbol`, if it has one of its own.
    ///
    /// The escape symbol always has a code.
    pub fn code(&self, symbol: &S) -> Option<&BitCode> {
        self.index.get(symbol).map(|&i| &self.entries[i].1)
    }

    /// Return whether `symbol` must be routed through the escape symbol.
    pub fn is_escaped(&self, symbol: &S) -> bool {
        *symbol == self.escape || !self.index.contains_key(symbol)
    }

    /// Return the escape symbol.
    pub fn escape(&self) -> &S {
        &self.escape
    }

    /// Return the code of the escape symbol.
    pub fn escape_code(&self) -> &BitCode {
        &self.entries[self.entries.len() - 1].1
    }

    /// Return the total frequency of escaped symbols.
    pub fn escaped_weight(&self) -> u64 {
        self.escaped_weight
    }

    /// Return the number of symbols with a code of their own, excluding the
    /// escape symbol.
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    /// Return whether every symbol is escaped.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over symbols and codes in leaf order (escape last).
    pub fn codes(&self) -> impl Iterator<Item = (&S, &BitCode)> {
        self.entries.iter().map(|(s, c)| (s, c))
    }

    /// Return the node arena.
    pub fn nodes(&self) -> &[HuffmanNode<S>] {
        &self.nodes
    }

    /// Return the index of the root in the node arena.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Write the code of `symbol` and return the number of bits written.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `symbol` has no code of its own.
    pub fn encode<W: BitWrite + ?Sized>(&self, symbol: &S, writer: &mut W) -> Result<usize> {
        let code = self.code(symbol).ok_or_else(|| {
            Error::InvalidArgument("symbol must be routed through the escape".into())
        })?;
        writer.write_code(code)
    }

    /// Write `symbol`, routing it through the escape if needed; in that case
    /// `literal` writes its payload after the escape code.
    pub fn encode_with_escape<W, F>(&self, symbol: &S, writer: &mut W, literal: F) -> Result<usize>
    where
        W: BitWrite + ?Sized,
        F: FnOnce(&mut W, &S) -> Result<usize>,
    {
        if self.is_escaped(symbol) {
            Ok(writer.write_code(self.escape_code())? + literal(writer, symbol)?)
        } else {
            self.encode(symbol, writer)
        }
    }

    /// Read one code, walking the tree from the root, and return its symbol.
    ///
    /// The result may be the escape symbol, in which case the caller must
    /// read the literal payload that follows.
    pub fn decode<R: BitRead + ?Sized>(&self, reader: &mut R) -> Result<&S> {
        let mut node = &self.nodes[self.root];
        loop {
            if let Some(symbol) = &node.symbol {
                return Ok(symbol);
            }
            let next = if reader.read_bit()? {
                node.right
            } else {
                node.left
            };
            let next = next.ok_or_else(|| Error::InvalidData("broken Huffman tree".into()))?;
            node = &self.nodes[next];
        }
    }

    /// Read a symbol written by [`encode_with_escape`](Self::encode_with_escape);
    /// `literal` reads the payload following an escape code.
    pub fn decode_with_escape<R, F>(&self, reader: &mut R, literal: F) -> Result<S>
    where
        R: BitRead + ?Sized,
        F: FnOnce(&mut R) -> Result<S>,
    {
        let symbol = self.decode(reader)?;
        if *symbol == self.escape {
            literal(reader)
        } else {
            Ok(symbol.clone())
        }
    }
}
