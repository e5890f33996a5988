// Copyright 2021 The Latus Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Binary Merkle trees and inclusion paths. Used for the forging stake
//! snapshot of a consensus epoch and for the UTXO set commitment handed to
//! the wallet at the end of a withdrawal epoch. An odd node at any level is
//! paired with itself.

use crate::core::hash::{Hash, HashWriter};
use crate::ser::{self, Readable, Reader, Writeable, Writer};

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
	let mut hasher = HashWriter::default();
	hasher.write_fixed_bytes(left).unwrap();
	hasher.write_fixed_bytes(right).unwrap();
	hasher.into_hash()
}

/// One step of a Merkle inclusion path: the sibling digest and the side it
/// sits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePathElement {
	/// Digest of the sibling subtree
	pub sibling: Hash,
	/// Whether the sibling is the left operand of the pair hash
	pub sibling_on_left: bool,
}

/// An inclusion path from a leaf up to a Merkle root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MerklePath {
	/// Path elements, leaf level first
	pub elements: Vec<MerklePathElement>,
}

impl MerklePath {
	/// Root obtained by folding the path over the provided leaf digest.
	pub fn apply(&self, leaf: &Hash) -> Hash {
		let mut acc = *leaf;
		for elmt in &self.elements {
			acc = if elmt.sibling_on_left {
				hash_pair(&elmt.sibling, &acc)
			} else {
				hash_pair(&acc, &elmt.sibling)
			};
		}
		acc
	}

	/// Whether this path proves `leaf` under `root`.
	pub fn verify(&self, leaf: &Hash, root: &Hash) -> bool {
		self.apply(leaf) == *root
	}
}

impl Writeable for MerklePathElement {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.sibling.write(writer)?;
		writer.write_u8(self.sibling_on_left as u8)
	}
}

impl Readable for MerklePathElement {
	fn read(reader: &mut dyn Reader) -> Result<MerklePathElement, ser::Error> {
		let sibling = Hash::read(reader)?;
		let sibling_on_left = match reader.read_u8()? {
			0 => false,
			1 => true,
			_ => return Err(ser::Error::CorruptedData),
		};
		Ok(MerklePathElement {
			sibling,
			sibling_on_left,
		})
	}
}

impl Writeable for MerklePath {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.elements.write(writer)
	}
}

impl Readable for MerklePath {
	fn read(reader: &mut dyn Reader) -> Result<MerklePath, ser::Error> {
		Ok(MerklePath {
			elements: Vec::read(reader)?,
		})
	}
}

/// A fully materialized binary Merkle tree, retaining every level so
/// inclusion paths can be produced for any leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
	levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
	/// Builds the tree over the provided leaf digests. An empty leaf set
	/// produces a single zero root.
	pub fn new(leaves: Vec<Hash>) -> MerkleTree {
		let base = if leaves.is_empty() {
			vec![Hash::default()]
		} else {
			leaves
		};
		let mut levels = vec![base];
		while levels.last().unwrap().len() > 1 {
			let prev = levels.last().unwrap();
			let mut next = Vec::with_capacity((prev.len() + 1) / 2);
			for pair in prev.chunks(2) {
				let right = if pair.len() == 2 { &pair[1] } else { &pair[0] };
				next.push(hash_pair(&pair[0], right));
			}
			levels.push(next);
		}
		MerkleTree { levels }
	}

	/// The root digest.
	pub fn root(&self) -> Hash {
		self.levels.last().unwrap()[0]
	}

	/// The leaf digests the tree was built over.
	pub fn leaves(&self) -> &[Hash] {
		&self.levels[0]
	}

	/// Index of the provided leaf digest, if present.
	pub fn leaf_index(&self, leaf: &Hash) -> Option<usize> {
		self.leaves().iter().position(|l| l == leaf)
	}

	/// Inclusion path for the leaf at `leaf_idx`.
	pub fn path(&self, leaf_idx: usize) -> Option<MerklePath> {
		if leaf_idx >= self.leaves().len() {
			return None;
		}
		let mut elements = vec![];
		let mut idx = leaf_idx;
		for level in &self.levels[..self.levels.len() - 1] {
			let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
			// odd node at the end of a level pairs with itself
			let sibling = *level.get(sibling_idx).unwrap_or(&level[idx]);
			elements.push(MerklePathElement {
				sibling,
				sibling_on_left: idx % 2 == 1,
			});
			idx /= 2;
		}
		Some(MerklePath { elements })
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::core::hash::blake2b;

	#[test]
	fn single_leaf_tree() {
		let leaf = blake2b(b"only");
		let tree = MerkleTree::new(vec![leaf]);
		assert_eq!(tree.root(), leaf);
		let path = tree.path(0).unwrap();
		assert!(path.elements.is_empty());
		assert!(path.verify(&leaf, &tree.root()));
	}

	#[test]
	fn every_leaf_verifies() {
		for n in 2..9 {
			let leaves: Vec<Hash> = (0..n).map(|i| blake2b(&[i as u8])).collect();
			let tree = MerkleTree::new(leaves.clone());
			for (i, leaf) in leaves.iter().enumerate() {
				let path = tree.path(i).unwrap();
				assert!(path.verify(leaf, &tree.root()), "leaf {} of {}", i, n);
			}
		}
	}

	#[test]
	fn wrong_leaf_fails() {
		let leaves: Vec<Hash> = (0..5).map(|i| blake2b(&[i as u8])).collect();
		let tree = MerkleTree::new(leaves);
		let path = tree.path(2).unwrap();
		assert!(!path.verify(&blake2b(b"other"), &tree.root()));
	}

	#[test]
	fn path_out_of_range() {
		let tree = MerkleTree::new(vec![blake2b(b"a")]);
		assert!(tree.path(1).is_none());
	}

	#[test]
	fn path_round_trips_through_ser() {
		let leaves: Vec<Hash> = (0..4).map(|i| blake2b(&[i as u8])).collect();
		let tree = MerkleTree::new(leaves.clone());
		let path = tree.path(3).unwrap();
		let bytes = crate::ser::ser_vec(&path).unwrap();
		let out: MerklePath = crate::ser::deserialize(&mut &bytes[..]).unwrap();
		assert_eq!(out, path);
		assert!(out.verify(&leaves[3], &tree.root()));
	}
}
