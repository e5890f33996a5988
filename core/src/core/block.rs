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

//! Blocks and the mainchain reference data they embed. A sidechain block
//! carries ordinary transactions plus the outputs the mainchain produced
//! for this sidechain (forward transfers, sidechain creations) along with
//! the commitment witnesses withdrawal evidence is built from.

use byteorder::{BigEndian, ByteOrder};

use crate::core::boxes::CoinBox;
use crate::core::hash::{blake2b, DefaultHashable, Hash, Hashed};
use crate::core::merkle::{MerklePath, MerkleTree};
use crate::core::proposition::Proposition;
use crate::core::transaction::SidechainTransaction;
use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// A mainchain-originated deposit, materializing as a coin box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTransfer {
	/// Receiver on the sidechain
	pub proposition: Proposition,
	/// Deposited amount
	pub amount: u64,
	/// Mainchain address refunds go back to
	pub mc_return_address: [u8; 20],
}

impl ForwardTransfer {
	/// Digest committed for this transfer in the forward transfer subtree.
	pub fn leaf_digest(&self) -> Hash {
		let mut bytes = self.proposition.to_vec();
		let mut amount = [0; 8];
		BigEndian::write_u64(&mut amount, self.amount);
		bytes.extend_from_slice(&amount);
		bytes.extend_from_slice(&self.mc_return_address);
		blake2b(&bytes)
	}

	/// The coin box this transfer creates on the sidechain. The nonce is
	/// bound to the carrying transaction and the transfer's position so
	/// identical deposits stay distinct.
	pub fn to_box(&self, mc_tx_hash: &Hash, leaf_index: u32) -> CoinBox {
		let mut bytes = mc_tx_hash.to_vec();
		let mut idx = [0; 4];
		BigEndian::write_u32(&mut idx, leaf_index);
		bytes.extend_from_slice(&idx);
		CoinBox {
			proposition: self.proposition,
			value: self.amount,
			nonce: blake2b(&bytes).to_u64(),
		}
	}
}

impl Writeable for ForwardTransfer {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.proposition.write(writer)?;
		writer.write_u64(self.amount)?;
		writer.write_fixed_bytes(&self.mc_return_address)
	}
}

impl Readable for ForwardTransfer {
	fn read(reader: &mut dyn Reader) -> Result<ForwardTransfer, ser::Error> {
		let proposition = Proposition::read(reader)?;
		let amount = reader.read_u64()?;
		let addr = reader.read_fixed_bytes(20)?;
		let mut mc_return_address = [0; 20];
		mc_return_address.copy_from_slice(&addr);
		Ok(ForwardTransfer {
			proposition,
			amount,
			mc_return_address,
		})
	}
}

/// A sidechain bootstrap output observed on the mainchain. Never produces
/// withdrawal evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidechainCreation {
	/// Output version as declared on the mainchain
	pub version: u32,
	/// Initial deposit
	pub amount: u64,
	/// Genesis custom data
	pub custom_data: Vec<u8>,
}

impl Writeable for SidechainCreation {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32(self.version)?;
		writer.write_u64(self.amount)?;
		writer.write_bytes(&self.custom_data)
	}
}

impl Readable for SidechainCreation {
	fn read(reader: &mut dyn Reader) -> Result<SidechainCreation, ser::Error> {
		Ok(SidechainCreation {
			version: reader.read_u32()?,
			amount: reader.read_u64()?,
			custom_data: reader.read_bytes_len_prefix()?,
		})
	}
}

const FORWARD_TRANSFER_DISCRIMINANT: u8 = 0;
const SIDECHAIN_CREATION_DISCRIMINANT: u8 = 1;

/// An output of the mainchain aggregated transaction that concerns this
/// sidechain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidechainRelatedOutput {
	/// A deposit
	ForwardTransfer(ForwardTransfer),
	/// A bootstrap output
	SidechainCreation(SidechainCreation),
}

impl Writeable for SidechainRelatedOutput {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		match self {
			SidechainRelatedOutput::ForwardTransfer(ft) => {
				writer.write_u8(FORWARD_TRANSFER_DISCRIMINANT)?;
				ft.write(writer)
			}
			SidechainRelatedOutput::SidechainCreation(sc) => {
				writer.write_u8(SIDECHAIN_CREATION_DISCRIMINANT)?;
				sc.write(writer)
			}
		}
	}
}

impl Readable for SidechainRelatedOutput {
	fn read(reader: &mut dyn Reader) -> Result<SidechainRelatedOutput, ser::Error> {
		match reader.read_u8()? {
			FORWARD_TRANSFER_DISCRIMINANT => Ok(SidechainRelatedOutput::ForwardTransfer(
				ForwardTransfer::read(reader)?,
			)),
			SIDECHAIN_CREATION_DISCRIMINANT => Ok(SidechainRelatedOutput::SidechainCreation(
				SidechainCreation::read(reader)?,
			)),
			_ => Err(ser::Error::CorruptedData),
		}
	}
}

/// The sidechain-related outputs of one mainchain block, batched into a
/// single synthetic transaction by the mainchain commitment scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedTransaction {
	/// Hash of the mainchain transaction
	pub mc_tx_hash: Hash,
	/// Index of the transaction within its mainchain block
	pub tx_index: u32,
	/// Sidechain-related outputs, in mainchain order
	pub outputs: Vec<SidechainRelatedOutput>,
}

impl AggregatedTransaction {
	/// Tree over all forward transfer leaves, in output order. Sidechain
	/// creations are not committed here.
	pub fn ft_merkle_tree(&self) -> MerkleTree {
		let leaves = self
			.outputs
			.iter()
			.filter_map(|out| match out {
				SidechainRelatedOutput::ForwardTransfer(ft) => Some(ft.leaf_digest()),
				SidechainRelatedOutput::SidechainCreation(_) => None,
			})
			.collect();
		MerkleTree::new(leaves)
	}
}

impl Writeable for AggregatedTransaction {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.mc_tx_hash.write(writer)?;
		writer.write_u32(self.tx_index)?;
		self.outputs.write(writer)
	}
}

impl Readable for AggregatedTransaction {
	fn read(reader: &mut dyn Reader) -> Result<AggregatedTransaction, ser::Error> {
		Ok(AggregatedTransaction {
			mc_tx_hash: Hash::read(reader)?,
			tx_index: reader.read_u32()?,
			outputs: Vec::read(reader)?,
		})
	}
}

/// Data extracted from one referenced mainchain block: the aggregated
/// sidechain transaction, if any, and the commitment witnesses for this
/// sidechain within that block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainchainBlockReferenceData {
	/// Hash of the referenced mainchain block header
	pub header_hash: Hash,
	/// Sidechain-related outputs of the referenced block
	pub sidechain_related_aggregated_transaction: Option<AggregatedTransaction>,
	/// Path of this sidechain's commitment in the block's commitment tree
	pub sc_commitment_merkle_path: MerklePath,
	/// Backward transfer request subtree commitment
	pub btr_commitment: Hash,
	/// Certificate subtree commitment
	pub cert_commitment: Hash,
	/// Sidechain creation subtree commitment
	pub sc_cr_commitment: Hash,
}

impl Writeable for MainchainBlockReferenceData {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.header_hash.write(writer)?;
		self.sidechain_related_aggregated_transaction.write(writer)?;
		self.sc_commitment_merkle_path.write(writer)?;
		self.btr_commitment.write(writer)?;
		self.cert_commitment.write(writer)?;
		self.sc_cr_commitment.write(writer)
	}
}

impl Readable for MainchainBlockReferenceData {
	fn read(reader: &mut dyn Reader) -> Result<MainchainBlockReferenceData, ser::Error> {
		Ok(MainchainBlockReferenceData {
			header_hash: Hash::read(reader)?,
			sidechain_related_aggregated_transaction: Option::read(reader)?,
			sc_commitment_merkle_path: MerklePath::read(reader)?,
			btr_commitment: Hash::read(reader)?,
			cert_commitment: Hash::read(reader)?,
			sc_cr_commitment: Hash::read(reader)?,
		})
	}
}

/// Block header. The block id is the digest of this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
	/// Id of the parent block
	pub parent_id: Hash,
	/// Forging timestamp, determines the consensus epoch
	pub timestamp: u64,
	/// Proposition of the forger that produced the block, fee receiver
	pub forger_proposition: Proposition,
}

impl Writeable for BlockHeader {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.parent_id.write(writer)?;
		writer.write_u64(self.timestamp)?;
		self.forger_proposition.write(writer)
	}
}

impl Readable for BlockHeader {
	fn read(reader: &mut dyn Reader) -> Result<BlockHeader, ser::Error> {
		Ok(BlockHeader {
			parent_id: Hash::read(reader)?,
			timestamp: reader.read_u64()?,
			forger_proposition: Proposition::read(reader)?,
		})
	}
}

impl DefaultHashable for BlockHeader {}

/// A full sidechain block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
	/// The header
	pub header: BlockHeader,
	/// Sidechain transactions carried by the block
	pub transactions: Vec<SidechainTransaction>,
	/// Mainchain blocks referenced by this block, oldest first
	pub mainchain_block_references_data: Vec<MainchainBlockReferenceData>,
}

impl Block {
	/// Block identifier, the digest of the header.
	pub fn id(&self) -> Hash {
		self.header.hash()
	}

	/// Id of the parent block.
	pub fn parent_id(&self) -> Hash {
		self.header.parent_id
	}

	/// Forging timestamp.
	pub fn timestamp(&self) -> u64 {
		self.header.timestamp
	}

	/// Sum of the fees of all carried transactions.
	pub fn total_fees(&self) -> u64 {
		self.transactions.iter().map(|tx| tx.fee).sum()
	}
}

impl Writeable for Block {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.header.write(writer)?;
		self.transactions.write(writer)?;
		self.mainchain_block_references_data.write(writer)
	}
}

impl Readable for Block {
	fn read(reader: &mut dyn Reader) -> Result<Block, ser::Error> {
		Ok(Block {
			header: BlockHeader::read(reader)?,
			transactions: Vec::read(reader)?,
			mainchain_block_references_data: Vec::read(reader)?,
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn block_id_is_header_digest() {
		let header = BlockHeader {
			parent_id: blake2b(b"parent"),
			timestamp: 42,
			forger_proposition: Proposition::from_vec(b"forger"),
		};
		let block = Block {
			header: header.clone(),
			transactions: vec![],
			mainchain_block_references_data: vec![],
		};
		assert_eq!(block.id(), header.hash());
	}

	#[test]
	fn forward_transfer_box_nonce_depends_on_position() {
		let ft = ForwardTransfer {
			proposition: Proposition::from_vec(b"dest"),
			amount: 90,
			mc_return_address: [3; 20],
		};
		let tx_hash = blake2b(b"mctx");
		let a = ft.to_box(&tx_hash, 0);
		let b = ft.to_box(&tx_hash, 1);
		assert_ne!(a.nonce, b.nonce);
		assert_eq!(a.value, 90);
	}

	#[test]
	fn ft_tree_skips_sidechain_creations() {
		let ft = ForwardTransfer {
			proposition: Proposition::from_vec(b"dest"),
			amount: 5,
			mc_return_address: [0; 20],
		};
		let agg = AggregatedTransaction {
			mc_tx_hash: blake2b(b"tx"),
			tx_index: 0,
			outputs: vec![
				SidechainRelatedOutput::SidechainCreation(SidechainCreation {
					version: 1,
					amount: 0,
					custom_data: vec![],
				}),
				SidechainRelatedOutput::ForwardTransfer(ft.clone()),
			],
		};
		let tree = agg.ft_merkle_tree();
		assert_eq!(tree.leaves().len(), 1);
		assert_eq!(tree.leaves()[0], ft.leaf_digest());
	}
}
