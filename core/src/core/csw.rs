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

//! Ceased-sidechain-withdrawal evidence. If the sidechain halts, owners
//! redeem funds on the mainchain by exhibiting either a utxo inclusion
//! proof against the last certified UTXO commitment, or a forward transfer
//! inclusion proof against the mainchain commitment tree. The wallet
//! materializes both flavours at the end of every withdrawal epoch.

use std::collections::HashMap;

use crate::core::boxes::BoxId;
use crate::core::hash::{blake2b, Hash};
use crate::core::merkle::{MerklePath, MerkleTree};
use crate::core::proposition::Proposition;
use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// Withdrawal evidence for a coin box held in the UTXO set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoCswData {
	/// Id of the box
	pub box_id: BoxId,
	/// Owner of the box
	pub proposition: Proposition,
	/// Amount held
	pub value: u64,
	/// Box nonce
	pub nonce: u64,
	/// Digest of any application-defined fields of the box
	pub custom_fields_hash: Hash,
	/// Path of the box leaf in the UTXO commitment tree
	pub utxo_merkle_path: MerklePath,
}

impl Writeable for UtxoCswData {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.box_id.write(writer)?;
		self.proposition.write(writer)?;
		writer.write_u64(self.value)?;
		writer.write_u64(self.nonce)?;
		self.custom_fields_hash.write(writer)?;
		self.utxo_merkle_path.write(writer)
	}
}

impl Readable for UtxoCswData {
	fn read(reader: &mut dyn Reader) -> Result<UtxoCswData, ser::Error> {
		Ok(UtxoCswData {
			box_id: BoxId::read(reader)?,
			proposition: Proposition::read(reader)?,
			value: reader.read_u64()?,
			nonce: reader.read_u64()?,
			custom_fields_hash: Hash::read(reader)?,
			utxo_merkle_path: MerklePath::read(reader)?,
		})
	}
}

/// Withdrawal evidence for a wallet-owned forward transfer observed in a
/// mainchain block reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtCswData {
	/// Id of the box the forward transfer materialized as
	pub box_id: BoxId,
	/// Transferred amount
	pub amount: u64,
	/// Receiver of the transfer
	pub proposition: Proposition,
	/// Mainchain address refunds go back to
	pub mc_return_address: [u8; 20],
	/// Hash of the mainchain transaction carrying the transfer
	pub tx_hash: Hash,
	/// Index of that transaction within its mainchain block
	pub tx_index: u32,
	/// Index of this transfer among ALL forward transfer outputs of the
	/// aggregated transaction, wallet-owned or not
	pub ft_leaf_index: u32,
	/// Path of the sidechain commitment in the mainchain commitment tree
	pub sc_commitment_merkle_path: MerklePath,
	/// Backward transfer request subtree commitment
	pub btr_commitment: Hash,
	/// Certificate subtree commitment
	pub cert_commitment: Hash,
	/// Sidechain creation subtree commitment
	pub sc_cr_commitment: Hash,
	/// Path of the transfer leaf in the forward transfer subtree
	pub ft_merkle_path: MerklePath,
}

impl Writeable for FtCswData {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.box_id.write(writer)?;
		writer.write_u64(self.amount)?;
		self.proposition.write(writer)?;
		writer.write_fixed_bytes(&self.mc_return_address)?;
		self.tx_hash.write(writer)?;
		writer.write_u32(self.tx_index)?;
		writer.write_u32(self.ft_leaf_index)?;
		self.sc_commitment_merkle_path.write(writer)?;
		self.btr_commitment.write(writer)?;
		self.cert_commitment.write(writer)?;
		self.sc_cr_commitment.write(writer)?;
		self.ft_merkle_path.write(writer)
	}
}

impl Readable for FtCswData {
	fn read(reader: &mut dyn Reader) -> Result<FtCswData, ser::Error> {
		let box_id = BoxId::read(reader)?;
		let amount = reader.read_u64()?;
		let proposition = Proposition::read(reader)?;
		let addr_bytes = reader.read_fixed_bytes(20)?;
		let mut mc_return_address = [0; 20];
		mc_return_address.copy_from_slice(&addr_bytes);
		Ok(FtCswData {
			box_id,
			amount,
			proposition,
			mc_return_address,
			tx_hash: Hash::read(reader)?,
			tx_index: reader.read_u32()?,
			ft_leaf_index: reader.read_u32()?,
			sc_commitment_merkle_path: MerklePath::read(reader)?,
			btr_commitment: Hash::read(reader)?,
			cert_commitment: Hash::read(reader)?,
			sc_cr_commitment: Hash::read(reader)?,
			ft_merkle_path: MerklePath::read(reader)?,
		})
	}
}

const UTXO_CSW_DISCRIMINANT: u8 = 0;
const FT_CSW_DISCRIMINANT: u8 = 1;

/// Either flavour of withdrawal evidence, stored per withdrawal epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CswData {
	/// Evidence for a held utxo
	Utxo(UtxoCswData),
	/// Evidence for an observed forward transfer
	Ft(FtCswData),
}

impl Writeable for CswData {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		match self {
			CswData::Utxo(data) => {
				writer.write_u8(UTXO_CSW_DISCRIMINANT)?;
				data.write(writer)
			}
			CswData::Ft(data) => {
				writer.write_u8(FT_CSW_DISCRIMINANT)?;
				data.write(writer)
			}
		}
	}
}

impl Readable for CswData {
	fn read(reader: &mut dyn Reader) -> Result<CswData, ser::Error> {
		match reader.read_u8()? {
			UTXO_CSW_DISCRIMINANT => Ok(CswData::Utxo(UtxoCswData::read(reader)?)),
			FT_CSW_DISCRIMINANT => Ok(CswData::Ft(FtCswData::read(reader)?)),
			_ => Err(ser::Error::CorruptedData),
		}
	}
}

/// A point-in-time view over the UTXO commitment tree, handed to the wallet
/// by value when a withdrawal epoch closes so it can extract inclusion
/// paths for the boxes it holds without ever referencing the state.
#[derive(Debug, Clone)]
pub struct UtxoMerkleTreeView {
	tree: MerkleTree,
	positions: HashMap<BoxId, usize>,
}

impl UtxoMerkleTreeView {
	/// Builds the view from the (box id, leaf digest) pairs of the full box
	/// set, in the state's canonical leaf order.
	pub fn new(leaves: Vec<(BoxId, Hash)>) -> UtxoMerkleTreeView {
		let positions = leaves
			.iter()
			.enumerate()
			.map(|(pos, (id, _))| (*id, pos))
			.collect();
		let tree = MerkleTree::new(leaves.into_iter().map(|(_, leaf)| leaf).collect());
		UtxoMerkleTreeView { tree, positions }
	}

	/// Root of the commitment tree.
	pub fn root(&self) -> Hash {
		self.tree.root()
	}

	/// Inclusion path of the given box, if it is part of the committed set.
	pub fn merkle_path(&self, box_id: &BoxId) -> Option<MerklePath> {
		self.positions.get(box_id).and_then(|pos| self.tree.path(*pos))
	}

	/// Leaf digest committed for a box: the digest of its id. Application
	/// custom fields are folded in by the caller before committing.
	pub fn leaf_digest(box_id: &BoxId) -> Hash {
		blake2b(box_id.as_ref())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn view_produces_verifiable_paths() {
		let ids: Vec<BoxId> = (0..5u8).map(|i| blake2b(&[i])).collect();
		let leaves: Vec<(BoxId, Hash)> = ids
			.iter()
			.map(|id| (*id, UtxoMerkleTreeView::leaf_digest(id)))
			.collect();
		let view = UtxoMerkleTreeView::new(leaves);
		for id in &ids {
			let path = view.merkle_path(id).unwrap();
			assert!(path.verify(&UtxoMerkleTreeView::leaf_digest(id), &view.root()));
		}
		assert!(view.merkle_path(&blake2b(b"unknown")).is_none());
	}

	#[test]
	fn csw_data_ser_round_trip() {
		let data = CswData::Utxo(UtxoCswData {
			box_id: blake2b(b"box"),
			proposition: Proposition::from_vec(b"p"),
			value: 12,
			nonce: 7,
			custom_fields_hash: blake2b(b"custom"),
			utxo_merkle_path: MerklePath::default(),
		});
		let bytes = crate::ser::ser_vec(&data).unwrap();
		let out: CswData = crate::ser::deserialize(&mut &bytes[..]).unwrap();
		assert_eq!(out, data);
	}
}
