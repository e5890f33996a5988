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

//! Base types that the block chain pipeline requires.

use crate::core::core::block::Block;
use crate::core::core::hash::Hash;
use crate::core::core::proposition::Proposition;
use crate::core::ser::{self, Readable, Reader, Writeable, Writer};

/// What history knows about a block's standing in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierSemanticValidity {
	/// Not yet applied to the state
	Unknown,
	/// Applied and accepted
	Valid,
	/// Rejected by the state
	Invalid,
}

impl Writeable for ModifierSemanticValidity {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		let discriminant = match self {
			ModifierSemanticValidity::Unknown => 0,
			ModifierSemanticValidity::Valid => 1,
			ModifierSemanticValidity::Invalid => 2,
		};
		writer.write_u8(discriminant)
	}
}

impl Readable for ModifierSemanticValidity {
	fn read(reader: &mut dyn Reader) -> Result<ModifierSemanticValidity, ser::Error> {
		match reader.read_u8()? {
			0 => Ok(ModifierSemanticValidity::Unknown),
			1 => Ok(ModifierSemanticValidity::Valid),
			2 => Ok(ModifierSemanticValidity::Invalid),
			_ => Err(ser::Error::CorruptedData),
		}
	}
}

/// Per-block record kept by history next to the block itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
	/// Height of the block, genesis being 0
	pub height: u64,
	/// Id of the parent block
	pub parent_id: Hash,
	/// Standing of the block
	pub semantic_validity: ModifierSemanticValidity,
}

impl Writeable for BlockInfo {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u64(self.height)?;
		self.parent_id.write(writer)?;
		self.semantic_validity.write(writer)
	}
}

impl Readable for BlockInfo {
	fn read(reader: &mut dyn Reader) -> Result<BlockInfo, ser::Error> {
		Ok(BlockInfo {
			height: reader.read_u64()?,
			parent_id: Hash::read(reader)?,
			semantic_validity: ModifierSemanticValidity::read(reader)?,
		})
	}
}

/// The fees one block collected and who forged it. Aggregated into the fee
/// payment boxes of the closing withdrawal epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFeeInfo {
	/// Total transaction fees of the block
	pub fee: u64,
	/// Proposition of the forger that produced the block
	pub forger_proposition: Proposition,
}

impl Writeable for BlockFeeInfo {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u64(self.fee)?;
		self.forger_proposition.write(writer)
	}
}

impl Readable for BlockFeeInfo {
	fn read(reader: &mut dyn Reader) -> Result<BlockFeeInfo, ser::Error> {
		Ok(BlockFeeInfo {
			fee: reader.read_u64()?,
			forger_proposition: Proposition::read(reader)?,
		})
	}
}

/// History's description of the delta between the current best chain and a
/// newly offered block: what to roll back, what to apply, and where the
/// chains part ways.
#[derive(Debug, Clone, Default)]
pub struct ProgressInfo {
	/// Last common ancestor when a chain switch is needed
	pub branch_point: Option<Hash>,
	/// Best-chain blocks to take back out, oldest first
	pub to_remove: Vec<Block>,
	/// Blocks to apply, oldest first
	pub to_apply: Vec<Block>,
	/// Ids of blocks that have to be fetched before progress can be made
	pub to_download: Vec<Hash>,
}

impl ProgressInfo {
	/// Progress info that asks for nothing.
	pub fn none() -> ProgressInfo {
		ProgressInfo::default()
	}

	/// Whether applying this progress requires abandoning part of the
	/// current best chain first.
	pub fn chain_switching_needed(&self) -> bool {
		self.branch_point.is_some()
	}
}
