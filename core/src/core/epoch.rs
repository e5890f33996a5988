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

//! Epoch bookkeeping types shared between state, history and wallet.

use crate::core::boxes::ForgingStakeInfo;
use crate::core::hash::Hash;
use crate::core::merkle::{MerklePath, MerkleTree};
use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// Position of a block within its withdrawal epoch: the epoch number and
/// how many mainchain references the epoch has absorbed up to and including
/// that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalEpochInfo {
	/// Withdrawal epoch number
	pub epoch: u32,
	/// Mainchain references consumed so far in this epoch
	pub last_epoch_index: u32,
}

impl Writeable for WithdrawalEpochInfo {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32(self.epoch)?;
		writer.write_u32(self.last_epoch_index)
	}
}

impl Readable for WithdrawalEpochInfo {
	fn read(reader: &mut dyn Reader) -> Result<WithdrawalEpochInfo, ser::Error> {
		Ok(WithdrawalEpochInfo {
			epoch: reader.read_u32()?,
			last_epoch_index: reader.read_u32()?,
		})
	}
}

/// The forging stake snapshot taken when a consensus epoch closes: every
/// stake summary in the state, arranged in a Merkle tree whose paths the
/// wallet hands to forgers.
#[derive(Debug, Clone)]
pub struct ConsensusEpochInfo {
	/// Epoch the snapshot belongs to
	pub epoch: u32,
	/// Tree over the stake summaries' digests
	pub stake_merkle_tree: MerkleTree,
	/// Total amount staked across all forger boxes
	pub forgers_stake: u64,
}

/// The digest of a consensus epoch as history records it: stake commitment
/// plus the epoch randomness used for slot leader election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullConsensusEpochInfo {
	/// Epoch number
	pub epoch: u32,
	/// Root of the stake snapshot tree
	pub stake_merkle_root: Hash,
	/// Total amount staked
	pub total_stake: u64,
	/// Epoch nonce derived from the closing epoch's blocks
	pub nonce: Hash,
}

impl Writeable for FullConsensusEpochInfo {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32(self.epoch)?;
		self.stake_merkle_root.write(writer)?;
		writer.write_u64(self.total_stake)?;
		self.nonce.write(writer)
	}
}

impl Readable for FullConsensusEpochInfo {
	fn read(reader: &mut dyn Reader) -> Result<FullConsensusEpochInfo, ser::Error> {
		Ok(FullConsensusEpochInfo {
			epoch: reader.read_u32()?,
			stake_merkle_root: Hash::read(reader)?,
			total_stake: reader.read_u64()?,
			nonce: Hash::read(reader)?,
		})
	}
}

/// A wallet-held stake summary together with its inclusion path into the
/// epoch's stake snapshot tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgingStakeMerklePathInfo {
	/// The stake summary
	pub stake_info: ForgingStakeInfo,
	/// Its path in the epoch stake tree
	pub merkle_path: MerklePath,
}

impl Writeable for ForgingStakeMerklePathInfo {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.stake_info.write(writer)?;
		self.merkle_path.write(writer)
	}
}

impl Readable for ForgingStakeMerklePathInfo {
	fn read(reader: &mut dyn Reader) -> Result<ForgingStakeMerklePathInfo, ser::Error> {
		Ok(ForgingStakeMerklePathInfo {
			stake_info: ForgingStakeInfo::read(reader)?,
			merkle_path: MerklePath::read(reader)?,
		})
	}
}
