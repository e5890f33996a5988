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

//! The ordered block graph with its best-chain pointer. Appending a block
//! yields the progress the rest of the node has to make: which best-chain
//! blocks to abandon and which fork blocks to apply. The best-block write
//! happens last in every block application, which makes it the crossing
//! point restart recovery reasons from.
//!
//! History is append-only; none of its versions are ever rolled back
//! through, so every mutation is recorded under a fresh random version.

use std::collections::HashMap;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use crate::core::consensus::ConsensusParams;
use crate::core::core::block::Block;
use crate::core::core::boxes::CoinBox;
use crate::core::core::epoch::FullConsensusEpochInfo;
use crate::core::core::hash::{blake2b, Hash};
use crate::error::{Error, ErrorKind};
use crate::store::VersionedStore;
use crate::types::{BlockInfo, ModifierSemanticValidity, ProgressInfo};

const BLOCK_PREFIX: u8 = b'B';
const BLOCK_INFO_PREFIX: u8 = b'I';
const FEE_PAYMENTS_PREFIX: u8 = b'F';
const HEAD_KEY: &[u8] = b"H";

const EPOCH_INFO_PREFIX: u8 = b'E';

fn to_key(prefix: u8, id: &Hash) -> Vec<u8> {
	let mut key = Vec::with_capacity(33);
	key.push(prefix);
	key.extend_from_slice(id.as_ref());
	key
}

fn epoch_key(epoch: u32) -> Vec<u8> {
	let mut key = vec![EPOCH_INFO_PREFIX];
	let mut bytes = [0; 4];
	BigEndian::write_u32(&mut bytes, epoch);
	key.extend_from_slice(&bytes);
	key
}

/// The block graph, its best-chain pointer and the consensus data recorded
/// per epoch.
pub struct History {
	store: VersionedStore,
	consensus_store: VersionedStore,
	params: ConsensusParams,
	// id -> height for every block of the active chain
	active_chain: HashMap<Hash, u64>,
	// height -> id, the active chain in order
	chain_by_height: Vec<Hash>,
}

impl History {
	/// Opens history under the provided directory and rebuilds the
	/// in-memory active chain index from the stored best pointer.
	pub fn open(db_root: String, params: ConsensusParams) -> Result<History, Error> {
		let env = Arc::new(crate::store::new_env(db_root + "/history"));
		let store = VersionedStore::open(env.clone(), "history");
		let consensus_store = VersionedStore::open(env, "consensus");
		let mut history = History {
			store,
			consensus_store,
			params,
			active_chain: HashMap::new(),
			chain_by_height: vec![],
		};
		if let Some(best) = history.best_block_id()? {
			history.rebuild_active_chain(&best)?;
			debug!(
				"history: opened at {} (height {})",
				best,
				history.chain_by_height.len() - 1
			);
		}
		Ok(history)
	}

	/// Epoch geometry this history was opened with.
	pub fn params(&self) -> &ConsensusParams {
		&self.params
	}

	/// Id of the best block, the last one reported valid. None before the
	/// genesis block made it through.
	pub fn best_block_id(&self) -> Result<Option<Hash>, Error> {
		Ok(self.store.get_ser(HEAD_KEY)?)
	}

	/// Whether the block is recorded, on the active chain or off it.
	pub fn contains(&self, id: &Hash) -> Result<bool, Error> {
		Ok(self.store.get(&to_key(BLOCK_INFO_PREFIX, id))?.is_some())
	}

	/// Whether the block is part of the current active chain.
	pub fn is_in_active_chain(&self, id: &Hash) -> bool {
		self.active_chain.contains_key(id)
	}

	/// The stored block with the provided id.
	pub fn block_by_id(&self, id: &Hash) -> Result<Block, Error> {
		self.store
			.get_ser(&to_key(BLOCK_PREFIX, id))?
			.ok_or_else(|| ErrorKind::BlockNotFound(format!("{}", id)).into())
	}

	/// The per-block record with the provided id.
	pub fn block_info_by_id(&self, id: &Hash) -> Result<BlockInfo, Error> {
		self.store
			.get_ser(&to_key(BLOCK_INFO_PREFIX, id))?
			.ok_or_else(|| ErrorKind::BlockNotFound(format!("{}", id)).into())
	}

	/// Id of the active-chain block at the provided height.
	pub fn block_id_by_height(&self, height: u64) -> Option<Hash> {
		self.chain_by_height.get(height as usize).copied()
	}

	/// Height of the provided block if it is on the active chain.
	pub fn height_of(&self, id: &Hash) -> Option<u64> {
		self.active_chain.get(id).copied()
	}

	/// Height of the best block. None before genesis.
	pub fn current_height(&self) -> Option<u64> {
		if self.chain_by_height.is_empty() {
			None
		} else {
			Some(self.chain_by_height.len() as u64 - 1)
		}
	}

	/// Records a new block and works out what the rest of the node has to
	/// do about it: apply it directly, switch chains first, or nothing yet.
	pub fn append(&mut self, block: &Block) -> Result<ProgressInfo, Error> {
		let id = block.id();
		if self.contains(&id)? {
			return Err(ErrorKind::InvalidBlock(format!("{} already known", id)).into());
		}

		let genesis = self.store.is_empty()?;
		let height = if genesis {
			0
		} else {
			let parent_info = self
				.store
				.get_ser::<BlockInfo>(&to_key(BLOCK_INFO_PREFIX, &block.parent_id()))?
				.ok_or_else(|| {
					ErrorKind::UnknownParent(format!(
						"{} extends unknown {}",
						id,
						block.parent_id()
					))
				})?;
			parent_info.height + 1
		};

		let info = BlockInfo {
			height,
			parent_id: block.parent_id(),
			semantic_validity: ModifierSemanticValidity::Unknown,
		};
		self.store.update(
			&Hash::random(),
			vec![
				(to_key(BLOCK_PREFIX, &id), crate::core::ser::ser_vec(block)?),
				(to_key(BLOCK_INFO_PREFIX, &id), crate::core::ser::ser_vec(&info)?),
			],
			vec![],
		)?;

		if genesis {
			debug!("history: genesis block {} offered", id);
			return Ok(ProgressInfo {
				branch_point: None,
				to_remove: vec![],
				to_apply: vec![block.clone()],
				to_download: vec![],
			});
		}

		let best = self
			.best_block_id()?
			.ok_or_else(|| ErrorKind::Other("no best block after genesis".to_owned()))?;

		if block.parent_id() == best {
			// plain extension of the best chain
			return Ok(ProgressInfo {
				branch_point: None,
				to_remove: vec![],
				to_apply: vec![block.clone()],
				to_download: vec![],
			});
		}

		let best_height = self.current_height().unwrap_or(0);
		if height <= best_height {
			// a fork that doesn't beat the current chain, keep it around
			debug!(
				"history: stored non-best fork block {} at height {}",
				id, height
			);
			return Ok(ProgressInfo::none());
		}

		// a better fork: walk it back to the branch point
		let mut fork_blocks = vec![block.clone()];
		let mut cursor = block.parent_id();
		while !self.is_in_active_chain(&cursor) {
			let fork_block = self.block_by_id(&cursor)?;
			cursor = fork_block.parent_id();
			fork_blocks.push(fork_block);
		}
		fork_blocks.reverse();
		let branch_point = cursor;

		let branch_height = self.height_of(&branch_point).unwrap_or(0);
		let mut to_remove = vec![];
		for h in (branch_height + 1)..=best_height {
			if let Some(removed_id) = self.block_id_by_height(h) {
				to_remove.push(self.block_by_id(&removed_id)?);
			}
		}

		info!(
			"history: chain switch at {} (-{} +{} blocks) triggered by {}",
			branch_point,
			to_remove.len(),
			fork_blocks.len(),
			id
		);

		Ok(ProgressInfo {
			branch_point: Some(branch_point),
			to_remove,
			to_apply: fork_blocks,
			to_download: vec![],
		})
	}

	/// Marks the block as applied and makes it the best block. This is the
	/// last write of a block application.
	pub fn report_modifier_is_valid(&mut self, block: &Block) -> Result<(), Error> {
		let id = block.id();
		let mut info = self.block_info_by_id(&id)?;
		info.semantic_validity = ModifierSemanticValidity::Valid;
		self.store.update(
			&Hash::random(),
			vec![
				(to_key(BLOCK_INFO_PREFIX, &id), crate::core::ser::ser_vec(&info)?),
				(HEAD_KEY.to_vec(), crate::core::ser::ser_vec(&id)?),
			],
			vec![],
		)?;

		// keep the in-memory active chain in step with the new best pointer
		if info.height as usize == self.chain_by_height.len()
			&& self
				.chain_by_height
				.last()
				.map(|last| *last == info.parent_id)
				.unwrap_or(info.height == 0)
		{
			self.chain_by_height.push(id);
			self.active_chain.insert(id, info.height);
		} else {
			self.rebuild_active_chain(&id)?;
		}
		Ok(())
	}

	/// Marks the block as rejected by the state. The returned progress info
	/// proposes no further work; the caller finishes with whatever suffix it
	/// already applied.
	pub fn report_modifier_is_invalid(
		&mut self,
		block: &Block,
		_progress_info: &ProgressInfo,
	) -> Result<ProgressInfo, Error> {
		let id = block.id();
		let mut info = self.block_info_by_id(&id)?;
		info.semantic_validity = ModifierSemanticValidity::Invalid;
		self.store.update(
			&Hash::random(),
			vec![(to_key(BLOCK_INFO_PREFIX, &id), crate::core::ser::ser_vec(&info)?)],
			vec![],
		)?;
		warn!("history: block {} marked invalid", id);
		Ok(ProgressInfo::none())
	}

	/// Path from `from` back to the first ancestor satisfying the
	/// predicate, that ancestor first. Empty if no such ancestor is reachable
	/// within `limit` steps.
	pub fn chain_back(
		&self,
		from: &Hash,
		predicate: impl Fn(&Hash) -> bool,
		limit: usize,
	) -> Result<Vec<Hash>, Error> {
		let mut path = vec![*from];
		let mut cursor = *from;
		for _ in 0..limit {
			if predicate(&cursor) {
				path.reverse();
				return Ok(path);
			}
			let info = match self.store.get_ser::<BlockInfo>(&to_key(BLOCK_INFO_PREFIX, &cursor))? {
				Some(info) => info,
				None => return Ok(vec![]),
			};
			if info.height == 0 {
				// ran out of ancestors
				return Ok(vec![]);
			}
			cursor = info.parent_id;
			path.push(cursor);
		}
		Ok(vec![])
	}

	/// Epoch randomness for the consensus epoch that `last_block_in_epoch`
	/// closes.
	pub fn consensus_epoch_nonce(&self, epoch: u32, last_block_in_epoch: &Hash) -> Hash {
		let mut bytes = vec![0; 4];
		BigEndian::write_u32(&mut bytes, epoch);
		bytes.extend_from_slice(last_block_in_epoch.as_ref());
		blake2b(&bytes)
	}

	/// Records the closed epoch's stake commitment and nonce.
	pub fn apply_full_consensus_info(
		&mut self,
		last_block_in_epoch: &Hash,
		info: FullConsensusEpochInfo,
	) -> Result<(), Error> {
		debug!(
			"history: epoch {} closed by {}, stake root {}",
			info.epoch, last_block_in_epoch, info.stake_merkle_root
		);
		self.consensus_store.update(
			&Hash::random(),
			vec![(epoch_key(info.epoch), crate::core::ser::ser_vec(&info)?)],
			vec![],
		)?;
		Ok(())
	}

	/// The recorded consensus data for an epoch, if the epoch has closed.
	pub fn full_consensus_epoch_info(
		&self,
		epoch: u32,
	) -> Result<Option<FullConsensusEpochInfo>, Error> {
		Ok(self.consensus_store.get_ser(&epoch_key(epoch))?)
	}

	/// Attaches the fee payment boxes the state computed for the epoch the
	/// provided block closes.
	pub fn update_fee_payments_info(
		&mut self,
		block_id: &Hash,
		payments: &[CoinBox],
	) -> Result<(), Error> {
		self.store.update(
			&Hash::random(),
			vec![(
				to_key(FEE_PAYMENTS_PREFIX, block_id),
				crate::core::ser::ser_vec(&payments.to_vec())?,
			)],
			vec![],
		)?;
		Ok(())
	}

	/// Fee payment boxes recorded for the provided block, if any.
	pub fn fee_payments_info(&self, block_id: &Hash) -> Result<Option<Vec<CoinBox>>, Error> {
		Ok(self.store.get_ser(&to_key(FEE_PAYMENTS_PREFIX, block_id))?)
	}

	fn rebuild_active_chain(&mut self, best: &Hash) -> Result<(), Error> {
		let mut chain = vec![];
		let mut cursor = *best;
		loop {
			let info = self.block_info_by_id(&cursor)?;
			chain.push(cursor);
			if info.height == 0 {
				break;
			}
			cursor = info.parent_id;
		}
		chain.reverse();
		self.active_chain = chain
			.iter()
			.enumerate()
			.map(|(height, id)| (*id, height as u64))
			.collect();
		self.chain_by_height = chain;
		Ok(())
	}
}
