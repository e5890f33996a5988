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

//! The box-set state. Validates a block against the UTXO rules, applies
//! its box delta across three versioned stores (box set, forger boxes,
//! UTXO commitment leaves) and tracks withdrawal and consensus epoch
//! progress. The three stores are written forger, UTXO, box set, so after
//! a crash the box set can only trail its satellites, never lead them.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use crate::core::consensus::ConsensusParams;
use crate::core::core::block::{Block, SidechainRelatedOutput};
use crate::core::core::boxes::{BoxId, CoinBox, ForgerBox, OutputBox};
use crate::core::core::changes::{box_changes, BoxChanges};
use crate::core::core::csw::UtxoMerkleTreeView;
use crate::core::core::epoch::{ConsensusEpochInfo, WithdrawalEpochInfo};
use crate::core::core::hash::{blake2b, Hash, Hashed};
use crate::core::core::merkle::MerkleTree;
use crate::core::ser;
use crate::error::{Error, ErrorKind};
use crate::store::VersionedStore;
use crate::types::BlockFeeInfo;

const BOX_PREFIX: u8 = b'b';
const FEE_INFO_PREFIX: u8 = b'f';
const WITHDRAWAL_EPOCH_KEY: &[u8] = b"w";
const CONSENSUS_EPOCH_KEY: &[u8] = b"c";

/// Highest sidechain creation output version this node understands.
const MAX_SIDECHAIN_CREATION_VERSION: u32 = 2;

fn box_key(id: &BoxId) -> Vec<u8> {
	let mut key = Vec::with_capacity(33);
	key.push(BOX_PREFIX);
	key.extend_from_slice(id.as_ref());
	key
}

fn fee_info_key(epoch: u32, block_id: &Hash) -> Vec<u8> {
	let mut key = Vec::with_capacity(37);
	key.push(FEE_INFO_PREFIX);
	let mut bytes = [0; 4];
	BigEndian::write_u32(&mut bytes, epoch);
	key.extend_from_slice(&bytes);
	key.extend_from_slice(block_id.as_ref());
	key
}

/// User extension point consulted during state transitions. Implementors
/// keep their own storage in step with the node's by honoring the version
/// passed to every callback.
pub trait ApplicationState: Send {
	/// Application-level validation of a block about to be applied. An
	/// error rejects the block.
	fn validate(&self, block: &Block) -> Result<(), failure::Error>;

	/// The state is about to record the block's box delta under `version`.
	/// An error aborts the application with nothing written.
	fn on_apply_changes(
		&mut self,
		version: &Hash,
		to_append: &[OutputBox],
		to_remove: &[BoxId],
	) -> Result<(), failure::Error>;

	/// Called after the node-side stores rolled back to `version`.
	fn on_rollback(&mut self, version: &Hash) -> Result<(), failure::Error>;

	/// Whether the application-side storage sits at the provided version.
	fn check_storages_version(&self, version: &Hash) -> bool;
}

/// An application extension that keeps no storage of its own.
pub struct DefaultApplicationState;

impl ApplicationState for DefaultApplicationState {
	fn validate(&self, _block: &Block) -> Result<(), failure::Error> {
		Ok(())
	}
	fn on_apply_changes(
		&mut self,
		_version: &Hash,
		_to_append: &[OutputBox],
		_to_remove: &[BoxId],
	) -> Result<(), failure::Error> {
		Ok(())
	}
	fn on_rollback(&mut self, _version: &Hash) -> Result<(), failure::Error> {
		Ok(())
	}
	fn check_storages_version(&self, _version: &Hash) -> bool {
		true
	}
}

/// The box set and its epoch bookkeeping.
pub struct State {
	base: VersionedStore,
	forger_store: VersionedStore,
	utxo_store: VersionedStore,
	application: Box<dyn ApplicationState>,
	params: ConsensusParams,
}

impl State {
	/// Opens the state stores under the provided directory.
	pub fn open(
		db_root: String,
		params: ConsensusParams,
		application: Box<dyn ApplicationState>,
	) -> State {
		let env = Arc::new(crate::store::new_env(db_root + "/state"));
		State {
			base: VersionedStore::open(env.clone(), "state"),
			forger_store: VersionedStore::open(env.clone(), "state_forger"),
			utxo_store: VersionedStore::open(env, "state_utxo"),
			application,
			params,
		}
	}

	/// Version of the state: the id of the last applied block. None before
	/// genesis.
	pub fn version(&self) -> Result<Option<Hash>, Error> {
		Ok(self.base.last_version_id()?)
	}

	/// The box recorded under the provided id, if unspent.
	pub fn closed_box(&self, id: &BoxId) -> Result<Option<OutputBox>, Error> {
		Ok(self.base.get_ser(&box_key(id))?)
	}

	/// Whether the box is currently unspent.
	pub fn box_is_unspent(&self, id: &BoxId) -> Result<bool, Error> {
		Ok(self.base.get(&box_key(id))?.is_some())
	}

	/// Withdrawal epoch position after the last applied block.
	pub fn withdrawal_epoch_info(&self) -> Result<WithdrawalEpochInfo, Error> {
		Ok(self
			.base
			.get_ser(WITHDRAWAL_EPOCH_KEY)?
			.unwrap_or(WithdrawalEpochInfo {
				epoch: 0,
				last_epoch_index: 0,
			}))
	}

	/// Whether the last applied block closed its withdrawal epoch.
	pub fn is_withdrawal_epoch_last_index(&self) -> Result<bool, Error> {
		Ok(self
			.params
			.is_withdrawal_epoch_last_index(&self.withdrawal_epoch_info()?))
	}

	/// Consensus epoch of the last applied block, if any.
	pub fn consensus_epoch(&self) -> Result<Option<u32>, Error> {
		Ok(self.base.get_ser(CONSENSUS_EPOCH_KEY)?)
	}

	/// Whether applying the provided block would move the state into a new
	/// consensus epoch.
	pub fn is_switching_consensus_epoch(&self, block: &Block) -> Result<bool, Error> {
		match self.consensus_epoch()? {
			Some(current) => {
				Ok(self.params.consensus_epoch_number(block.timestamp()) != current)
			}
			None => Ok(false),
		}
	}

	/// Snapshot of the current forging stake: the epoch, a tree over every
	/// stake summary and the grand total. Paired with the id of the last
	/// applied block, which the caller treats as the closing block of the
	/// epoch.
	pub fn current_consensus_epoch_info(&self) -> Result<(Hash, ConsensusEpochInfo), Error> {
		let last_block = self.version()?.ok_or_else(|| {
			ErrorKind::Other("consensus epoch info requested of empty state".to_owned())
		})?;
		let epoch = self.consensus_epoch()?.ok_or_else(|| {
			ErrorKind::Other("consensus epoch info requested of empty state".to_owned())
		})?;

		// forger boxes sorted by id so the snapshot is deterministic
		let mut stakes: BTreeMap<Vec<u8>, ForgerBox> = BTreeMap::new();
		for (key, value) in self.forger_store.get_all()? {
			let forger_box: ForgerBox = ser::deserialize(&mut &value[..])?;
			stakes.insert(key, forger_box);
		}
		let forgers_stake: u64 = stakes.values().map(|fb| fb.value).sum();
		let leaves = stakes
			.values()
			.map(|fb| fb.forging_stake_info().hash())
			.collect();

		Ok((
			last_block,
			ConsensusEpochInfo {
				epoch,
				stake_merkle_tree: MerkleTree::new(leaves),
				forgers_stake,
			},
		))
	}

	/// Fee payment boxes owed at the end of the provided withdrawal epoch:
	/// one coin box per distinct forger, carrying that forger's fee total.
	pub fn get_fee_payments(&self, epoch: u32) -> Result<Vec<CoinBox>, Error> {
		let mut prefix = vec![FEE_INFO_PREFIX];
		let mut bytes = [0; 4];
		BigEndian::write_u32(&mut bytes, epoch);
		prefix.extend_from_slice(&bytes);

		let mut per_forger: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
		for (key, value) in self.base.get_all()? {
			if !key.starts_with(&prefix) {
				continue;
			}
			let info: BlockFeeInfo = ser::deserialize(&mut &value[..])?;
			*per_forger.entry(info.forger_proposition.to_vec()).or_insert(0) += info.fee;
		}

		let payments = per_forger
			.into_iter()
			.filter(|(_, fee)| *fee > 0)
			.map(|(proposition_bytes, fee)| {
				let mut nonce_bytes = vec![0; 4];
				BigEndian::write_u32(&mut nonce_bytes, epoch);
				nonce_bytes.extend_from_slice(&proposition_bytes);
				CoinBox {
					proposition: crate::core::core::proposition::Proposition::from_vec(
						&proposition_bytes,
					),
					value: fee,
					nonce: blake2b(&nonce_bytes).to_u64(),
				}
			})
			.collect();
		Ok(payments)
	}

	/// A by-value view over the UTXO commitment tree, for the wallet to
	/// extract inclusion paths from.
	pub fn utxo_merkle_tree_view(&self) -> Result<UtxoMerkleTreeView, Error> {
		let mut leaves = vec![];
		for (key, value) in self.utxo_store.get_all()? {
			let box_id = Hash::from_vec(&key);
			let leaf: Hash = ser::deserialize(&mut &value[..])?;
			leaves.push((box_id, leaf));
		}
		Ok(UtxoMerkleTreeView::new(leaves))
	}

	/// The box delta the provided block describes. The wallet derives its
	/// own view of the block through this same contract.
	pub fn changes(block: &Block) -> BoxChanges {
		box_changes(block)
	}

	/// Validates the block against the box-set rules and applies its delta
	/// across the three state stores under `version = block.id()`.
	pub fn apply_modifier(&mut self, block: &Block) -> Result<(), Error> {
		let version = block.id();
		self.validate_modifier(block)?;

		let changes = box_changes(block);

		// hand the delta to the application before any store write, so a
		// rejecting extension aborts with nothing persisted
		self.application
			.on_apply_changes(&version, &changes.to_append, &changes.to_remove)
			.map_err(|e| ErrorKind::ApplicationHook(format!("{}", e)))?;

		let epoch_info = self.params.next_withdrawal_epoch_info(
			self.withdrawal_epoch_info()?,
			block.mainchain_block_references_data.len() as u32,
		);
		let consensus_epoch = self.params.consensus_epoch_number(block.timestamp());

		// forger store first
		let forger_puts = changes
			.to_append
			.iter()
			.filter_map(|b| b.as_forger().map(|fb| (b.id(), fb.clone())))
			.map(|(id, fb)| Ok((id.to_vec(), ser::ser_vec(&fb)?)))
			.collect::<Result<Vec<_>, Error>>()?;
		let mut forger_deletes = vec![];
		for id in &changes.to_remove {
			if self.forger_store.get(id.as_ref())?.is_some() {
				forger_deletes.push(id.to_vec());
			}
		}
		self.forger_store.update(&version, forger_puts, forger_deletes)?;

		// then the utxo commitment leaves for every coin-carrying box
		let utxo_puts = changes
			.to_append
			.iter()
			.filter(|b| b.is_coin())
			.map(|b| {
				let id = b.id();
				Ok((
					id.to_vec(),
					ser::ser_vec(&UtxoMerkleTreeView::leaf_digest(&id))?,
				))
			})
			.collect::<Result<Vec<_>, Error>>()?;
		let mut utxo_deletes = vec![];
		for id in &changes.to_remove {
			if self.utxo_store.get(id.as_ref())?.is_some() {
				utxo_deletes.push(id.to_vec());
			}
		}
		self.utxo_store.update(&version, utxo_puts, utxo_deletes)?;

		// the box set last, so its version is the one the others may lead
		let mut puts = vec![];
		for output in &changes.to_append {
			puts.push((box_key(&output.id()), ser::ser_vec(output)?));
		}
		puts.push((
			WITHDRAWAL_EPOCH_KEY.to_vec(),
			ser::ser_vec(&epoch_info)?,
		));
		puts.push((
			CONSENSUS_EPOCH_KEY.to_vec(),
			ser::ser_vec(&consensus_epoch)?,
		));
		puts.push((
			fee_info_key(epoch_info.epoch, &version),
			ser::ser_vec(&BlockFeeInfo {
				fee: block.total_fees(),
				forger_proposition: block.header.forger_proposition,
			})?,
		));
		let deletes = changes.to_remove.iter().map(|id| box_key(id)).collect();
		self.base.update(&version, puts, deletes)?;

		info!(
			"state: applied block {} (+{} -{} boxes), withdrawal epoch {}/{}",
			version,
			changes.to_append.len(),
			changes.to_remove.len(),
			epoch_info.epoch,
			epoch_info.last_epoch_index
		);
		Ok(())
	}

	fn validate_modifier(&self, block: &Block) -> Result<(), Error> {
		if let Some(current) = self.version()? {
			if block.parent_id() != current {
				return Err(ErrorKind::InvalidBlock(format!(
					"block {} does not extend state version {}",
					block.id(),
					current
				))
				.into());
			}
		}

		let changes = box_changes(block);
		let overlapping = changes.overlapping_ids();
		if !overlapping.is_empty() {
			return Err(ErrorKind::InvalidBlock(format!(
				"block {} both creates and opens {:?}",
				block.id(),
				overlapping
			))
			.into());
		}

		let mut opened: HashSet<BoxId> = HashSet::new();
		for id in &changes.to_remove {
			if !opened.insert(*id) {
				return Err(ErrorKind::InvalidBlock(format!(
					"block {} opens {} twice",
					block.id(),
					id
				))
				.into());
			}
			if !self.box_is_unspent(id)? {
				return Err(ErrorKind::InvalidBlock(format!(
					"block {} opens unknown box {}",
					block.id(),
					id
				))
				.into());
			}
		}
		for output in &changes.to_append {
			if self.box_is_unspent(&output.id())? {
				return Err(ErrorKind::InvalidBlock(format!(
					"block {} re-creates existing box {}",
					block.id(),
					output.id()
				))
				.into());
			}
		}

		for ref_data in &block.mainchain_block_references_data {
			if let Some(agg_tx) = &ref_data.sidechain_related_aggregated_transaction {
				for output in &agg_tx.outputs {
					if let SidechainRelatedOutput::SidechainCreation(sc) = output {
						if sc.version > MAX_SIDECHAIN_CREATION_VERSION {
							return Err(ErrorKind::InvalidBlock(format!(
								"unknown sidechain creation version {}",
								sc.version
							))
							.into());
						}
					}
				}
			}
		}

		self.application
			.validate(block)
			.map_err(|e| ErrorKind::InvalidBlock(format!("application rejected: {}", e)))?;

		Ok(())
	}

	/// Rolls all three stores back to the provided version and tells the
	/// application to follow.
	pub fn rollback(&mut self, to: &Hash) -> Result<(), Error> {
		self.base
			.rollback(to)
			.map_err(|e| ErrorKind::Rollback(format!("state to {}: {}", to, e)))?;
		self.utxo_store
			.rollback(to)
			.map_err(|e| ErrorKind::Rollback(format!("state utxo to {}: {}", to, e)))?;
		self.forger_store
			.rollback(to)
			.map_err(|e| ErrorKind::Rollback(format!("state forger to {}: {}", to, e)))?;
		self.application
			.on_rollback(to)
			.map_err(|e| ErrorKind::ApplicationHook(format!("{}", e)))?;
		warn!("state: rolled back to {}", to);
		Ok(())
	}

	/// Verifies that the three state stores and the application storage
	/// agree on a version after a restart, rolling a leading satellite
	/// store back to the box set's version where the crash window allows
	/// it.
	pub fn ensure_storage_consistency_after_restore(&mut self) -> Result<(), Error> {
		let version = match self.version()? {
			Some(v) => v,
			None => {
				// nothing ever applied; satellites must be empty too
				if self.forger_store.num_versions()? != 0 || self.utxo_store.num_versions()? != 0 {
					return Err(ErrorKind::Consistency(
						"state is empty but satellite stores are not".to_owned(),
					)
					.into());
				}
				return Ok(());
			}
		};

		self.align_satellite("state_forger", &version)?;
		self.align_satellite("state_utxo", &version)?;

		if !self.application.check_storages_version(&version) {
			return Err(ErrorKind::Consistency(format!(
				"application state storage not at {}",
				version
			))
			.into());
		}
		Ok(())
	}

	fn align_satellite(&mut self, which: &str, version: &Hash) -> Result<(), Error> {
		let store = match which {
			"state_forger" => &self.forger_store,
			_ => &self.utxo_store,
		};
		match store.last_version_id()? {
			Some(v) if v == *version => Ok(()),
			Some(_) => {
				let recent = store.rollback_versions(2)?;
				if recent.len() == 2 && recent[1] == *version {
					// crash between satellite and box set writes
					warn!(
						"state: {} leads box set, rolling back to {}",
						which, version
					);
					store.rollback(version).map_err(|e| {
						Error::from(ErrorKind::Rollback(format!("{} to {}: {}", which, version, e)))
					})
				} else {
					Err(ErrorKind::Consistency(format!(
						"{} at {:?}, box set at {}",
						which,
						recent.first(),
						version
					))
					.into())
				}
			}
			None => Err(ErrorKind::Consistency(format!(
				"{} is empty, box set at {}",
				which, version
			))
			.into()),
		}
	}
}
