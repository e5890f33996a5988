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

//! The wallet proper: scans applied blocks for boxes locked to its keys,
//! keeps four block-versioned stores in lockstep (boxes, transactions,
//! forging stake, withdrawal evidence), and recovers a consistent version
//! across them after an ungraceful shutdown.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use crate::core::core::block::{Block, SidechainRelatedOutput};
use crate::core::core::boxes::{BoxId, CoinBox, ForgerBox, OutputBox, WalletBox};
use crate::core::core::changes::box_changes;
use crate::core::core::csw::{CswData, FtCswData, UtxoCswData, UtxoMerkleTreeView};
use crate::core::core::epoch::{ConsensusEpochInfo, ForgingStakeMerklePathInfo};
use crate::core::core::hash::{blake2b, Hash, Hashed, ZERO_HASH};
use crate::core::core::proposition::Proposition;
use crate::core::core::transaction::SidechainTransaction;
use crate::application::ApplicationWallet;
use crate::error::{Error, ErrorKind};
use crate::secret::Secret;
use crate::storage::{
	CswDataStorage, ForgingStakeStorage, SecretStorage, WalletBoxStorage,
	WalletTransactionStorage,
};
use crate::store::VersionedStore;

/// The wallet subsystem of the node view.
pub struct Wallet {
	secret_storage: SecretStorage,
	box_storage: WalletBoxStorage,
	tx_storage: WalletTransactionStorage,
	forging_stake_storage: ForgingStakeStorage,
	csw_storage: CswDataStorage,
	application: Box<dyn ApplicationWallet>,
}

impl Wallet {
	/// Opens the wallet stores under the provided directory.
	pub fn open(db_root: String, application: Box<dyn ApplicationWallet>) -> Result<Wallet, Error> {
		let env = Arc::new(crate::store::new_env(db_root + "/wallet"));
		Ok(Wallet {
			secret_storage: SecretStorage::new(VersionedStore::open(env.clone(), "secrets"))?,
			box_storage: WalletBoxStorage::new(VersionedStore::open(env.clone(), "wallet_boxes")),
			tx_storage: WalletTransactionStorage::new(VersionedStore::open(
				env.clone(),
				"wallet_transactions",
			)),
			forging_stake_storage: ForgingStakeStorage::new(VersionedStore::open(
				env.clone(),
				"forging_stake",
			)),
			csw_storage: CswDataStorage::new(VersionedStore::open(env, "csw_data")),
			application,
		})
	}

	/// Version of the wallet: the id of the last scanned block.
	pub fn version(&self) -> Result<Option<Hash>, Error> {
		self.box_storage.last_version_id()
	}

	/// Adds a secret and notifies the application.
	pub fn add_secret(&mut self, secret: Secret) -> Result<(), Error> {
		self.secret_storage.add(secret.clone())?;
		self.application
			.on_add_secret(&secret)
			.map_err(|e| ErrorKind::ApplicationHook(format!("{}", e)).into())
	}

	/// Removes the secret of the provided proposition and notifies the
	/// application.
	pub fn remove_secret(&mut self, proposition: &Proposition) -> Result<(), Error> {
		self.secret_storage.remove(proposition)?;
		self.application
			.on_remove_secret(proposition)
			.map_err(|e| ErrorKind::ApplicationHook(format!("{}", e)).into())
	}

	/// Every stored secret, in insertion order.
	pub fn secrets(&self) -> Vec<&Secret> {
		self.secret_storage.get_all()
	}

	/// The propositions the wallet can open boxes of.
	pub fn public_keys(&self) -> HashSet<Proposition> {
		self.secret_storage
			.get_all()
			.iter()
			.map(|secret| secret.public_image())
			.collect()
	}

	/// Every box the wallet tracks.
	pub fn all_boxes(&self) -> Result<Vec<WalletBox>, Error> {
		self.box_storage.get_all()
	}

	/// The tracked boxes locked to the provided proposition.
	pub fn boxes_of(&self, proposition: &Proposition) -> Result<Vec<WalletBox>, Error> {
		Ok(self
			.all_boxes()?
			.into_iter()
			.filter(|wb| wb.output.proposition() == *proposition)
			.collect())
	}

	/// Sum of the values of all tracked coin-carrying boxes.
	pub fn balance(&self) -> Result<u64, Error> {
		Ok(self
			.all_boxes()?
			.iter()
			.filter(|wb| wb.output.is_coin())
			.map(|wb| wb.output.value())
			.sum())
	}

	/// Sum of the coin values locked to the provided proposition.
	pub fn balance_of(&self, proposition: &Proposition) -> Result<u64, Error> {
		Ok(self
			.boxes_of(proposition)?
			.iter()
			.filter(|wb| wb.output.is_coin())
			.map(|wb| wb.output.value())
			.sum())
	}

	/// A recorded transaction by id.
	pub fn transaction_by_id(&self, tx_id: &Hash) -> Result<Option<SidechainTransaction>, Error> {
		self.tx_storage.get(tx_id)
	}

	/// The withdrawal evidence gathered for the provided epoch.
	pub fn csw_data_for_epoch(&self, epoch: u32) -> Result<Vec<CswData>, Error> {
		Ok(self.csw_storage.csw_data(epoch)?.unwrap_or_default())
	}

	/// Scans one applied block: records the boxes the wallet gained and
	/// lost, the transactions that touched them, the forger boxes newly
	/// delegated to its keys, and the withdrawal evidence of the epoch.
	/// The stores are written boxes, transactions, forging stake, evidence,
	/// all under `version = block.id()`.
	pub fn scan_persistent(
		&mut self,
		block: &Block,
		withdrawal_epoch: u32,
		fee_payments: &[CoinBox],
		utxo_view: Option<&UtxoMerkleTreeView>,
	) -> Result<(), Error> {
		let version = block.id();
		let changes = box_changes(block);
		let public_keys = self.public_keys();

		// box id -> creating/opening transaction id, across the whole block
		let mut tx_by_box_id: HashMap<BoxId, Hash> = HashMap::new();
		for tx in &block.transactions {
			let tx_id = tx.id();
			for box_id in tx.box_ids_to_open() {
				tx_by_box_id.insert(*box_id, tx_id);
			}
			for output in tx.new_boxes() {
				tx_by_box_id.insert(output.id(), tx_id);
			}
		}

		let mut new_boxes: Vec<OutputBox> = changes.to_append.clone();
		new_boxes.extend(fee_payments.iter().cloned().map(CoinBox::into_output));

		let wallet_boxes: Vec<WalletBox> = new_boxes
			.iter()
			.filter(|output| public_keys.contains(&output.proposition()))
			.map(|output| WalletBox {
				output: output.clone(),
				creating_tx_id: tx_by_box_id.get(&output.id()).copied(),
				block_timestamp: block.timestamp(),
			})
			.collect();

		let new_delegated_forger_boxes: Vec<ForgerBox> = new_boxes
			.iter()
			.filter_map(|output| output.as_forger())
			.filter(|fb| public_keys.contains(&fb.block_sign_proposition))
			.cloned()
			.collect();

		let box_ids_to_remove: Vec<BoxId> = changes.to_remove.clone();

		// the application gets its veto before any wallet store is written
		self.application
			.on_change_boxes(&version, &wallet_boxes, &box_ids_to_remove)
			.map_err(|e| ErrorKind::ApplicationHook(format!("{}", e)))?;

		// transactions referenced by anything the wallet gained or lost
		let mut referenced: HashSet<Hash> = HashSet::new();
		for wallet_box in &wallet_boxes {
			if let Some(tx_id) = wallet_box.creating_tx_id {
				referenced.insert(tx_id);
			}
		}
		for box_id in &box_ids_to_remove {
			if let Some(tx_id) = tx_by_box_id.get(box_id) {
				referenced.insert(*tx_id);
			}
		}
		let transactions: Vec<SidechainTransaction> = block
			.transactions
			.iter()
			.filter(|tx| referenced.contains(&tx.id()))
			.cloned()
			.collect();

		self.box_storage
			.update(&version, &wallet_boxes, &box_ids_to_remove)?;
		self.tx_storage.update(&version, &transactions)?;
		self.forging_stake_storage.update_forger_boxes(
			&version,
			&new_delegated_forger_boxes,
			&box_ids_to_remove,
		)?;

		let mut csw_data = self.utxo_csw_data(utxo_view)?;
		csw_data.extend(self.ft_csw_data(block, &public_keys));
		self.csw_storage
			.update(&version, withdrawal_epoch, &csw_data)?;

		debug!(
			"wallet: scanned block {} (+{} boxes, -{} ids, {} csw entries)",
			version,
			wallet_boxes.len(),
			box_ids_to_remove.len(),
			csw_data.len()
		);
		Ok(())
	}

	// Evidence for every coin-carrying box currently held, against the
	// epoch's UTXO commitment. Only produced when a view is handed over,
	// which happens on the last block of a withdrawal epoch.
	fn utxo_csw_data(&self, utxo_view: Option<&UtxoMerkleTreeView>) -> Result<Vec<CswData>, Error> {
		let view = match utxo_view {
			Some(view) => view,
			None => return Ok(vec![]),
		};
		let mut data = vec![];
		for wallet_box in self.box_storage.get_all()? {
			if !wallet_box.output.is_coin() {
				continue;
			}
			let box_id = wallet_box.id();
			if let Some(path) = view.merkle_path(&box_id) {
				data.push(CswData::Utxo(UtxoCswData {
					box_id,
					proposition: wallet_box.output.proposition(),
					value: wallet_box.output.value(),
					nonce: wallet_box.output.nonce(),
					custom_fields_hash: ZERO_HASH,
					utxo_merkle_path: path,
				}));
			}
		}
		Ok(data)
	}

	// Evidence for the wallet-owned forward transfers of the block. The
	// leaf index counts every forward transfer of the aggregated
	// transaction, owned or not.
	fn ft_csw_data(&self, block: &Block, public_keys: &HashSet<Proposition>) -> Vec<CswData> {
		let mut data = vec![];
		for ref_data in &block.mainchain_block_references_data {
			let agg_tx = match &ref_data.sidechain_related_aggregated_transaction {
				Some(agg_tx) => agg_tx,
				None => continue,
			};
			let ft_tree = agg_tx.ft_merkle_tree();
			let mut ft_leaf_index = 0u32;
			for output in &agg_tx.outputs {
				let ft = match output {
					SidechainRelatedOutput::ForwardTransfer(ft) => ft,
					// no withdrawal evidence for sidechain creations
					SidechainRelatedOutput::SidechainCreation(_) => continue,
				};
				if public_keys.contains(&ft.proposition) {
					data.push(CswData::Ft(FtCswData {
						box_id: ft.to_box(&agg_tx.mc_tx_hash, ft_leaf_index).id(),
						amount: ft.amount,
						proposition: ft.proposition,
						mc_return_address: ft.mc_return_address,
						tx_hash: agg_tx.mc_tx_hash,
						tx_index: agg_tx.tx_index,
						ft_leaf_index,
						sc_commitment_merkle_path: ref_data.sc_commitment_merkle_path.clone(),
						btr_commitment: ref_data.btr_commitment,
						cert_commitment: ref_data.cert_commitment,
						sc_cr_commitment: ref_data.sc_cr_commitment,
						ft_merkle_path: ft_tree
							.path(ft_leaf_index as usize)
							.unwrap_or_default(),
					}));
				}
				ft_leaf_index += 1;
			}
		}
		data
	}

	/// Unwinds the four block-versioned stores to the provided version, in
	/// reverse update order, and notifies the application. Secrets are not
	/// touched.
	pub fn rollback(&mut self, to: &Hash) -> Result<(), Error> {
		self.csw_storage.rollback(to)?;
		self.forging_stake_storage.rollback(to)?;
		self.tx_storage.rollback(to)?;
		self.box_storage.rollback(to)?;
		self.application
			.on_rollback(to)
			.map_err(|e| ErrorKind::ApplicationHook(format!("{}", e)))?;
		warn!("wallet: rolled back to {}", to);
		Ok(())
	}

	/// Records the Merkle paths of every wallet forger box present in the
	/// closing epoch's stake snapshot. Runs when a consensus epoch switch
	/// is detected, before the switching block is applied, so the forging
	/// stake store takes the lead the restart check knows to expect.
	pub fn apply_consensus_epoch_info(&mut self, info: &ConsensusEpochInfo) -> Result<(), Error> {
		let mut paths = vec![];
		for forger_box in self.forging_stake_storage.forger_boxes()? {
			let stake_hash = forger_box.forging_stake_info().hash();
			// wallet forger boxes missing from the snapshot are fine, the
			// wallet has no visibility into the full forger set
			if let Some(leaf_idx) = info.stake_merkle_tree.leaf_index(&stake_hash) {
				if let Some(merkle_path) = info.stake_merkle_tree.path(leaf_idx) {
					paths.push(ForgingStakeMerklePathInfo {
						stake_info: forger_box.forging_stake_info(),
						merkle_path,
					});
				}
			}
		}

		let version = consensus_info_version(info);
		self.forging_stake_storage
			.update_stake_paths(&version, info.epoch, &paths)?;
		info!(
			"wallet: recorded {} stake paths for epoch {}",
			paths.len(),
			info.epoch
		);
		Ok(())
	}

	/// The stake path info a forger needs for the provided epoch: the
	/// snapshot taken two epochs earlier, except that the first two epochs
	/// forge against the genesis epoch's snapshot.
	pub fn get_forging_stake_merkle_path_info(
		&self,
		requested_epoch: u32,
	) -> Result<Option<Vec<ForgingStakeMerklePathInfo>>, Error> {
		let epoch = if requested_epoch <= 2 {
			1
		} else {
			requested_epoch - 2
		};
		self.forging_stake_storage.stake_paths(epoch)
	}

	/// Verifies that the wallet stores all agree on a version after a
	/// restart. The forging stake store may instead lead by exactly one
	/// version, which is either retained (the genesis-plus-epoch-info
	/// configuration) or rolled back.
	pub fn ensure_storage_consistency_after_restore(&mut self) -> Result<(), Error> {
		let version = match self.box_storage.last_version_id()? {
			Some(version) => version,
			None => {
				// a wallet that never scanned a block; nothing to align
				return Ok(());
			}
		};

		if self.tx_storage.last_version_id()? != Some(version)
			|| self.csw_storage.last_version_id()? != Some(version)
			|| !self.application.check_storages_version(&version)
		{
			return Err(ErrorKind::Consistency(format!(
				"wallet storages not consistent, boxes at {}",
				version
			))
			.into());
		}

		if self.forging_stake_storage.last_version_id()? == Some(version) {
			return Ok(());
		}

		let recent = self.forging_stake_storage.rollback_versions(2)?;
		if recent.len() == 2 && recent[1] == version {
			if self.forging_stake_storage.num_versions()? == 2 {
				// genesis plus the first epoch-info write; the lead is
				// legitimate and the epoch data must be retained
				return Ok(());
			}
			warn!(
				"wallet: forging stake store leads, rolling back to {}",
				version
			);
			return self.forging_stake_storage.rollback(&version);
		}

		Err(ErrorKind::Consistency(format!(
			"forging stake store at {:?}, boxes at {}",
			recent.first(),
			version
		))
		.into())
	}
}

// The version an epoch-info write lands under, derived from the snapshot
// itself so a re-run after a crash produces the same version.
fn consensus_info_version(info: &ConsensusEpochInfo) -> Hash {
	let mut bytes = vec![0; 4];
	BigEndian::write_u32(&mut bytes, info.epoch);
	bytes.extend_from_slice(info.stake_merkle_tree.root().as_ref());
	blake2b(&bytes)
}
