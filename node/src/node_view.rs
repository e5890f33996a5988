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

//! The in-memory quadruple of node subsystems and the block application
//! protocol over them. Updates proceed state, wallet, history; the history
//! best-block write is the atomic crossing point a restart reasons from:
//! everything state and wallet did beyond it retreats, everything behind
//! it stands.

use std::sync::mpsc;

use crate::chain::{ApplicationState, History, ProgressInfo, State};
use crate::core::consensus::ConsensusParams;
use crate::core::core::block::Block;
use crate::core::core::boxes::BoxId;
use crate::core::core::epoch::FullConsensusEpochInfo;
use crate::core::core::hash::Hash;
use crate::core::core::proposition::Proposition;
use crate::error::{Error, ErrorKind};
use crate::events::NodeViewEvent;
use crate::pool::{MemoryPool, PoolStateView};
use crate::wallet::{ApplicationWallet, Secret, Wallet};

/// The four subsystems the coordinator owns, plus its event subscribers.
pub struct NodeView {
	history: History,
	state: State,
	wallet: Wallet,
	pool: MemoryPool,
	subscribers: Vec<mpsc::Sender<NodeViewEvent>>,
	halted: bool,
}

// The state viewed through the pool admission lens.
struct StateView<'a> {
	state: &'a State,
}

impl<'a> PoolStateView for StateView<'a> {
	fn box_is_unspent(&self, id: &BoxId) -> bool {
		self.state.box_is_unspent(id).unwrap_or(false)
	}
}

impl NodeView {
	/// Opens all subsystems under the provided directory and runs the
	/// restart consistency procedure before serving anything.
	pub fn open(
		db_root: &str,
		params: ConsensusParams,
		application_state: Box<dyn ApplicationState>,
		application_wallet: Box<dyn ApplicationWallet>,
	) -> Result<NodeView, Error> {
		let history = History::open(db_root.to_string(), params)?;
		let state = State::open(db_root.to_string(), params, application_state);
		let wallet = Wallet::open(db_root.to_string(), application_wallet)?;
		let mut view = NodeView {
			history,
			state,
			wallet,
			pool: MemoryPool::new(),
			subscribers: vec![],
			halted: false,
		};
		view.check_and_recover_storages()?;
		Ok(view)
	}

	/// Registers an event subscriber.
	pub fn subscribe(&mut self, subscriber: mpsc::Sender<NodeViewEvent>) {
		self.subscribers.push(subscriber);
	}

	fn publish(&mut self, event: NodeViewEvent) {
		// subscribers that went away are dropped on the spot
		self.subscribers
			.retain(|subscriber| subscriber.send(event.clone()).is_ok());
	}

	/// Read access to history.
	pub fn history(&self) -> &History {
		&self.history
	}

	/// Read access to the state.
	pub fn state(&self) -> &State {
		&self.state
	}

	/// Read access to the wallet.
	pub fn wallet(&self) -> &Wallet {
		&self.wallet
	}

	/// Read access to the memory pool.
	pub fn pool(&self) -> &MemoryPool {
		&self.pool
	}

	/// Whether a failed rollback halted the coordinator.
	pub fn is_halted(&self) -> bool {
		self.halted
	}

	/// Adds a locally generated secret to the wallet.
	pub fn add_secret(&mut self, secret: Secret) -> Result<(), Error> {
		self.refuse_if_halted()?;
		Ok(self.wallet.add_secret(secret)?)
	}

	/// Removes the secret of the provided proposition from the wallet.
	pub fn remove_secret(&mut self, proposition: &Proposition) -> Result<(), Error> {
		self.refuse_if_halted()?;
		Ok(self.wallet.remove_secret(proposition)?)
	}

	/// Submits a transaction to the memory pool.
	pub fn add_transaction(
		&mut self,
		tx: crate::core::core::transaction::SidechainTransaction,
	) -> Result<(), Error> {
		self.refuse_if_halted()?;
		let view = StateView { state: &self.state };
		self.pool
			.add_transaction(tx, &view)
			.map_err(|e| ErrorKind::Other(format!("{}", e)).into())
	}

	fn refuse_if_halted(&self) -> Result<(), Error> {
		if self.halted {
			Err(ErrorKind::Halted.into())
		} else {
			Ok(())
		}
	}

	/// Offers one block to the node view. Already-known blocks are ignored
	/// without any store write or event. A block the state rejects is
	/// reported to history and the application finishes cleanly with
	/// whatever prefix made it through.
	pub fn apply_block(&mut self, block: &Block) -> Result<(), Error> {
		self.refuse_if_halted()?;

		let id = block.id();
		if self.history.contains(&id)? {
			debug!("node view: block {} already known, ignoring", id);
			return Ok(());
		}

		let progress = match self.history.append(block) {
			Ok(progress) => progress,
			Err(e) => {
				self.publish(NodeViewEvent::SyntacticallyFailedModifier(id));
				return Err(e.into());
			}
		};

		if progress.to_apply.is_empty() {
			if !progress.to_download.is_empty() {
				self.publish(NodeViewEvent::DownloadRequested(progress.to_download.clone()));
			}
			return Ok(());
		}

		let to_remove = progress.to_remove.clone();
		let applied = self.update_state_and_wallet(progress, vec![])?;

		let view = StateView { state: &self.state };
		self.pool.reconcile(&to_remove, &applied, &view);

		let applied_ids: Vec<Hash> = applied.iter().map(|b| b.id()).collect();
		for applied_id in applied_ids {
			self.publish(NodeViewEvent::SemanticallySuccessfulModifier(applied_id));
		}
		Ok(())
	}

	// Rolls state and wallet back to the branch point if the progress asks
	// for a chain switch, then walks the blocks to apply. Recurses into the
	// alternative progress history proposes when a block fails.
	fn update_state_and_wallet(
		&mut self,
		progress: ProgressInfo,
		mut suffix_applied: Vec<Block>,
	) -> Result<Vec<Block>, Error> {
		if progress.chain_switching_needed() {
			let branch_point = progress.branch_point.expect("checked above");
			if self.state.version()? != Some(branch_point) {
				info!("node view: rolling back to branch point {}", branch_point);
				if let Err(e) = self.rollback_wallet_and_state(&branch_point) {
					self.halted = true;
					self.publish(NodeViewEvent::RollbackFailed(branch_point));
					error!("node view: rollback to {} failed, halting", branch_point);
					return Err(e);
				}
				// keep only the suffix from the branch point on; the rest
				// has just been taken back out
				if let Some(pos) = suffix_applied.iter().position(|b| b.id() == branch_point) {
					suffix_applied.drain(..pos);
				} else {
					suffix_applied.clear();
				}
			}
		}
		self.apply_state_and_wallet(progress, suffix_applied)
	}

	fn rollback_wallet_and_state(&mut self, to: &Hash) -> Result<(), Error> {
		self.wallet.rollback(to)?;
		self.state.rollback(to)?;
		Ok(())
	}

	// Applies each block of the progress in order: consensus epoch switch
	// bookkeeping first, then the state transition, then the wallet scan,
	// then the history validity report that flips the best pointer.
	fn apply_state_and_wallet(
		&mut self,
		progress: ProgressInfo,
		mut suffix_applied: Vec<Block>,
	) -> Result<Vec<Block>, Error> {
		let mut alternative: Option<ProgressInfo> = None;

		for block in &progress.to_apply {
			if alternative.is_some() {
				// a previous block of this batch already failed
				break;
			}

			if self.state.is_switching_consensus_epoch(block)? {
				let (last_block_in_epoch, epoch_info) =
					self.state.current_consensus_epoch_info()?;
				let nonce = self
					.history
					.consensus_epoch_nonce(epoch_info.epoch, &last_block_in_epoch);
				self.history.apply_full_consensus_info(
					&last_block_in_epoch,
					FullConsensusEpochInfo {
						epoch: epoch_info.epoch,
						stake_merkle_root: epoch_info.stake_merkle_tree.root(),
						total_stake: epoch_info.forgers_stake,
						nonce,
					},
				)?;
				// from here until the wallet scan of this block lands, the
				// forging stake store legitimately leads the others
				self.wallet.apply_consensus_epoch_info(&epoch_info)?;
			}

			match self.state.apply_modifier(block) {
				Err(e) if e.is_bad_block() => {
					warn!("node view: state rejected block {}: {}", block.id(), e);
					let proposed = self
						.history
						.report_modifier_is_invalid(block, &progress)?;
					self.publish(NodeViewEvent::SemanticallyFailedModifier(block.id()));
					alternative = Some(proposed);
				}
				Err(e) => return Err(e.into()),
				Ok(()) => {
					let epoch_info = self.state.withdrawal_epoch_info()?;
					if self.state.is_withdrawal_epoch_last_index()? {
						let fee_payments = self.state.get_fee_payments(epoch_info.epoch)?;
						self.history
							.update_fee_payments_info(&block.id(), &fee_payments)?;
						let utxo_view = self.state.utxo_merkle_tree_view()?;
						self.wallet.scan_persistent(
							block,
							epoch_info.epoch,
							&fee_payments,
							Some(&utxo_view),
						)?;
					} else {
						self.wallet
							.scan_persistent(block, epoch_info.epoch, &[], None)?;
					}
					// the last write: the atomic crossing point
					self.history.report_modifier_is_valid(block)?;
					suffix_applied.push(block.clone());
				}
			}
		}

		match alternative {
			Some(proposed) => self.update_state_and_wallet(proposed, suffix_applied),
			None => Ok(suffix_applied),
		}
	}

	/// Brings history, state and wallet back to a common version after a
	/// restart. History's best-block write is the crossing point: if it
	/// never recorded the crash block, state and wallet retreat to the
	/// newest state ancestor still on the active chain.
	pub fn check_and_recover_storages(&mut self) -> Result<(), Error> {
		let history_version = self.history.best_block_id()?;
		self.state.ensure_storage_consistency_after_restore()?;
		let state_version = self.state.version()?;

		match (history_version, state_version) {
			(None, None) => {
				// a fresh node; the wallet must be fresh too
				if self.wallet.version()?.is_some() {
					return Err(ErrorKind::Consistency(
						"wallet has scans but history and state are empty".to_owned(),
					)
					.into());
				}
				Ok(())
			}
			(Some(history_version), Some(state_version)) if history_version == state_version => {
				self.wallet.ensure_storage_consistency_after_restore()?;
				if self.wallet.version()? == Some(history_version) {
					info!("node view: stores consistent at {}", history_version);
					Ok(())
				} else {
					// wallet precedes history in the update order, so this
					// configuration has no legal crash window
					Err(ErrorKind::Consistency(format!(
						"history and state at {} but wallet at {:?}",
						history_version,
						self.wallet.version()?
					))
					.into())
				}
			}
			(Some(history_version), Some(state_version)) => {
				warn!(
					"node view: history at {} but state at {}, retreating",
					history_version, state_version
				);
				let history = &self.history;
				let non_chain_suffix = history.chain_back(
					&state_version,
					|id| history.is_in_active_chain(id),
					usize::max_value(),
				)?;
				let rollback_to = match non_chain_suffix.first() {
					Some(rollback_to) => *rollback_to,
					None => {
						return Err(ErrorKind::Consistency(format!(
							"no active-chain ancestor of state version {}",
							state_version
						))
						.into());
					}
				};
				if let Err(e) = self
					.state
					.rollback(&rollback_to)
					.map_err(Error::from)
					.and_then(|_| self.wallet.rollback(&rollback_to).map_err(Error::from))
				{
					self.halted = true;
					self.publish(NodeViewEvent::RollbackFailed(rollback_to));
					return Err(e);
				}
				info!("node view: recovered at {}", rollback_to);
				Ok(())
			}
			(history_version, state_version) => Err(ErrorKind::Consistency(format!(
				"history at {:?} but state at {:?}",
				history_version, state_version
			))
			.into()),
		}
	}
}
