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

//! The memory pool itself: an insertion-ordered set of transactions that
//! spend currently-unspent boxes and don't conflict among themselves.
//! Reconciled against the state after every block application or chain
//! switch.

use std::collections::{HashMap, HashSet};

use latus_core::core::block::Block;
use latus_core::core::boxes::BoxId;
use latus_core::core::hash::Hash;
use latus_core::core::transaction::SidechainTransaction;

use crate::types::{PoolError, PoolStateView};

/// A pool of candidate transactions for the next blocks.
pub struct MemoryPool {
	// insertion order preserved for fair mining candidate selection
	ordered_ids: Vec<Hash>,
	transactions: HashMap<Hash, SidechainTransaction>,
	// every box id opened by some pool transaction
	opened_boxes: HashSet<BoxId>,
}

impl MemoryPool {
	/// An empty pool.
	pub fn new() -> MemoryPool {
		MemoryPool {
			ordered_ids: vec![],
			transactions: HashMap::new(),
			opened_boxes: HashSet::new(),
		}
	}

	/// Number of pooled transactions.
	pub fn len(&self) -> usize {
		self.ordered_ids.len()
	}

	/// Whether the pool holds no transactions.
	pub fn is_empty(&self) -> bool {
		self.ordered_ids.is_empty()
	}

	/// Whether the pool holds the provided transaction.
	pub fn contains(&self, tx_id: &Hash) -> bool {
		self.transactions.contains_key(tx_id)
	}

	/// The pooled transactions, oldest first.
	pub fn all_transactions(&self) -> Vec<&SidechainTransaction> {
		self.ordered_ids
			.iter()
			.filter_map(|id| self.transactions.get(id))
			.collect()
	}

	/// Admits a transaction if its inputs are unspent in the provided state
	/// view and unclaimed within the pool.
	pub fn add_transaction(
		&mut self,
		tx: SidechainTransaction,
		view: &dyn PoolStateView,
	) -> Result<(), PoolError> {
		let tx_id = tx.id();
		if self.contains(&tx_id) {
			return Err(PoolError::DuplicateTx);
		}
		for box_id in tx.box_ids_to_open() {
			if !view.box_is_unspent(box_id) {
				return Err(PoolError::BoxNotAvailable(format!("{}", box_id)));
			}
			if self.opened_boxes.contains(box_id) {
				return Err(PoolError::DoubleSpendInPool(format!("{}", box_id)));
			}
		}
		for box_id in tx.box_ids_to_open() {
			self.opened_boxes.insert(*box_id);
		}
		self.ordered_ids.push(tx_id);
		self.transactions.insert(tx_id, tx);
		Ok(())
	}

	/// Drops the provided transaction if pooled.
	pub fn remove(&mut self, tx_id: &Hash) {
		if let Some(tx) = self.transactions.remove(tx_id) {
			self.ordered_ids.retain(|id| id != tx_id);
			for box_id in tx.box_ids_to_open() {
				self.opened_boxes.remove(box_id);
			}
		}
	}

	/// Brings the pool in line with a state change: transactions confirmed
	/// by the applied blocks leave the pool, transactions of rolled-back
	/// blocks are offered back, and everything is re-validated against the
	/// new state view.
	pub fn reconcile(
		&mut self,
		rolled_back: &[Block],
		applied: &[Block],
		view: &dyn PoolStateView,
	) {
		let confirmed: HashSet<Hash> = applied
			.iter()
			.flat_map(|block| block.transactions.iter().map(|tx| tx.id()))
			.collect();

		// keep surviving pool transactions in their original order,
		// then queue the rolled-back ones behind them
		let mut candidates: Vec<SidechainTransaction> = self
			.ordered_ids
			.iter()
			.filter_map(|id| self.transactions.get(id))
			.cloned()
			.collect();
		for block in rolled_back {
			candidates.extend(block.transactions.iter().cloned());
		}

		self.ordered_ids.clear();
		self.transactions.clear();
		self.opened_boxes.clear();

		let before = candidates.len();
		for tx in candidates {
			if confirmed.contains(&tx.id()) {
				continue;
			}
			// silently drop what no longer validates
			let _ = self.add_transaction(tx, view);
		}
		debug!(
			"pool: reconciled, {} of {} candidates kept",
			self.len(),
			before
		);
	}
}

impl Default for MemoryPool {
	fn default() -> MemoryPool {
		MemoryPool::new()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use latus_core::core::block::BlockHeader;
	use latus_core::core::boxes::{CoinBox, OutputBox};
	use latus_core::core::hash::blake2b;
	use latus_core::core::proposition::Proposition;

	struct AllUnspent;
	impl PoolStateView for AllUnspent {
		fn box_is_unspent(&self, _id: &BoxId) -> bool {
			true
		}
	}

	struct NoneUnspent;
	impl PoolStateView for NoneUnspent {
		fn box_is_unspent(&self, _id: &BoxId) -> bool {
			false
		}
	}

	fn tx(tag: u8, inputs: Vec<BoxId>) -> SidechainTransaction {
		SidechainTransaction {
			inputs,
			outputs: vec![OutputBox::Coin(CoinBox {
				proposition: Proposition::from_vec(b"p"),
				value: 1,
				nonce: tag as u64,
			})],
			fee: 1,
		}
	}

	fn block_with(transactions: Vec<SidechainTransaction>) -> Block {
		Block {
			header: BlockHeader {
				parent_id: blake2b(b"parent"),
				timestamp: 0,
				forger_proposition: Proposition::from_vec(b"f"),
			},
			transactions,
			mainchain_block_references_data: vec![],
		}
	}

	#[test]
	fn add_and_double_spend_rules() {
		let mut pool = MemoryPool::new();
		let shared_input = blake2b(b"in");
		let first = tx(1, vec![shared_input]);
		let second = tx(2, vec![shared_input]);

		pool.add_transaction(first.clone(), &AllUnspent).unwrap();
		assert_eq!(
			pool.add_transaction(first.clone(), &AllUnspent),
			Err(PoolError::DuplicateTx)
		);
		match pool.add_transaction(second, &AllUnspent) {
			Err(PoolError::DoubleSpendInPool(_)) => (),
			other => panic!("expected DoubleSpendInPool, got {:?}", other),
		}
		assert_eq!(
			pool.add_transaction(tx(3, vec![blake2b(b"spent")]), &NoneUnspent),
			Err(PoolError::BoxNotAvailable(format!("{}", blake2b(b"spent"))))
		);
		assert_eq!(pool.len(), 1);
	}

	#[test]
	fn reconcile_confirms_and_readmits() {
		let mut pool = MemoryPool::new();
		let pooled = tx(1, vec![blake2b(b"a")]);
		let confirmed = tx(2, vec![blake2b(b"b")]);
		pool.add_transaction(pooled.clone(), &AllUnspent).unwrap();
		pool.add_transaction(confirmed.clone(), &AllUnspent).unwrap();

		let rolled_back = tx(3, vec![blake2b(b"c")]);
		pool.reconcile(
			&[block_with(vec![rolled_back.clone()])],
			&[block_with(vec![confirmed.clone()])],
			&AllUnspent,
		);

		assert!(pool.contains(&pooled.id()));
		assert!(!pool.contains(&confirmed.id()));
		assert!(pool.contains(&rolled_back.id()));
		assert_eq!(pool.len(), 2);

		// pool order: survivors first, re-admitted transactions after
		let ordered: Vec<Hash> = pool.all_transactions().iter().map(|t| t.id()).collect();
		assert_eq!(ordered, vec![pooled.id(), rolled_back.id()]);
	}

	#[test]
	fn reconcile_drops_invalidated() {
		let mut pool = MemoryPool::new();
		let pooled = tx(1, vec![blake2b(b"a")]);
		pool.add_transaction(pooled.clone(), &AllUnspent).unwrap();

		pool.reconcile(&[], &[], &NoneUnspent);
		assert!(pool.is_empty());
	}
}
