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

//! Extraction of the box delta a block applies to the box set. Both the
//! state and the wallet derive their view of a block from this single
//! contract, so the two can never disagree on what a block did.

use std::collections::HashSet;

use crate::core::block::{Block, SidechainRelatedOutput};
use crate::core::boxes::{BoxId, OutputBox};

/// The box delta of one block: boxes it creates and ids of boxes it opens.
#[derive(Debug, Clone, Default)]
pub struct BoxChanges {
	/// Boxes created by the block, transaction outputs first, then forward
	/// transfers in mainchain order
	pub to_append: Vec<OutputBox>,
	/// Ids of the boxes the block opens
	pub to_remove: Vec<BoxId>,
}

impl BoxChanges {
	/// Ids appearing both as created and opened, empty for any well-formed
	/// block.
	pub fn overlapping_ids(&self) -> Vec<BoxId> {
		let removed: HashSet<&BoxId> = self.to_remove.iter().collect();
		self.to_append
			.iter()
			.map(|b| b.id())
			.filter(|id| removed.contains(id))
			.collect()
	}
}

/// Derive the box delta of the given block: outputs and opened ids of every
/// carried transaction, plus one coin box per forward transfer found in the
/// block's mainchain references.
pub fn box_changes(block: &Block) -> BoxChanges {
	let mut changes = BoxChanges::default();
	for tx in &block.transactions {
		changes.to_remove.extend_from_slice(tx.box_ids_to_open());
		changes.to_append.extend_from_slice(tx.new_boxes());
	}
	for ref_data in &block.mainchain_block_references_data {
		if let Some(agg_tx) = &ref_data.sidechain_related_aggregated_transaction {
			let mut ft_leaf_index = 0u32;
			for output in &agg_tx.outputs {
				match output {
					SidechainRelatedOutput::ForwardTransfer(ft) => {
						changes
							.to_append
							.push(OutputBox::Coin(ft.to_box(&agg_tx.mc_tx_hash, ft_leaf_index)));
						ft_leaf_index += 1;
					}
					SidechainRelatedOutput::SidechainCreation(_) => {}
				}
			}
		}
	}
	changes
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::core::block::{AggregatedTransaction, BlockHeader, ForwardTransfer};
	use crate::core::boxes::CoinBox;
	use crate::core::hash::blake2b;
	use crate::core::proposition::Proposition;
	use crate::core::transaction::SidechainTransaction;

	fn coin(value: u64, nonce: u64) -> OutputBox {
		OutputBox::Coin(CoinBox {
			proposition: Proposition::from_vec(b"someone"),
			value,
			nonce,
		})
	}

	#[test]
	fn changes_cover_txs_and_forward_transfers() {
		let opened = blake2b(b"spent");
		let block = Block {
			header: BlockHeader {
				parent_id: blake2b(b"parent"),
				timestamp: 10,
				forger_proposition: Proposition::from_vec(b"forger"),
			},
			transactions: vec![SidechainTransaction {
				inputs: vec![opened],
				outputs: vec![coin(4, 0), coin(5, 1)],
				fee: 1,
			}],
			mainchain_block_references_data: vec![crate::core::block::MainchainBlockReferenceData {
				header_hash: blake2b(b"mc"),
				sidechain_related_aggregated_transaction: Some(AggregatedTransaction {
					mc_tx_hash: blake2b(b"mctx"),
					tx_index: 0,
					outputs: vec![SidechainRelatedOutput::ForwardTransfer(ForwardTransfer {
						proposition: Proposition::from_vec(b"dest"),
						amount: 33,
						mc_return_address: [1; 20],
					})],
				}),
				sc_commitment_merkle_path: Default::default(),
				btr_commitment: blake2b(b"btr"),
				cert_commitment: blake2b(b"cert"),
				sc_cr_commitment: blake2b(b"sccr"),
			}],
		};

		let changes = box_changes(&block);
		assert_eq!(changes.to_remove, vec![opened]);
		assert_eq!(changes.to_append.len(), 3);
		assert_eq!(changes.to_append[2].value(), 33);
		assert!(changes.overlapping_ids().is_empty());
	}
}
