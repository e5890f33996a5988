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

//! Helpers shared by the chain integration tests.

use std::fs;

use latus_core::consensus::ConsensusParams;
use latus_core::core::block::{
	AggregatedTransaction, Block, BlockHeader, ForwardTransfer, MainchainBlockReferenceData,
	SidechainRelatedOutput,
};
use latus_core::core::boxes::{BoxId, CoinBox, ForgerBox, OutputBox};
use latus_core::core::hash::{blake2b, Hash};
use latus_core::core::proposition::{Proposition, VrfPublicKey};
use latus_core::core::transaction::SidechainTransaction;
use latus_util as util;

pub fn clean_output_dir(test_dir: &str) {
	let _ = fs::remove_dir_all(test_dir);
}

pub fn setup(test_dir: &str) {
	util::init_test_logger();
	clean_output_dir(test_dir);
}

pub fn test_params() -> ConsensusParams {
	ConsensusParams {
		slots_in_epoch: 10,
		seconds_in_slot: 6,
		withdrawal_epoch_length: 3,
	}
}

pub fn prop(tag: &[u8]) -> Proposition {
	Proposition::from_vec(&blake2b(tag).to_vec())
}

pub fn coin_box(owner: &[u8], value: u64, nonce: u64) -> OutputBox {
	OutputBox::Coin(CoinBox {
		proposition: prop(owner),
		value,
		nonce,
	})
}

pub fn forger_box(owner: &[u8], value: u64, nonce: u64) -> OutputBox {
	OutputBox::Forger(ForgerBox {
		proposition: prop(owner),
		value,
		nonce,
		block_sign_proposition: prop(owner),
		vrf_pub_key: VrfPublicKey::from_vec(&blake2b(owner).to_vec()),
	})
}

pub fn tx(inputs: Vec<BoxId>, outputs: Vec<OutputBox>, fee: u64) -> SidechainTransaction {
	SidechainTransaction {
		inputs,
		outputs,
		fee,
	}
}

pub fn block(parent: Hash, timestamp: u64, transactions: Vec<SidechainTransaction>) -> Block {
	Block {
		header: BlockHeader {
			parent_id: parent,
			timestamp,
			forger_proposition: prop(b"the-forger"),
		},
		transactions,
		mainchain_block_references_data: vec![],
	}
}

pub fn mc_ref(transfers: Vec<ForwardTransfer>, tag: &[u8]) -> MainchainBlockReferenceData {
	let aggregated = if transfers.is_empty() {
		None
	} else {
		Some(AggregatedTransaction {
			mc_tx_hash: blake2b(tag),
			tx_index: 0,
			outputs: transfers
				.into_iter()
				.map(SidechainRelatedOutput::ForwardTransfer)
				.collect(),
		})
	};
	MainchainBlockReferenceData {
		header_hash: blake2b(tag),
		sidechain_related_aggregated_transaction: aggregated,
		sc_commitment_merkle_path: Default::default(),
		btr_commitment: blake2b(b"btr"),
		cert_commitment: blake2b(b"cert"),
		sc_cr_commitment: blake2b(b"sccr"),
	}
}
