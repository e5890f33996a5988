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

//! Helpers shared by the coordinator integration tests.

use std::fs;

use latus_chain::DefaultApplicationState;
use latus_core::consensus::ConsensusParams;
use latus_core::core::block::{Block, BlockHeader};
use latus_core::core::boxes::{BoxId, CoinBox, OutputBox};
use latus_core::core::hash::{blake2b, Hash};
use latus_core::core::proposition::Proposition;
use latus_core::core::transaction::SidechainTransaction;
use latus_node::NodeView;
use latus_util as util;
use latus_wallet::{DefaultApplicationWallet, Secret};

pub fn clean_output_dir(test_dir: &str) {
	let _ = fs::remove_dir_all(test_dir);
}

pub fn setup(test_dir: &str) {
	util::init_test_logger();
	clean_output_dir(test_dir);
}

/// Ten 6-second slots per consensus epoch, three mainchain references per
/// withdrawal epoch.
pub fn test_params() -> ConsensusParams {
	ConsensusParams {
		slots_in_epoch: 10,
		seconds_in_slot: 6,
		withdrawal_epoch_length: 3,
	}
}

pub fn open_node(test_dir: &str) -> NodeView {
	NodeView::open(
		test_dir,
		test_params(),
		Box::new(DefaultApplicationState),
		Box::new(DefaultApplicationWallet),
	)
	.unwrap()
}

pub fn secret(tag: u8) -> Secret {
	Secret::from_seed([tag; 32])
}

pub fn coin_to(owner: Proposition, value: u64, nonce: u64) -> OutputBox {
	OutputBox::Coin(CoinBox {
		proposition: owner,
		value,
		nonce,
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
			forger_proposition: Proposition::from_vec(b"forger"),
		},
		transactions,
		mainchain_block_references_data: vec![],
	}
}

pub fn genesis_block() -> Block {
	block(blake2b(b"void"), 0, vec![])
}

/// Asserts the version-agreement invariant of the whole node view.
pub fn assert_converged(view: &NodeView, at: Hash) {
	assert_eq!(view.history().best_block_id().unwrap(), Some(at));
	assert_eq!(view.state().version().unwrap(), Some(at));
	assert_eq!(view.wallet().version().unwrap(), Some(at));
}
