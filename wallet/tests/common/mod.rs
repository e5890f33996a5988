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

//! Helpers shared by the wallet integration tests.

use std::fs;

use latus_core::core::block::{
	AggregatedTransaction, Block, BlockHeader, ForwardTransfer, MainchainBlockReferenceData,
	SidechainRelatedOutput,
};
use latus_core::core::boxes::{BoxId, CoinBox, ForgerBox, OutputBox};
use latus_core::core::hash::{blake2b, Hash};
use latus_core::core::proposition::{Proposition, VrfPublicKey};
use latus_core::core::transaction::SidechainTransaction;
use latus_util as util;
use latus_wallet::{DefaultApplicationWallet, Secret, Wallet};

pub fn clean_output_dir(test_dir: &str) {
	let _ = fs::remove_dir_all(test_dir);
}

pub fn setup(test_dir: &str) {
	util::init_test_logger();
	clean_output_dir(test_dir);
}

pub fn open_wallet(test_dir: &str) -> Wallet {
	Wallet::open(test_dir.to_string(), Box::new(DefaultApplicationWallet)).unwrap()
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

pub fn forger_to(owner: Proposition, signer: Proposition, value: u64, nonce: u64) -> OutputBox {
	OutputBox::Forger(ForgerBox {
		proposition: owner,
		value,
		nonce,
		block_sign_proposition: signer,
		vrf_pub_key: VrfPublicKey::from_vec(&blake2b(b"vrf").to_vec()),
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

pub fn ft(dest: Proposition, amount: u64) -> SidechainRelatedOutput {
	SidechainRelatedOutput::ForwardTransfer(ForwardTransfer {
		proposition: dest,
		amount,
		mc_return_address: [9; 20],
	})
}

pub fn sc_creation() -> SidechainRelatedOutput {
	SidechainRelatedOutput::SidechainCreation(latus_core::core::block::SidechainCreation {
		version: 1,
		amount: 0,
		custom_data: vec![],
	})
}

pub fn mc_ref(outputs: Vec<SidechainRelatedOutput>, tag: &[u8]) -> MainchainBlockReferenceData {
	let aggregated = if outputs.is_empty() {
		None
	} else {
		Some(AggregatedTransaction {
			mc_tx_hash: blake2b(tag),
			tx_index: 2,
			outputs,
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
