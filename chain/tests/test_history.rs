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

mod common;

use latus_chain as chain;

use chain::{ErrorKind, History};
use common::*;
use latus_core::core::epoch::FullConsensusEpochInfo;
use latus_core::core::hash::blake2b;

#[test]
fn genesis_and_plain_extension() {
	let test_dir = "test_output/history_genesis";
	setup(test_dir);
	let mut history = History::open(test_dir.to_string(), test_params()).unwrap();

	assert_eq!(history.best_block_id().unwrap(), None);

	let genesis = block(blake2b(b"void"), 0, vec![]);
	let progress = history.append(&genesis).unwrap();
	assert!(!progress.chain_switching_needed());
	assert_eq!(progress.to_apply.len(), 1);
	assert_eq!(progress.to_apply[0].id(), genesis.id());

	// not best until reported valid
	assert_eq!(history.best_block_id().unwrap(), None);
	history.report_modifier_is_valid(&genesis).unwrap();
	assert_eq!(history.best_block_id().unwrap(), Some(genesis.id()));
	assert_eq!(history.current_height(), Some(0));
	assert!(history.is_in_active_chain(&genesis.id()));

	let b1 = block(genesis.id(), 6, vec![]);
	let progress = history.append(&b1).unwrap();
	assert_eq!(progress.to_apply.len(), 1);
	assert!(progress.to_remove.is_empty());
	history.report_modifier_is_valid(&b1).unwrap();
	assert_eq!(history.current_height(), Some(1));

	clean_output_dir(test_dir);
}

#[test]
fn duplicate_append_rejected() {
	let test_dir = "test_output/history_duplicate";
	setup(test_dir);
	let mut history = History::open(test_dir.to_string(), test_params()).unwrap();

	let genesis = block(blake2b(b"void"), 0, vec![]);
	history.append(&genesis).unwrap();
	assert!(history.contains(&genesis.id()).unwrap());
	assert!(history.append(&genesis).is_err());

	clean_output_dir(test_dir);
}

#[test]
fn unknown_parent_rejected() {
	let test_dir = "test_output/history_unknown_parent";
	setup(test_dir);
	let mut history = History::open(test_dir.to_string(), test_params()).unwrap();

	let genesis = block(blake2b(b"void"), 0, vec![]);
	history.append(&genesis).unwrap();
	history.report_modifier_is_valid(&genesis).unwrap();

	let orphan = block(blake2b(b"nowhere"), 6, vec![]);
	match history.append(&orphan) {
		Err(e) => match e.kind() {
			ErrorKind::UnknownParent(_) => (),
			k => panic!("expected UnknownParent, got {:?}", k),
		},
		Ok(_) => panic!("orphan accepted"),
	}

	clean_output_dir(test_dir);
}

#[test]
fn better_fork_triggers_chain_switch() {
	let test_dir = "test_output/history_fork";
	setup(test_dir);
	let mut history = History::open(test_dir.to_string(), test_params()).unwrap();

	let genesis = block(blake2b(b"void"), 0, vec![]);
	let b1 = block(genesis.id(), 6, vec![]);
	let b2 = block(b1.id(), 12, vec![]);
	for b in [&genesis, &b1, &b2].iter() {
		history.append(b).unwrap();
		history.report_modifier_is_valid(b).unwrap();
	}
	assert_eq!(history.current_height(), Some(2));

	// a fork off genesis, one block longer than the active chain
	let f1 = block(genesis.id(), 7, vec![]);
	let f2 = block(f1.id(), 13, vec![]);
	let f3 = block(f2.id(), 19, vec![]);

	// shorter or equal forks are stored without any progress
	let progress = history.append(&f1).unwrap();
	assert!(progress.to_apply.is_empty());
	assert!(!progress.chain_switching_needed());
	let progress = history.append(&f2).unwrap();
	assert!(progress.to_apply.is_empty());

	// the third fork block outgrows the active chain
	let progress = history.append(&f3).unwrap();
	assert!(progress.chain_switching_needed());
	assert_eq!(progress.branch_point, Some(genesis.id()));
	assert_eq!(
		progress.to_remove.iter().map(|b| b.id()).collect::<Vec<_>>(),
		vec![b1.id(), b2.id()]
	);
	assert_eq!(
		progress.to_apply.iter().map(|b| b.id()).collect::<Vec<_>>(),
		vec![f1.id(), f2.id(), f3.id()]
	);

	// the switch lands once the fork blocks are reported valid
	for b in [&f1, &f2, &f3].iter() {
		history.report_modifier_is_valid(b).unwrap();
	}
	assert_eq!(history.best_block_id().unwrap(), Some(f3.id()));
	assert!(history.is_in_active_chain(&f2.id()));
	assert!(!history.is_in_active_chain(&b1.id()));

	clean_output_dir(test_dir);
}

#[test]
fn invalid_report_proposes_nothing() {
	let test_dir = "test_output/history_invalid";
	setup(test_dir);
	let mut history = History::open(test_dir.to_string(), test_params()).unwrap();

	let genesis = block(blake2b(b"void"), 0, vec![]);
	let progress = history.append(&genesis).unwrap();
	let alternative = history
		.report_modifier_is_invalid(&genesis, &progress)
		.unwrap();
	assert!(alternative.to_apply.is_empty());
	assert!(alternative.to_remove.is_empty());
	assert!(!alternative.chain_switching_needed());
	assert_eq!(history.best_block_id().unwrap(), None);

	clean_output_dir(test_dir);
}

#[test]
fn chain_back_finds_active_ancestor() {
	let test_dir = "test_output/history_chain_back";
	setup(test_dir);
	let mut history = History::open(test_dir.to_string(), test_params()).unwrap();

	let genesis = block(blake2b(b"void"), 0, vec![]);
	let b1 = block(genesis.id(), 6, vec![]);
	for b in [&genesis, &b1].iter() {
		history.append(b).unwrap();
		history.report_modifier_is_valid(b).unwrap();
	}
	// two fork blocks recorded but never reported valid
	let f2 = block(b1.id(), 13, vec![]);
	let f3 = block(f2.id(), 19, vec![]);
	history.append(&f2).unwrap();
	history.append(&f3).unwrap();

	let path = history
		.chain_back(&f3.id(), |id| history.is_in_active_chain(id), usize::max_value())
		.unwrap();
	assert_eq!(path, vec![b1.id(), f2.id(), f3.id()]);

	// a block already on the active chain is its own path
	let path = history
		.chain_back(&b1.id(), |id| history.is_in_active_chain(id), usize::max_value())
		.unwrap();
	assert_eq!(path, vec![b1.id()]);

	clean_output_dir(test_dir);
}

#[test]
fn consensus_info_and_fee_payments_round_trip() {
	let test_dir = "test_output/history_consensus";
	setup(test_dir);
	let mut history = History::open(test_dir.to_string(), test_params()).unwrap();

	let genesis = block(blake2b(b"void"), 0, vec![]);
	history.append(&genesis).unwrap();
	history.report_modifier_is_valid(&genesis).unwrap();

	let info = FullConsensusEpochInfo {
		epoch: 1,
		stake_merkle_root: blake2b(b"root"),
		total_stake: 777,
		nonce: history.consensus_epoch_nonce(1, &genesis.id()),
	};
	history
		.apply_full_consensus_info(&genesis.id(), info.clone())
		.unwrap();
	assert_eq!(history.full_consensus_epoch_info(1).unwrap(), Some(info));
	assert_eq!(history.full_consensus_epoch_info(2).unwrap(), None);

	let payments = vec![latus_core::core::boxes::CoinBox {
		proposition: prop(b"forger-one"),
		value: 12,
		nonce: 1,
	}];
	history
		.update_fee_payments_info(&genesis.id(), &payments)
		.unwrap();
	assert_eq!(
		history.fee_payments_info(&genesis.id()).unwrap(),
		Some(payments)
	);

	clean_output_dir(test_dir);
}

#[test]
fn reopen_rebuilds_active_chain() {
	let test_dir = "test_output/history_reopen";
	setup(test_dir);

	let genesis = block(blake2b(b"void"), 0, vec![]);
	let b1 = block(genesis.id(), 6, vec![]);
	{
		let mut history = History::open(test_dir.to_string(), test_params()).unwrap();
		for b in [&genesis, &b1].iter() {
			history.append(b).unwrap();
			history.report_modifier_is_valid(b).unwrap();
		}
	}
	{
		let history = History::open(test_dir.to_string(), test_params()).unwrap();
		assert_eq!(history.best_block_id().unwrap(), Some(b1.id()));
		assert_eq!(history.current_height(), Some(1));
		assert!(history.is_in_active_chain(&genesis.id()));
		assert_eq!(history.height_of(&b1.id()), Some(1));
	}

	clean_output_dir(test_dir);
}
