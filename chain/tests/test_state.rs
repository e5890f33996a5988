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
use latus_store as store;

use std::sync::Arc;

use chain::{DefaultApplicationState, ErrorKind, State};
use common::*;
use latus_core::core::hash::blake2b;
use latus_core::core::Hashed;

fn open_state(test_dir: &str) -> State {
	State::open(
		test_dir.to_string(),
		test_params(),
		Box::new(DefaultApplicationState),
	)
}

#[test]
fn apply_and_spend() {
	let test_dir = "test_output/state_apply";
	setup(test_dir);
	let mut state = open_state(test_dir);

	assert_eq!(state.version().unwrap(), None);

	let minted = coin_box(b"alice", 100, 0);
	let genesis = block(blake2b(b"void"), 0, vec![tx(vec![], vec![minted.clone()], 0)]);
	state.apply_modifier(&genesis).unwrap();

	assert_eq!(state.version().unwrap(), Some(genesis.id()));
	assert!(state.box_is_unspent(&minted.id()).unwrap());
	assert_eq!(state.closed_box(&minted.id()).unwrap(), Some(minted.clone()));

	let change = coin_box(b"bob", 95, 1);
	let b1 = block(
		genesis.id(),
		6,
		vec![tx(vec![minted.id()], vec![change.clone()], 5)],
	);
	state.apply_modifier(&b1).unwrap();

	assert!(!state.box_is_unspent(&minted.id()).unwrap());
	assert!(state.box_is_unspent(&change.id()).unwrap());
	assert_eq!(state.version().unwrap(), Some(b1.id()));

	clean_output_dir(test_dir);
}

#[test]
fn invalid_blocks_leave_state_untouched() {
	let test_dir = "test_output/state_invalid";
	setup(test_dir);
	let mut state = open_state(test_dir);

	let minted = coin_box(b"alice", 100, 0);
	let genesis = block(blake2b(b"void"), 0, vec![tx(vec![], vec![minted.clone()], 0)]);
	state.apply_modifier(&genesis).unwrap();

	// opening a box that does not exist
	let bogus = block(
		genesis.id(),
		6,
		vec![tx(vec![blake2b(b"ghost")], vec![coin_box(b"eve", 1, 9)], 0)],
	);
	let err = state.apply_modifier(&bogus).unwrap_err();
	assert!(err.is_bad_block());
	assert_eq!(state.version().unwrap(), Some(genesis.id()));

	// wrong parent
	let disconnected = block(blake2b(b"elsewhere"), 6, vec![]);
	let err = state.apply_modifier(&disconnected).unwrap_err();
	match err.kind() {
		ErrorKind::InvalidBlock(_) => (),
		k => panic!("expected InvalidBlock, got {:?}", k),
	}

	// re-creating an existing box
	let duplicate = block(genesis.id(), 6, vec![tx(vec![], vec![minted.clone()], 0)]);
	assert!(state.apply_modifier(&duplicate).is_err());
	assert_eq!(state.version().unwrap(), Some(genesis.id()));

	clean_output_dir(test_dir);
}

#[test]
fn rollback_restores_previous_version() {
	let test_dir = "test_output/state_rollback";
	setup(test_dir);
	let mut state = open_state(test_dir);

	let minted = coin_box(b"alice", 100, 0);
	let genesis = block(blake2b(b"void"), 0, vec![tx(vec![], vec![minted.clone()], 0)]);
	state.apply_modifier(&genesis).unwrap();

	let spent = coin_box(b"bob", 100, 1);
	let b1 = block(
		genesis.id(),
		6,
		vec![tx(vec![minted.id()], vec![spent.clone()], 0)],
	);
	state.apply_modifier(&b1).unwrap();

	state.rollback(&genesis.id()).unwrap();
	assert_eq!(state.version().unwrap(), Some(genesis.id()));
	assert!(state.box_is_unspent(&minted.id()).unwrap());
	assert!(!state.box_is_unspent(&spent.id()).unwrap());

	// rolling back to a version that was discarded fails
	let err = state.rollback(&b1.id()).unwrap_err();
	match err.kind() {
		ErrorKind::Rollback(_) => (),
		k => panic!("expected Rollback, got {:?}", k),
	}

	clean_output_dir(test_dir);
}

#[test]
fn withdrawal_epoch_accounting_and_fee_payments() {
	let test_dir = "test_output/state_epochs";
	setup(test_dir);
	// withdrawal epoch length 3 in test params
	let mut state = open_state(test_dir);

	let genesis = block(blake2b(b"void"), 0, vec![]);
	state.apply_modifier(&genesis).unwrap();
	assert!(!state.is_withdrawal_epoch_last_index().unwrap());

	// two mainchain references
	let mut b1 = block(genesis.id(), 6, vec![tx(vec![], vec![coin_box(b"x", 7, 0)], 3)]);
	b1.mainchain_block_references_data = vec![mc_ref(vec![], b"mc1"), mc_ref(vec![], b"mc2")];
	state.apply_modifier(&b1).unwrap();
	let info = state.withdrawal_epoch_info().unwrap();
	assert_eq!((info.epoch, info.last_epoch_index), (0, 2));
	assert!(!state.is_withdrawal_epoch_last_index().unwrap());

	// third reference closes withdrawal epoch 0
	let mut b2 = block(b1.id(), 12, vec![tx(vec![], vec![coin_box(b"y", 9, 0)], 4)]);
	b2.mainchain_block_references_data = vec![mc_ref(vec![], b"mc3")];
	state.apply_modifier(&b2).unwrap();
	assert!(state.is_withdrawal_epoch_last_index().unwrap());

	let payments = state.get_fee_payments(0).unwrap();
	// all test blocks are forged by the same helper forger
	assert_eq!(payments.len(), 1);
	assert_eq!(payments[0].value, 7);
	assert_eq!(payments[0].proposition, prop(b"the-forger"));

	// next block rolls into withdrawal epoch 1
	let b3 = block(b2.id(), 18, vec![]);
	state.apply_modifier(&b3).unwrap();
	let info = state.withdrawal_epoch_info().unwrap();
	assert_eq!((info.epoch, info.last_epoch_index), (1, 0));

	clean_output_dir(test_dir);
}

#[test]
fn consensus_epoch_switch_detection() {
	let test_dir = "test_output/state_consensus_epoch";
	setup(test_dir);
	// epoch spans 10 slots of 6 seconds
	let mut state = open_state(test_dir);

	let genesis = block(blake2b(b"void"), 0, vec![]);
	// empty state never switches
	assert!(!state.is_switching_consensus_epoch(&genesis).unwrap());
	state.apply_modifier(&genesis).unwrap();
	assert_eq!(state.consensus_epoch().unwrap(), Some(1));

	let same_epoch = block(genesis.id(), 42, vec![]);
	assert!(!state.is_switching_consensus_epoch(&same_epoch).unwrap());

	let next_epoch = block(genesis.id(), 60, vec![]);
	assert!(state.is_switching_consensus_epoch(&next_epoch).unwrap());

	clean_output_dir(test_dir);
}

#[test]
fn stake_snapshot_covers_forger_boxes() {
	let test_dir = "test_output/state_stake";
	setup(test_dir);
	let mut state = open_state(test_dir);

	let fb1 = forger_box(b"forger-a", 40, 0);
	let fb2 = forger_box(b"forger-b", 60, 1);
	let genesis = block(
		blake2b(b"void"),
		0,
		vec![tx(vec![], vec![fb1.clone(), fb2.clone()], 0)],
	);
	state.apply_modifier(&genesis).unwrap();

	let (last_block, info) = state.current_consensus_epoch_info().unwrap();
	assert_eq!(last_block, genesis.id());
	assert_eq!(info.epoch, 1);
	assert_eq!(info.forgers_stake, 100);
	assert_eq!(info.stake_merkle_tree.leaves().len(), 2);

	let stake_hash = fb1.as_forger().unwrap().forging_stake_info().hash();
	assert!(info.stake_merkle_tree.leaf_index(&stake_hash).is_some());

	// spending a forger box shrinks the snapshot
	let b1 = block(
		genesis.id(),
		6,
		vec![tx(vec![fb1.id()], vec![coin_box(b"a", 40, 2)], 0)],
	);
	state.apply_modifier(&b1).unwrap();
	let (_, info) = state.current_consensus_epoch_info().unwrap();
	assert_eq!(info.forgers_stake, 60);
	assert_eq!(info.stake_merkle_tree.leaves().len(), 1);

	clean_output_dir(test_dir);
}

#[test]
fn utxo_view_commits_current_coin_boxes() {
	let test_dir = "test_output/state_utxo_view";
	setup(test_dir);
	let mut state = open_state(test_dir);

	let minted = coin_box(b"alice", 100, 0);
	let custom = latus_core::core::boxes::OutputBox::Custom(latus_core::core::boxes::CustomBox {
		proposition: prop(b"alice"),
		value: 1,
		nonce: 5,
		data: vec![1, 2],
	});
	let genesis = block(
		blake2b(b"void"),
		0,
		vec![tx(vec![], vec![minted.clone(), custom.clone()], 0)],
	);
	state.apply_modifier(&genesis).unwrap();

	let view = state.utxo_merkle_tree_view().unwrap();
	let path = view.merkle_path(&minted.id()).unwrap();
	assert!(path.verify(
		&latus_core::core::csw::UtxoMerkleTreeView::leaf_digest(&minted.id()),
		&view.root()
	));
	// custom boxes carry no coins and are not committed
	assert!(view.merkle_path(&custom.id()).is_none());

	clean_output_dir(test_dir);
}

#[test]
fn restore_check_rolls_back_leading_satellite() {
	let test_dir = "test_output/state_restore";
	setup(test_dir);

	let fb = forger_box(b"forger-a", 40, 0);
	let genesis = block(blake2b(b"void"), 0, vec![tx(vec![], vec![fb.clone()], 0)]);
	let b1 = block(genesis.id(), 6, vec![]);
	{
		let mut state = open_state(test_dir);
		state.apply_modifier(&genesis).unwrap();
		state.apply_modifier(&b1).unwrap();
	}
	// simulate a crash window: the forger store accepted the next block's
	// write but the box set never did
	{
		let env = Arc::new(store::new_env(test_dir.to_string() + "/state"));
		let forger = store::VersionedStore::open(env, "state_forger");
		forger
			.update(&blake2b(b"halfway"), vec![(b"junk".to_vec(), b"x".to_vec())], vec![])
			.unwrap();
	}
	{
		let mut state = open_state(test_dir);
		state.ensure_storage_consistency_after_restore().unwrap();
		assert_eq!(state.version().unwrap(), Some(b1.id()));
		let (_, info) = state.current_consensus_epoch_info().unwrap();
		assert_eq!(info.forgers_stake, 40);
	}

	clean_output_dir(test_dir);
}
