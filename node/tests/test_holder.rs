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

use common::*;
use latus_node::NodeViewHolder;

#[test]
fn requests_are_served_in_order() {
	let test_dir = "test_output/holder_in_order";
	setup(test_dir);

	let holder = NodeViewHolder::start(open_node(test_dir));

	holder.add_secret(secret(1)).unwrap();
	let mine = secret(1).public_image();

	let genesis = block(
		latus_core::core::hash::blake2b(b"void"),
		0,
		vec![tx(vec![], vec![coin_to(mine, 42, 0)], 0)],
	);
	let b1 = block(genesis.id(), 6, vec![]);

	holder.apply_block(genesis.clone()).unwrap();
	holder.apply_block(b1.clone()).unwrap();

	let (best, balance) = holder
		.with_node_view(|view| {
			(
				view.history().best_block_id().unwrap(),
				view.wallet().balance().unwrap(),
			)
		})
		.unwrap();
	assert_eq!(best, Some(b1.id()));
	assert_eq!(balance, 42);

	// a read scheduled after a write observes its effects
	let b2 = block(b1.id(), 12, vec![]);
	holder.apply_block(b2.clone()).unwrap();
	let height = holder
		.with_node_view(|view| view.history().current_height())
		.unwrap();
	assert_eq!(height, Some(2));

	holder.stop();
	clean_output_dir(test_dir);
}

#[test]
fn mutate_requests_reach_the_view() {
	let test_dir = "test_output/holder_mutate";
	setup(test_dir);

	let holder = NodeViewHolder::start(open_node(test_dir));

	let added = holder
		.with_node_view_mut(|view| view.add_secret(secret(7)).is_ok())
		.unwrap();
	assert!(added);

	let keys = holder
		.with_node_view(|view| view.wallet().public_keys())
		.unwrap();
	assert!(keys.contains(&secret(7).public_image()));

	holder.remove_secret(secret(7).public_image()).unwrap();
	let keys = holder
		.with_node_view(|view| view.wallet().public_keys())
		.unwrap();
	assert!(keys.is_empty());

	holder.stop();
	clean_output_dir(test_dir);
}

#[test]
fn bad_blocks_report_back_to_the_caller() {
	let test_dir = "test_output/holder_bad_block";
	setup(test_dir);

	let holder = NodeViewHolder::start(open_node(test_dir));

	holder.apply_block(genesis_block()).unwrap();
	let orphan = block(latus_core::core::hash::blake2b(b"unknown"), 6, vec![]);
	assert!(holder.apply_block(orphan).is_err());

	holder.stop();
	clean_output_dir(test_dir);
}
