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

use latus_store as store;
use latus_util as util;

use std::fs;
use std::sync::Arc;

use latus_core::core::hash::blake2b;
use store::VersionedStore;

fn clean_output_dir(test_dir: &str) {
	let _ = fs::remove_dir_all(test_dir);
}

fn setup(test_dir: &str) -> VersionedStore {
	util::init_test_logger();
	clean_output_dir(test_dir);
	let env = Arc::new(store::new_env(test_dir.to_string()));
	VersionedStore::open(env, "test")
}

fn kv(key: &[u8], value: &[u8]) -> (Vec<u8>, Vec<u8>) {
	(key.to_vec(), value.to_vec())
}

#[test]
fn update_and_get() {
	let test_dir = "test_output/versioned_update_and_get";
	let db = setup(test_dir);

	assert!(db.is_empty().unwrap());
	assert_eq!(db.last_version_id().unwrap(), None);

	let v1 = blake2b(b"v1");
	db.update(&v1, vec![kv(b"a", b"1"), kv(b"b", b"2")], vec![])
		.unwrap();

	assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));
	assert_eq!(db.get(b"b").unwrap(), Some(b"2".to_vec()));
	assert_eq!(db.get(b"c").unwrap(), None);
	assert_eq!(db.last_version_id().unwrap(), Some(v1));
	assert_eq!(db.num_versions().unwrap(), 1);
	assert!(!db.is_empty().unwrap());

	let all = db.get_all().unwrap();
	assert_eq!(all.len(), 2);
	assert!(all.contains(&kv(b"a", b"1")));

	clean_output_dir(test_dir);
}

#[test]
fn rollback_restores_exact_state() {
	let test_dir = "test_output/versioned_rollback";
	let db = setup(test_dir);

	let v1 = blake2b(b"v1");
	let v2 = blake2b(b"v2");
	let v3 = blake2b(b"v3");

	db.update(&v1, vec![kv(b"a", b"1"), kv(b"b", b"2")], vec![])
		.unwrap();
	// v2 overwrites a, removes b, adds c
	db.update(&v2, vec![kv(b"a", b"10"), kv(b"c", b"3")], vec![b"b".to_vec()])
		.unwrap();
	// v3 adds d
	db.update(&v3, vec![kv(b"d", b"4")], vec![]).unwrap();

	assert_eq!(db.num_versions().unwrap(), 3);

	db.rollback(&v1).unwrap();

	assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));
	assert_eq!(db.get(b"b").unwrap(), Some(b"2".to_vec()));
	assert_eq!(db.get(b"c").unwrap(), None);
	assert_eq!(db.get(b"d").unwrap(), None);
	assert_eq!(db.last_version_id().unwrap(), Some(v1));
	assert_eq!(db.num_versions().unwrap(), 1);

	// the discarded versions are gone for good
	assert!(db.rollback(&v2).is_err());

	clean_output_dir(test_dir);
}

#[test]
fn rollback_to_unknown_version_fails() {
	let test_dir = "test_output/versioned_rollback_unknown";
	let db = setup(test_dir);

	let v1 = blake2b(b"v1");
	db.update(&v1, vec![kv(b"a", b"1")], vec![]).unwrap();

	match db.rollback(&blake2b(b"nope")) {
		Err(store::Error::VersionNotFound(_)) => (),
		other => panic!("expected VersionNotFound, got {:?}", other),
	}
	// nothing was touched
	assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));

	clean_output_dir(test_dir);
}

#[test]
fn duplicate_version_rejected() {
	let test_dir = "test_output/versioned_duplicate";
	let db = setup(test_dir);

	let v1 = blake2b(b"v1");
	db.update(&v1, vec![kv(b"a", b"1")], vec![]).unwrap();
	match db.update(&v1, vec![kv(b"b", b"2")], vec![]) {
		Err(store::Error::DuplicateVersion(_)) => (),
		other => panic!("expected DuplicateVersion, got {:?}", other),
	}
	assert_eq!(db.get(b"b").unwrap(), None);

	clean_output_dir(test_dir);
}

#[test]
fn overlapping_writeset_rejected() {
	let test_dir = "test_output/versioned_overlap";
	let db = setup(test_dir);

	match db.update(
		&blake2b(b"v1"),
		vec![kv(b"a", b"1")],
		vec![b"a".to_vec()],
	) {
		Err(store::Error::InvalidWriteSet(_)) => (),
		other => panic!("expected InvalidWriteSet, got {:?}", other),
	}
	assert_eq!(db.num_versions().unwrap(), 0);

	clean_output_dir(test_dir);
}

#[test]
fn rollback_versions_most_recent_first() {
	let test_dir = "test_output/versioned_rollback_versions";
	let db = setup(test_dir);

	let versions: Vec<_> = (0..5u8).map(|i| blake2b(&[i])).collect();
	for (i, v) in versions.iter().enumerate() {
		db.update(v, vec![kv(&[i as u8], b"x")], vec![]).unwrap();
	}

	let recent = db.rollback_versions(2).unwrap();
	assert_eq!(recent, vec![versions[4], versions[3]]);

	let all = db.rollback_versions(10).unwrap();
	assert_eq!(all.len(), 5);
	assert_eq!(all[0], versions[4]);
	assert_eq!(all[4], versions[0]);

	clean_output_dir(test_dir);
}

#[test]
fn delete_of_absent_key_still_writes_version() {
	let test_dir = "test_output/versioned_absent_delete";
	let db = setup(test_dir);

	let v1 = blake2b(b"v1");
	db.update(&v1, vec![], vec![b"ghost".to_vec()]).unwrap();
	assert_eq!(db.num_versions().unwrap(), 1);
	assert_eq!(db.last_version_id().unwrap(), Some(v1));

	clean_output_dir(test_dir);
}

#[test]
fn survives_reopen() {
	let test_dir = "test_output/versioned_reopen";
	util::init_test_logger();
	clean_output_dir(test_dir);

	let v1 = blake2b(b"v1");
	{
		let env = Arc::new(store::new_env(test_dir.to_string()));
		let db = VersionedStore::open(env, "test");
		db.update(&v1, vec![kv(b"a", b"1")], vec![]).unwrap();
	}
	{
		let env = Arc::new(store::new_env(test_dir.to_string()));
		let db = VersionedStore::open(env, "test");
		assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));
		assert_eq!(db.last_version_id().unwrap(), Some(v1));
	}

	clean_output_dir(test_dir);
}
