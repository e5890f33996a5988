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

//! A versioned key/value store: an append-only sequence of (version,
//! writeset) pairs over a current-data view, with the undo information
//! needed to roll the view back to any recorded version. Every mutation of
//! a node-owned subsystem goes through one of these.

use std::sync::Arc;

use lmdb_zero as lmdb;

use latus_core::core::hash::Hash;
use latus_core::ser::{self, Readable, Reader, Writeable, Writer};

use crate::lmdb::{Batch, Error, Store};
use crate::{to_key, u64_to_key};

const DATA_PREFIX: u8 = b'd';
const VERSION_LOG_PREFIX: u8 = b'l';
const VERSION_INDEX_PREFIX: u8 = b'x';
const UNDO_PREFIX: u8 = b'u';
const META_PREFIX: u8 = b'm';

/// How to take one data mutation back out again.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UndoOp {
	/// Put the previous value of the key back
	Restore(Vec<u8>, Vec<u8>),
	/// Remove a key the update introduced
	Remove(Vec<u8>),
}

impl Writeable for UndoOp {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		match self {
			UndoOp::Restore(key, value) => {
				writer.write_u8(0)?;
				writer.write_bytes(key)?;
				writer.write_bytes(value)
			}
			UndoOp::Remove(key) => {
				writer.write_u8(1)?;
				writer.write_bytes(key)
			}
		}
	}
}

impl Readable for UndoOp {
	fn read(reader: &mut dyn Reader) -> Result<UndoOp, ser::Error> {
		match reader.read_u8()? {
			0 => Ok(UndoOp::Restore(
				reader.read_bytes_len_prefix()?,
				reader.read_bytes_len_prefix()?,
			)),
			1 => Ok(UndoOp::Remove(reader.read_bytes_len_prefix()?)),
			_ => Err(ser::Error::CorruptedData),
		}
	}
}

/// A key/value store where every update is labeled with a version and can
/// be unwound. The current data, the version log and the undo journal all
/// live in one LMDB database, so an update is atomic: observers see either
/// the pre-state or the post-state, never anything in between.
pub struct VersionedStore {
	db: Store,
	name: String,
}

impl VersionedStore {
	/// Opens the named versioned store within the provided environment.
	pub fn open(env: Arc<lmdb::Environment>, name: &str) -> VersionedStore {
		VersionedStore {
			db: Store::open(env, name),
			name: name.to_owned(),
		}
	}

	/// Name the store was opened under.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Applies a writeset under the provided version. Fails without touching
	/// anything if the version is already recorded or if a key appears both
	/// as a put and as a delete.
	pub fn update(
		&self,
		version: &Hash,
		puts: Vec<(Vec<u8>, Vec<u8>)>,
		deletes: Vec<Vec<u8>>,
	) -> Result<(), Error> {
		for key in &deletes {
			if puts.iter().any(|(put_key, _)| put_key == key) {
				return Err(Error::InvalidWriteSet(format!(
					"key {:?} both put and deleted in {}",
					key, self.name
				)));
			}
		}

		let batch = self.db.batch()?;
		if batch.exists(&to_key(VERSION_INDEX_PREFIX, version.as_ref()))? {
			return Err(Error::DuplicateVersion(format!(
				"{} already in {}",
				version, self.name
			)));
		}

		let num_versions = self.read_num_versions(&batch)?;
		let mut undo_ops = vec![];

		for (key, value) in puts {
			let data_key = to_key(DATA_PREFIX, &key);
			match batch.get(&data_key)? {
				Some(old) => undo_ops.push(UndoOp::Restore(key, old)),
				None => undo_ops.push(UndoOp::Remove(key)),
			}
			batch.put(&data_key, value)?;
		}
		for key in deletes {
			let data_key = to_key(DATA_PREFIX, &key);
			if let Some(old) = batch.get(&data_key)? {
				undo_ops.push(UndoOp::Restore(key, old));
				batch.delete(&data_key)?;
			}
		}

		batch.put_ser(&u64_to_key(VERSION_LOG_PREFIX, num_versions), version)?;
		batch.put_ser(
			&to_key(VERSION_INDEX_PREFIX, version.as_ref()),
			&num_versions,
		)?;
		batch.put_ser(&u64_to_key(UNDO_PREFIX, num_versions), &undo_ops)?;
		batch.put_ser(&[META_PREFIX], &(num_versions + 1))?;
		batch.commit()?;

		trace!(
			"{}: updated to version {} ({} undo ops)",
			self.name,
			version,
			undo_ops.len()
		);
		Ok(())
	}

	/// Restores the state exactly as it was right after the update that
	/// produced `version`, discarding every strictly newer version. Fails if
	/// the version is not recorded.
	pub fn rollback(&self, version: &Hash) -> Result<(), Error> {
		let batch = self.db.batch()?;
		let target: u64 = match batch.get_ser(&to_key(VERSION_INDEX_PREFIX, version.as_ref()))? {
			Some(idx) => idx,
			None => {
				return Err(Error::VersionNotFound(format!(
					"{} not in {}",
					version, self.name
				)));
			}
		};
		let num_versions = self.read_num_versions(&batch)?;

		for idx in ((target + 1)..num_versions).rev() {
			let undo_ops: Vec<UndoOp> = batch
				.get_ser(&u64_to_key(UNDO_PREFIX, idx))?
				.ok_or_else(|| Error::NotFoundErr(format!("undo record {}", idx)))?;
			for op in undo_ops.iter().rev() {
				match op {
					UndoOp::Restore(key, value) => {
						batch.put(&to_key(DATA_PREFIX, key), value.clone())?;
					}
					UndoOp::Remove(key) => {
						let data_key = to_key(DATA_PREFIX, key);
						if batch.exists(&data_key)? {
							batch.delete(&data_key)?;
						}
					}
				}
			}
			let discarded: Hash = batch
				.get_ser(&u64_to_key(VERSION_LOG_PREFIX, idx))?
				.ok_or_else(|| Error::NotFoundErr(format!("version log {}", idx)))?;
			batch.delete(&to_key(VERSION_INDEX_PREFIX, discarded.as_ref()))?;
			batch.delete(&u64_to_key(VERSION_LOG_PREFIX, idx))?;
			batch.delete(&u64_to_key(UNDO_PREFIX, idx))?;
		}

		batch.put_ser(&[META_PREFIX], &(target + 1))?;
		batch.commit()?;

		debug!("{}: rolled back to version {}", self.name, version);
		Ok(())
	}

	/// The most recently recorded version, if any.
	pub fn last_version_id(&self) -> Result<Option<Hash>, Error> {
		let num_versions = self.num_versions()?;
		if num_versions == 0 {
			return Ok(None);
		}
		self.db
			.get_ser(&u64_to_key(VERSION_LOG_PREFIX, num_versions - 1))
	}

	/// Up to `limit` recorded versions, most recent first.
	pub fn rollback_versions(&self, limit: usize) -> Result<Vec<Hash>, Error> {
		let num_versions = self.num_versions()?;
		let mut versions = Vec::with_capacity(limit.min(num_versions as usize));
		for idx in (0..num_versions).rev().take(limit) {
			let version = self
				.db
				.get_ser(&u64_to_key(VERSION_LOG_PREFIX, idx))?
				.ok_or_else(|| Error::NotFoundErr(format!("version log {}", idx)))?;
			versions.push(version);
		}
		Ok(versions)
	}

	/// Current value recorded under the provided key.
	pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
		self.db.get(&to_key(DATA_PREFIX, key))
	}

	/// Current `Readable` value recorded under the provided key.
	pub fn get_ser<T: ser::Readable>(&self, key: &[u8]) -> Result<Option<T>, Error> {
		self.db.get_ser(&to_key(DATA_PREFIX, key))
	}

	/// Every current key/value pair, in key order.
	pub fn get_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error> {
		let prefix = [DATA_PREFIX, b':'];
		let pairs = self.db.prefix_iter(&prefix)?;
		Ok(pairs
			.into_iter()
			.map(|(key, value)| (key[prefix.len()..].to_vec(), value))
			.collect())
	}

	/// Whether the store holds no current data at all.
	pub fn is_empty(&self) -> Result<bool, Error> {
		Ok(self.get_all()?.is_empty())
	}

	/// Number of versions currently recorded.
	pub fn num_versions(&self) -> Result<u64, Error> {
		Ok(self.db.get_ser(&[META_PREFIX])?.unwrap_or(0))
	}

	fn read_num_versions(&self, batch: &Batch<'_>) -> Result<u64, Error> {
		Ok(batch.get_ser(&[META_PREFIX])?.unwrap_or(0))
	}
}
