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

//! The wallet's five storages. Four of them are block-versioned and must
//! agree on a version (the forging stake one may lead by a single
//! consensus-epoch write); the secret store is versionless in spirit and
//! writes a fresh random version per mutation, so it survives every
//! rollback untouched.

use std::collections::HashMap;

use byteorder::{BigEndian, ByteOrder};

use crate::core::core::boxes::{BoxId, ForgerBox, WalletBox};
use crate::core::core::csw::CswData;
use crate::core::core::epoch::ForgingStakeMerklePathInfo;
use crate::core::core::hash::Hash;
use crate::core::core::proposition::Proposition;
use crate::core::core::transaction::SidechainTransaction;
use crate::core::ser::{self, Readable, Reader, Writeable, Writer};
use crate::error::{Error, ErrorKind};
use crate::secret::Secret;
use crate::store::VersionedStore;

fn epoch_key(prefix: u8, epoch: u32) -> Vec<u8> {
	let mut key = vec![prefix];
	let mut bytes = [0; 4];
	BigEndian::write_u32(&mut bytes, epoch);
	key.extend_from_slice(&bytes);
	key
}

/// The boxes the wallet tracks, by box id.
pub struct WalletBoxStorage {
	db: VersionedStore,
}

impl WalletBoxStorage {
	pub(crate) fn new(db: VersionedStore) -> WalletBoxStorage {
		WalletBoxStorage { db }
	}

	/// Records the delta of one scanned block.
	pub fn update(
		&self,
		version: &Hash,
		to_update: &[WalletBox],
		to_remove: &[BoxId],
	) -> Result<(), Error> {
		let mut puts = vec![];
		for wallet_box in to_update {
			puts.push((wallet_box.id().to_vec(), ser::ser_vec(wallet_box)?));
		}
		let deletes = to_remove.iter().map(|id| id.to_vec()).collect();
		self.db.update(version, puts, deletes)?;
		Ok(())
	}

	/// The tracked box with the provided id, if any.
	pub fn get(&self, id: &BoxId) -> Result<Option<WalletBox>, Error> {
		Ok(self.db.get_ser(id.as_ref())?)
	}

	/// Every tracked box.
	pub fn get_all(&self) -> Result<Vec<WalletBox>, Error> {
		let mut boxes = vec![];
		for (_, value) in self.db.get_all()? {
			boxes.push(ser::deserialize(&mut &value[..])?);
		}
		Ok(boxes)
	}

	/// Version of the last recorded update.
	pub fn last_version_id(&self) -> Result<Option<Hash>, Error> {
		Ok(self.db.last_version_id()?)
	}

	/// Unwind to the provided version.
	pub fn rollback(&self, to: &Hash) -> Result<(), Error> {
		self.db
			.rollback(to)
			.map_err(|e| ErrorKind::Rollback(format!("wallet boxes to {}: {}", to, e)).into())
	}
}

/// The transactions that ever touched a tracked box, by transaction id.
pub struct WalletTransactionStorage {
	db: VersionedStore,
}

impl WalletTransactionStorage {
	pub(crate) fn new(db: VersionedStore) -> WalletTransactionStorage {
		WalletTransactionStorage { db }
	}

	/// Records the transactions of one scanned block.
	pub fn update(
		&self,
		version: &Hash,
		transactions: &[SidechainTransaction],
	) -> Result<(), Error> {
		let mut puts = vec![];
		for tx in transactions {
			puts.push((tx.id().to_vec(), ser::ser_vec(tx)?));
		}
		self.db.update(version, puts, vec![])?;
		Ok(())
	}

	/// The recorded transaction with the provided id, if any.
	pub fn get(&self, tx_id: &Hash) -> Result<Option<SidechainTransaction>, Error> {
		Ok(self.db.get_ser(tx_id.as_ref())?)
	}

	/// Version of the last recorded update.
	pub fn last_version_id(&self) -> Result<Option<Hash>, Error> {
		Ok(self.db.last_version_id()?)
	}

	/// Unwind to the provided version.
	pub fn rollback(&self, to: &Hash) -> Result<(), Error> {
		self.db
			.rollback(to)
			.map_err(|e| ErrorKind::Rollback(format!("wallet txs to {}: {}", to, e)).into())
	}
}

const FORGER_BOX_PREFIX: u8 = b'f';
const STAKE_PATHS_PREFIX: u8 = b'e';

/// Forger boxes delegated to the wallet's keys, plus the per-epoch Merkle
/// path info of their stake. This is the one wallet store allowed to lead
/// the others by a version: the epoch-switch write happens before the
/// block that opens the new epoch is applied anywhere else.
pub struct ForgingStakeStorage {
	db: VersionedStore,
}

impl ForgingStakeStorage {
	pub(crate) fn new(db: VersionedStore) -> ForgingStakeStorage {
		ForgingStakeStorage { db }
	}

	fn forger_box_key(id: &BoxId) -> Vec<u8> {
		let mut key = vec![FORGER_BOX_PREFIX];
		key.extend_from_slice(id.as_ref());
		key
	}

	/// Records the forger box delta of one scanned block.
	pub fn update_forger_boxes(
		&self,
		version: &Hash,
		to_add: &[ForgerBox],
		to_remove: &[BoxId],
	) -> Result<(), Error> {
		let mut puts = vec![];
		for forger_box in to_add {
			puts.push((
				ForgingStakeStorage::forger_box_key(&forger_box.id()),
				ser::ser_vec(forger_box)?,
			));
		}
		let mut deletes = vec![];
		for id in to_remove {
			let key = ForgingStakeStorage::forger_box_key(id);
			if self.db.get(&key)?.is_some() {
				deletes.push(key);
			}
		}
		self.db.update(version, puts, deletes)?;
		Ok(())
	}

	/// Stores the epoch's stake Merkle path info under its own version.
	pub fn update_stake_paths(
		&self,
		version: &Hash,
		epoch: u32,
		paths: &Vec<ForgingStakeMerklePathInfo>,
	) -> Result<(), Error> {
		self.db.update(
			version,
			vec![(epoch_key(STAKE_PATHS_PREFIX, epoch), ser::ser_vec(paths)?)],
			vec![],
		)?;
		Ok(())
	}

	/// Every forger box currently delegated to the wallet.
	pub fn forger_boxes(&self) -> Result<Vec<ForgerBox>, Error> {
		let mut boxes = vec![];
		for (key, value) in self.db.get_all()? {
			if key.first() == Some(&FORGER_BOX_PREFIX) {
				boxes.push(ser::deserialize(&mut &value[..])?);
			}
		}
		Ok(boxes)
	}

	/// The stake path info recorded for the provided epoch, if any.
	pub fn stake_paths(&self, epoch: u32) -> Result<Option<Vec<ForgingStakeMerklePathInfo>>, Error> {
		Ok(self.db.get_ser(&epoch_key(STAKE_PATHS_PREFIX, epoch))?)
	}

	/// Version of the last recorded update.
	pub fn last_version_id(&self) -> Result<Option<Hash>, Error> {
		Ok(self.db.last_version_id()?)
	}

	/// Up to `limit` recorded versions, most recent first.
	pub fn rollback_versions(&self, limit: usize) -> Result<Vec<Hash>, Error> {
		Ok(self.db.rollback_versions(limit)?)
	}

	/// Number of versions currently recorded.
	pub fn num_versions(&self) -> Result<u64, Error> {
		Ok(self.db.num_versions()?)
	}

	/// Unwind to the provided version.
	pub fn rollback(&self, to: &Hash) -> Result<(), Error> {
		self.db
			.rollback(to)
			.map_err(|e| ErrorKind::Rollback(format!("forging stake to {}: {}", to, e)).into())
	}
}

/// Withdrawal evidence per withdrawal epoch.
pub struct CswDataStorage {
	db: VersionedStore,
}

impl CswDataStorage {
	pub(crate) fn new(db: VersionedStore) -> CswDataStorage {
		CswDataStorage { db }
	}

	/// Records the evidence gathered while scanning one block.
	pub fn update(&self, version: &Hash, epoch: u32, data: &Vec<CswData>) -> Result<(), Error> {
		let puts = if data.is_empty() {
			vec![]
		} else {
			let mut merged = self.csw_data(epoch)?.unwrap_or_default();
			merged.extend_from_slice(data);
			vec![(epoch_key(b'c', epoch), ser::ser_vec(&merged)?)]
		};
		self.db.update(version, puts, vec![])?;
		Ok(())
	}

	/// The evidence recorded for the provided epoch, if any.
	pub fn csw_data(&self, epoch: u32) -> Result<Option<Vec<CswData>>, Error> {
		Ok(self.db.get_ser(&epoch_key(b'c', epoch))?)
	}

	/// Version of the last recorded update.
	pub fn last_version_id(&self) -> Result<Option<Hash>, Error> {
		Ok(self.db.last_version_id()?)
	}

	/// Unwind to the provided version.
	pub fn rollback(&self, to: &Hash) -> Result<(), Error> {
		self.db
			.rollback(to)
			.map_err(|e| ErrorKind::Rollback(format!("csw data to {}: {}", to, e)).into())
	}
}

// value stored per secret: its insertion sequence plus the secret itself,
// so insertion order survives a restart
struct SecretEntry {
	seq: u64,
	secret: Secret,
}

impl Writeable for SecretEntry {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u64(self.seq)?;
		self.secret.write(writer)
	}
}

impl Readable for SecretEntry {
	fn read(reader: &mut dyn Reader) -> Result<SecretEntry, ser::Error> {
		Ok(SecretEntry {
			seq: reader.read_u64()?,
			secret: Secret::read(reader)?,
		})
	}
}

/// The wallet's secrets, keyed by the digest of their proposition.
/// Mutations are recorded under fresh random versions that are never
/// rolled back through; the underlying store's version log exists only to
/// satisfy its API.
pub struct SecretStorage {
	db: VersionedStore,
	// insertion-ordered cache, rebuilt from the stored sequence numbers
	order: Vec<Hash>,
	secrets: HashMap<Hash, Secret>,
	next_seq: u64,
}

impl SecretStorage {
	pub(crate) fn new(db: VersionedStore) -> Result<SecretStorage, Error> {
		let mut entries = vec![];
		for (key, value) in db.get_all()? {
			let entry: SecretEntry = ser::deserialize(&mut &value[..])?;
			entries.push((Hash::from_vec(&key), entry));
		}
		entries.sort_by_key(|(_, entry)| entry.seq);

		let next_seq = entries.last().map(|(_, entry)| entry.seq + 1).unwrap_or(0);
		let order = entries.iter().map(|(key, _)| *key).collect();
		let secrets = entries
			.into_iter()
			.map(|(key, entry)| (key, entry.secret))
			.collect();

		Ok(SecretStorage {
			db,
			order,
			secrets,
			next_seq,
		})
	}

	/// Adds a secret. Fails if one is already stored for the same
	/// proposition.
	pub fn add(&mut self, secret: Secret) -> Result<(), Error> {
		let key = secret.storage_key();
		if self.secrets.contains_key(&key) {
			return Err(ErrorKind::SecretAlreadyPresent(format!(
				"{:?}",
				secret.public_image()
			))
			.into());
		}
		let entry = SecretEntry {
			seq: self.next_seq,
			secret: secret.clone(),
		};
		self.db.update(
			&Hash::random(),
			vec![(key.to_vec(), ser::ser_vec(&entry)?)],
			vec![],
		)?;
		self.next_seq += 1;
		self.order.push(key);
		self.secrets.insert(key, secret);
		Ok(())
	}

	/// Removes the secret of the provided proposition. Removing an unknown
	/// proposition is a no-op that still writes a version.
	pub fn remove(&mut self, proposition: &Proposition) -> Result<(), Error> {
		let key = proposition.storage_key();
		self.db
			.update(&Hash::random(), vec![], vec![key.to_vec()])?;
		if self.secrets.remove(&key).is_some() {
			self.order.retain(|k| *k != key);
		}
		Ok(())
	}

	/// The secret of the provided proposition, if stored.
	pub fn get(&self, proposition: &Proposition) -> Option<&Secret> {
		self.secrets.get(&proposition.storage_key())
	}

	/// Whether a secret is stored for the provided proposition.
	pub fn contains(&self, proposition: &Proposition) -> bool {
		self.secrets.contains_key(&proposition.storage_key())
	}

	/// Every stored secret, in insertion order.
	pub fn get_all(&self) -> Vec<&Secret> {
		self.order
			.iter()
			.filter_map(|key| self.secrets.get(key))
			.collect()
	}

	/// Number of stored secrets.
	pub fn len(&self) -> usize {
		self.order.len()
	}

	/// Whether no secret is stored.
	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}
}
