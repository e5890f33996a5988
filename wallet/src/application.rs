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

//! User extension point mirrored alongside the wallet. Implementors keep
//! application-owned storage in step with the wallet stores; a failing
//! box-change callback aborts the whole block scan before anything is
//! persisted.

use crate::core::core::boxes::{BoxId, WalletBox};
use crate::core::core::hash::Hash;
use crate::core::core::proposition::Proposition;
use crate::secret::Secret;

/// Callbacks the wallet drives into the application extension.
pub trait ApplicationWallet: Send {
	/// A secret was added to the wallet.
	fn on_add_secret(&mut self, secret: &Secret) -> Result<(), failure::Error>;

	/// The secret of the provided proposition was removed from the wallet.
	fn on_remove_secret(&mut self, proposition: &Proposition) -> Result<(), failure::Error>;

	/// The wallet is about to record the provided box delta under
	/// `version`. An error aborts the block scan with nothing written.
	fn on_change_boxes(
		&mut self,
		version: &Hash,
		boxes_to_update: &[WalletBox],
		box_ids_to_remove: &[BoxId],
	) -> Result<(), failure::Error>;

	/// The wallet stores rolled back to `version`.
	fn on_rollback(&mut self, version: &Hash) -> Result<(), failure::Error>;

	/// Whether the application-side storage sits at the provided version.
	fn check_storages_version(&self, version: &Hash) -> bool;
}

/// An application extension that keeps no storage of its own.
pub struct DefaultApplicationWallet;

impl ApplicationWallet for DefaultApplicationWallet {
	fn on_add_secret(&mut self, _secret: &Secret) -> Result<(), failure::Error> {
		Ok(())
	}
	fn on_remove_secret(&mut self, _proposition: &Proposition) -> Result<(), failure::Error> {
		Ok(())
	}
	fn on_change_boxes(
		&mut self,
		_version: &Hash,
		_boxes_to_update: &[WalletBox],
		_box_ids_to_remove: &[BoxId],
	) -> Result<(), failure::Error> {
		Ok(())
	}
	fn on_rollback(&mut self, _version: &Hash) -> Result<(), failure::Error> {
		Ok(())
	}
	fn check_storages_version(&self, _version: &Hash) -> bool {
		true
	}
}
