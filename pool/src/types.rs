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

//! The interface between the pool and the rest of the node.

use latus_core::core::boxes::BoxId;

/// Bridge to the box-set state, the part of it pool admission cares about.
pub trait PoolStateView {
	/// Whether the box with the provided id is currently unspent.
	fn box_is_unspent(&self, id: &BoxId) -> bool;
}

/// Pool admission errors.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum PoolError {
	/// The pool already holds this transaction
	#[fail(display = "Duplicate Transaction")]
	DuplicateTx,
	/// The transaction opens a box that is not currently unspent
	#[fail(display = "Box Not Available: {}", _0)]
	BoxNotAvailable(String),
	/// The transaction opens a box another pool transaction already opens
	#[fail(display = "Double Spend In Pool: {}", _0)]
	DoubleSpendInPool(String),
}
