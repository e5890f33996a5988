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

//! Events published by the coordinator at fixed points of the block
//! application protocol. Delivery is synchronous; observers must not
//! assume post-event storage visibility until the enclosing application
//! completes.

use crate::core::core::hash::Hash;

/// What happened inside the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeViewEvent {
	/// A block was rejected before touching any store
	SyntacticallyFailedModifier(Hash),
	/// A block was rejected by the state rules
	SemanticallyFailedModifier(Hash),
	/// A block was fully applied across state, wallet and history
	SemanticallySuccessfulModifier(Hash),
	/// A multi-store rollback failed; the coordinator stops serving
	RollbackFailed(Hash),
	/// Blocks that must be fetched before progress can be made
	DownloadRequested(Vec<Hash>),
}
