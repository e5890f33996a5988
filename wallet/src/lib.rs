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

//! The wallet of the sidechain node. Tracks the boxes locked to the node's
//! own keys across four versioned stores plus a versionless secret store,
//! scans every applied block for relevant outputs, materializes withdrawal
//! evidence at epoch boundaries and keeps forging stake Merkle paths per
//! consensus epoch.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;

use latus_core as core;
use latus_store as store;

mod application;
mod error;
pub mod secret;
pub mod storage;
pub mod wallet;

pub use crate::application::{ApplicationWallet, DefaultApplicationWallet};
pub use crate::error::{Error, ErrorKind};
pub use crate::secret::Secret;
pub use crate::storage::SecretStorage;
pub use crate::wallet::Wallet;
