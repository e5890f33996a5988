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

//! The sidechain block graph and box-set state: validates and accepts new
//! blocks, tracks the best chain, handles rollbacks on forks.

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

mod error;
pub mod history;
pub mod state;
pub mod types;

// Re-export the base interface
pub use crate::error::{Error, ErrorKind};
pub use crate::history::History;
pub use crate::state::{ApplicationState, DefaultApplicationState, State};
pub use crate::types::{BlockFeeInfo, BlockInfo, ModifierSemanticValidity, ProgressInfo};
