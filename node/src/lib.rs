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

//! The node view coordinator. Owns the history, state, wallet and memory
//! pool, serializes every mutation through a single consumer loop, drives
//! the per-block update protocol across the four subsystems and brings
//! their stores back to a common version after an ungraceful shutdown.

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

use latus_chain as chain;
use latus_core as core;
use latus_pool as pool;
use latus_wallet as wallet;

mod error;
mod events;
mod holder;
mod node_view;

pub use crate::error::{Error, ErrorKind};
pub use crate::events::NodeViewEvent;
pub use crate::holder::{NodeViewHolder, NodeViewRequest};
pub use crate::node_view::NodeView;
