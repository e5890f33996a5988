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

//! Error types for chain

use failure::{Backtrace, Context, Fail};
use std::fmt::{self, Display};

use crate::core::ser;
use crate::store;

/// Error definition
#[derive(Debug, Fail)]
pub struct Error {
	inner: Context<ErrorKind>,
}

/// Chain error definitions
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	/// The block breaks a chain or box-set rule and must be rejected
	#[fail(display = "Invalid Block: {}", _0)]
	InvalidBlock(String),
	/// The block's parent is not known to the history
	#[fail(display = "Unknown Parent: {}", _0)]
	UnknownParent(String),
	/// A block or block record that should exist could not be found
	#[fail(display = "Block Not Found: {}", _0)]
	BlockNotFound(String),
	/// Stores were found at versions that cannot be reconciled
	#[fail(display = "Storages Not Consistent: {}", _0)]
	Consistency(String),
	/// A rollback to a version the store no longer holds
	#[fail(display = "Rollback Failed: {}", _0)]
	Rollback(String),
	/// The application extension rejected or failed an operation
	#[fail(display = "Application Hook Error: {}", _0)]
	ApplicationHook(String),
	/// Internal issue when trying to save or load data from store
	#[fail(display = "Store Error: {}", _1)]
	StoreErr(store::Error, String),
	/// Error serializing or deserializing a type
	#[fail(display = "Serialization Error")]
	SerErr(ser::Error),
	/// Anything else
	#[fail(display = "Other Error: {}", _0)]
	Other(String),
}

impl Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let cause = match self.cause() {
			Some(c) => format!("{}", c),
			None => String::from("Unknown"),
		};
		let backtrace = match self.backtrace() {
			Some(b) => format!("{}", b),
			None => String::from("Unknown"),
		};
		let output = format!(
			"{} \n Cause: {} \n Backtrace: {}",
			self.inner, cause, backtrace
		);
		Display::fmt(&output, f)
	}
}

impl Error {
	/// get kind
	pub fn kind(&self) -> ErrorKind {
		self.inner.get_context().clone()
	}
	/// get cause
	pub fn cause(&self) -> Option<&dyn Fail> {
		self.inner.cause()
	}
	/// get backtrace
	pub fn backtrace(&self) -> Option<&Backtrace> {
		self.inner.backtrace()
	}

	/// Whether the error means the offered block itself is bad, as opposed
	/// to an internal failure of ours. Bad blocks are reported to history
	/// and skipped; internal failures propagate.
	pub fn is_bad_block(&self) -> bool {
		match self.kind() {
			ErrorKind::InvalidBlock(_)
			| ErrorKind::UnknownParent(_)
			| ErrorKind::ApplicationHook(_) => true,
			_ => false,
		}
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Error {
		Error {
			inner: Context::new(kind),
		}
	}
}

impl From<Context<ErrorKind>> for Error {
	fn from(inner: Context<ErrorKind>) -> Error {
		Error { inner }
	}
}

impl From<store::Error> for Error {
	fn from(error: store::Error) -> Error {
		let ec = error.clone();
		Error {
			inner: error.context(ErrorKind::StoreErr(ec.clone(), format!("{:?}", ec))),
		}
	}
}

impl From<ser::Error> for Error {
	fn from(error: ser::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::SerErr(error)),
		}
	}
}
