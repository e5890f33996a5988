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

//! Error types for the node view coordinator

use failure::{Backtrace, Context, Fail};
use std::fmt::{self, Display};

use crate::chain;
use crate::wallet;

/// Error definition
#[derive(Debug, Fail)]
pub struct Error {
	inner: Context<ErrorKind>,
}

/// Coordinator error definitions
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	/// Error from the history or state side
	#[fail(display = "Chain Error: {}", _0)]
	Chain(chain::ErrorKind),
	/// Error from the wallet side
	#[fail(display = "Wallet Error: {}", _0)]
	Wallet(wallet::ErrorKind),
	/// Startup found stores at versions that cannot be reconciled
	#[fail(display = "Storages Not Consistent: {}", _0)]
	Consistency(String),
	/// The coordinator refused the request because an earlier rollback
	/// failure left it halted
	#[fail(display = "Node View Halted")]
	Halted,
	/// The request channel to the holder is gone
	#[fail(display = "Holder Disconnected")]
	Disconnected,
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
		let output = format!("{} \n Cause: {}", self.inner, cause);
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

impl From<chain::Error> for Error {
	fn from(error: chain::Error) -> Error {
		let kind = error.kind();
		Error {
			inner: Context::new(ErrorKind::Chain(kind)),
		}
	}
}

impl From<wallet::Error> for Error {
	fn from(error: wallet::Error) -> Error {
		let kind = error.kind();
		Error {
			inner: Context::new(ErrorKind::Wallet(kind)),
		}
	}
}
