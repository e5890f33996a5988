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

//! Propositions: the public-key-like identifiers boxes are locked to, and
//! the VRF keys forger boxes carry. The actual signature and VRF schemes
//! live outside the node; here they are opaque 32 byte values with stable
//! equality and serialization.

use std::fmt;

use latus_util as util;

use crate::core::hash::{blake2b, Hash};
use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// Public identifier an output box is locked to.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Proposition(pub [u8; 32]);

impl Proposition {
	/// Builds a proposition from a byte slice, zero-padding or truncating to
	/// 32 bytes.
	pub fn from_vec(v: &[u8]) -> Proposition {
		Proposition(Hash::from_vec(v).0)
	}

	/// The proposition bytes.
	pub fn to_vec(&self) -> Vec<u8> {
		self.0.to_vec()
	}

	/// Key under which anything proposition-indexed is stored: the Blake2b
	/// digest of the proposition bytes.
	pub fn storage_key(&self) -> Hash {
		blake2b(&self.0)
	}
}

impl fmt::Debug for Proposition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", &util::to_hex(self.to_vec())[..12])
	}
}

impl AsRef<[u8]> for Proposition {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl Readable for Proposition {
	fn read(reader: &mut dyn Reader) -> Result<Proposition, ser::Error> {
		let v = reader.read_fixed_bytes(32)?;
		Ok(Proposition::from_vec(&v))
	}
}

impl Writeable for Proposition {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_fixed_bytes(&self.0)
	}
}

/// Public VRF key carried by forger boxes, used by block production to
/// prove slot eligibility. Opaque to the node view.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VrfPublicKey(pub [u8; 32]);

impl VrfPublicKey {
	/// Builds a VRF public key from a byte slice.
	pub fn from_vec(v: &[u8]) -> VrfPublicKey {
		VrfPublicKey(Hash::from_vec(v).0)
	}

	/// The key bytes.
	pub fn to_vec(&self) -> Vec<u8> {
		self.0.to_vec()
	}
}

impl fmt::Debug for VrfPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", &util::to_hex(self.to_vec())[..12])
	}
}

impl AsRef<[u8]> for VrfPublicKey {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl Readable for VrfPublicKey {
	fn read(reader: &mut dyn Reader) -> Result<VrfPublicKey, ser::Error> {
		let v = reader.read_fixed_bytes(32)?;
		Ok(VrfPublicKey::from_vec(&v))
	}
}

impl Writeable for VrfPublicKey {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_fixed_bytes(&self.0)
	}
}
