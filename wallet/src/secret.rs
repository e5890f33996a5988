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

//! Wallet secrets. The actual signature scheme lives outside the node; a
//! secret here is the 32 byte seed material with a derivable public image,
//! wiped from memory on drop.

use std::fmt;

use rand::{thread_rng, Rng};
use zeroize::Zeroize;

use crate::core::core::hash::{blake2b, Hash};
use crate::core::core::proposition::Proposition;
use crate::core::ser::{self, Readable, Reader, Writeable, Writer};

/// A private-key-analogue owned by the wallet.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct Secret {
	seed: [u8; 32],
}

impl Secret {
	/// Builds a secret from existing seed material.
	pub fn from_seed(seed: [u8; 32]) -> Secret {
		Secret { seed }
	}

	/// Draws a fresh random secret from the thread rng.
	pub fn generate() -> Secret {
		let mut seed = [0; 32];
		thread_rng().fill(&mut seed);
		Secret { seed }
	}

	/// The proposition this secret can open boxes of.
	pub fn public_image(&self) -> Proposition {
		Proposition::from_vec(&blake2b(&self.seed).to_vec())
	}

	/// Key under which the secret is stored: the digest of its public
	/// image's bytes.
	pub fn storage_key(&self) -> Hash {
		self.public_image().storage_key()
	}
}

impl fmt::Debug for Secret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// never print key material
		write!(f, "Secret({:?})", self.public_image())
	}
}

impl Writeable for Secret {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_fixed_bytes(&self.seed)
	}
}

impl Readable for Secret {
	fn read(reader: &mut dyn Reader) -> Result<Secret, ser::Error> {
		let bytes = reader.read_fixed_bytes(32)?;
		let mut seed = [0; 32];
		seed.copy_from_slice(&bytes);
		Ok(Secret { seed })
	}
}
