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

//! Output boxes: the unspent outputs the sidechain state is made of. A box
//! is locked to a proposition and identified by a digest of its content, so
//! the nonce keeps otherwise identical boxes distinct.

use crate::core::hash::{DefaultHashable, Hash, Hashed};
use crate::core::proposition::{Proposition, VrfPublicKey};
use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// Identifier of a box, the digest of its serialized content.
pub type BoxId = Hash;

const COIN_BOX_DISCRIMINANT: u8 = 0;
const FORGER_BOX_DISCRIMINANT: u8 = 1;
const CUSTOM_BOX_DISCRIMINANT: u8 = 2;

/// A plain value transfer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinBox {
	/// Owner of the box
	pub proposition: Proposition,
	/// Amount held
	pub value: u64,
	/// Disambiguates boxes with identical owner and amount
	pub nonce: u64,
}

/// An output entitling its owner to participate in block production,
/// delegating `value` as forging stake to the key pair below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgerBox {
	/// Owner of the box
	pub proposition: Proposition,
	/// Amount staked
	pub value: u64,
	/// Disambiguates boxes with identical owner and amount
	pub nonce: u64,
	/// Key the delegated forger signs blocks with
	pub block_sign_proposition: Proposition,
	/// VRF key the delegated forger proves slot eligibility with
	pub vrf_pub_key: VrfPublicKey,
}

/// An application-defined output, opaque to the node view beyond its owner
/// and amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomBox {
	/// Owner of the box
	pub proposition: Proposition,
	/// Amount held
	pub value: u64,
	/// Disambiguates boxes with identical owner and amount
	pub nonce: u64,
	/// Application payload
	pub data: Vec<u8>,
}

impl CoinBox {
	/// The box as a generic output.
	pub fn into_output(self) -> OutputBox {
		OutputBox::Coin(self)
	}

	/// Identifier the box gets as a generic output.
	pub fn id(&self) -> BoxId {
		OutputBox::Coin(self.clone()).id()
	}
}

impl Writeable for CoinBox {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.proposition.write(writer)?;
		writer.write_u64(self.value)?;
		writer.write_u64(self.nonce)
	}
}

impl Readable for CoinBox {
	fn read(reader: &mut dyn Reader) -> Result<CoinBox, ser::Error> {
		Ok(CoinBox {
			proposition: Proposition::read(reader)?,
			value: reader.read_u64()?,
			nonce: reader.read_u64()?,
		})
	}
}

/// Summary of the stake a forger box delegates, the unit the consensus
/// epoch stake snapshot is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgingStakeInfo {
	/// Amount staked
	pub stake_amount: u64,
	/// Block signing key the stake is delegated to
	pub block_sign_proposition: Proposition,
	/// VRF key the stake is delegated to
	pub vrf_pub_key: VrfPublicKey,
}

impl Writeable for ForgingStakeInfo {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u64(self.stake_amount)?;
		self.block_sign_proposition.write(writer)?;
		self.vrf_pub_key.write(writer)
	}
}

impl Readable for ForgingStakeInfo {
	fn read(reader: &mut dyn Reader) -> Result<ForgingStakeInfo, ser::Error> {
		Ok(ForgingStakeInfo {
			stake_amount: reader.read_u64()?,
			block_sign_proposition: Proposition::read(reader)?,
			vrf_pub_key: VrfPublicKey::read(reader)?,
		})
	}
}

impl DefaultHashable for ForgingStakeInfo {}

impl ForgerBox {
	/// Stake summary of this box.
	pub fn forging_stake_info(&self) -> ForgingStakeInfo {
		ForgingStakeInfo {
			stake_amount: self.value,
			block_sign_proposition: self.block_sign_proposition,
			vrf_pub_key: self.vrf_pub_key,
		}
	}

	/// The box as a generic output.
	pub fn into_output(self) -> OutputBox {
		OutputBox::Forger(self)
	}

	/// Identifier the box gets as a generic output.
	pub fn id(&self) -> BoxId {
		OutputBox::Forger(self.clone()).id()
	}
}

impl Writeable for ForgerBox {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.proposition.write(writer)?;
		writer.write_u64(self.value)?;
		writer.write_u64(self.nonce)?;
		self.block_sign_proposition.write(writer)?;
		self.vrf_pub_key.write(writer)
	}
}

impl Readable for ForgerBox {
	fn read(reader: &mut dyn Reader) -> Result<ForgerBox, ser::Error> {
		Ok(ForgerBox {
			proposition: Proposition::read(reader)?,
			value: reader.read_u64()?,
			nonce: reader.read_u64()?,
			block_sign_proposition: Proposition::read(reader)?,
			vrf_pub_key: VrfPublicKey::read(reader)?,
		})
	}
}

/// Any output box the state can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputBox {
	/// Plain value transfer
	Coin(CoinBox),
	/// Forging stake delegation
	Forger(ForgerBox),
	/// Application-defined
	Custom(CustomBox),
}

impl OutputBox {
	/// Owner of the box.
	pub fn proposition(&self) -> Proposition {
		match self {
			OutputBox::Coin(b) => b.proposition,
			OutputBox::Forger(b) => b.proposition,
			OutputBox::Custom(b) => b.proposition,
		}
	}

	/// Amount held by the box.
	pub fn value(&self) -> u64 {
		match self {
			OutputBox::Coin(b) => b.value,
			OutputBox::Forger(b) => b.value,
			OutputBox::Custom(b) => b.value,
		}
	}

	/// Nonce of the box.
	pub fn nonce(&self) -> u64 {
		match self {
			OutputBox::Coin(b) => b.nonce,
			OutputBox::Forger(b) => b.nonce,
			OutputBox::Custom(b) => b.nonce,
		}
	}

	/// Unique identifier, the digest of the serialized box.
	pub fn id(&self) -> BoxId {
		self.hash()
	}

	/// Whether the box carries spendable coins (coin and forger boxes do).
	pub fn is_coin(&self) -> bool {
		match self {
			OutputBox::Custom(_) => false,
			_ => true,
		}
	}

	/// The forger box inside, if that's what this is.
	pub fn as_forger(&self) -> Option<&ForgerBox> {
		match self {
			OutputBox::Forger(b) => Some(b),
			_ => None,
		}
	}
}

impl Writeable for OutputBox {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		match self {
			OutputBox::Coin(b) => {
				writer.write_u8(COIN_BOX_DISCRIMINANT)?;
				b.proposition.write(writer)?;
				writer.write_u64(b.value)?;
				writer.write_u64(b.nonce)
			}
			OutputBox::Forger(b) => {
				writer.write_u8(FORGER_BOX_DISCRIMINANT)?;
				b.proposition.write(writer)?;
				writer.write_u64(b.value)?;
				writer.write_u64(b.nonce)?;
				b.block_sign_proposition.write(writer)?;
				b.vrf_pub_key.write(writer)
			}
			OutputBox::Custom(b) => {
				writer.write_u8(CUSTOM_BOX_DISCRIMINANT)?;
				b.proposition.write(writer)?;
				writer.write_u64(b.value)?;
				writer.write_u64(b.nonce)?;
				writer.write_bytes(&b.data)
			}
		}
	}
}

impl Readable for OutputBox {
	fn read(reader: &mut dyn Reader) -> Result<OutputBox, ser::Error> {
		let discriminant = reader.read_u8()?;
		let proposition = Proposition::read(reader)?;
		let value = reader.read_u64()?;
		let nonce = reader.read_u64()?;
		match discriminant {
			COIN_BOX_DISCRIMINANT => Ok(OutputBox::Coin(CoinBox {
				proposition,
				value,
				nonce,
			})),
			FORGER_BOX_DISCRIMINANT => Ok(OutputBox::Forger(ForgerBox {
				proposition,
				value,
				nonce,
				block_sign_proposition: Proposition::read(reader)?,
				vrf_pub_key: VrfPublicKey::read(reader)?,
			})),
			CUSTOM_BOX_DISCRIMINANT => Ok(OutputBox::Custom(CustomBox {
				proposition,
				value,
				nonce,
				data: reader.read_bytes_len_prefix()?,
			})),
			_ => Err(ser::Error::CorruptedData),
		}
	}
}

impl DefaultHashable for OutputBox {}

/// A box as tracked by the wallet: the output itself plus where it came
/// from. Fee payment boxes have no creating transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletBox {
	/// The tracked output
	pub output: OutputBox,
	/// Transaction that created the output, absent for fee payments
	pub creating_tx_id: Option<Hash>,
	/// Timestamp of the block the output appeared in
	pub block_timestamp: u64,
}

impl WalletBox {
	/// Identifier of the underlying output.
	pub fn id(&self) -> BoxId {
		self.output.id()
	}
}

impl Writeable for WalletBox {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.output.write(writer)?;
		self.creating_tx_id.write(writer)?;
		writer.write_u64(self.block_timestamp)
	}
}

impl Readable for WalletBox {
	fn read(reader: &mut dyn Reader) -> Result<WalletBox, ser::Error> {
		Ok(WalletBox {
			output: OutputBox::read(reader)?,
			creating_tx_id: Option::read(reader)?,
			block_timestamp: reader.read_u64()?,
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn coin(value: u64, nonce: u64) -> OutputBox {
		OutputBox::Coin(CoinBox {
			proposition: Proposition::from_vec(b"owner"),
			value,
			nonce,
		})
	}

	#[test]
	fn nonce_keeps_ids_distinct() {
		assert_ne!(coin(10, 0).id(), coin(10, 1).id());
		assert_eq!(coin(10, 0).id(), coin(10, 0).id());
	}

	#[test]
	fn box_ser_round_trip() {
		let fb = OutputBox::Forger(ForgerBox {
			proposition: Proposition::from_vec(b"owner"),
			value: 500,
			nonce: 3,
			block_sign_proposition: Proposition::from_vec(b"signer"),
			vrf_pub_key: VrfPublicKey::from_vec(b"vrf"),
		});
		let bytes = crate::ser::ser_vec(&fb).unwrap();
		let out: OutputBox = crate::ser::deserialize(&mut &bytes[..]).unwrap();
		assert_eq!(out, fb);
	}

	#[test]
	fn custom_box_carries_no_coins() {
		let cb = OutputBox::Custom(CustomBox {
			proposition: Proposition::from_vec(b"owner"),
			value: 1,
			nonce: 0,
			data: vec![1, 2, 3],
		});
		assert!(!cb.is_coin());
		assert!(coin(1, 0).is_coin());
	}
}
