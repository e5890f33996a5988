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

//! Sidechain transactions. A transaction opens a set of existing boxes and
//! creates new ones; unlocking proofs are validated before a block ever
//! reaches the node view, so only the box delta is carried here.

use crate::core::boxes::{BoxId, OutputBox};
use crate::core::hash::{DefaultHashable, Hash, Hashed};
use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// A transfer of value between boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidechainTransaction {
	/// Ids of the boxes this transaction opens
	pub inputs: Vec<BoxId>,
	/// Boxes this transaction creates
	pub outputs: Vec<OutputBox>,
	/// Fee paid to the block forger
	pub fee: u64,
}

impl SidechainTransaction {
	/// Transaction identifier, the digest of its serialized content.
	pub fn id(&self) -> Hash {
		self.hash()
	}

	/// Ids of the boxes opened by this transaction.
	pub fn box_ids_to_open(&self) -> &[BoxId] {
		&self.inputs
	}

	/// Boxes created by this transaction.
	pub fn new_boxes(&self) -> &[OutputBox] {
		&self.outputs
	}
}

impl Writeable for SidechainTransaction {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.inputs.write(writer)?;
		self.outputs.write(writer)?;
		writer.write_u64(self.fee)
	}
}

impl Readable for SidechainTransaction {
	fn read(reader: &mut dyn Reader) -> Result<SidechainTransaction, ser::Error> {
		Ok(SidechainTransaction {
			inputs: Vec::read(reader)?,
			outputs: Vec::read(reader)?,
			fee: reader.read_u64()?,
		})
	}
}

impl DefaultHashable for SidechainTransaction {}

#[cfg(test)]
mod test {
	use super::*;
	use crate::core::boxes::CoinBox;
	use crate::core::proposition::Proposition;

	#[test]
	fn id_covers_all_fields() {
		let base = SidechainTransaction {
			inputs: vec![Hash::from_vec(b"in")],
			outputs: vec![OutputBox::Coin(CoinBox {
				proposition: Proposition::from_vec(b"p"),
				value: 4,
				nonce: 0,
			})],
			fee: 1,
		};
		let mut other = base.clone();
		other.fee = 2;
		assert_ne!(base.id(), other.id());
		assert_eq!(base.id(), base.clone().id());
	}
}
