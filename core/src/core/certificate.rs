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

//! Withdrawal epoch certificates as they appear on the mainchain wire.
//! Every multi-byte integer is little-endian and every variable-length
//! sequence is CompactSize-prefixed. The raw byte span of a parsed
//! certificate is retained so re-serialization is byte-exact regardless of
//! any representation choices made here.

use byteorder::{ByteOrder, LittleEndian};
use sha2::{Digest, Sha256};

use crate::core::hash::Hash;
use crate::ser::Error;
use crate::varint;

/// Length in bytes of a proof-system field element. Roots committed in
/// certificates must be exactly this long.
pub const FIELD_ELEMENT_LENGTH: usize = 32;

/// A proof-system field element carried as a certificate custom field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldElementCertificateField(pub Vec<u8>);

/// A compressed bit vector carried as a certificate custom field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVectorCertificateField(pub Vec<u8>);

/// An input of the mainchain certificate transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainchainTxInput {
	/// Hash of the transaction holding the spent output
	pub prev_tx_hash: [u8; 32],
	/// Index of the spent output
	pub prev_tx_output_index: u32,
	/// Unlocking script
	pub tx_script: Vec<u8>,
	/// Input sequence number
	pub sequence: u32,
}

/// An ordinary output of the mainchain certificate transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainchainTxOutput {
	/// Amount in mainchain base units
	pub value: i64,
	/// Locking script
	pub script: Vec<u8>,
}

/// A backward transfer output: coins leaving the sidechain towards a
/// mainchain address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainchainBackwardTransferOutput {
	/// Amount in mainchain base units
	pub amount: i64,
	/// Hash of the receiving mainchain public key
	pub pub_key_hash: [u8; 20],
}

/// A certificate the mainchain accepted for one sidechain withdrawal
/// epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalEpochCertificate {
	/// Certificate version
	pub version: i32,
	/// Id of the sidechain the certificate belongs to
	pub sidechain_id: [u8; 32],
	/// Withdrawal epoch the certificate closes
	pub epoch_number: i32,
	/// Quality, the certificate ranking criterion
	pub quality: i64,
	/// Cumulative commitment tree root at the end of the epoch
	pub end_cumulative_sc_tx_commitment_tree_root: Vec<u8>,
	/// Zero-knowledge proof backing the certificate
	pub proof: Vec<u8>,
	/// Field element custom fields
	pub field_element_certificate_fields: Vec<FieldElementCertificateField>,
	/// Bit vector custom fields
	pub bit_vector_certificate_fields: Vec<BitVectorCertificateField>,
	/// Minimum forward transfer amount declared for the next epoch
	pub ft_min_amount: i64,
	/// Backward transfer request fee declared for the next epoch
	pub btr_fee: i64,
	/// Inputs of the carrying transaction
	pub transaction_inputs: Vec<MainchainTxInput>,
	/// Ordinary outputs of the carrying transaction
	pub transaction_outputs: Vec<MainchainTxOutput>,
	/// Backward transfer outputs of the carrying transaction
	pub backward_transfer_outputs: Vec<MainchainBackwardTransferOutput>,
	/// The exact wire bytes this certificate was parsed from
	certificate_bytes: Vec<u8>,
}

fn read_i32_le(buf: &[u8], pos: &mut usize) -> Result<i32, Error> {
	if buf.len() < *pos + 4 {
		return Err(Error::CorruptedData);
	}
	let v = LittleEndian::read_i32(&buf[*pos..*pos + 4]);
	*pos += 4;
	Ok(v)
}

fn read_u32_le(buf: &[u8], pos: &mut usize) -> Result<u32, Error> {
	if buf.len() < *pos + 4 {
		return Err(Error::CorruptedData);
	}
	let v = LittleEndian::read_u32(&buf[*pos..*pos + 4]);
	*pos += 4;
	Ok(v)
}

fn read_i64_le(buf: &[u8], pos: &mut usize) -> Result<i64, Error> {
	if buf.len() < *pos + 8 {
		return Err(Error::CorruptedData);
	}
	let v = LittleEndian::read_i64(&buf[*pos..*pos + 8]);
	*pos += 8;
	Ok(v)
}

fn read_exact<'a>(buf: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], Error> {
	if buf.len() < *pos + len {
		return Err(Error::CorruptedData);
	}
	let out = &buf[*pos..*pos + len];
	*pos += len;
	Ok(out)
}

fn read_var_bytes(buf: &[u8], pos: &mut usize) -> Result<Vec<u8>, Error> {
	let len = varint::read(buf, pos)? as usize;
	Ok(read_exact(buf, pos, len)?.to_vec())
}

impl WithdrawalEpochCertificate {
	/// Parses a certificate from `bytes` starting at `offset`. The consumed
	/// span is retained verbatim for byte-exact re-serialization.
	pub fn parse(bytes: &[u8], offset: usize) -> Result<WithdrawalEpochCertificate, Error> {
		let mut pos = offset;

		let version = read_i32_le(bytes, &mut pos)?;

		let mut sidechain_id = [0; 32];
		sidechain_id.copy_from_slice(read_exact(bytes, &mut pos, 32)?);

		let epoch_number = read_i32_le(bytes, &mut pos)?;
		let quality = read_i64_le(bytes, &mut pos)?;

		let end_cumulative_sc_tx_commitment_tree_root = read_var_bytes(bytes, &mut pos)?;
		if end_cumulative_sc_tx_commitment_tree_root.len() != FIELD_ELEMENT_LENGTH {
			return Err(Error::CorruptedData);
		}

		let proof = read_var_bytes(bytes, &mut pos)?;

		let field_elements_count = varint::read(bytes, &mut pos)?;
		let mut field_element_certificate_fields =
			Vec::with_capacity(field_elements_count as usize);
		for _ in 0..field_elements_count {
			field_element_certificate_fields
				.push(FieldElementCertificateField(read_var_bytes(bytes, &mut pos)?));
		}

		let bit_vectors_count = varint::read(bytes, &mut pos)?;
		let mut bit_vector_certificate_fields = Vec::with_capacity(bit_vectors_count as usize);
		for _ in 0..bit_vectors_count {
			bit_vector_certificate_fields
				.push(BitVectorCertificateField(read_var_bytes(bytes, &mut pos)?));
		}

		let ft_min_amount = read_i64_le(bytes, &mut pos)?;
		let btr_fee = read_i64_le(bytes, &mut pos)?;

		let inputs_count = varint::read(bytes, &mut pos)?;
		let mut transaction_inputs = Vec::with_capacity(inputs_count as usize);
		for _ in 0..inputs_count {
			let mut prev_tx_hash = [0; 32];
			prev_tx_hash.copy_from_slice(read_exact(bytes, &mut pos, 32)?);
			let prev_tx_output_index = read_u32_le(bytes, &mut pos)?;
			let tx_script = read_var_bytes(bytes, &mut pos)?;
			let sequence = read_u32_le(bytes, &mut pos)?;
			transaction_inputs.push(MainchainTxInput {
				prev_tx_hash,
				prev_tx_output_index,
				tx_script,
				sequence,
			});
		}

		let outputs_count = varint::read(bytes, &mut pos)?;
		let mut transaction_outputs = Vec::with_capacity(outputs_count as usize);
		for _ in 0..outputs_count {
			let value = read_i64_le(bytes, &mut pos)?;
			let script = read_var_bytes(bytes, &mut pos)?;
			transaction_outputs.push(MainchainTxOutput { value, script });
		}

		let bt_count = varint::read(bytes, &mut pos)?;
		let mut backward_transfer_outputs = Vec::with_capacity(bt_count as usize);
		for _ in 0..bt_count {
			let amount = read_i64_le(bytes, &mut pos)?;
			let mut pub_key_hash = [0; 20];
			pub_key_hash.copy_from_slice(read_exact(bytes, &mut pos, 20)?);
			backward_transfer_outputs.push(MainchainBackwardTransferOutput {
				amount,
				pub_key_hash,
			});
		}

		Ok(WithdrawalEpochCertificate {
			version,
			sidechain_id,
			epoch_number,
			quality,
			end_cumulative_sc_tx_commitment_tree_root,
			proof,
			field_element_certificate_fields,
			bit_vector_certificate_fields,
			ft_min_amount,
			btr_fee,
			transaction_inputs,
			transaction_outputs,
			backward_transfer_outputs,
			certificate_bytes: bytes[offset..pos].to_vec(),
		})
	}

	/// Assembles a certificate from its fields, producing the canonical wire
	/// encoding.
	pub fn new(
		version: i32,
		sidechain_id: [u8; 32],
		epoch_number: i32,
		quality: i64,
		end_cumulative_sc_tx_commitment_tree_root: Vec<u8>,
		proof: Vec<u8>,
		field_element_certificate_fields: Vec<FieldElementCertificateField>,
		bit_vector_certificate_fields: Vec<BitVectorCertificateField>,
		ft_min_amount: i64,
		btr_fee: i64,
		transaction_inputs: Vec<MainchainTxInput>,
		transaction_outputs: Vec<MainchainTxOutput>,
		backward_transfer_outputs: Vec<MainchainBackwardTransferOutput>,
	) -> Result<WithdrawalEpochCertificate, Error> {
		if end_cumulative_sc_tx_commitment_tree_root.len() != FIELD_ELEMENT_LENGTH {
			return Err(Error::CorruptedData);
		}

		let mut out = vec![];
		write_i32_le(version, &mut out);
		out.extend_from_slice(&sidechain_id);
		write_i32_le(epoch_number, &mut out);
		write_i64_le(quality, &mut out);

		write_prefixed(&end_cumulative_sc_tx_commitment_tree_root, &mut out);
		write_prefixed(&proof, &mut out);

		varint::write(field_element_certificate_fields.len() as u64, &mut out);
		for field in &field_element_certificate_fields {
			write_prefixed(&field.0, &mut out);
		}
		varint::write(bit_vector_certificate_fields.len() as u64, &mut out);
		for field in &bit_vector_certificate_fields {
			write_prefixed(&field.0, &mut out);
		}

		write_i64_le(ft_min_amount, &mut out);
		write_i64_le(btr_fee, &mut out);

		varint::write(transaction_inputs.len() as u64, &mut out);
		for input in &transaction_inputs {
			out.extend_from_slice(&input.prev_tx_hash);
			write_u32_le(input.prev_tx_output_index, &mut out);
			write_prefixed(&input.tx_script, &mut out);
			write_u32_le(input.sequence, &mut out);
		}

		varint::write(transaction_outputs.len() as u64, &mut out);
		for output in &transaction_outputs {
			write_i64_le(output.value, &mut out);
			write_prefixed(&output.script, &mut out);
		}

		varint::write(backward_transfer_outputs.len() as u64, &mut out);
		for output in &backward_transfer_outputs {
			write_i64_le(output.amount, &mut out);
			out.extend_from_slice(&output.pub_key_hash);
		}

		Ok(WithdrawalEpochCertificate {
			version,
			sidechain_id,
			epoch_number,
			quality,
			end_cumulative_sc_tx_commitment_tree_root,
			proof,
			field_element_certificate_fields,
			bit_vector_certificate_fields,
			ft_min_amount,
			btr_fee,
			transaction_inputs,
			transaction_outputs,
			backward_transfer_outputs,
			certificate_bytes: out,
		})
	}

	/// The exact wire bytes of this certificate. Serialization is a verbatim
	/// copy of these.
	pub fn bytes(&self) -> &[u8] {
		&self.certificate_bytes
	}

	/// Certificate hash as the mainchain computes it: the byte-reversed
	/// double SHA256 of the wire bytes.
	pub fn hash(&self) -> Hash {
		let first = Sha256::digest(&self.certificate_bytes);
		let second = Sha256::digest(&first);
		let mut reversed: Vec<u8> = second.to_vec();
		reversed.reverse();
		Hash::from_vec(&reversed)
	}
}

fn write_i32_le(v: i32, out: &mut Vec<u8>) {
	let mut b = [0; 4];
	LittleEndian::write_i32(&mut b, v);
	out.extend_from_slice(&b);
}

fn write_u32_le(v: u32, out: &mut Vec<u8>) {
	let mut b = [0; 4];
	LittleEndian::write_u32(&mut b, v);
	out.extend_from_slice(&b);
}

fn write_i64_le(v: i64, out: &mut Vec<u8>) {
	let mut b = [0; 8];
	LittleEndian::write_i64(&mut b, v);
	out.extend_from_slice(&b);
}

fn write_prefixed(bytes: &[u8], out: &mut Vec<u8>) {
	varint::write(bytes.len() as u64, out);
	out.extend_from_slice(bytes);
}

#[cfg(test)]
mod test {
	use super::*;

	fn sample_certificate() -> WithdrawalEpochCertificate {
		WithdrawalEpochCertificate::new(
			-5,
			[2; 32],
			7,
			900,
			vec![6; FIELD_ELEMENT_LENGTH],
			vec![9; 300],
			vec![
				FieldElementCertificateField(vec![1; 32]),
				FieldElementCertificateField(vec![2; 32]),
			],
			vec![BitVectorCertificateField(vec![0xaa; 40])],
			54,
			-1,
			vec![MainchainTxInput {
				prev_tx_hash: [8; 32],
				prev_tx_output_index: 1,
				tx_script: vec![0x51, 0x52],
				sequence: 0xffff_ffff,
			}],
			vec![MainchainTxOutput {
				value: 5000,
				script: vec![0x76, 0xa9],
			}],
			vec![MainchainBackwardTransferOutput {
				amount: 77,
				pub_key_hash: [4; 20],
			}],
		)
		.unwrap()
	}

	#[test]
	fn round_trip_is_byte_exact() {
		let cert = sample_certificate();
		let parsed = WithdrawalEpochCertificate::parse(cert.bytes(), 0).unwrap();
		assert_eq!(parsed, cert);
		assert_eq!(parsed.bytes(), cert.bytes());
	}

	#[test]
	fn parse_respects_offset() {
		let cert = sample_certificate();
		let mut buf = vec![0xde, 0xad, 0xbe, 0xef];
		buf.extend_from_slice(cert.bytes());
		let parsed = WithdrawalEpochCertificate::parse(&buf, 4).unwrap();
		assert_eq!(parsed, cert);
	}

	#[test]
	fn integers_are_little_endian_on_the_wire() {
		let cert = sample_certificate();
		// version -5 as little-endian i32
		assert_eq!(&cert.bytes()[..4], &[0xfb, 0xff, 0xff, 0xff]);
		// epoch number 7 right after the 32 byte sidechain id
		assert_eq!(&cert.bytes()[36..40], &[7, 0, 0, 0]);
	}

	#[test]
	fn wrong_root_length_is_rejected() {
		let cert = sample_certificate();
		let good = cert.bytes();
		// shrink the committed root from 32 to 31 bytes
		let root_offset = 4 + 32 + 4 + 8;
		let mut bad = good[..root_offset].to_vec();
		bad.push(31);
		bad.extend_from_slice(&vec![6; 31]);
		bad.extend_from_slice(&good[root_offset + 1 + 32..]);
		assert_eq!(
			WithdrawalEpochCertificate::parse(&bad, 0),
			Err(Error::CorruptedData)
		);
	}

	#[test]
	fn truncated_certificate_is_rejected() {
		let cert = sample_certificate();
		let short = &cert.bytes()[..cert.bytes().len() - 3];
		assert!(WithdrawalEpochCertificate::parse(short, 0).is_err());
	}

	#[test]
	fn hash_is_reversed_double_sha() {
		let cert = sample_certificate();
		let h1 = cert.hash();
		let h2 = WithdrawalEpochCertificate::parse(cert.bytes(), 0).unwrap().hash();
		assert_eq!(h1, h2);
		assert_ne!(h1, Hash::default());
	}
}
