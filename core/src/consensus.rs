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

//! All the epoch parameters of the sidechain and the functions deriving
//! epoch membership from block data. A consensus epoch is a span of slots
//! sharing one forging-stake snapshot; a withdrawal epoch is a span of
//! mainchain references after which a certificate is due.

use crate::core::epoch::WithdrawalEpochInfo;

/// Epoch geometry of the sidechain. Fixed at network definition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConsensusParams {
	/// Number of forging slots in one consensus epoch
	pub slots_in_epoch: u64,
	/// Wall-clock duration of one slot, in seconds
	pub seconds_in_slot: u64,
	/// Number of mainchain block references in one withdrawal epoch
	pub withdrawal_epoch_length: u32,
}

impl Default for ConsensusParams {
	fn default() -> ConsensusParams {
		ConsensusParams {
			slots_in_epoch: 720,
			seconds_in_slot: 120,
			withdrawal_epoch_length: 100,
		}
	}
}

impl ConsensusParams {
	/// Consensus epoch the given block timestamp falls into. The chain
	/// starts in epoch 1, whose sole guaranteed member is the genesis block.
	pub fn consensus_epoch_number(&self, timestamp: u64) -> u32 {
		(timestamp / (self.slots_in_epoch * self.seconds_in_slot) + 1) as u32
	}

	/// Withdrawal epoch info after a block carrying `mc_refs_count`
	/// mainchain references extends a chain whose last applied block left
	/// `current`. A block landing on a full epoch index opens the next one.
	pub fn next_withdrawal_epoch_info(
		&self,
		current: WithdrawalEpochInfo,
		mc_refs_count: u32,
	) -> WithdrawalEpochInfo {
		if current.last_epoch_index >= self.withdrawal_epoch_length {
			WithdrawalEpochInfo {
				epoch: current.epoch + 1,
				last_epoch_index: mc_refs_count,
			}
		} else {
			WithdrawalEpochInfo {
				epoch: current.epoch,
				last_epoch_index: current.last_epoch_index + mc_refs_count,
			}
		}
	}

	/// Whether `info` describes the last block of its withdrawal epoch.
	pub fn is_withdrawal_epoch_last_index(&self, info: &WithdrawalEpochInfo) -> bool {
		info.last_epoch_index >= self.withdrawal_epoch_length
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn consensus_epoch_from_timestamp() {
		let params = ConsensusParams {
			slots_in_epoch: 10,
			seconds_in_slot: 6,
			withdrawal_epoch_length: 100,
		};
		assert_eq!(params.consensus_epoch_number(0), 1);
		assert_eq!(params.consensus_epoch_number(59), 1);
		assert_eq!(params.consensus_epoch_number(60), 2);
		assert_eq!(params.consensus_epoch_number(121), 3);
	}

	#[test]
	fn withdrawal_epoch_rolls_over() {
		let params = ConsensusParams {
			slots_in_epoch: 10,
			seconds_in_slot: 6,
			withdrawal_epoch_length: 3,
		};
		let mut info = WithdrawalEpochInfo {
			epoch: 0,
			last_epoch_index: 0,
		};
		info = params.next_withdrawal_epoch_info(info, 2);
		assert_eq!((info.epoch, info.last_epoch_index), (0, 2));
		assert!(!params.is_withdrawal_epoch_last_index(&info));

		info = params.next_withdrawal_epoch_info(info, 1);
		assert_eq!((info.epoch, info.last_epoch_index), (0, 3));
		assert!(params.is_withdrawal_epoch_last_index(&info));

		info = params.next_withdrawal_epoch_info(info, 1);
		assert_eq!((info.epoch, info.last_epoch_index), (1, 1));
	}
}
