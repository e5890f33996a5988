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

//! Core types: boxes, transactions, blocks, certificates and the hashing
//! and Merkle machinery they rely on.

pub mod block;
pub mod boxes;
pub mod certificate;
pub mod changes;
pub mod csw;
pub mod epoch;
pub mod hash;
pub mod merkle;
pub mod proposition;
pub mod transaction;

pub use self::block::{
	AggregatedTransaction, Block, BlockHeader, ForwardTransfer, MainchainBlockReferenceData,
	SidechainCreation, SidechainRelatedOutput,
};
pub use self::boxes::{BoxId, CoinBox, CustomBox, ForgerBox, ForgingStakeInfo, OutputBox, WalletBox};
pub use self::certificate::{WithdrawalEpochCertificate, FIELD_ELEMENT_LENGTH};
pub use self::changes::{box_changes, BoxChanges};
pub use self::csw::{CswData, FtCswData, UtxoCswData, UtxoMerkleTreeView};
pub use self::epoch::{
	ConsensusEpochInfo, ForgingStakeMerklePathInfo, FullConsensusEpochInfo, WithdrawalEpochInfo,
};
pub use self::hash::{Hash, Hashed, ZERO_HASH};
pub use self::merkle::{MerklePath, MerkleTree};
pub use self::proposition::{Proposition, VrfPublicKey};
pub use self::transaction::SidechainTransaction;
