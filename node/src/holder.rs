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

//! Single-consumer request loop around the node view. Callers submit
//! requests over a channel; one thread serves them in arrival order, so
//! every mutation of the quadruple is serialized and a block application
//! runs to completion before anything else is looked at. Read requests
//! carry a function that is run against the current view, its result going
//! back over the caller's reply channel.

use std::sync::mpsc;
use std::thread;

use crate::core::core::block::Block;
use crate::core::core::proposition::Proposition;
use crate::core::core::transaction::SidechainTransaction;
use crate::error::{Error, ErrorKind};
use crate::node_view::NodeView;
use crate::wallet::Secret;

/// A request to the holder. Mutating requests reply on the embedded
/// channel once served.
pub enum NodeViewRequest {
	/// Offer a block to the node view
	ApplyBlock(Block, mpsc::Sender<Result<(), Error>>),
	/// Add a locally generated secret to the wallet
	AddSecret(Secret, mpsc::Sender<Result<(), Error>>),
	/// Remove a secret from the wallet
	RemoveSecret(Proposition, mpsc::Sender<Result<(), Error>>),
	/// Submit a transaction to the memory pool
	AddTransaction(SidechainTransaction, mpsc::Sender<Result<(), Error>>),
	/// Run a read-only function against the current node view
	Inspect(Box<dyn FnOnce(&NodeView) + Send>),
	/// Run a mutating function against the current node view
	Mutate(Box<dyn FnOnce(&mut NodeView) + Send>),
}

/// Handle to the consumer loop.
pub struct NodeViewHolder {
	sender: mpsc::Sender<NodeViewRequest>,
	handle: thread::JoinHandle<()>,
}

impl NodeViewHolder {
	/// Starts the consumer thread over the provided node view.
	pub fn start(mut view: NodeView) -> NodeViewHolder {
		let (sender, receiver) = mpsc::channel::<NodeViewRequest>();
		let handle = thread::Builder::new()
			.name("node_view_holder".to_string())
			.spawn(move || {
				while let Ok(request) = receiver.recv() {
					match request {
						NodeViewRequest::ApplyBlock(block, reply) => {
							let _ = reply.send(view.apply_block(&block));
						}
						NodeViewRequest::AddSecret(secret, reply) => {
							let _ = reply.send(view.add_secret(secret));
						}
						NodeViewRequest::RemoveSecret(proposition, reply) => {
							let _ = reply.send(view.remove_secret(&proposition));
						}
						NodeViewRequest::AddTransaction(tx, reply) => {
							let _ = reply.send(view.add_transaction(tx));
						}
						NodeViewRequest::Inspect(f) => f(&view),
						NodeViewRequest::Mutate(f) => f(&mut view),
					}
				}
				debug!("node view holder: all request senders gone, stopping");
			})
			.expect("failed to spawn node view holder thread");
		NodeViewHolder { sender, handle }
	}

	/// A fresh sender for submitting requests from elsewhere.
	pub fn sender(&self) -> mpsc::Sender<NodeViewRequest> {
		self.sender.clone()
	}

	/// Offers a block and waits for the outcome.
	pub fn apply_block(&self, block: Block) -> Result<(), Error> {
		let (reply, outcome) = mpsc::channel();
		self.sender
			.send(NodeViewRequest::ApplyBlock(block, reply))
			.map_err(|_| Error::from(ErrorKind::Disconnected))?;
		outcome.recv().map_err(|_| ErrorKind::Disconnected)?
	}

	/// Adds a locally generated secret and waits for the outcome.
	pub fn add_secret(&self, secret: Secret) -> Result<(), Error> {
		let (reply, outcome) = mpsc::channel();
		self.sender
			.send(NodeViewRequest::AddSecret(secret, reply))
			.map_err(|_| Error::from(ErrorKind::Disconnected))?;
		outcome.recv().map_err(|_| ErrorKind::Disconnected)?
	}

	/// Removes a secret and waits for the outcome.
	pub fn remove_secret(&self, proposition: Proposition) -> Result<(), Error> {
		let (reply, outcome) = mpsc::channel();
		self.sender
			.send(NodeViewRequest::RemoveSecret(proposition, reply))
			.map_err(|_| Error::from(ErrorKind::Disconnected))?;
		outcome.recv().map_err(|_| ErrorKind::Disconnected)?
	}

	/// Submits a transaction to the memory pool and waits for the outcome.
	pub fn add_transaction(&self, tx: SidechainTransaction) -> Result<(), Error> {
		let (reply, outcome) = mpsc::channel();
		self.sender
			.send(NodeViewRequest::AddTransaction(tx, reply))
			.map_err(|_| Error::from(ErrorKind::Disconnected))?;
		outcome.recv().map_err(|_| ErrorKind::Disconnected)?
	}

	/// Runs a read-only function against the current node view and returns
	/// its result.
	pub fn with_node_view<R, F>(&self, f: F) -> Result<R, Error>
	where
		R: Send + 'static,
		F: FnOnce(&NodeView) -> R + Send + 'static,
	{
		let (reply, outcome) = mpsc::channel();
		self.sender
			.send(NodeViewRequest::Inspect(Box::new(move |view| {
				let _ = reply.send(f(view));
			})))
			.map_err(|_| Error::from(ErrorKind::Disconnected))?;
		outcome.recv().map_err(|_| ErrorKind::Disconnected.into())
	}

	/// Runs a mutating function against the current node view and returns
	/// its result.
	pub fn with_node_view_mut<R, F>(&self, f: F) -> Result<R, Error>
	where
		R: Send + 'static,
		F: FnOnce(&mut NodeView) -> R + Send + 'static,
	{
		let (reply, outcome) = mpsc::channel();
		self.sender
			.send(NodeViewRequest::Mutate(Box::new(move |view| {
				let _ = reply.send(f(view));
			})))
			.map_err(|_| Error::from(ErrorKind::Disconnected))?;
		outcome.recv().map_err(|_| ErrorKind::Disconnected.into())
	}

	/// Drops the holder's own sender and waits for the consumer thread to
	/// drain and stop. Other live senders keep the loop running.
	pub fn stop(self) {
		let NodeViewHolder { sender, handle } = self;
		drop(sender);
		let _ = handle.join();
	}
}
