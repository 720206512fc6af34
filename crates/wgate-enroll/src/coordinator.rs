// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::allocator::AddressAllocator;
use crate::client_config::{ClientConfig, Endpoint};
use crate::error::{EnrollError, Result};
use crate::keys::WgPublicKey;
use crate::registry::{Peer, PeerKey, PeerRegistry};
use crate::syncer::KernelSyncer;
use crate::writer::InterfaceStateWriter;

/// Steps of one enrollment attempt, in order. Any of them can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollStage {
	Validating,
	Allocating,
	Registering,
	Persisting,
	Syncing,
	Responding,
}

impl EnrollStage {
	pub fn as_str(&self) -> &'static str {
		match self {
			EnrollStage::Validating => "validating",
			EnrollStage::Allocating => "allocating",
			EnrollStage::Registering => "registering",
			EnrollStage::Persisting => "persisting",
			EnrollStage::Syncing => "syncing",
			EnrollStage::Responding => "responding",
		}
	}
}

impl fmt::Display for EnrollStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What clients need to know about this server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
	pub public_key: WgPublicKey,
	pub endpoint: Endpoint,
	pub persistent_keepalive: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
	pub peer: Peer,
	pub client_config: ClientConfig,
}

/// Runs enrollments one at a time.
///
/// The registry lock is held from allocation until the kernel has the peer,
/// so the registry, the config file and the interface only ever change
/// together. A failed attempt leaves the registry as it found it.
pub struct EnrollmentCoordinator {
	registry: Mutex<PeerRegistry>,
	/// Registry size as of the last finished enrollment; readable without the lock.
	enrolled: AtomicUsize,
	allocator: AddressAllocator,
	writer: InterfaceStateWriter,
	syncer: KernelSyncer,
	identity: ServerIdentity,
}

impl EnrollmentCoordinator {
	pub fn new(
		registry: PeerRegistry,
		allocator: AddressAllocator,
		writer: InterfaceStateWriter,
		syncer: KernelSyncer,
		identity: ServerIdentity,
	) -> Self {
		Self {
			enrolled: AtomicUsize::new(registry.size()),
			registry: Mutex::new(registry),
			allocator,
			writer,
			syncer,
			identity,
		}
	}

	pub fn identity(&self) -> &ServerIdentity {
		&self.identity
	}

	pub fn interface(&self) -> &str {
		self.syncer.interface()
	}

	/// Peers enrolled so far. Does not wait for an enrollment in progress.
	pub fn enrolled_count(&self) -> usize {
		self.enrolled.load(Ordering::Acquire)
	}

	pub async fn peer_count(&self) -> usize {
		self.registry.lock().await.size()
	}

	pub async fn peers(&self) -> Vec<Peer> {
		self.registry.lock().await.list().to_vec()
	}

	/// Enrolls the public key carried in a request body.
	pub async fn enroll(&self, body: &[u8]) -> Result<Enrollment> {
		let key = PeerKey::from_body(body).map_err(|e| failed(EnrollStage::Validating, e))?;
		self.enroll_key(key).await
	}

	#[instrument(skip(self, key), fields(peer = %key.prefix(), interface = %self.syncer.interface()))]
	pub async fn enroll_key(&self, key: PeerKey) -> Result<Enrollment> {
		let mut registry = self.registry.lock().await;
		let ordinal = registry.size() + 1;

		let address = self
			.allocator
			.allocate(ordinal)
			.map_err(|e| failed(EnrollStage::Allocating, e))?;

		let peer = registry
			.register(key, address)
			.map_err(|e| failed(EnrollStage::Registering, e))?
			.clone();

		let receipt = match self.writer.append_peer(&peer).await {
			Ok(receipt) => receipt,
			Err(e) => {
				registry.remove(&peer.public_key);
				warn!(%address, "removed peer from registry after failed config write");
				return Err(failed(EnrollStage::Persisting, e));
			}
		};

		if let Err(e) = self.syncer.add_peer(&peer).await {
			match self.writer.revert(receipt).await {
				Ok(()) => {
					registry.remove(&peer.public_key);
					warn!(%address, "rolled back peer after failed kernel sync");
				}
				Err(revert) => {
					error!(
						%address,
						error = %revert,
						"could not remove peer stanza; keeping registry entry so the address is not reissued"
					);
				}
			}
			self.enrolled.store(registry.size(), Ordering::Release);
			return Err(failed(EnrollStage::Syncing, e));
		}
		self.enrolled.store(registry.size(), Ordering::Release);
		drop(registry);

		info!(%address, ordinal, stage = %EnrollStage::Responding, "peer enrolled");
		Ok(Enrollment {
			client_config: self.client_config(&peer),
			peer,
		})
	}

	pub fn client_config(&self, peer: &Peer) -> ClientConfig {
		ClientConfig {
			address: peer.address,
			server_public_key: self.identity.public_key,
			endpoint: self.identity.endpoint.clone(),
			persistent_keepalive: self.identity.persistent_keepalive,
		}
	}
}

fn failed(stage: EnrollStage, err: EnrollError) -> EnrollError {
	if err.is_client_error() {
		info!(%stage, code = err.code(), error = %err, "enrollment rejected");
	} else {
		error!(%stage, code = err.code(), error = %err, "enrollment failed");
	}
	err
}
