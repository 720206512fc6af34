// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-time startup: pick the interface key, restore enrolled peers, write the
//! config file and bring the interface up.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ipnet::Ipv4Net;
use tracing::{info, instrument, warn};

use crate::allocator::AddressAllocator;
use crate::client_config::Endpoint;
use crate::coordinator::{EnrollmentCoordinator, ServerIdentity};
use crate::error::{EnrollError, Result};
use crate::keys::{WgKeyPair, WgPrivateKey};
use crate::registry::{PeerKey, PeerRegistry};
use crate::syncer::{bounded, KernelSyncer};
use crate::tool::WgTool;
use crate::wgconf::{self, InterfaceStanza, WgConfFile};
use crate::writer::InterfaceStateWriter;

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
	pub interface: String,
	pub config_dir: PathBuf,
	/// Interface address with the subnet prefix, e.g. `10.0.0.1/8`.
	pub address: Ipv4Net,
	pub listen_port: u16,
	/// Host name clients dial; the port is always `listen_port`.
	pub endpoint_host: String,
	pub persistent_keepalive: u16,
	pub tool_timeout: Duration,
	/// Reload key and peers from an existing config file instead of starting
	/// from an empty registry.
	pub resume: bool,
	pub private_key: Option<WgPrivateKey>,
}

impl BootstrapOptions {
	pub fn config_path(&self) -> PathBuf {
		self.config_dir.join(format!("{}.conf", self.interface))
	}

	/// The interface stanza that will be written, with the key masked.
	pub fn preview(&self) -> String {
		wgconf::redacted_interface(self.address, self.listen_port)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeySource {
	Configured,
	Resumed,
	Generated,
}

#[instrument(skip(options, tool), fields(interface = %options.interface, resume = options.resume))]
pub async fn bootstrap(
	options: BootstrapOptions,
	tool: Arc<dyn WgTool>,
) -> Result<EnrollmentCoordinator> {
	let path = options.config_path();
	let allocator = AddressAllocator::new(options.address);

	let existing = if options.resume {
		read_existing(&path).await?
	} else {
		None
	};

	let (pair, source) = match (options.private_key.clone(), &existing) {
		(Some(private), _) => (WgKeyPair::from_private_key(private), KeySource::Configured),
		(None, Some(file)) => (
			WgKeyPair::from_private_key(file.interface.private_key.clone()),
			KeySource::Resumed,
		),
		(None, None) => {
			let pair = bounded("wg", options.tool_timeout, tool.generate_key_pair())
				.await
				.map_err(|e| EnrollError::KeyGeneration(e.to_string()))?;
			(pair, KeySource::Generated)
		}
	};
	info!(source = ?source, public_key = %pair.public_key(), "interface key ready");

	let registry = match existing {
		Some(file) if file.interface.address == options.address => {
			restore_registry(&path, &file, &allocator)?
		}
		Some(file) => {
			warn!(
				previous = %file.interface.address,
				configured = %options.address,
				"interface address changed; previously enrolled peers are dropped"
			);
			PeerRegistry::new()
		}
		None => PeerRegistry::new(),
	};
	if !registry.is_empty() {
		info!(peers = registry.size(), "restored enrolled peers");
	}

	let writer = InterfaceStateWriter::new(&path);
	let stanza = InterfaceStanza {
		private_key: pair.private_key().clone(),
		address: options.address,
		listen_port: options.listen_port,
	};
	writer.write_initial(&stanza, registry.list()).await?;

	let syncer = KernelSyncer::new(tool, &options.interface, &path, options.tool_timeout);
	syncer.bring_up().await?;

	Ok(EnrollmentCoordinator::new(
		registry,
		allocator,
		writer,
		syncer,
		ServerIdentity {
			public_key: *pair.public_key(),
			endpoint: Endpoint::new(options.endpoint_host, options.listen_port),
			persistent_keepalive: options.persistent_keepalive,
		},
	))
}

async fn read_existing(path: &Path) -> Result<Option<WgConfFile>> {
	let text = match tokio::fs::read_to_string(path).await {
		Ok(text) => text,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(e) => {
			return Err(EnrollError::ConfigParse {
				path: path.to_path_buf(),
				message: format!("could not read existing config: {e}"),
			})
		}
	};

	WgConfFile::parse(&text)
		.map(Some)
		.map_err(|e| EnrollError::ConfigParse {
			path: path.to_path_buf(),
			message: e.to_string(),
		})
}

/// Rebuilds the registry from the file's `[Peer]` stanzas. Peer `n` must hold
/// the address the allocator gives ordinal `n`, otherwise the next allocation
/// could collide with a restored peer.
fn restore_registry(
	path: &Path,
	file: &WgConfFile,
	allocator: &AddressAllocator,
) -> Result<PeerRegistry> {
	let parse_error = |message: String| EnrollError::ConfigParse {
		path: path.to_path_buf(),
		message,
	};

	let mut registry = PeerRegistry::new();
	for (index, stanza) in file.peers.iter().enumerate() {
		let ordinal = index + 1;
		let key = PeerKey::parse(&stanza.public_key)
			.map_err(|e| parse_error(format!("peer #{ordinal}: {e}")))?;
		let expected = allocator
			.allocate(ordinal)
			.map_err(|e| parse_error(format!("peer #{ordinal}: {e}")))?;
		if stanza.allowed_ip != expected {
			return Err(parse_error(format!(
				"peer #{ordinal} ({}) has {}, expected {expected}",
				key.prefix(),
				stanza.allowed_ip
			)));
		}
		registry
			.register(key, expected)
			.map_err(|_| parse_error(format!("peer #{ordinal} repeats an earlier public key")))?;
	}
	Ok(registry)
}
