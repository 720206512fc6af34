// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::error::{EnrollError, Result};

const MAX_KEY_LEN: usize = 256;

/// A peer public key as submitted by a client.
///
/// The key is opaque here: only its shape is checked, not that it decodes to
/// a Curve25519 point. Anything that would corrupt a `Key = Value` line of the
/// interface config file is rejected.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PeerKey(String);

impl PeerKey {
	pub fn parse(raw: &str) -> Result<Self> {
		if raw.is_empty() {
			return Err(EnrollError::InvalidInput("public key is empty".to_string()));
		}
		if raw.len() > MAX_KEY_LEN {
			return Err(EnrollError::InvalidInput(format!(
				"public key is longer than {MAX_KEY_LEN} bytes"
			)));
		}
		if raw
			.chars()
			.any(|c| c.is_whitespace() || c.is_control() || c == '#')
		{
			return Err(EnrollError::InvalidInput(
				"public key contains whitespace, control or comment characters".to_string(),
			));
		}
		Ok(Self(raw.to_string()))
	}

	/// Parses a request body; a single trailing newline (as sent by
	/// `curl --data @key.pub`) is dropped.
	pub fn from_body(body: &[u8]) -> Result<Self> {
		let text = std::str::from_utf8(body)
			.map_err(|_| EnrollError::InvalidInput("public key is not valid UTF-8".to_string()))?;
		let text = text
			.strip_suffix("\r\n")
			.or_else(|| text.strip_suffix('\n'))
			.unwrap_or(text);
		Self::parse(text)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Short form for log lines.
	pub fn prefix(&self) -> String {
		let head: String = self.0.chars().take(8).collect();
		if head.len() < self.0.len() {
			format!("{head}...")
		} else {
			head
		}
	}
}

impl fmt::Debug for PeerKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("PeerKey").field(&self.prefix()).finish()
	}
}

impl fmt::Display for PeerKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Peer {
	pub public_key: PeerKey,
	pub address: Ipv4Addr,
}

impl Peer {
	pub fn new(public_key: PeerKey, address: Ipv4Addr) -> Self {
		Self {
			public_key,
			address,
		}
	}
}

/// Enrolled peers in enrollment order, indexed by public key.
#[derive(Debug, Default)]
pub struct PeerRegistry {
	peers: Vec<Peer>,
	by_key: HashMap<PeerKey, usize>,
}

impl PeerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, public_key: PeerKey, address: Ipv4Addr) -> Result<&Peer> {
		if self.by_key.contains_key(&public_key) {
			return Err(EnrollError::DuplicateKey);
		}
		let index = self.peers.len();
		self.by_key.insert(public_key.clone(), index);
		self.peers.push(Peer::new(public_key, address));
		Ok(&self.peers[index])
	}

	/// Removes a peer and reindexes the ones enrolled after it.
	pub fn remove(&mut self, public_key: &PeerKey) -> Option<Peer> {
		let index = self.by_key.remove(public_key)?;
		let peer = self.peers.remove(index);
		for later in &self.peers[index..] {
			if let Some(slot) = self.by_key.get_mut(&later.public_key) {
				*slot -= 1;
			}
		}
		Some(peer)
	}

	pub fn get(&self, public_key: &PeerKey) -> Option<&Peer> {
		self.by_key.get(public_key).map(|&index| &self.peers[index])
	}

	pub fn contains(&self, public_key: &PeerKey) -> bool {
		self.by_key.contains_key(public_key)
	}

	pub fn size(&self) -> usize {
		self.peers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.peers.is_empty()
	}

	pub fn list(&self) -> &[Peer] {
		&self.peers
	}
}
