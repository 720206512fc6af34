// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`WgTool`] for tests.
//!
//! [`FakeWgTool`] behaves like a tiny kernel: `bring_up` reads the config file
//! and replaces the interface's peer table with its `[Peer]` stanzas,
//! `add_peer` inserts into that table. Failures and latency can be injected.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::keys::WgKeyPair;
use crate::registry::Peer;
use crate::tool::{ToolError, WgTool};
use crate::wgconf::WgConfFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
	GenerateKeyPair,
	BringUp {
		interface: String,
		config_path: PathBuf,
	},
	AddPeer {
		interface: String,
		public_key: String,
		address: Ipv4Addr,
	},
}

#[derive(Default)]
struct State {
	calls: Vec<ToolCall>,
	up: BTreeSet<String>,
	bring_ups: BTreeMap<String, usize>,
	kernel_peers: BTreeMap<String, Vec<(String, Ipv4Addr)>>,
	key_pair: Option<WgKeyPair>,
	fail_generate: Option<String>,
	fail_bring_up: Option<String>,
	fail_add_peer: Option<String>,
	delay: Option<Duration>,
}

#[derive(Default)]
pub struct FakeWgTool {
	state: Mutex<State>,
}

impl FakeWgTool {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes `generate_key_pair` return this pair instead of a random one.
	pub fn with_key_pair(self, pair: WgKeyPair) -> Self {
		self.state().key_pair = Some(pair);
		self
	}

	fn state(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn fail_generate_key_pair(&self, diagnostic: &str) {
		self.state().fail_generate = Some(diagnostic.to_string());
	}

	pub fn fail_bring_up(&self, diagnostic: &str) {
		self.state().fail_bring_up = Some(diagnostic.to_string());
	}

	pub fn fail_add_peer(&self, diagnostic: &str) {
		self.state().fail_add_peer = Some(diagnostic.to_string());
	}

	pub fn clear_failures(&self) {
		let mut state = self.state();
		state.fail_generate = None;
		state.fail_bring_up = None;
		state.fail_add_peer = None;
	}

	/// Every call sleeps this long before taking effect.
	pub fn set_delay(&self, delay: Duration) {
		self.state().delay = Some(delay);
	}

	pub fn clear_delay(&self) {
		self.state().delay = None;
	}

	pub fn calls(&self) -> Vec<ToolCall> {
		self.state().calls.clone()
	}

	pub fn add_peer_count(&self) -> usize {
		self.state()
			.calls
			.iter()
			.filter(|c| matches!(c, ToolCall::AddPeer { .. }))
			.count()
	}

	pub fn interfaces_up(&self) -> Vec<String> {
		self.state().up.iter().cloned().collect()
	}

	pub fn bring_up_count(&self, interface: &str) -> usize {
		self.state().bring_ups.get(interface).copied().unwrap_or(0)
	}

	/// Peers currently in the interface's table, in insertion order.
	pub fn kernel_peers(&self, interface: &str) -> Vec<(String, Ipv4Addr)> {
		self.state()
			.kernel_peers
			.get(interface)
			.cloned()
			.unwrap_or_default()
	}

	fn record(&self, call: ToolCall) -> Option<Duration> {
		let mut state = self.state();
		state.calls.push(call);
		state.delay
	}

	async fn pause(delay: Option<Duration>) {
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
	}
}

fn failed(program: &str, diagnostic: String) -> ToolError {
	ToolError::Failed {
		program: program.to_string(),
		diagnostic,
	}
}

#[async_trait]
impl WgTool for FakeWgTool {
	async fn generate_key_pair(&self) -> Result<WgKeyPair, ToolError> {
		let delay = self.record(ToolCall::GenerateKeyPair);
		Self::pause(delay).await;

		let state = self.state();
		if let Some(diagnostic) = state.fail_generate.clone() {
			return Err(failed("wg", diagnostic));
		}
		Ok(state.key_pair.clone().unwrap_or_else(WgKeyPair::generate))
	}

	async fn bring_up(&self, interface: &str, config_path: &Path) -> Result<(), ToolError> {
		let delay = self.record(ToolCall::BringUp {
			interface: interface.to_string(),
			config_path: config_path.to_path_buf(),
		});
		Self::pause(delay).await;

		let mut state = self.state();
		state.up.remove(interface);
		state.kernel_peers.remove(interface);

		if let Some(diagnostic) = state.fail_bring_up.clone() {
			return Err(failed("wg-quick", diagnostic));
		}

		let text = std::fs::read_to_string(config_path).map_err(|e| {
			failed(
				"wg-quick",
				format!("`{}' does not exist: {e}", config_path.display()),
			)
		})?;
		let conf = WgConfFile::parse(&text).map_err(|e| failed("wg-quick", e.to_string()))?;

		let peers = conf
			.peers
			.iter()
			.map(|p| (p.public_key.clone(), p.allowed_ip))
			.collect();
		state.kernel_peers.insert(interface.to_string(), peers);
		state.up.insert(interface.to_string());
		*state.bring_ups.entry(interface.to_string()).or_default() += 1;
		Ok(())
	}

	async fn add_peer(&self, interface: &str, peer: &Peer) -> Result<(), ToolError> {
		let delay = self.record(ToolCall::AddPeer {
			interface: interface.to_string(),
			public_key: peer.public_key.as_str().to_string(),
			address: peer.address,
		});
		Self::pause(delay).await;

		let mut state = self.state();
		if let Some(diagnostic) = state.fail_add_peer.clone() {
			return Err(failed("wg", diagnostic));
		}
		if !state.up.contains(interface) {
			return Err(failed(
				"wg",
				"Unable to access interface: No such device".to_string(),
			));
		}

		let table = state.kernel_peers.entry(interface.to_string()).or_default();
		table.retain(|(key, _)| key != peer.public_key.as_str());
		table.push((peer.public_key.as_str().to_string(), peer.address));
		Ok(())
	}
}
