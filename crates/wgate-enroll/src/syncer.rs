// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::error::{EnrollError, Result};
use crate::registry::Peer;
use crate::tool::{ToolError, WgTool};

/// Pushes state into the live interface through a [`WgTool`].
///
/// Every call is bounded by `timeout` so a hung tool cannot hold the
/// enrollment lock indefinitely.
#[derive(Clone)]
pub struct KernelSyncer {
	tool: Arc<dyn WgTool>,
	interface: String,
	config_path: PathBuf,
	timeout: Duration,
}

impl KernelSyncer {
	pub fn new(
		tool: Arc<dyn WgTool>,
		interface: impl Into<String>,
		config_path: impl Into<PathBuf>,
		timeout: Duration,
	) -> Self {
		Self {
			tool,
			interface: interface.into(),
			config_path: config_path.into(),
			timeout,
		}
	}

	pub fn interface(&self) -> &str {
		&self.interface
	}

	pub fn config_path(&self) -> &Path {
		&self.config_path
	}

	#[instrument(skip(self), fields(interface = %self.interface))]
	pub async fn bring_up(&self) -> Result<()> {
		bounded(
			"wg-quick",
			self.timeout,
			self.tool.bring_up(&self.interface, &self.config_path),
		)
		.await
		.map_err(|source| EnrollError::InterfaceBringUp {
			interface: self.interface.clone(),
			source,
		})?;
		info!(config = %self.config_path.display(), "interface is up");
		Ok(())
	}

	#[instrument(skip(self, peer), fields(interface = %self.interface, peer = %peer.public_key.prefix(), address = %peer.address))]
	pub async fn add_peer(&self, peer: &Peer) -> Result<()> {
		bounded("wg", self.timeout, self.tool.add_peer(&self.interface, peer))
			.await
			.map_err(|source| EnrollError::KernelSync {
				interface: self.interface.clone(),
				source,
			})
	}
}

pub(crate) async fn bounded<T>(
	program: &str,
	timeout: Duration,
	call: impl Future<Output = std::result::Result<T, ToolError>>,
) -> std::result::Result<T, ToolError> {
	tokio::time::timeout(timeout, call)
		.await
		.map_err(|_| ToolError::TimedOut {
			program: program.to_string(),
			timeout,
		})?
}
