// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::error::{EnrollError, Result};
use crate::registry::Peer;
use crate::wgconf::{InterfaceStanza, PeerStanza, WgConfFile};

/// Where a file stood before an append, so the append can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
	pub previous_len: u64,
}

/// Owns the on-disk interface config file.
///
/// The file holds the interface private key, so it is created with mode 0600.
#[derive(Debug, Clone)]
pub struct InterfaceStateWriter {
	path: PathBuf,
}

impl InterfaceStateWriter {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn write_error(&self, source: std::io::Error) -> EnrollError {
		EnrollError::ConfigWrite {
			path: self.path.clone(),
			source,
		}
	}

	/// Replaces the file with the interface stanza followed by `peers`.
	///
	/// Written to a sibling temp file and renamed into place so a crash never
	/// leaves a truncated config behind.
	#[instrument(skip(self, interface, peers), fields(path = %self.path.display(), peers = peers.len()))]
	pub async fn write_initial(&self, interface: &InterfaceStanza, peers: &[Peer]) -> Result<()> {
		let conf = WgConfFile {
			interface: interface.clone(),
			peers: peers.iter().map(PeerStanza::from).collect(),
		};
		let content = conf.render();

		let mut tmp_name = self.path.as_os_str().to_owned();
		tmp_name.push(".tmp");
		let tmp = PathBuf::from(tmp_name);

		let result = async {
			let mut file = create_private(&tmp).await?;
			file.write_all(content.expose().as_bytes()).await?;
			file.sync_all().await?;
			fs::rename(&tmp, &self.path).await
		}
		.await;

		if let Err(e) = result {
			let _ = fs::remove_file(&tmp).await;
			return Err(self.write_error(e));
		}

		debug!("wrote interface config");
		Ok(())
	}

	/// Appends one `[Peer]` stanza and syncs it to disk. The file must already
	/// exist.
	#[instrument(skip(self, peer), fields(path = %self.path.display(), address = %peer.address))]
	pub async fn append_peer(&self, peer: &Peer) -> Result<AppendReceipt> {
		let mut file = OpenOptions::new()
			.append(true)
			.open(&self.path)
			.await
			.map_err(|e| self.write_error(e))?;
		let previous_len = file
			.metadata()
			.await
			.map_err(|e| self.write_error(e))?
			.len();
		let receipt = AppendReceipt { previous_len };

		let stanza = PeerStanza::from(peer).render();
		let written = async {
			file.write_all(stanza.as_bytes()).await?;
			file.sync_all().await
		}
		.await;

		if let Err(e) = written {
			drop(file);
			if let Err(revert) = self.revert(receipt).await {
				warn!(error = %revert, "could not remove partial peer stanza");
			}
			return Err(self.write_error(e));
		}

		Ok(receipt)
	}

	/// Truncates the file back to where it was before the append.
	#[instrument(skip(self), fields(path = %self.path.display()))]
	pub async fn revert(&self, receipt: AppendReceipt) -> Result<()> {
		let file = OpenOptions::new()
			.write(true)
			.open(&self.path)
			.await
			.map_err(|e| self.write_error(e))?;
		file.set_len(receipt.previous_len)
			.await
			.map_err(|e| self.write_error(e))?;
		file.sync_all().await.map_err(|e| self.write_error(e))?;
		debug!(len = receipt.previous_len, "reverted peer stanza");
		Ok(())
	}
}

async fn create_private(path: &Path) -> std::io::Result<File> {
	let mut options = OpenOptions::new();
	options.write(true).create(true).truncate(true);
	#[cfg(unix)]
	options.mode(0o600);
	options.open(path).await
}
