// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::keys::{WgKeyPair, WgPrivateKey, WgPublicKey};
use crate::registry::Peer;

#[derive(Debug, Error)]
pub enum ToolError {
	#[error("{program} not found in PATH")]
	NotInstalled { program: String },

	#[error("failed to run {program}: {source}")]
	Io {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("{program} failed: {diagnostic}")]
	Failed { program: String, diagnostic: String },

	#[error("{program} did not finish within {timeout:?}")]
	TimedOut { program: String, timeout: Duration },

	#[error("{program} produced unexpected output: {message}")]
	InvalidOutput { program: String, message: String },
}

/// The external WireGuard control surface.
#[async_trait]
pub trait WgTool: Send + Sync {
	async fn generate_key_pair(&self) -> Result<WgKeyPair, ToolError>;

	/// Tears down any existing interface of this name and brings it up again
	/// from `config_path`.
	async fn bring_up(&self, interface: &str, config_path: &Path) -> Result<(), ToolError>;

	/// Adds `peer` to the running interface with its address as the only
	/// allowed-IPs range.
	async fn add_peer(&self, interface: &str, peer: &Peer) -> Result<(), ToolError>;
}

/// [`WgTool`] backed by `wg`, `wg-quick` and `ip`.
///
/// Arguments are passed straight to the binaries, never through a shell, so a
/// peer key cannot inject commands. Children are killed when the calling
/// future is dropped; callers bound each call with a timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandWgTool;

impl CommandWgTool {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl WgTool for CommandWgTool {
	async fn generate_key_pair(&self) -> Result<WgKeyPair, ToolError> {
		let private_b64 = run_tool("wg", &["genkey"], None).await?;
		let private =
			WgPrivateKey::from_base64(&private_b64).map_err(|e| ToolError::InvalidOutput {
				program: "wg genkey".to_string(),
				message: e.to_string(),
			})?;

		let public_b64 = run_tool(
			"wg",
			&["pubkey"],
			Some(format!("{private_b64}\n").as_bytes()),
		)
		.await?;
		let public = WgPublicKey::from_base64(&public_b64).map_err(|e| ToolError::InvalidOutput {
			program: "wg pubkey".to_string(),
			message: e.to_string(),
		})?;

		let pair = WgKeyPair::from_private_key(private);
		if pair.public_key() != &public {
			return Err(ToolError::InvalidOutput {
				program: "wg pubkey".to_string(),
				message: "public key does not match the generated private key".to_string(),
			});
		}
		Ok(pair)
	}

	async fn bring_up(&self, interface: &str, config_path: &Path) -> Result<(), ToolError> {
		match run_tool("ip", &["link", "del", interface], None).await {
			Ok(_) => debug!(interface, "removed existing interface"),
			Err(ToolError::Failed { diagnostic, .. }) => {
				trace!(interface, %diagnostic, "no existing interface to remove")
			}
			Err(e) => return Err(e),
		}

		let config = config_path.to_string_lossy();
		run_tool("wg-quick", &["up", &config], None).await?;
		Ok(())
	}

	async fn add_peer(&self, interface: &str, peer: &Peer) -> Result<(), ToolError> {
		let allowed_ips = format!("{}/32", peer.address);
		run_tool(
			"wg",
			&[
				"set",
				interface,
				"peer",
				peer.public_key.as_str(),
				"allowed-ips",
				&allowed_ips,
			],
			None,
		)
		.await?;
		Ok(())
	}
}

/// Runs a tool and returns its trimmed stdout on success.
async fn run_tool(
	program: &str,
	args: &[&str],
	stdin: Option<&[u8]>,
) -> Result<String, ToolError> {
	trace!(cmd = %format!("{} {}", program, args.join(" ")), "running tool");

	let mut cmd = Command::new(program);
	cmd.args(args)
		.stdin(if stdin.is_some() {
			Stdio::piped()
		} else {
			Stdio::null()
		})
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);

	let spawn_error = |e: std::io::Error| {
		if e.kind() == std::io::ErrorKind::NotFound {
			warn!(program, "tool not found in PATH");
			ToolError::NotInstalled {
				program: program.to_string(),
			}
		} else {
			ToolError::Io {
				program: program.to_string(),
				source: e,
			}
		}
	};

	let mut child = cmd.spawn().map_err(spawn_error)?;
	if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
		pipe.write_all(input).await.map_err(|e| ToolError::Io {
			program: program.to_string(),
			source: e,
		})?;
	}
	let output = child.wait_with_output().await.map_err(|e| ToolError::Io {
		program: program.to_string(),
		source: e,
	})?;

	if output.status.success() {
		return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
	}

	let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
	let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
	let diagnostic = if !stderr.is_empty() {
		stderr
	} else if !stdout.is_empty() {
		stdout
	} else {
		output.status.to_string()
	};

	Err(ToolError::Failed {
		program: program.to_string(),
		diagnostic,
	})
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;

	#[tokio::test]
	async fn missing_binary_is_reported_as_not_installed() {
		let err = run_tool(
			"wgate-definitely-not-installed",
			&[],
			None,
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ToolError::NotInstalled { .. }));
	}

	#[tokio::test]
	async fn stderr_becomes_the_diagnostic() {
		let err = run_tool(
			"sh",
			&["-c", "echo 'Unable to modify interface' >&2; exit 1"],
			None,
		)
		.await
		.unwrap_err();
		match err {
			ToolError::Failed { diagnostic, .. } => {
				assert_eq!(diagnostic, "Unable to modify interface")
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn falls_back_to_stdout_then_status() {
		let err = run_tool("sh", &["-c", "echo from-stdout; exit 3"], None)
			.await
			.unwrap_err();
		assert!(err.to_string().contains("from-stdout"));

		let err = run_tool("sh", &["-c", "exit 4"], None)
			.await
			.unwrap_err();
		assert!(err.to_string().contains('4'));
	}

	#[tokio::test]
	async fn stdin_is_forwarded() {
		let out = run_tool("cat", &[], Some(b"abc\n"))
			.await
			.unwrap();
		assert_eq!(out, "abc");
	}
}
