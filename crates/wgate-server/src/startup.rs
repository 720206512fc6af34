// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turns resolved configuration into a running coordinator.

use std::sync::Arc;

use tracing::info;
use wgate_enroll::{bootstrap, BootstrapOptions, EnrollError, KeyError, WgPrivateKey, WgTool};
use wgate_server_config::{ServerConfig, WireguardConfig};

use crate::auth::BasicAuth;
use crate::AppState;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
	#[error("invalid wireguard private key: {0}")]
	PrivateKey(#[from] KeyError),

	#[error("bootstrap failed: {0}")]
	Bootstrap(#[from] EnrollError),
}

pub fn bootstrap_options(config: &WireguardConfig) -> Result<BootstrapOptions, StartupError> {
	let private_key = config
		.private_key
		.as_ref()
		.map(|key| WgPrivateKey::from_base64(key.expose()))
		.transpose()?;

	Ok(BootstrapOptions {
		interface: config.interface.clone(),
		config_dir: config.config_dir.clone(),
		address: config.address,
		listen_port: config.listen_port,
		endpoint_host: config.endpoint.clone(),
		persistent_keepalive: config.persistent_keepalive,
		tool_timeout: config.tool_timeout(),
		resume: config.resume,
		private_key,
	})
}

/// Bootstraps the interface and wraps the coordinator in handler state. Nothing
/// is served if this fails.
pub async fn build_state(
	config: &ServerConfig,
	tool: Arc<dyn WgTool>,
) -> Result<AppState, StartupError> {
	let options = bootstrap_options(&config.wireguard)?;
	let coordinator = bootstrap(options, tool).await?;
	info!(
		interface = %coordinator.interface(),
		public_key = %coordinator.identity().public_key,
		endpoint = %coordinator.identity().endpoint,
		"interface ready for enrollment"
	);

	Ok(AppState::new(
		Arc::new(coordinator),
		BasicAuth::new(config.auth.username.clone(), config.auth.password.clone()),
		config.http.request_timeout(),
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;
	use wgate_common_secret::Secret;
	use wgate_enroll::testing::FakeWgTool;
	use wgate_server_config::{finalize, AuthConfigLayer, ServerConfigLayer, WireguardConfigLayer};

	fn config(dir: &TempDir, private_key: Option<&str>) -> ServerConfig {
		finalize(ServerConfigLayer {
			auth: Some(AuthConfigLayer {
				password: Some(Secret::new("hunter2".to_string())),
				..Default::default()
			}),
			wireguard: Some(WireguardConfigLayer {
				endpoint: Some("vpn.example.com".to_string()),
				config_dir: Some(dir.path().to_path_buf()),
				private_key: private_key.map(|k| Secret::new(k.to_string())),
				..Default::default()
			}),
			..Default::default()
		})
		.unwrap()
	}

	#[test]
	fn options_mirror_the_wireguard_section() {
		let dir = TempDir::new().unwrap();
		let options = bootstrap_options(&config(&dir, None).wireguard).unwrap();
		assert_eq!(options.interface, "wg0");
		assert_eq!(options.config_path(), dir.path().join("wg0.conf"));
		assert_eq!(options.endpoint_host, "vpn.example.com");
		assert!(options.private_key.is_none());
	}

	#[test]
	fn bad_private_key_is_rejected() {
		let dir = TempDir::new().unwrap();
		let err = bootstrap_options(&config(&dir, Some("not-a-key")).wireguard).unwrap_err();
		assert!(matches!(err, StartupError::PrivateKey(_)));
	}

	#[tokio::test]
	async fn build_state_brings_the_interface_up() {
		let dir = TempDir::new().unwrap();
		let tool = Arc::new(FakeWgTool::new());
		let state = build_state(
			&config(&dir, Some("dwdtCnMYpX08FsFyUbJmRd9ML4frwJkqsXf7pR25LCo=")),
			tool.clone(),
		)
		.await
		.unwrap();

		assert_eq!(tool.interfaces_up(), vec!["wg0".to_string()]);
		assert_eq!(
			state.coordinator.identity().public_key.to_base64(),
			"hSDwCYkwp1R0i33ctD73Wg2/Og0mOBr066SpjqqbTmo="
		);
		assert_eq!(state.auth.username(), "wireguard");
	}

	#[tokio::test]
	async fn bring_up_failure_stops_startup() {
		let dir = TempDir::new().unwrap();
		let tool = Arc::new(FakeWgTool::new());
		tool.fail_bring_up("RTNETLINK answers: Operation not permitted");

		let err = build_state(&config(&dir, None), tool).await.err().unwrap();
		assert!(matches!(err, StartupError::Bootstrap(_)));
	}
}
