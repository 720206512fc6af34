// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the WireGuard enrollment gateway.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`WG_GATEWAY_*`)
//!
//! # Usage
//!
//! ```ignore
//! use wgate_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("enrolling peers on {}", config.wireguard.interface);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub tls: TlsConfig,
	pub auth: AuthConfig,
	pub wireguard: WireguardConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		self.http.socket_addr()
	}

	/// Emit the resolved settings at info level. Secrets are reported only as
	/// present or absent.
	pub fn log_summary(&self) {
		info!(
			listen = %self.socket_addr(),
			tls = self.tls.enabled,
			interface = %self.wireguard.interface,
			address = %self.wireguard.address,
			listen_port = self.wireguard.listen_port,
			endpoint = %self.wireguard.endpoint,
			resume = self.wireguard.resume,
			private_key_configured = self.wireguard.private_key.is_some(),
			"Server configuration loaded"
		);
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`WG_GATEWAY_*`)
/// 2. Config file (`/etc/wgate/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let tls = layer.tls.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let auth = layer.auth.unwrap_or_default().finalize()?;
	let wireguard = layer.wireguard.unwrap_or_default().finalize()?;

	let config = ServerConfig {
		http,
		tls,
		auth,
		wireguard,
		logging,
	};
	validate_config(&config)?;
	debug!("configuration validated");

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	let nonzero = [
		("http.port", u64::from(config.http.port)),
		("http.request_timeout_secs", config.http.request_timeout_secs),
		("wireguard.listen_port", u64::from(config.wireguard.listen_port)),
		("wireguard.tool_timeout_secs", config.wireguard.tool_timeout_secs),
	];
	for (key, value) in nonzero {
		if value == 0 {
			return Err(ConfigError::InvalidValue {
				key: key.to_string(),
				message: "must be greater than zero".to_string(),
			});
		}
	}

	if config.wireguard.tool_timeout_secs >= config.http.request_timeout_secs {
		return Err(ConfigError::Validation(format!(
			"wireguard.tool_timeout_secs ({}) must be shorter than http.request_timeout_secs ({}) \
			 so a stuck tool is reported before the request is abandoned",
			config.wireguard.tool_timeout_secs, config.http.request_timeout_secs
		)));
	}

	if config.tls.enabled
		&& (config.tls.cert_path.as_os_str().is_empty() || config.tls.key_path.as_os_str().is_empty())
	{
		return Err(ConfigError::Validation(
			"TLS is enabled but the certificate or key path is empty".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use wgate_common_secret::Secret;

	fn minimal_layer() -> ServerConfigLayer {
		ServerConfigLayer {
			auth: Some(AuthConfigLayer {
				password: Some(Secret::new("hunter2".to_string())),
				..Default::default()
			}),
			wireguard: Some(WireguardConfigLayer {
				endpoint: Some("vpn.example.com".to_string()),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_default_values() {
		let config = finalize(minimal_layer()).unwrap();
		assert_eq!(config.socket_addr(), "[::]:443");
		assert!(config.tls.enabled);
		assert_eq!(config.auth.username, "wireguard");
		assert_eq!(config.wireguard.interface, "wg0");
		assert_eq!(config.wireguard.listen_port, 51820);
		assert_eq!(config.logging.level, "info");
	}

	#[derive(Clone, Default)]
	struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

	impl Write for Captured {
		fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
			self.0.lock().unwrap().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> std::io::Result<()> {
			Ok(())
		}
	}

	impl Captured {
		fn text(&self) -> String {
			String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
		}
	}

	#[test]
	fn test_summary_reaches_the_active_subscriber() {
		let mut layer = minimal_layer();
		layer.wireguard.as_mut().unwrap().private_key =
			Some(Secret::new("c2VjcmV0LWtleS1tYXRlcmlhbA==".to_string()));
		let config = finalize(layer).unwrap();

		let captured = Captured::default();
		let writer = captured.clone();
		let subscriber = tracing_subscriber::fmt()
			.with_ansi(false)
			.with_writer(move || writer.clone())
			.finish();
		tracing::subscriber::with_default(subscriber, || config.log_summary());

		let output = captured.text();
		assert!(output.contains("Server configuration loaded"));
		assert!(output.contains("vpn.example.com"));
		assert!(output.contains("private_key_configured=true"));
		assert!(!output.contains("hunter2"));
		assert!(!output.contains("c2VjcmV0LWtleS1tYXRlcmlhbA=="));
	}

	#[test]
	fn test_finalize_leaves_the_summary_to_the_caller() {
		let captured = Captured::default();
		let writer = captured.clone();
		let subscriber = tracing_subscriber::fmt()
			.with_ansi(false)
			.with_writer(move || writer.clone())
			.finish();
		tracing::subscriber::with_default(subscriber, || finalize(minimal_layer()).unwrap());

		assert!(!captured.text().contains("Server configuration loaded"));
	}

	#[test]
	fn test_missing_endpoint_fails() {
		let mut layer = minimal_layer();
		layer.wireguard = None;
		let err = finalize(layer).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_missing_password_fails() {
		let mut layer = minimal_layer();
		layer.auth = None;
		let err = finalize(layer).unwrap_err();
		assert!(err.to_string().contains("password"));
	}

	#[test]
	fn test_zero_port_rejected() {
		let mut layer = minimal_layer();
		layer.merge(ServerConfigLayer {
			wireguard: Some(WireguardConfigLayer {
				listen_port: Some(0),
				..Default::default()
			}),
			..Default::default()
		});
		let err = finalize(layer).unwrap_err();
		assert!(err.to_string().contains("wireguard.listen_port"));
	}

	#[test]
	fn test_tool_timeout_must_undercut_request_timeout() {
		let mut layer = minimal_layer();
		layer.merge(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				request_timeout_secs: Some(5),
				..Default::default()
			}),
			..Default::default()
		});
		let err = finalize(layer).unwrap_err();
		assert!(err.to_string().contains("tool_timeout_secs"));
	}

	#[test]
	fn test_load_config_with_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[http]
host = "127.0.0.1"
port = 8443

[tls]
enabled = false

[auth]
username = "ops"
password = "correct horse"

[wireguard]
interface = "wg9"
address = "172.16.0.1/16"
endpoint = "gw.example.net"
"#
		)
		.unwrap();

		let config = load_config_with_file(file.path()).unwrap();
		if std::env::var_os("WG_GATEWAY_PORT").is_none() {
			assert_eq!(config.socket_addr(), "127.0.0.1:8443");
		}
		if std::env::var_os("WG_GATEWAY_INTERFACE").is_none() {
			assert_eq!(config.wireguard.interface, "wg9");
			assert_eq!(
				config.wireguard.config_path(),
				std::path::PathBuf::from("/etc/wireguard/wg9.conf")
			);
		}
	}
}
