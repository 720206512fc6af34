// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The managed WireGuard interface.

use std::path::PathBuf;
use std::time::Duration;

use ipnet::Ipv4Net;
use serde::Deserialize;
use wgate_common_secret::SecretString;

use crate::error::ConfigError;

const DEFAULT_INTERFACE: &str = "wg0";
const DEFAULT_CONFIG_DIR: &str = "/etc/wireguard";
const DEFAULT_ADDRESS: &str = "10.0.0.1/8";
const DEFAULT_LISTEN_PORT: u16 = 51820;
const DEFAULT_KEEPALIVE_SECS: u16 = 25;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 5;

/// Linux caps interface names at 15 bytes (IFNAMSIZ - 1).
const MAX_INTERFACE_NAME: usize = 15;

#[derive(Debug, Clone)]
pub struct WireguardConfig {
	pub interface: String,
	pub config_dir: PathBuf,
	pub address: Ipv4Net,
	pub listen_port: u16,
	/// Host name or address clients dial.
	pub endpoint: String,
	pub persistent_keepalive: u16,
	pub tool_timeout_secs: u64,
	pub resume: bool,
	pub private_key: Option<SecretString>,
}

impl WireguardConfig {
	pub fn config_path(&self) -> PathBuf {
		self.config_dir.join(format!("{}.conf", self.interface))
	}

	pub fn tool_timeout(&self) -> Duration {
		Duration::from_secs(self.tool_timeout_secs)
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireguardConfigLayer {
	#[serde(default)]
	pub interface: Option<String>,
	#[serde(default)]
	pub config_dir: Option<PathBuf>,
	#[serde(default)]
	pub address: Option<String>,
	#[serde(default)]
	pub listen_port: Option<u16>,
	#[serde(default)]
	pub endpoint: Option<String>,
	#[serde(default)]
	pub persistent_keepalive: Option<u16>,
	#[serde(default)]
	pub tool_timeout_secs: Option<u64>,
	#[serde(default)]
	pub resume: Option<bool>,
	#[serde(default)]
	pub private_key: Option<SecretString>,
}

impl WireguardConfigLayer {
	pub fn merge(&mut self, other: WireguardConfigLayer) {
		if other.interface.is_some() {
			self.interface = other.interface;
		}
		if other.config_dir.is_some() {
			self.config_dir = other.config_dir;
		}
		if other.address.is_some() {
			self.address = other.address;
		}
		if other.listen_port.is_some() {
			self.listen_port = other.listen_port;
		}
		if other.endpoint.is_some() {
			self.endpoint = other.endpoint;
		}
		if other.persistent_keepalive.is_some() {
			self.persistent_keepalive = other.persistent_keepalive;
		}
		if other.tool_timeout_secs.is_some() {
			self.tool_timeout_secs = other.tool_timeout_secs;
		}
		if other.resume.is_some() {
			self.resume = other.resume;
		}
		if other.private_key.is_some() {
			self.private_key = other.private_key;
		}
	}

	pub fn finalize(self) -> Result<WireguardConfig, ConfigError> {
		let endpoint = self
			.endpoint
			.map(|e| e.trim().to_string())
			.filter(|e| !e.is_empty())
			.ok_or_else(|| {
				ConfigError::Validation(
					"an external endpoint host is required: set WG_GATEWAY_ENDPOINT".to_string(),
				)
			})?;

		let interface = self
			.interface
			.unwrap_or_else(|| DEFAULT_INTERFACE.to_string());
		validate_interface_name(&interface)?;

		let raw_address = self
			.address
			.unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
		let address: Ipv4Net = raw_address
			.trim()
			.parse()
			.map_err(|e| ConfigError::InvalidValue {
				key: "wireguard.address".to_string(),
				message: format!("'{raw_address}' is not an IPv4 CIDR: {e}"),
			})?;
		if address.prefix_len() > 30 {
			return Err(ConfigError::InvalidValue {
				key: "wireguard.address".to_string(),
				message: format!("/{} leaves no room for peers", address.prefix_len()),
			});
		}
		if address.addr() == address.network() || address.addr() == address.broadcast() {
			return Err(ConfigError::InvalidValue {
				key: "wireguard.address".to_string(),
				message: format!("{address} is not a host address"),
			});
		}

		Ok(WireguardConfig {
			interface,
			config_dir: self
				.config_dir
				.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
			address,
			listen_port: self.listen_port.unwrap_or(DEFAULT_LISTEN_PORT),
			endpoint,
			persistent_keepalive: self.persistent_keepalive.unwrap_or(DEFAULT_KEEPALIVE_SECS),
			tool_timeout_secs: self.tool_timeout_secs.unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
			resume: self.resume.unwrap_or(true),
			private_key: self.private_key.filter(|k| !k.is_empty()),
		})
	}
}

fn validate_interface_name(name: &str) -> Result<(), ConfigError> {
	let valid_chars = name
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '=' | '+' | '.' | '-'));
	if name.is_empty() || name.len() > MAX_INTERFACE_NAME || !valid_chars || name.starts_with('.') {
		return Err(ConfigError::InvalidValue {
			key: "wireguard.interface".to_string(),
			message: format!("'{name}' is not a valid interface name"),
		});
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn with_endpoint() -> WireguardConfigLayer {
		WireguardConfigLayer {
			endpoint: Some("vpn.example.com".to_string()),
			..Default::default()
		}
	}

	#[test]
	fn test_defaults() {
		let config = with_endpoint().finalize().unwrap();
		assert_eq!(config.interface, "wg0");
		assert_eq!(config.config_path(), PathBuf::from("/etc/wireguard/wg0.conf"));
		assert_eq!(config.address, "10.0.0.1/8".parse::<Ipv4Net>().unwrap());
		assert_eq!(config.listen_port, 51820);
		assert_eq!(config.persistent_keepalive, 25);
		assert_eq!(config.tool_timeout(), Duration::from_secs(5));
		assert!(config.resume);
		assert!(config.private_key.is_none());
	}

	#[test]
	fn test_endpoint_is_required() {
		let err = WireguardConfigLayer::default().finalize().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
		assert!(err.to_string().contains("WG_GATEWAY_ENDPOINT"));

		let blank = WireguardConfigLayer {
			endpoint: Some("   ".to_string()),
			..Default::default()
		};
		assert!(blank.finalize().is_err());
	}

	#[test]
	fn test_address_must_be_ipv4_cidr() {
		for bad in ["10.0.0.1", "fd00::1/64", "10.0.0.1/31", "10.0.0.0/24", "nonsense"] {
			let layer = WireguardConfigLayer {
				address: Some(bad.to_string()),
				..with_endpoint()
			};
			let err = layer.finalize().unwrap_err();
			assert!(
				matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "wireguard.address"),
				"{bad}: {err}"
			);
		}
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = with_endpoint();
		base.merge(WireguardConfigLayer {
			interface: Some("wg1".to_string()),
			resume: Some(false),
			..Default::default()
		});
		let config = base.finalize().unwrap();
		assert_eq!(config.interface, "wg1");
		assert_eq!(config.endpoint, "vpn.example.com");
		assert!(!config.resume);
	}

	#[test]
	fn test_deserialize_layer() {
		let layer: WireguardConfigLayer = toml::from_str(
			r#"
interface = "wg7"
address = "172.16.0.1/16"
endpoint = "gw.example.net"
resume = false
"#,
		)
		.unwrap();
		let config = layer.finalize().unwrap();
		assert_eq!(config.interface, "wg7");
		assert_eq!(config.address.prefix_len(), 16);
		assert!(!config.resume);
	}

	proptest! {
		#[test]
		fn interface_names_are_bounded(name in "[a-z0-9_.-]{0,24}") {
			let ok = validate_interface_name(&name).is_ok();
			let expected = !name.is_empty() && name.len() <= 15 && !name.starts_with('.');
			prop_assert_eq!(ok, expected);
		}
	}
}
