// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! TLS termination.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
	pub enabled: bool,
	pub cert_path: PathBuf,
	pub key_path: PathBuf,
}

impl Default for TlsConfig {
	fn default() -> Self {
		TlsConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub cert_path: Option<PathBuf>,
	#[serde(default)]
	pub key_path: Option<PathBuf>,
}

impl TlsConfigLayer {
	pub fn merge(&mut self, other: TlsConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.cert_path.is_some() {
			self.cert_path = other.cert_path;
		}
		if other.key_path.is_some() {
			self.key_path = other.key_path;
		}
	}

	pub fn finalize(self) -> TlsConfig {
		TlsConfig {
			enabled: self.enabled.unwrap_or(true),
			cert_path: self.cert_path.unwrap_or_else(|| PathBuf::from("server.crt")),
			key_path: self.key_path.unwrap_or_else(|| PathBuf::from("server.key")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_expect_cert_in_working_directory() {
		let config = TlsConfig::default();
		assert!(config.enabled);
		assert_eq!(config.cert_path, PathBuf::from("server.crt"));
		assert_eq!(config.key_path, PathBuf::from("server.key"));
	}

	#[test]
	fn test_deserialize_partial() {
		let layer: TlsConfigLayer = toml::from_str("enabled = false").unwrap();
		assert_eq!(layer.enabled, Some(false));
		assert!(layer.cert_path.is_none());
	}
}
