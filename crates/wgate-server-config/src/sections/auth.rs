// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP Basic credentials for the enrollment endpoint.

use serde::Deserialize;
use wgate_common_secret::SecretString;

use crate::error::ConfigError;

const DEFAULT_USERNAME: &str = "wireguard";

#[derive(Debug, Clone)]
pub struct AuthConfig {
	pub username: String,
	pub password: SecretString,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<SecretString>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
	}

	pub fn finalize(self) -> Result<AuthConfig, ConfigError> {
		let password = self
			.password
			.filter(|p| !p.is_empty())
			.ok_or_else(|| {
				ConfigError::Validation(
					"an enrollment password is required: set WG_GATEWAY_PASSWORD or \
					 WG_GATEWAY_PASSWORD_FILE"
						.to_string(),
				)
			})?;

		let username = self
			.username
			.unwrap_or_else(|| DEFAULT_USERNAME.to_string());
		if username.is_empty() || username.contains(':') {
			return Err(ConfigError::InvalidValue {
				key: "auth.username".to_string(),
				message: "must be non-empty and must not contain ':'".to_string(),
			});
		}

		Ok(AuthConfig { username, password })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wgate_common_secret::Secret;

	#[test]
	fn test_password_is_required() {
		let err = AuthConfigLayer::default().finalize().unwrap_err();
		assert!(err.to_string().contains("WG_GATEWAY_PASSWORD"));

		let err = AuthConfigLayer {
			password: Some(Secret::new(String::new())),
			..Default::default()
		}
		.finalize()
		.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_default_username() {
		let config = AuthConfigLayer {
			password: Some(Secret::new("hunter2".to_string())),
			..Default::default()
		}
		.finalize()
		.unwrap();
		assert_eq!(config.username, "wireguard");
		assert_eq!(config.password.expose(), "hunter2");
	}

	#[test]
	fn test_colon_in_username_rejected() {
		let err = AuthConfigLayer {
			username: Some("wire:guard".to_string()),
			password: Some(Secret::new("hunter2".to_string())),
		}
		.finalize()
		.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}

	#[test]
	fn test_password_not_in_debug() {
		let layer: AuthConfigLayer = toml::from_str("password = \"hunter2\"").unwrap();
		assert!(!format!("{layer:?}").contains("hunter2"));
		assert_eq!(layer.password.unwrap().expose(), "hunter2");
	}
}
