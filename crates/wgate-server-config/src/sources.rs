// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};
use wgate_common_secret::load_secret_env;

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuthConfigLayer, HttpConfigLayer, LoggingConfigLayer, TlsConfigLayer, WireguardConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/wgate/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `WG_GATEWAY_<FIELD>`. Secrets also accept `WG_GATEWAY_<FIELD>_FILE`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			tls: Some(load_tls_from_env()),
			auth: Some(load_auth_from_env()?),
			wireguard: Some(load_wireguard_from_env()?),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("WG_GATEWAY_HOST"),
		port: env_u16("WG_GATEWAY_PORT")?,
		request_timeout_secs: env_u64("WG_GATEWAY_REQUEST_TIMEOUT_SECS")?,
	})
}

fn load_tls_from_env() -> TlsConfigLayer {
	TlsConfigLayer {
		enabled: env_bool("WG_GATEWAY_TLS_ENABLED"),
		cert_path: env_var("WG_GATEWAY_TLS_CERT").map(PathBuf::from),
		key_path: env_var("WG_GATEWAY_TLS_KEY").map(PathBuf::from),
	}
}

fn load_auth_from_env() -> Result<AuthConfigLayer, ConfigError> {
	let password = load_secret_env("WG_GATEWAY_PASSWORD")
		.map_err(|e| ConfigError::Secret(e.to_string()))?;
	Ok(AuthConfigLayer {
		username: env_var("WG_GATEWAY_AUTH_USERNAME"),
		password,
	})
}

fn load_wireguard_from_env() -> Result<WireguardConfigLayer, ConfigError> {
	let private_key = load_secret_env("WG_GATEWAY_PRIVATE_KEY")
		.map_err(|e| ConfigError::Secret(e.to_string()))?;
	Ok(WireguardConfigLayer {
		interface: env_var("WG_GATEWAY_INTERFACE"),
		config_dir: env_var("WG_GATEWAY_CONFIG_DIR").map(PathBuf::from),
		address: env_var("WG_GATEWAY_ADDRESS"),
		listen_port: env_u16("WG_GATEWAY_LISTEN_PORT")?,
		endpoint: env_var("WG_GATEWAY_ENDPOINT"),
		persistent_keepalive: env_u16("WG_GATEWAY_KEEPALIVE_SECS")?,
		tool_timeout_secs: env_u64("WG_GATEWAY_TOOL_TIMEOUT_SECS")?,
		resume: env_bool("WG_GATEWAY_RESUME"),
		private_key,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("WG_GATEWAY_LOG_LEVEL"),
		json: env_bool("WG_GATEWAY_LOG_JSON"),
	}
}
