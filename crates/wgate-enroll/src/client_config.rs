// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

use crate::keys::WgPublicKey;

/// Stands in for the client's private key. The client generates its own key
/// pair, submits the public half and substitutes the private half here.
pub const CLIENT_PRIVATE_KEY_PLACEHOLDER: &str = "<client-private-key>";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientConfigError {
	#[error("missing {0}")]
	Missing(&'static str),

	#[error("invalid {field}: {value:?}")]
	Invalid { field: &'static str, value: String },
}

/// `host:port` as the client dials it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
	pub host: String,
	pub port: u16,
}

impl Endpoint {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			port,
		}
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.host.parse::<Ipv6Addr>().is_ok() {
			write!(f, "[{}]:{}", self.host, self.port)
		} else {
			write!(f, "{}:{}", self.host, self.port)
		}
	}
}

impl FromStr for Endpoint {
	type Err = ClientConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || ClientConfigError::Invalid {
			field: "Endpoint",
			value: s.to_string(),
		};
		let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
		let host = host
			.strip_prefix('[')
			.and_then(|h| h.strip_suffix(']'))
			.unwrap_or(host);
		if host.is_empty() {
			return Err(invalid());
		}
		let port = port.parse().map_err(|_| invalid())?;
		Ok(Self::new(host, port))
	}
}

/// The configuration handed back to an enrolled client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	pub address: Ipv4Addr,
	pub server_public_key: WgPublicKey,
	pub endpoint: Endpoint,
	pub persistent_keepalive: u16,
}

impl fmt::Display for ClientConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "[Interface]")?;
		writeln!(f, "PrivateKey = {CLIENT_PRIVATE_KEY_PLACEHOLDER}")?;
		writeln!(f, "Address = {}/32", self.address)?;
		writeln!(f)?;
		writeln!(f, "[Peer]")?;
		writeln!(f, "PublicKey = {}", self.server_public_key)?;
		writeln!(f, "AllowedIPs = 0.0.0.0/0")?;
		writeln!(f, "Endpoint = {}", self.endpoint)?;
		writeln!(f, "PersistentKeepalive = {}", self.persistent_keepalive)
	}
}

impl FromStr for ClientConfig {
	type Err = ClientConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut address = None;
		let mut server_public_key = None;
		let mut endpoint = None;
		let mut keepalive = None;

		for line in s.lines() {
			let Some((key, value)) = line.split_once('=') else {
				continue;
			};
			let (key, value) = (key.trim(), value.trim());
			let invalid = |field| ClientConfigError::Invalid {
				field,
				value: value.to_string(),
			};

			match key {
				"Address" => {
					let host = value.strip_suffix("/32").ok_or_else(|| invalid("Address"))?;
					address = Some(
						host.parse::<Ipv4Addr>()
							.map_err(|_| invalid("Address"))?,
					);
				}
				"PublicKey" => {
					server_public_key =
						Some(WgPublicKey::from_base64(value).map_err(|_| invalid("PublicKey"))?);
				}
				"Endpoint" => endpoint = Some(value.parse::<Endpoint>()?),
				"PersistentKeepalive" => {
					keepalive = Some(
						value
							.parse::<u16>()
							.map_err(|_| invalid("PersistentKeepalive"))?,
					);
				}
				_ => {}
			}
		}

		Ok(Self {
			address: address.ok_or(ClientConfigError::Missing("Address"))?,
			server_public_key: server_public_key.ok_or(ClientConfigError::Missing("PublicKey"))?,
			endpoint: endpoint.ok_or(ClientConfigError::Missing("Endpoint"))?,
			persistent_keepalive: keepalive.unwrap_or(0),
		})
	}
}
