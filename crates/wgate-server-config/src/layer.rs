// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	AuthConfigLayer, HttpConfigLayer, LoggingConfigLayer, TlsConfigLayer, WireguardConfigLayer,
};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub tls: Option<TlsConfigLayer>,
	#[serde(default)]
	pub auth: Option<AuthConfigLayer>,
	#[serde(default)]
	pub wireguard: Option<WireguardConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(&mut self.tls, other.tls, TlsConfigLayer::merge);
		merge_option(&mut self.auth, other.auth, AuthConfigLayer::merge);
		merge_option(
			&mut self.wireguard,
			other.wireguard,
			WireguardConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T>(target: &mut Option<T>, source: Option<T>, merge_fn: fn(&mut T, T)) {
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(8443),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(base.http.unwrap().port, Some(8443));
		assert!(base.wireguard.is_none());
	}

	#[test]
	fn test_merge_overwrites_field_by_field() {
		let mut base: ServerConfigLayer = toml::from_str(
			r#"
[http]
host = "0.0.0.0"
port = 8443

[wireguard]
interface = "wg1"
endpoint = "vpn.example.com"
"#,
		)
		.unwrap();

		base.merge(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(9443),
				..Default::default()
			}),
			wireguard: Some(WireguardConfigLayer {
				endpoint: Some("gw.example.net".to_string()),
				..Default::default()
			}),
			..Default::default()
		});

		let http = base.http.unwrap();
		assert_eq!(http.host.as_deref(), Some("0.0.0.0"));
		assert_eq!(http.port, Some(9443));
		let wireguard = base.wireguard.unwrap();
		assert_eq!(wireguard.interface.as_deref(), Some("wg1"));
		assert_eq!(wireguard.endpoint.as_deref(), Some("gw.example.net"));
	}

	#[test]
	fn test_empty_source_changes_nothing() {
		let mut base = ServerConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: Some("debug".to_string()),
				json: None,
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer::default());
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("debug"));
	}
}
