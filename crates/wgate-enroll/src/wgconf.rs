// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `wg-quick` configuration file.
//!
//! Stanzas are rendered from fixed text so that the file after N enrollments
//! is exactly the interface stanza followed by N peer stanzas:
//!
//! ```text
//! [Interface]
//! PrivateKey = <base64>
//! Address = 10.0.0.1/8
//! ListenPort = 51820
//!
//! [Peer]
//! PublicKey = <key>
//! AllowedIPs = 10.0.0.2/32
//! ```

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use thiserror::Error;
use wgate_common_secret::{Secret, REDACTED};

use crate::keys::WgPrivateKey;
use crate::registry::Peer;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WgConfError {
	#[error("line {line}: {message}")]
	Syntax { line: usize, message: String },

	#[error("no [Interface] section")]
	MissingInterface,

	#[error("[{section}] section is missing {field}")]
	MissingField {
		section: &'static str,
		field: &'static str,
	},
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStanza {
	pub private_key: WgPrivateKey,
	pub address: Ipv4Net,
	pub listen_port: u16,
}

impl InterfaceStanza {
	pub fn render(&self) -> Secret<String> {
		let private_key = self.private_key.to_base64();
		Secret::new(interface_text(
			private_key.expose(),
			self.address,
			self.listen_port,
		))
	}
}

/// The interface stanza for `address`/`listen_port` without any key material.
pub fn redacted_interface(address: Ipv4Net, listen_port: u16) -> String {
	interface_text(REDACTED, address, listen_port)
}

fn interface_text(private_key: &str, address: Ipv4Net, listen_port: u16) -> String {
	format!("[Interface]\nPrivateKey = {private_key}\nAddress = {address}\nListenPort = {listen_port}\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerStanza {
	pub public_key: String,
	pub allowed_ip: Ipv4Addr,
}

impl PeerStanza {
	pub fn render(&self) -> String {
		format!(
			"\n[Peer]\nPublicKey = {}\nAllowedIPs = {}/32\n",
			self.public_key, self.allowed_ip
		)
	}
}

impl From<&Peer> for PeerStanza {
	fn from(peer: &Peer) -> Self {
		Self {
			public_key: peer.public_key.as_str().to_string(),
			allowed_ip: peer.address,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WgConfFile {
	pub interface: InterfaceStanza,
	pub peers: Vec<PeerStanza>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
	None,
	Interface,
	Peer,
	Other,
}

#[derive(Default)]
struct PartialInterface {
	private_key: Option<WgPrivateKey>,
	address: Option<Ipv4Net>,
	listen_port: Option<u16>,
}

#[derive(Default)]
struct PartialPeer {
	public_key: Option<String>,
	allowed_ip: Option<Ipv4Addr>,
}

impl PartialPeer {
	fn finish(self) -> Result<PeerStanza, WgConfError> {
		Ok(PeerStanza {
			public_key: self.public_key.ok_or(WgConfError::MissingField {
				section: "Peer",
				field: "PublicKey",
			})?,
			allowed_ip: self.allowed_ip.ok_or(WgConfError::MissingField {
				section: "Peer",
				field: "AllowedIPs",
			})?,
		})
	}
}

impl WgConfFile {
	pub fn render(&self) -> Secret<String> {
		let mut out = self.interface.render().expose().clone();
		for peer in &self.peers {
			out.push_str(&peer.render());
		}
		Secret::new(out)
	}

	/// Parses the subset of the format this service writes. Keys are matched
	/// case-insensitively and unknown keys (`DNS`, `PostUp`, ...) are ignored.
	pub fn parse(text: &str) -> Result<Self, WgConfError> {
		let mut section = Section::None;
		let mut interface: Option<PartialInterface> = None;
		let mut current_peer: Option<PartialPeer> = None;
		let mut peers = Vec::new();

		for (index, raw) in text.lines().enumerate() {
			let line_no = index + 1;
			let line = raw.split('#').next().unwrap_or_default().trim();
			if line.is_empty() {
				continue;
			}

			if line.starts_with('[') {
				if let Some(peer) = current_peer.take() {
					peers.push(peer.finish()?);
				}
				section = match line {
					l if l.eq_ignore_ascii_case("[Interface]") => {
						if interface.is_some() {
							return Err(syntax(line_no, "duplicate [Interface] section"));
						}
						interface = Some(PartialInterface::default());
						Section::Interface
					}
					l if l.eq_ignore_ascii_case("[Peer]") => {
						current_peer = Some(PartialPeer::default());
						Section::Peer
					}
					_ => Section::Other,
				};
				continue;
			}

			let (key, value) = line
				.split_once('=')
				.map(|(k, v)| (k.trim(), v.trim()))
				.ok_or_else(|| syntax(line_no, "expected `Key = Value`"))?;

			match section {
				Section::None => return Err(syntax(line_no, "key outside of any section")),
				Section::Other => {}
				Section::Interface => {
					let Some(iface) = interface.as_mut() else {
						continue;
					};
					if key.eq_ignore_ascii_case("PrivateKey") {
						let private_key = WgPrivateKey::from_base64(value)
							.map_err(|e| syntax(line_no, &format!("PrivateKey: {e}")))?;
						iface.private_key = Some(private_key);
					} else if key.eq_ignore_ascii_case("Address") {
						let first = value.split(',').next().unwrap_or_default().trim();
						let address = first
							.parse::<Ipv4Net>()
							.map_err(|e| syntax(line_no, &format!("Address {first:?}: {e}")))?;
						iface.address = Some(address);
					} else if key.eq_ignore_ascii_case("ListenPort") {
						let port = value
							.parse::<u16>()
							.map_err(|e| syntax(line_no, &format!("ListenPort {value:?}: {e}")))?;
						iface.listen_port = Some(port);
					}
				}
				Section::Peer => {
					let Some(peer) = current_peer.as_mut() else {
						continue;
					};
					if key.eq_ignore_ascii_case("PublicKey") {
						if value.is_empty() {
							return Err(syntax(line_no, "empty PublicKey"));
						}
						peer.public_key = Some(value.to_string());
					} else if key.eq_ignore_ascii_case("AllowedIPs") {
						let first = value.split(',').next().unwrap_or_default().trim();
						let net = first
							.parse::<Ipv4Net>()
							.map_err(|e| syntax(line_no, &format!("AllowedIPs {first:?}: {e}")))?;
						if net.prefix_len() != 32 {
							return Err(syntax(
								line_no,
								&format!("AllowedIPs {first:?} is not a single host"),
							));
						}
						peer.allowed_ip = Some(net.addr());
					}
				}
			}
		}

		if let Some(peer) = current_peer.take() {
			peers.push(peer.finish()?);
		}

		let interface = interface.ok_or(WgConfError::MissingInterface)?;
		Ok(Self {
			interface: InterfaceStanza {
				private_key: interface.private_key.ok_or(WgConfError::MissingField {
					section: "Interface",
					field: "PrivateKey",
				})?,
				address: interface.address.ok_or(WgConfError::MissingField {
					section: "Interface",
					field: "Address",
				})?,
				listen_port: interface.listen_port.ok_or(WgConfError::MissingField {
					section: "Interface",
					field: "ListenPort",
				})?,
			},
			peers,
		})
	}
}

fn syntax(line: usize, message: &str) -> WgConfError {
	WgConfError::Syntax {
		line,
		message: message.to_string(),
	}
}
