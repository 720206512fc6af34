// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interface key material.
//!
//! Keys use the padded standard base64 encoding that `wg genkey`, `wg pubkey`
//! and the config file format all share (44 characters for 32 bytes).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use wgate_common_secret::{Secret, REDACTED};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

#[derive(Error, Debug)]
pub enum KeyError {
	#[error("invalid key length: expected 32 bytes, got {0}")]
	InvalidLength(usize),

	#[error("invalid base64 encoding: {0}")]
	InvalidBase64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, KeyError>;

fn decode_key(s: &str) -> Result<[u8; 32]> {
	let bytes = STANDARD.decode(s.trim())?;
	if bytes.len() != 32 {
		return Err(KeyError::InvalidLength(bytes.len()));
	}
	let mut arr = [0u8; 32];
	arr.copy_from_slice(&bytes);
	Ok(arr)
}

#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct WgPrivateKey {
	bytes: [u8; 32],
}

impl WgPrivateKey {
	pub fn generate() -> Self {
		let secret = StaticSecret::random_from_rng(OsRng);
		Self {
			bytes: secret.to_bytes(),
		}
	}

	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(s)?,
		})
	}

	pub fn to_base64(&self) -> Secret<String> {
		Secret::new(STANDARD.encode(self.bytes))
	}

	pub fn public_key(&self) -> WgPublicKey {
		let secret = StaticSecret::from(self.bytes);
		let public = PublicKey::from(&secret);
		WgPublicKey {
			bytes: *public.as_bytes(),
		}
	}
}

impl PartialEq for WgPrivateKey {
	fn eq(&self, other: &Self) -> bool {
		self.bytes == other.bytes
	}
}

impl Eq for WgPrivateKey {}

impl fmt::Debug for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgPrivateKey")
			.field("bytes", &REDACTED)
			.finish()
	}
}

impl fmt::Display for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl Serialize for WgPrivateKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for WgPrivateKey {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Self::from_base64(&s).map_err(serde::de::Error::custom)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WgPublicKey {
	bytes: [u8; 32],
}

impl WgPublicKey {
	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(s)?,
		})
	}

	pub fn to_base64(&self) -> String {
		STANDARD.encode(self.bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.bytes
	}
}

impl fmt::Debug for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let b64 = self.to_base64();
		f.debug_struct("WgPublicKey")
			.field("prefix", &format!("{}...", &b64[..8]))
			.finish()
	}
}

impl fmt::Display for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_base64())
	}
}

impl Serialize for WgPublicKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_base64())
	}
}

impl<'de> Deserialize<'de> for WgPublicKey {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Self::from_base64(&s).map_err(serde::de::Error::custom)
	}
}

/// The interface's own identity.
#[derive(Clone, Debug)]
pub struct WgKeyPair {
	private: WgPrivateKey,
	public: WgPublicKey,
}

impl WgKeyPair {
	pub fn generate() -> Self {
		Self::from_private_key(WgPrivateKey::generate())
	}

	pub fn from_private_key(private: WgPrivateKey) -> Self {
		let public = private.public_key();
		Self { private, public }
	}

	pub fn private_key(&self) -> &WgPrivateKey {
		&self.private
	}

	pub fn public_key(&self) -> &WgPublicKey {
		&self.public
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	// RFC 7748 section 6.1, Alice's key pair.
	const ALICE_PRIVATE: &str = "dwdtCnMYpX08FsFyUbJmRd9ML4frwJkqsXf7pR25LCo=";
	const ALICE_PUBLIC: &str = "hSDwCYkwp1R0i33ctD73Wg2/Og0mOBr066SpjqqbTmo=";

	#[test]
	fn derives_known_public_key() {
		let private = WgPrivateKey::from_base64(ALICE_PRIVATE).unwrap();
		assert_eq!(private.public_key().to_base64(), ALICE_PUBLIC);
	}

	#[test]
	fn base64_is_padded_like_wg() {
		let pair = WgKeyPair::generate();
		let encoded = pair.public_key().to_base64();
		assert_eq!(encoded.len(), 44);
		assert!(encoded.ends_with('='));
		assert_eq!(pair.private_key().to_base64().expose().len(), 44);
	}

	#[test]
	fn accepts_trailing_newline_from_tool_output() {
		let key = WgPublicKey::from_base64(&format!("{ALICE_PUBLIC}\n")).unwrap();
		assert_eq!(key.to_base64(), ALICE_PUBLIC);
	}

	#[test]
	fn rejects_wrong_length() {
		let short = STANDARD.encode([7u8; 16]);
		assert!(matches!(
			WgPublicKey::from_base64(&short),
			Err(KeyError::InvalidLength(16))
		));
	}

	#[test]
	fn rejects_garbage() {
		assert!(matches!(
			WgPrivateKey::from_base64("not base64!"),
			Err(KeyError::InvalidBase64(_))
		));
	}

	#[test]
	fn private_key_is_redacted() {
		let private = WgPrivateKey::from_base64(ALICE_PRIVATE).unwrap();
		assert!(!format!("{private:?}").contains(ALICE_PRIVATE));
		assert_eq!(format!("{private}"), REDACTED);
		assert_eq!(serde_json::to_string(&private).unwrap(), "\"[REDACTED]\"");
	}

	#[test]
	fn public_key_debug_shows_prefix_only() {
		let public = WgPublicKey::from_base64(ALICE_PUBLIC).unwrap();
		assert_eq!(format!("{public:?}"), "WgPublicKey { prefix: \"hSDwCYkw...\" }");
	}

	proptest! {
		#[test]
		fn public_key_base64_roundtrips(bytes in proptest::array::uniform32(any::<u8>())) {
			let key = WgPublicKey::from_bytes(bytes);
			let decoded = WgPublicKey::from_base64(&key.to_base64()).unwrap();
			prop_assert_eq!(decoded, key);
		}
	}
}
