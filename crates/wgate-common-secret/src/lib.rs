// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret handling shared by the gateway crates.
//!
//! Two things live here:
//!
//! - [`Secret<T>`]: wraps interface private keys and the enrollment password so
//!   they never reach logs, config dumps, or `Debug` output, and are zeroized
//!   when dropped. The value is only reachable through `.expose()`.
//! - [`load_secret_env`]: read a secret from `NAME`, or from the file named by `NAME_FILE`
//!   (Docker/Kubernetes secret mounts).
//!
//! ```
//! use wgate_common_secret::Secret;
//!
//! let password = Secret::new("hunter2".to_string());
//! assert_eq!(format!("{password}"), "[REDACTED]");
//! assert_eq!(password.expose(), "hunter2");
//! ```

pub mod env;

use std::fmt;
use zeroize::Zeroize;

pub use env::{load_secret_env, SecretEnvError};

/// Placeholder printed wherever a secret would otherwise appear.
pub const REDACTED: &str = "[REDACTED]";

/// A sensitive value that redacts itself in every textual representation.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Access the wrapped value. Every call site is a deliberate disclosure.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl SecretString {
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn private_key_never_appears_in_debug() {
		let key = Secret::new("aGVsbG8td29ybGQtcHJpdmF0ZS1rZXktMzItYnl0ZXM=".to_string());
		let debug = format!("{key:?}");
		assert_eq!(debug, "Secret(\"[REDACTED]\")");
	}

	#[test]
	fn option_secret_debug_is_redacted() {
		let password: Option<SecretString> = Some(Secret::new("hunter2".to_string()));
		let debug = format!("{password:?}");
		assert!(debug.contains(REDACTED));
		assert!(!debug.contains("hunter2"));
	}

	#[test]
	fn empty_secret_is_empty() {
		assert!(Secret::new(String::new()).is_empty());
		assert!(!Secret::new("x".to_string()).is_empty());
	}

	#[cfg(feature = "serde")]
	#[test]
	fn serializes_as_placeholder_and_deserializes_value() {
		let password = Secret::new("hunter2".to_string());
		assert_eq!(serde_json::to_string(&password).unwrap(), "\"[REDACTED]\"");

		let parsed: SecretString = serde_json::from_str("\"hunter2\"").unwrap();
		assert_eq!(parsed.expose(), "hunter2");
	}

	proptest! {
		#[test]
		fn display_never_leaks(inner in "[a-zA-Z0-9+/=]{4,64}") {
			prop_assume!(!REDACTED.contains(inner.as_str()));
			let secret = Secret::new(inner.clone());
			prop_assert_eq!(format!("{secret}"), REDACTED);
		}
	}
}
