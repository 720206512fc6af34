// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP Basic authentication for the enrollment route.

use axum::{
	extract::{Request, State},
	http::{
		header::{AUTHORIZATION, WWW_AUTHENTICATE},
		HeaderMap, HeaderValue, StatusCode,
	},
	middleware::Next,
	response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use wgate_common_secret::SecretString;

use crate::AppState;

const CHALLENGE: &str = "Basic realm=\"Restricted\"";

/// The single credential allowed to enroll peers.
#[derive(Debug, Clone)]
pub struct BasicAuth {
	username: String,
	password: SecretString,
}

impl BasicAuth {
	pub fn new(username: impl Into<String>, password: SecretString) -> Self {
		Self {
			username: username.into(),
			password,
		}
	}

	pub fn username(&self) -> &str {
		&self.username
	}

	/// Checks an `Authorization` header value. Both halves are always
	/// compared so a wrong username costs the same as a wrong password.
	pub fn verify(&self, header: &str) -> bool {
		let Some((username, password)) = decode_basic(header) else {
			return false;
		};
		let user_ok = self.username.as_bytes().ct_eq(username.as_bytes());
		let pass_ok = self.password.expose().as_bytes().ct_eq(password.as_bytes());
		(user_ok & pass_ok).into()
	}
}

fn decode_basic(header: &str) -> Option<(String, String)> {
	let (scheme, encoded) = header.trim().split_once(' ')?;
	if !scheme.eq_ignore_ascii_case("basic") {
		return None;
	}
	let decoded = STANDARD.decode(encoded.trim()).ok()?;
	let decoded = String::from_utf8(decoded).ok()?;
	let (username, password) = decoded.split_once(':')?;
	Some((username.to_string(), password.to_string()))
}

pub async fn require_basic_auth(
	State(state): State<AppState>,
	request: Request,
	next: Next,
) -> Response {
	let verdict = authorization(request.headers()).map(|value| state.auth.verify(value));
	match verdict {
		Some(true) => next.run(request).await,
		Some(false) => {
			warn!(path = %request.uri().path(), "rejected enrollment credentials");
			unauthorized()
		}
		None => {
			debug!(path = %request.uri().path(), "missing credentials");
			unauthorized()
		}
	}
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
	headers.get(AUTHORIZATION)?.to_str().ok()
}

fn unauthorized() -> Response {
	let status = StatusCode::UNAUTHORIZED;
	(
		status,
		[(WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE))],
		format!("{status}\nauthentication required"),
	)
		.into_response()
}

#[cfg(test)]
mod tests {
	use super::*;
	use wgate_common_secret::Secret;

	fn auth() -> BasicAuth {
		BasicAuth::new("wireguard", Secret::new("hunter2".to_string()))
	}

	fn header(credentials: &str) -> String {
		format!("Basic {}", STANDARD.encode(credentials))
	}

	#[test]
	fn accepts_the_configured_credential() {
		assert!(auth().verify(&header("wireguard:hunter2")));
		assert!(auth().verify(&format!("basic  {}", STANDARD.encode("wireguard:hunter2"))));
	}

	#[test]
	fn rejects_everything_else() {
		let auth = auth();
		assert!(!auth.verify(&header("wireguard:hunter3")));
		assert!(!auth.verify(&header("admin:hunter2")));
		assert!(!auth.verify(&header("wireguard")));
		assert!(!auth.verify("Bearer abc"));
		assert!(!auth.verify("Basic !!!not-base64!!!"));
		assert!(!auth.verify(""));
	}

	#[test]
	fn rejects_prefixes_and_extensions_of_the_credential() {
		let auth = auth();
		assert!(!auth.verify(&header("wireguard:hunter")));
		assert!(!auth.verify(&header("wireguard:hunter22")));
		assert!(!auth.verify(&header("wireguar:hunter2")));
		assert!(!auth.verify(&header("wireguardx:hunter2")));
		assert!(!auth.verify(&header(":")));
	}

	#[test]
	fn password_may_contain_colons() {
		let auth = BasicAuth::new("wireguard", Secret::new("a:b:c".to_string()));
		assert!(auth.verify(&header("wireguard:a:b:c")));
	}

	#[test]
	fn debug_hides_password() {
		let rendered = format!("{:?}", auth());
		assert!(!rendered.contains("hunter2"));
		assert_eq!(auth().username(), "wireguard");
	}
}
