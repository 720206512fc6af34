// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use axum::{
	http::{header::CONTENT_TYPE, StatusCode},
	response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};
use wgate_enroll::EnrollError;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error(transparent)]
	Enroll(#[from] EnrollError),

	#[error("enrollment did not finish within {0:?}; it will complete in the background")]
	Timeout(Duration),

	#[error("enrollment task failed: {0}")]
	Task(String),
}

impl ServerError {
	pub fn status(&self) -> StatusCode {
		match self {
			ServerError::Enroll(e) => {
				StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
			}
			ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
			ServerError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn code(&self) -> &'static str {
		match self {
			ServerError::Enroll(e) => e.code(),
			ServerError::Timeout(_) => "timeout",
			ServerError::Task(_) => "internal_error",
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let status = self.status();
		match &self {
			ServerError::Task(message) => {
				error!(code = self.code(), error = %message, "enrollment task did not complete");
			}
			ServerError::Timeout(limit) => {
				warn!(code = self.code(), ?limit, "enrollment response timed out");
			}
			ServerError::Enroll(_) => {
				debug!(code = self.code(), %status, "enrollment request failed");
			}
		}
		(
			status,
			[(CONTENT_TYPE, "text/plain; charset=utf-8")],
			format!("{status}\n{self}"),
		)
			.into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn statuses_follow_the_taxonomy() {
		let cases = [
			(ServerError::from(EnrollError::InvalidInput("empty".into())), 400),
			(ServerError::from(EnrollError::DuplicateKey), 409),
			(
				ServerError::from(EnrollError::AddressSpaceExhausted {
					subnet: "10.0.0.1/30".into(),
					ordinal: 2,
				}),
				500,
			),
			(ServerError::Timeout(Duration::from_secs(30)), 504),
			(ServerError::Task("panicked".into()), 500),
		];
		for (err, status) in cases {
			assert_eq!(err.status().as_u16(), status, "{err}");
		}
	}

	#[test]
	fn codes_are_stable() {
		assert_eq!(ServerError::from(EnrollError::DuplicateKey).code(), "duplicate_key");
		assert_eq!(ServerError::Timeout(Duration::from_secs(1)).code(), "timeout");
		assert_eq!(ServerError::Task("x".into()).code(), "internal_error");
	}

	#[tokio::test]
	async fn responses_are_plain_text_with_status_line() {
		let response = ServerError::Timeout(Duration::from_secs(30)).into_response();
		assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
		assert_eq!(
			response.headers()[CONTENT_TYPE],
			"text/plain; charset=utf-8"
		);
		let body = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let text = String::from_utf8(body.to_vec()).unwrap();
		assert!(text.starts_with("504 Gateway Timeout\n"));
		assert!(text.contains("complete in the background"));
	}
}
