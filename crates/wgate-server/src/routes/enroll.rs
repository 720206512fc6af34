// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `POST /wireguard`: enroll the public key carried in the body.

use std::sync::Arc;

use axum::{
	body::Bytes,
	extract::State,
	http::header::CONTENT_TYPE,
	response::{IntoResponse, Response},
};
use tracing::{info, instrument, warn};

use crate::error::{Result, ServerError};
use crate::AppState;

/// Runs the enrollment on its own task so a dropped connection cannot cancel
/// it halfway through. The handler stops waiting after the request timeout;
/// the task still finishes.
#[instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn enroll(State(state): State<AppState>, body: Bytes) -> Result<Response> {
	let coordinator = Arc::clone(&state.coordinator);
	let task = tokio::spawn(async move { coordinator.enroll(&body).await });

	let enrollment = match tokio::time::timeout(state.request_timeout, task).await {
		Ok(Ok(result)) => result?,
		Ok(Err(join)) => return Err(ServerError::Task(join.to_string())),
		Err(_) => {
			warn!(timeout = ?state.request_timeout, "enrollment still running after request timeout");
			return Err(ServerError::Timeout(state.request_timeout));
		}
	};

	info!(address = %enrollment.peer.address, "returning client configuration");
	Ok((
		[(CONTENT_TYPE, "text/plain; charset=utf-8")],
		enrollment.client_config.to_string(),
	)
		.into_response())
}
