// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface of the WireGuard enrollment gateway.
//!
//! - `POST /wireguard` enrolls the public key in the request body (Basic auth)
//! - `GET /health` reports the interface and its peer count

pub mod auth;
pub mod error;
pub mod logging;
pub mod routes;
pub mod startup;
pub mod version;

use std::sync::Arc;
use std::time::Duration;

use axum::{
	extract::DefaultBodyLimit,
	middleware,
	routing::{get, post},
	Router,
};
use tower_http::trace::TraceLayer;
use wgate_enroll::EnrollmentCoordinator;

pub use auth::BasicAuth;
pub use error::ServerError;

/// Enrollment bodies are a single public key; anything larger is refused early.
pub const MAX_ENROLL_BODY: usize = 4 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
	pub coordinator: Arc<EnrollmentCoordinator>,
	pub auth: Arc<BasicAuth>,
	/// How long a request waits for its enrollment before answering 504.
	pub request_timeout: Duration,
}

impl AppState {
	pub fn new(
		coordinator: Arc<EnrollmentCoordinator>,
		auth: BasicAuth,
		request_timeout: Duration,
	) -> Self {
		Self {
			coordinator,
			auth: Arc::new(auth),
			request_timeout,
		}
	}
}

pub fn create_router(state: AppState) -> Router {
	let enroll: Router<AppState> = Router::new()
		.route("/wireguard", post(routes::enroll::enroll))
		.layer(DefaultBodyLimit::max(MAX_ENROLL_BODY))
		.route_layer(middleware::from_fn_with_state(
			state.clone(),
			auth::require_basic_auth,
		));

	Router::new()
		.merge(enroll)
		.route("/health", get(routes::health::health))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
