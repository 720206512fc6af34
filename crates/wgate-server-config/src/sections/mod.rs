// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for wgate-server.

pub mod auth;
pub mod http;
pub mod logging;
pub mod tls;
pub mod wireguard;

pub use auth::{AuthConfig, AuthConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use tls::{TlsConfig, TlsConfigLayer};
pub use wireguard::{WireguardConfig, WireguardConfigLayer};
