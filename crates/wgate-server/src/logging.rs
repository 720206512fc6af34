// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wgate_server_config::LoggingConfig;

const BOOTSTRAP_LEVEL: &str = "info";

/// `RUST_LOG` wins over the configured level.
pub fn filter(config: &LoggingConfig) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Plain console subscriber scoped to configuration loading, before the
/// configured level and format are known.
pub fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_LEVEL)),
		)
		.finish()
}

pub fn init_tracing(config: &LoggingConfig) {
	let registry = tracing_subscriber::registry().with(filter(config));
	if config.json {
		registry
			.with(tracing_subscriber::fmt::layer().json().with_current_span(true))
			.init();
	} else {
		registry.with(tracing_subscriber::fmt::layer()).init();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bootstrap_subscriber_records_config_loading() {
		if std::env::var_os("RUST_LOG").is_some() {
			return;
		}
		tracing::subscriber::with_default(bootstrap_subscriber(), || {
			assert!(tracing::enabled!(tracing::Level::INFO));
			assert!(!tracing::enabled!(tracing::Level::TRACE));
		});
	}
}
