// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard enrollment gateway binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use wgate_enroll::CommandWgTool;
use wgate_server::{create_router, logging, startup, version};
use wgate_server_config::ServerConfig;

/// How long in-flight requests get to finish after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// wgate-server - enroll WireGuard peers over HTTPS.
#[derive(Parser, Debug)]
#[command(
	name = "wgate-server",
	about = "WireGuard peer enrollment gateway",
	version
)]
struct Args {
	/// Config file (defaults to /etc/wgate/server.toml)
	#[arg(long, short, env = "WG_GATEWAY_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Bring the interface up and serve enrollments (default)
	Serve,
	/// Show version and build information
	Version,
	/// Print the interface stanza that would be written, key redacted
	RenderConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = tracing::subscriber::with_default(logging::bootstrap_subscriber(), || {
		match &args.config {
			Some(path) => wgate_server_config::load_config_with_file(path),
			None => wgate_server_config::load_config(),
		}
	})
	.context("loading configuration")?;

	match args.command.unwrap_or(Command::Serve) {
		Command::RenderConfig => render_config(&config),
		Command::Version => Ok(()),
		Command::Serve => serve(config).await,
	}
}

fn render_config(config: &ServerConfig) -> anyhow::Result<()> {
	let options = startup::bootstrap_options(&config.wireguard)?;
	println!("# {}", options.config_path().display());
	print!("{}", options.preview());
	Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
	logging::init_tracing(&config.logging);
	config.log_summary();

	tracing::info!(
		version = version::VERSION,
		interface = %config.wireguard.interface,
		listen = %config.socket_addr(),
		tls = config.tls.enabled,
		"starting wgate-server"
	);

	let state = startup::build_state(&config, Arc::new(CommandWgTool))
		.await
		.context("bootstrapping the wireguard interface")?;
	let app = create_router(state);

	let addr: SocketAddr = config
		.socket_addr()
		.parse()
		.with_context(|| format!("invalid listen address {}", config.socket_addr()))?;

	if config.tls.enabled {
		rustls::crypto::ring::default_provider()
			.install_default()
			.map_err(|_| anyhow::anyhow!("a rustls crypto provider is already installed"))?;

		let tls = RustlsConfig::from_pem_file(&config.tls.cert_path, &config.tls.key_path)
			.await
			.with_context(|| {
				format!(
					"loading TLS certificate {} and key {}",
					config.tls.cert_path.display(),
					config.tls.key_path.display()
				)
			})?;

		let handle = axum_server::Handle::new();
		let shutdown = handle.clone();
		tokio::spawn(async move {
			shutdown_signal().await;
			shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
		});

		tracing::info!("listening on https://{}", addr);
		axum_server::bind_rustls(addr, tls)
			.handle(handle)
			.serve(app.into_make_service())
			.await
			.context("https server failed")?;
	} else {
		tracing::warn!("TLS is disabled; credentials and keys travel in clear text");
		let listener = tokio::net::TcpListener::bind(addr)
			.await
			.with_context(|| format!("binding {addr}"))?;

		tracing::info!("listening on http://{}", addr);
		axum::serve(listener, app)
			.with_graceful_shutdown(shutdown_signal())
			.await
			.context("http server failed")?;
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for ctrl-c");
		std::future::pending::<()>().await;
	}
	tracing::info!("Received shutdown signal");
}
