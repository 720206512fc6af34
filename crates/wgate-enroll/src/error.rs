// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

use crate::tool::ToolError;

#[derive(Debug, Error)]
pub enum EnrollError {
	#[error("invalid public key: {0}")]
	InvalidInput(String),

	#[error("address space exhausted: {subnet} has no host address for peer #{ordinal}")]
	AddressSpaceExhausted { subnet: String, ordinal: usize },

	#[error("public key is already enrolled")]
	DuplicateKey,

	#[error("failed to write {path}: {source}")]
	ConfigWrite {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to bring up interface {interface}: {source}")]
	InterfaceBringUp {
		interface: String,
		#[source]
		source: ToolError,
	},

	#[error("failed to add peer to interface {interface}: {source}")]
	KernelSync {
		interface: String,
		#[source]
		source: ToolError,
	},

	#[error("failed to generate interface key pair: {0}")]
	KeyGeneration(String),

	#[error("failed to parse {path}: {message}")]
	ConfigParse { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, EnrollError>;

impl EnrollError {
	/// Stable machine-readable code, used in logs and response bodies.
	pub fn code(&self) -> &'static str {
		match self {
			EnrollError::InvalidInput(_) => "invalid_input",
			EnrollError::AddressSpaceExhausted { .. } => "address_space_exhausted",
			EnrollError::DuplicateKey => "duplicate_key",
			EnrollError::ConfigWrite { .. } => "config_write_error",
			EnrollError::InterfaceBringUp { .. } => "interface_bring_up_error",
			EnrollError::KernelSync { .. } => "kernel_sync_error",
			EnrollError::KeyGeneration(_) => "key_generation_error",
			EnrollError::ConfigParse { .. } => "config_parse_error",
		}
	}

	/// HTTP-equivalent status for the transport layer.
	pub fn http_status(&self) -> u16 {
		match self {
			EnrollError::InvalidInput(_) => 400,
			EnrollError::DuplicateKey => 409,
			_ => 500,
		}
	}

	pub fn is_client_error(&self) -> bool {
		self.http_status() < 500
	}
}
