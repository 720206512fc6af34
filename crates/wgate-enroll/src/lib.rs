// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard peer enrollment.
//!
//! A client submits a public key; the [`EnrollmentCoordinator`] allocates the
//! next tunnel address, records the peer in the [`PeerRegistry`], appends a
//! `[Peer]` stanza to the interface config file and pushes the peer into the
//! running interface, then returns a [`ClientConfig`]. The whole sequence runs
//! under one lock and rolls back on failure, so the registry, the file and the
//! kernel peer table agree after every attempt.
//!
//! External tooling (`wg`, `wg-quick`, `ip`) sits behind the [`WgTool`] trait;
//! [`testing::FakeWgTool`] stands in for it in tests.

pub mod allocator;
pub mod bootstrap;
pub mod client_config;
pub mod coordinator;
pub mod error;
pub mod keys;
pub mod registry;
pub mod syncer;
pub mod testing;
pub mod tool;
pub mod wgconf;
pub mod writer;

pub use allocator::AddressAllocator;
pub use bootstrap::{bootstrap, BootstrapOptions};
pub use client_config::{ClientConfig, ClientConfigError, Endpoint};
pub use coordinator::{EnrollStage, Enrollment, EnrollmentCoordinator, ServerIdentity};
pub use error::{EnrollError, Result};
pub use keys::{KeyError, WgKeyPair, WgPrivateKey, WgPublicKey};
pub use registry::{Peer, PeerKey, PeerRegistry};
pub use syncer::KernelSyncer;
pub use tool::{CommandWgTool, ToolError, WgTool};
pub use wgconf::{InterfaceStanza, PeerStanza, WgConfFile};
pub use writer::{AppendReceipt, InterfaceStateWriter};
