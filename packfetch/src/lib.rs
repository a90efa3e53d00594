//! Packfetch - Resumable modpack downloads
//!
//! This library resolves a versioned modpack from a remote catalog, reads the
//! pack manifest, and acquires every mod it lists into a local staging tree.
//! Acquisition progress is recorded in a durable ledger so that repeated or
//! interrupted runs pick up where they left off without re-downloading files
//! that are already present and intact.
//!
//! # Modules
//!
//! - [`catalog`] - Catalog API client and pack reference parsing
//! - [`config`] - Persisted configuration file
//! - [`logging`] - Tracing subscriber setup
//! - [`manager`] - Pack installation and the acquisition engine

pub mod catalog;
pub mod config;
pub mod logging;
pub mod manager;

/// Library version, taken from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
