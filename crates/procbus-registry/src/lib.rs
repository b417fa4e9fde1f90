//! Procbus Registry
//!
//! The single name-service for one host: a registry server that tracks which
//! process exposes which component types, and the per-process client that
//! publishes a process record, emits heartbeats and discovers other
//! processes.
//!
//! # Liveness
//!
//! Records are never evicted. A record counts as *active* only while its
//! last heartbeat is within the 30s liveness window; `List` filters stale
//! records at read time.
//!
//! # Bootstrap
//!
//! The first process that cannot reach a registry server becomes the host:
//! [`RegistryClient::register`] starts an in-process [`RegistryServer`] on
//! connect timeout and retries the registration exactly once.

pub mod client;
pub mod server;

pub use client::RegistryClient;
pub use server::{RecordTable, RegistryHandle, RegistryServer};
