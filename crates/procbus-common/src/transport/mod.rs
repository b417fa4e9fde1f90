//! Procbus Transport Layer
//!
//! Same-host IPC over Unix domain sockets with newline-delimited JSON
//! envelopes.
//!
//! # Exchange Pattern
//!
//! A connection carries exactly one request envelope from initiator to
//! responder, followed by exactly one response envelope back, then the
//! connection is closed. There is no pipelining and no streaming.
//!
//! # Components
//!
//! - **[`LineCodec`]**: encode/decode one envelope per text line
//! - **[`IpcTransport`]**: client side — connect with a bounded wait and run
//!   one exchange
//! - **[`IpcServer`]**: server side — accept loop with cooperative shutdown
//!   and tracked per-connection tasks

pub mod codec;
pub mod ipc;
pub mod ipc_server;

pub use codec::LineCodec;
pub use ipc::IpcTransport;
pub use ipc_server::IpcServer;
