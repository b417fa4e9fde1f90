//! Procbus Common Types and Transport
//!
//! This crate provides the protocol definitions and same-host IPC transport
//! for procbus, a system that lets independent OS processes on one host
//! publish typed components and invoke components owned by other processes.
//!
//! # Overview
//!
//! Processes talk to each other over Unix domain sockets placed in a shared
//! directory. Every exchange is strictly one request envelope followed by one
//! response envelope, after which the connection is closed.
//!
//! - **Protocol Layer**: envelope, method call/result and process record types
//! - **Transport Layer**: Unix socket transport with newline-delimited JSON
//!
//! # Wire Format
//!
//! One JSON object per line, per direction:
//!
//! ```text
//! {"kind": "MethodCall", "payload": "..."}\n
//! ```
//!
//! JSON string escaping guarantees that a payload can never contain the
//! record delimiter.

pub mod cancel;
pub mod endpoint;
pub mod protocol;
pub mod transport;

pub use cancel::ShutdownToken;
pub use protocol::error::{ProcbusError, Result};
pub use protocol::{
    ComponentDescriptor, Envelope, EnvelopeKind, ProcessRecord, RemoteMethodCall,
    RemoteMethodResult, HEARTBEAT_TIMEOUT,
};
pub use transport::{IpcServer, IpcTransport, LineCodec};
