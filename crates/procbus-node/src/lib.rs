//! Procbus Node
//!
//! The per-process side of procbus: a local component registry with
//! lifecycle coordination, the dispatcher that serves remote method calls
//! against it, and the proxy support for invoking components owned by other
//! processes.
//!
//! # Flow
//!
//! A process builds a [`ComponentHub`], registers its components (each with
//! an explicit method table), initializes them and calls
//! [`ComponentHub::serve`] to start its remote listener, publish itself to
//! the registry and begin heartbeating. A consuming process discovers a
//! provider via [`remote::find_provider`] and talks to it through a
//! [`RemoteCaller`], usually wrapped in a hand-written stub implementing the
//! shared interface.

pub mod component;
pub mod dispatch;
pub mod hub;
pub mod lifecycle;
pub mod methods;
pub mod remote;

pub use component::Component;
pub use dispatch::Dispatcher;
pub use hub::ComponentHub;
pub use lifecycle::{FixedTickable, Releasable, Startable, Tickable};
pub use methods::{decode_arg, encode_return, required_arg, MethodTable};
pub use remote::{find_provider, CallArg, RemoteCaller};
