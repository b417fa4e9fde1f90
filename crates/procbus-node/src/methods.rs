//! Per-component method tables.
//!
//! Instead of runtime reflection, every registered component supplies an
//! explicit mapping from method name to a typed invoker closure. The
//! registration side is compile-time checked; only the name lookup happens
//! at runtime. Resolution is by name alone — overloads are inexpressible by
//! construction.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;

use procbus_common::{ProcbusError, Result};

/// The future produced by one method invocation: an optional serialized
/// return value, or the error describing the failing phase.
pub type MethodFuture = BoxFuture<'static, Result<Option<String>>>;

/// A typed invoker closure bound to a component instance.
///
/// Receives the positional serialized arguments of a
/// [`RemoteMethodCall`](procbus_common::RemoteMethodCall); any asynchronous
/// work the target method performs is awaited inside the returned future, so
/// the value the dispatcher sees is already the unwrapped result.
pub type MethodHandler = Arc<dyn Fn(Vec<String>) -> MethodFuture + Send + Sync>;

/// Name → invoker mapping for one component.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: HashMap<String, MethodHandler>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an invoker under a method name, replacing any previous one.
    pub fn handler<F>(mut self, name: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(Vec<String>) -> MethodFuture + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(invoker));
        self
    }

    /// Looks up an invoker by method name.
    pub fn get(&self, name: &str) -> Option<MethodHandler> {
        self.methods.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodTable")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Decodes the positional argument at `index` by its declared parameter
/// type.
///
/// A missing or empty serialization means "no value supplied" for that
/// position and yields `None` rather than an error.
pub fn decode_arg<T: DeserializeOwned>(args: &[String], index: usize) -> Result<Option<T>> {
    match args.get(index) {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => serde_json::from_str(raw).map(Some).map_err(|e| {
            ProcbusError::ArgumentDeserialization(format!("argument {index}: {e}"))
        }),
    }
}

/// Like [`decode_arg`] but treats an absent value as an error.
pub fn required_arg<T: DeserializeOwned>(args: &[String], index: usize) -> Result<T> {
    decode_arg(args, index)?.ok_or_else(|| {
        ProcbusError::ArgumentDeserialization(format!("argument {index}: no value supplied"))
    })
}

/// Serializes a return value by its concrete runtime type.
pub fn encode_return<T: Serialize>(value: &T) -> Result<Option<String>> {
    Ok(Some(serde_json::to_string(value)?))
}
