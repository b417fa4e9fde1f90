//! Calling components owned by other processes.
//!
//! A consumer discovers a provider through [`find_provider`], then talks to
//! it through a [`RemoteCaller`] — typically wrapped in a hand-written stub
//! struct implementing the shared interface trait, so call sites stay typed:
//!
//! ```ignore
//! struct TaskServiceStub {
//!     caller: RemoteCaller,
//! }
//!
//! #[async_trait]
//! impl TaskService for TaskServiceStub {
//!     async fn submit(&self, task: TaskRequest) -> Result<TaskReceipt> {
//!         self.caller
//!             .invoke("submit", vec![CallArg::of("demo::TaskRequest", &task)?])
//!             .await?
//!             .ok_or_else(|| ProcbusError::RemoteCall("submit returned nothing".into()))
//!     }
//! }
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use procbus_common::{
    Envelope, EnvelopeKind, IpcTransport, ProcbusError, ProcessRecord, RemoteMethodCall,
    RemoteMethodResult, Result,
};
use procbus_registry::RegistryClient;

/// Upper bound on one remote invocation, connection included. Same-host
/// traffic, so a slow peer usually means a wedged peer.
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// One positional argument of a remote call: the concrete runtime type name
/// plus the serialized value.
#[derive(Debug, Clone)]
pub struct CallArg {
    type_name: String,
    value: String,
}

impl CallArg {
    /// Serializes a value under its concrete runtime type name.
    pub fn of<T: Serialize>(type_name: impl Into<String>, value: &T) -> Result<Self> {
        Ok(CallArg {
            type_name: type_name.into(),
            value: serde_json::to_string(value)?,
        })
    }

    /// A positional slot with no value supplied, marshaled as the empty
    /// string.
    pub fn absent(type_name: impl Into<String>) -> Self {
        CallArg {
            type_name: type_name.into(),
            value: String::new(),
        }
    }
}

/// Invokes methods of one remote component over one-shot exchanges.
///
/// Bound to a provider endpoint and a capability name; stateless beyond
/// that, so it is freely cloneable and shareable.
#[derive(Debug, Clone)]
pub struct RemoteCaller {
    endpoint: String,
    type_name: String,
}

impl RemoteCaller {
    /// Creates a caller for a capability served at `endpoint`.
    pub fn new(endpoint: impl Into<String>, type_name: impl Into<String>) -> Self {
        RemoteCaller {
            endpoint: endpoint.into(),
            type_name: type_name.into(),
        }
    }

    /// Creates a caller for the component a discovered record advertises.
    pub fn for_provider(record: &ProcessRecord, type_name: impl Into<String>) -> Self {
        Self::new(record.endpoint.clone(), type_name)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Invokes a method by name with positional arguments.
    ///
    /// `Ok(None)` means the method succeeded without returning a value. Any
    /// remote-reported failure — unknown component, unknown method,
    /// argument mismatch, execution error — surfaces as
    /// [`ProcbusError::RemoteCall`] carrying the provider's message.
    pub async fn invoke<R: DeserializeOwned>(
        &self,
        method_name: &str,
        arguments: Vec<CallArg>,
    ) -> Result<Option<R>> {
        debug!("invoking {}.{} at {}", self.type_name, method_name, self.endpoint);

        let (argument_types, arguments) = arguments
            .into_iter()
            .map(|arg| (arg.type_name, arg.value))
            .unzip();
        let call = RemoteMethodCall {
            type_name: self.type_name.clone(),
            method_name: method_name.to_string(),
            argument_types,
            arguments,
        };

        let request = Envelope::with_body(EnvelopeKind::MethodCall, &call)?;
        let response = exchange_bounded(&self.endpoint, &request, method_name).await?;

        let result: RemoteMethodResult = match response.kind {
            EnvelopeKind::MethodResult => response.body()?,
            EnvelopeKind::Error => {
                return Err(ProcbusError::RemoteCall(response.payload));
            }
            other => {
                return Err(ProcbusError::RemoteCall(format!(
                    "provider answered {other:?} instead of a method result"
                )));
            }
        };

        if !result.success {
            return Err(ProcbusError::RemoteCall(
                result
                    .error_message
                    .unwrap_or_else(|| "remote call failed without a message".to_string()),
            ));
        }

        match result.return_value {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => {
                let value = serde_json::from_str(&raw).map_err(|e| {
                    ProcbusError::Decode(format!("return value of {method_name}: {e}"))
                })?;
                Ok(Some(value))
            }
        }
    }

    /// Asks the provider whether it still serves this capability.
    pub async fn probe(&self) -> Result<bool> {
        let request = Envelope::new(EnvelopeKind::GetComponent, self.type_name.clone());
        let response = exchange_bounded(&self.endpoint, &request, "component probe").await?;
        match response.kind {
            EnvelopeKind::ComponentStatus => Ok(response.payload == "true"),
            EnvelopeKind::Error => Err(ProcbusError::RemoteCall(response.payload)),
            other => Err(ProcbusError::RemoteCall(format!(
                "provider answered {other:?} instead of a component status"
            ))),
        }
    }
}

/// Runs one exchange with the whole-call bound applied: a provider that
/// accepts the connection but never answers must not hang its consumers.
async fn exchange_bounded(endpoint: &str, request: &Envelope, what: &str) -> Result<Envelope> {
    match tokio::time::timeout(
        CALL_TIMEOUT,
        IpcTransport::request(endpoint, request, CALL_TIMEOUT),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(ProcbusError::RemoteCall(format!(
            "{what} at {endpoint} timed out after {}ms",
            CALL_TIMEOUT.as_millis()
        ))),
    }
}

/// Finds an active process advertising a capability, skipping the caller's
/// own endpoint.
///
/// Returns the first match in registry order; with several providers of the
/// same capability the choice is arbitrary. `None` covers both "nobody
/// provides this" and "registry unreachable".
pub async fn find_provider(
    registry: &RegistryClient,
    capability: &str,
    own_endpoint: &str,
) -> Option<ProcessRecord> {
    registry
        .list_active()
        .await
        .into_iter()
        .find(|record| record.endpoint != own_endpoint && record.advertises(capability))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_arg_serialization() {
        let arg = CallArg::of("i64", &7).unwrap();
        assert_eq!(arg.type_name, "i64");
        assert_eq!(arg.value, "7");

        let absent = CallArg::absent("demo::TaskRequest");
        assert!(absent.value.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_absent_provider_times_out() {
        let caller = RemoteCaller::new("procbus-test-no-provider", "tests::Doubler");
        let err = caller.invoke::<i64>("double", vec![]).await.unwrap_err();
        assert!(matches!(err, ProcbusError::ConnectTimeout(_, _)));
    }
}
