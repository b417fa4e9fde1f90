//! Inbound request dispatch.
//!
//! Translates wire envelopes into method-table invocations against the hub.
//! Invocation failures are reported inside a `MethodResult` body, phase
//! tagged so the caller can tell resolution failures from execution
//! failures; only a request that is not a recognized kind produces an
//! `Error` envelope.

use tracing::{debug, warn};

use procbus_common::{Envelope, EnvelopeKind, ProcbusError, RemoteMethodCall, RemoteMethodResult};

use crate::hub::ComponentHub;

/// Serves one hub's components to remote callers.
#[derive(Clone)]
pub struct Dispatcher {
    hub: ComponentHub,
}

impl Dispatcher {
    pub fn new(hub: ComponentHub) -> Self {
        Dispatcher { hub }
    }

    /// Handles one request envelope and produces its response envelope.
    pub async fn dispatch(&self, request: Envelope) -> Envelope {
        if !self.hub.is_active() {
            return Envelope::new(EnvelopeKind::Error, "component hub is deactivated");
        }

        match request.kind {
            EnvelopeKind::MethodCall => self.dispatch_call(&request).await,
            EnvelopeKind::GetComponent => {
                let known = self.hub.resolve_entry(&request.payload).is_some();
                Envelope::new(EnvelopeKind::ComponentStatus, if known { "true" } else { "false" })
            }
            kind => {
                warn!("unhandled request kind: {kind:?}");
                Envelope::new(EnvelopeKind::Error, "Unknown message type")
            }
        }
    }

    async fn dispatch_call(&self, request: &Envelope) -> Envelope {
        let result = match request.body::<RemoteMethodCall>() {
            Ok(call) => self.invoke(call).await,
            Err(e) => RemoteMethodResult::failure(format!("malformed method call: {e}")),
        };
        // RemoteMethodResult serialization cannot fail; the fallback is for
        // form only.
        Envelope::with_body(EnvelopeKind::MethodResult, &result)
            .unwrap_or_else(|e| Envelope::new(EnvelopeKind::Error, e.to_string()))
    }

    async fn invoke(&self, call: RemoteMethodCall) -> RemoteMethodResult {
        debug!("dispatching {}.{}", call.type_name, call.method_name);

        let Some(entry) = self.hub.resolve_entry(&call.type_name) else {
            return RemoteMethodResult::failure(
                ProcbusError::ComponentNotFound(call.type_name).to_string(),
            );
        };
        let Some(handler) = entry.methods.get(&call.method_name) else {
            return RemoteMethodResult::failure(
                ProcbusError::MethodNotFound(call.method_name, entry.type_name.clone())
                    .to_string(),
            );
        };

        match handler(call.arguments).await {
            Ok(return_value) => RemoteMethodResult::success(return_value),
            Err(e) => {
                warn!(
                    "invocation of {}.{} failed: {e}",
                    call.type_name, call.method_name
                );
                RemoteMethodResult::failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::component::Component;
    use crate::methods::{encode_return, required_arg};

    struct Doubler;

    fn test_hub(endpoint: &str) -> ComponentHub {
        let hub = ComponentHub::with_endpoint(endpoint);
        let doubler = Arc::new(Doubler);
        hub.register(
            Component::new("tests::Doubler", doubler).method("double", |args| {
                Box::pin(async move {
                    let n: i64 = required_arg(&args, 0)?;
                    encode_return(&(n * 2))
                })
            }),
        )
        .unwrap();
        hub
    }

    fn call_envelope(type_name: &str, method_name: &str, arguments: Vec<String>) -> Envelope {
        let call = RemoteMethodCall {
            type_name: type_name.to_string(),
            method_name: method_name.to_string(),
            argument_types: vec!["i64".to_string(); arguments.len()],
            arguments,
        };
        Envelope::with_body(EnvelopeKind::MethodCall, &call).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_successful_call() {
        let dispatcher = Dispatcher::new(test_hub("test-dispatch-ok"));
        let response = dispatcher
            .dispatch(call_envelope("tests::Doubler", "double", vec!["21".to_string()]))
            .await;

        assert_eq!(response.kind, EnvelopeKind::MethodResult);
        let result: RemoteMethodResult = response.body().unwrap();
        assert!(result.success);
        assert_eq!(result.return_value.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_dispatch_by_simple_name() {
        let dispatcher = Dispatcher::new(test_hub("test-dispatch-simple"));
        let response = dispatcher
            .dispatch(call_envelope("Doubler", "double", vec!["5".to_string()]))
            .await;

        let result: RemoteMethodResult = response.body().unwrap();
        assert!(result.success);
        assert_eq!(result.return_value.as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_component() {
        let dispatcher = Dispatcher::new(test_hub("test-dispatch-nocomp"));
        let response = dispatcher
            .dispatch(call_envelope("tests::Missing", "double", vec![]))
            .await;

        let result: RemoteMethodResult = response.body().unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Component tests::Missing not found")
        );
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let dispatcher = Dispatcher::new(test_hub("test-dispatch-nomethod"));
        let response = dispatcher
            .dispatch(call_envelope("tests::Doubler", "triple", vec![]))
            .await;

        let result: RemoteMethodResult = response.body().unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Method triple not found on tests::Doubler")
        );
    }

    #[tokio::test]
    async fn test_not_found_failures_carry_taxonomy_messages() {
        let dispatcher = Dispatcher::new(test_hub("test-dispatch-taxonomy"));

        let response = dispatcher
            .dispatch(call_envelope("tests::Missing", "double", vec![]))
            .await;
        let result: RemoteMethodResult = response.body().unwrap();
        assert_eq!(
            result.error_message,
            Some(ProcbusError::ComponentNotFound("tests::Missing".to_string()).to_string())
        );

        let response = dispatcher
            .dispatch(call_envelope("tests::Doubler", "triple", vec![]))
            .await;
        let result: RemoteMethodResult = response.body().unwrap();
        assert_eq!(
            result.error_message,
            Some(
                ProcbusError::MethodNotFound("triple".to_string(), "tests::Doubler".to_string())
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_dispatch_invocation_error_is_result_not_envelope_error() {
        let dispatcher = Dispatcher::new(test_hub("test-dispatch-badarg"));
        let response = dispatcher
            .dispatch(call_envelope(
                "tests::Doubler",
                "double",
                vec![r#""text""#.to_string()],
            ))
            .await;

        assert_eq!(response.kind, EnvelopeKind::MethodResult);
        let result: RemoteMethodResult = response.body().unwrap();
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("argument 0"));
    }

    #[tokio::test]
    async fn test_dispatch_malformed_call_body() {
        let dispatcher = Dispatcher::new(test_hub("test-dispatch-malformed"));
        let response = dispatcher
            .dispatch(Envelope::new(EnvelopeKind::MethodCall, "not json"))
            .await;

        assert_eq!(response.kind, EnvelopeKind::MethodResult);
        let result: RemoteMethodResult = response.body().unwrap();
        assert!(!result.success);
        assert!(result.error_message.unwrap().starts_with("malformed method call"));
    }

    #[tokio::test]
    async fn test_dispatch_get_component_probe() {
        let dispatcher = Dispatcher::new(test_hub("test-dispatch-probe"));

        let present = dispatcher
            .dispatch(Envelope::new(EnvelopeKind::GetComponent, "tests::Doubler"))
            .await;
        assert_eq!(present.kind, EnvelopeKind::ComponentStatus);
        assert_eq!(present.payload, "true");

        let absent = dispatcher
            .dispatch(Envelope::new(EnvelopeKind::GetComponent, "tests::Missing"))
            .await;
        assert_eq!(absent.payload, "false");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_kind() {
        let dispatcher = Dispatcher::new(test_hub("test-dispatch-unknown"));
        let response = dispatcher
            .dispatch(Envelope::new(EnvelopeKind::List, ""))
            .await;
        assert_eq!(response.kind, EnvelopeKind::Error);
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown() {
        let hub = test_hub("test-dispatch-shutdown");
        let dispatcher = Dispatcher::new(hub.clone());
        hub.shutdown().await;

        let response = dispatcher
            .dispatch(call_envelope("tests::Doubler", "double", vec!["1".to_string()]))
            .await;
        assert_eq!(response.kind, EnvelopeKind::Error);
        assert_eq!(response.payload, "component hub is deactivated");
    }
}
