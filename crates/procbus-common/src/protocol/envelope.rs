use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::protocol::error::{ProcbusError, Result};

/// Kind tag of a wire envelope.
///
/// Every exchange is one request envelope answered by exactly one response
/// envelope. The payload shape depends on the kind:
///
/// | Kind              | Payload                                  |
/// |-------------------|------------------------------------------|
/// | `Register`        | JSON [`ProcessRecord`](super::ProcessRecord) |
/// | `RegisterAck`     | `"OK"`                                   |
/// | `List`            | empty                                    |
/// | `ListResponse`    | JSON array of process records            |
/// | `Heartbeat`       | endpoint name, verbatim                  |
/// | `HeartbeatAck`    | `"OK"`                                   |
/// | `MethodCall`      | JSON [`RemoteMethodCall`](super::RemoteMethodCall) |
/// | `MethodResult`    | JSON [`RemoteMethodResult`](super::RemoteMethodResult) |
/// | `GetComponent`    | capability name, verbatim                |
/// | `ComponentStatus` | `"true"` / `"false"`                     |
/// | `Error`           | human-readable message                   |
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EnvelopeKind {
    Register,
    RegisterAck,
    List,
    ListResponse,
    Heartbeat,
    HeartbeatAck,
    MethodCall,
    MethodResult,
    GetComponent,
    ComponentStatus,
    Error,
}

/// The outermost wire message: a kind tag plus an opaque serialized body.
///
/// Serialized as `{"kind": <string>, "payload": <string>}` and framed as one
/// line of JSON per direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    pub payload: String,
}

impl Envelope {
    /// Creates an envelope with a verbatim string payload.
    pub fn new(kind: EnvelopeKind, payload: impl Into<String>) -> Self {
        Envelope {
            kind,
            payload: payload.into(),
        }
    }

    /// Creates an envelope whose payload is the JSON serialization of `body`.
    pub fn with_body<T: Serialize>(kind: EnvelopeKind, body: &T) -> Result<Self> {
        Ok(Envelope {
            kind,
            payload: serde_json::to_string(body)?,
        })
    }

    /// Decodes the payload as JSON into the requested body type.
    pub fn body<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.payload)
            .map_err(|e| ProcbusError::Decode(format!("{:?} payload: {}", self.kind, e)))
    }
}
