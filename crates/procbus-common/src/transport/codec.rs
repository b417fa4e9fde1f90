use crate::protocol::error::{ProcbusError, Result};
use crate::protocol::Envelope;

/// Codec for the line-oriented envelope framing.
///
/// Each direction of an exchange carries exactly one envelope, serialized as
/// a single line of JSON. Arbitrarily large payloads are safe because JSON
/// string escaping can never emit a raw newline.
///
/// # Example
///
/// ```
/// use procbus_common::{Envelope, EnvelopeKind, LineCodec};
///
/// let envelope = Envelope::new(EnvelopeKind::Heartbeat, "procbus-42");
/// let line = LineCodec::encode(&envelope).unwrap();
/// let decoded = LineCodec::decode(&line).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
pub struct LineCodec;

impl LineCodec {
    /// Encodes an envelope as one line of JSON, without the trailing newline.
    pub fn encode(envelope: &Envelope) -> Result<String> {
        Ok(serde_json::to_string(envelope)?)
    }

    /// Decodes one received line into an envelope.
    ///
    /// The caller strips the line delimiter; leading/trailing whitespace is
    /// tolerated.
    pub fn decode(line: &str) -> Result<Envelope> {
        serde_json::from_str(line.trim())
            .map_err(|e| ProcbusError::Decode(format!("malformed envelope: {e}")))
    }
}
