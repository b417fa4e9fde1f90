use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::endpoint::socket_path;
use crate::protocol::error::{ProcbusError, Result};
use crate::protocol::Envelope;
use crate::transport::codec::LineCodec;

/// Client side of the one-shot exchange transport.
///
/// Every call opens a fresh connection, sends one envelope, reads one
/// envelope back and closes the connection. A fresh connection per exchange
/// keeps concurrent callers independent of each other.
///
/// Failure to connect within the bound is a [`ProcbusError::ConnectTimeout`],
/// distinct from a protocol-level `Error` envelope returned by the peer.
pub struct IpcTransport;

impl IpcTransport {
    /// Connects to a socket path with a bounded wait.
    ///
    /// An absent peer (no socket, nobody listening) is reported the same way
    /// as a slow one: as a connect timeout.
    pub async fn connect(path: &Path, timeout: Duration) -> Result<UnixStream> {
        let attempt = UnixStream::connect(path);
        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                    Err(ProcbusError::ConnectTimeout(
                        path.display().to_string(),
                        timeout.as_millis() as u64,
                    ))
                }
                _ => Err(ProcbusError::Connection(format!(
                    "Failed to connect to {}: {}",
                    path.display(),
                    e
                ))),
            },
            Err(_) => Err(ProcbusError::ConnectTimeout(
                path.display().to_string(),
                timeout.as_millis() as u64,
            )),
        }
    }

    /// Runs one request/response exchange on a fresh connection.
    ///
    /// # Arguments
    ///
    /// * `stream` - A newly connected stream; consumed by the exchange
    /// * `request` - The envelope to send
    ///
    /// # Returns
    ///
    /// The single response envelope.
    pub async fn exchange(mut stream: UnixStream, request: &Envelope) -> Result<Envelope> {
        let line = LineCodec::encode(request)?;

        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ProcbusError::Connection(format!("writing request: {e}")))?;
        stream
            .write_all(b"\n")
            .await
            .map_err(|e| ProcbusError::Connection(format!("writing request delimiter: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| ProcbusError::Connection(format!("flushing request: {e}")))?;

        let mut reader = BufReader::new(stream);
        let mut response = String::new();
        let read = reader
            .read_line(&mut response)
            .await
            .map_err(|e| ProcbusError::Connection(format!("reading response: {e}")))?;
        if read == 0 {
            return Err(ProcbusError::Connection(
                "connection closed before a response was written".to_string(),
            ));
        }

        LineCodec::decode(&response)
    }

    /// Convenience: connect to an endpoint by name and run one exchange.
    pub async fn request(
        endpoint: &str,
        request: &Envelope,
        connect_timeout: Duration,
    ) -> Result<Envelope> {
        let path = socket_path(endpoint);
        let stream = Self::connect(&path, connect_timeout).await?;
        Self::exchange(stream, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EnvelopeKind;

    #[tokio::test]
    async fn test_connect_to_absent_endpoint_is_timeout() {
        let path = socket_path("procbus-test-nobody-home");
        let err = IpcTransport::connect(&path, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcbusError::ConnectTimeout(_, _)));
    }

    #[tokio::test]
    async fn test_request_to_absent_endpoint_is_timeout() {
        let envelope = Envelope::new(EnvelopeKind::List, "");
        let err =
            IpcTransport::request("procbus-test-nobody-home", &envelope, Duration::from_millis(200))
                .await
                .unwrap_err();
        assert!(matches!(err, ProcbusError::ConnectTimeout(_, _)));
    }
}
