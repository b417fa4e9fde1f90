use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::cancel::ShutdownToken;
use crate::endpoint::{socket_dir, socket_path};
use crate::protocol::error::{ProcbusError, Result};
use crate::protocol::{Envelope, EnvelopeKind};

/// Bounded wait for in-flight connection handlers during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// One-shot exchange server over a Unix domain socket.
///
/// For every accepted connection the server reads exactly one request
/// envelope, passes it to the handler, writes the single response envelope
/// and closes the connection. Each connection is handed to its own task
/// immediately so the accept loop can re-open listening without waiting for
/// the exchange to finish.
///
/// Per-connection state machine: Accepted → Reading request →
/// {Dispatching → Writing response} | {Malformed → Writing Error response}
/// → Closed. Terminal on any path; no retries within a connection.
pub struct IpcServer {
    listener: UnixListener,
    path: PathBuf,
}

impl IpcServer {
    /// Binds an endpoint name, creating the socket directory and unlinking a
    /// stale socket left behind by a dead process.
    pub async fn bind(endpoint: &str) -> Result<Self> {
        let dir = socket_dir();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ProcbusError::Connection(format!("creating {}: {}", dir.display(), e)))?;

        let path = socket_path(endpoint);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                ProcbusError::Connection(format!("unlinking stale socket {}: {}", path.display(), e))
            })?;
        }

        let listener = UnixListener::bind(&path).map_err(|e| {
            ProcbusError::Connection(format!("Failed to bind {}: {}", path.display(), e))
        })?;

        Ok(IpcServer { listener, path })
    }

    /// Runs the accept loop until the shutdown token is cancelled.
    ///
    /// Every accepted connection is spawned into a `JoinSet` so shutdown can
    /// wait for in-flight exchanges. Cancellation stops future accepts; the
    /// drain of already-dispatched handlers is bounded by a 2s grace, after
    /// which remaining handlers are aborted and shutdown proceeds regardless.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Cancellation signal for the loop
    /// * `handler` - Turns a request envelope into the response envelope
    pub async fn run_with_handler<F, Fut>(self, shutdown: ShutdownToken, handler: F) -> Result<()>
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Envelope> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let mut connections: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                // Opportunistically reap finished handlers so the set does
                // not grow without bound on a long-lived listener.
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            debug!("connection accepted on {}", self.path.display());
                            let handler = handler.clone();
                            connections.spawn(async move {
                                if let Err(e) = handle_connection(stream, handler).await {
                                    warn!("connection handler error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            warn!("accept error on {}: {}", self.path.display(), e);
                        }
                    }
                }
            }
        }

        let drain = async {
            while connections.join_next().await.is_some() {}
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!(
                "shutdown grace elapsed with connection handlers still in flight on {}",
                self.path.display()
            );
            connections.abort_all();
        }

        let _ = std::fs::remove_file(&self.path);
        Ok(())
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Handles one accepted connection: one request in, one response out.
///
/// A malformed request produces an `Error` envelope rather than an abnormal
/// close; handler errors are the handler's own concern (it always produces a
/// response envelope).
async fn handle_connection<F, Fut>(stream: UnixStream, handler: Arc<F>) -> Result<()>
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Envelope> + Send + 'static,
{
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|e| ProcbusError::Connection(format!("reading request: {e}")))?;
    if read == 0 {
        // Peer connected and went away without sending anything.
        return Ok(());
    }

    let response = match crate::transport::codec::LineCodec::decode(&line) {
        Ok(request) => handler(request).await,
        Err(e) => Envelope::new(EnvelopeKind::Error, e.to_string()),
    };

    let encoded = crate::transport::codec::LineCodec::encode(&response)?;
    write_half
        .write_all(encoded.as_bytes())
        .await
        .map_err(|e| ProcbusError::Connection(format!("writing response: {e}")))?;
    write_half
        .write_all(b"\n")
        .await
        .map_err(|e| ProcbusError::Connection(format!("writing response delimiter: {e}")))?;
    write_half
        .flush()
        .await
        .map_err(|e| ProcbusError::Connection(format!("flushing response: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ipc::IpcTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static ENDPOINT_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn test_endpoint(tag: &str) -> String {
        let id = ENDPOINT_COUNTER.fetch_add(1, Ordering::SeqCst);
        format!("procbus-test-{}-{}-{}", tag, std::process::id(), id)
    }

    fn spawn_echo_server(endpoint: &str) -> ShutdownToken {
        let shutdown = ShutdownToken::new();
        let token = shutdown.clone();
        let endpoint = endpoint.to_string();
        tokio::spawn(async move {
            let server = IpcServer::bind(&endpoint).await.unwrap();
            server
                .run_with_handler(token, |request| async move {
                    Envelope::new(EnvelopeKind::MethodResult, request.payload)
                })
                .await
                .unwrap();
        });
        shutdown
    }

    #[tokio::test]
    async fn test_one_shot_exchange() {
        let endpoint = test_endpoint("echo");
        let shutdown = spawn_echo_server(&endpoint);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let request = Envelope::new(EnvelopeKind::MethodCall, "ping");
        let response = IpcTransport::request(&endpoint, &request, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(response.kind, EnvelopeKind::MethodResult);
        assert_eq!(response.payload, "ping");
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_malformed_request_yields_error_envelope() {
        let endpoint = test_endpoint("malformed");
        let shutdown = spawn_echo_server(&endpoint);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stream = IpcTransport::connect(&socket_path(&endpoint), Duration::from_secs(1))
            .await
            .unwrap();
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(b"this is not json\n").await.unwrap();

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let response = crate::transport::codec::LineCodec::decode(&line).unwrap();

        assert_eq!(response.kind, EnvelopeKind::Error);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_concurrent_exchanges() {
        let endpoint = test_endpoint("concurrent");
        let shutdown = spawn_echo_server(&endpoint);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut tasks = Vec::new();
        for i in 0..8 {
            let endpoint = endpoint.clone();
            tasks.push(tokio::spawn(async move {
                let request = Envelope::new(EnvelopeKind::MethodCall, format!("m{i}"));
                IpcTransport::request(&endpoint, &request, Duration::from_secs(1))
                    .await
                    .unwrap()
            }));
        }
        for (i, task) in tasks.into_iter().enumerate() {
            let response = task.await.unwrap();
            assert_eq!(response.payload, format!("m{i}"));
        }
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let endpoint = test_endpoint("shutdown");
        let shutdown = spawn_echo_server(&endpoint);
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let request = Envelope::new(EnvelopeKind::MethodCall, "late");
        let result = IpcTransport::request(&endpoint, &request, Duration::from_millis(200)).await;
        assert!(result.is_err());
    }
}
