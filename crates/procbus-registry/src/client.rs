use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info, warn};

use procbus_common::endpoint::REGISTRY_ENDPOINT;
use procbus_common::{
    Envelope, EnvelopeKind, IpcTransport, ProcbusError, ProcessRecord, Result,
};

use crate::server::{RegistryHandle, RegistryServer};

/// Connect timeout for registry exchanges; the registry lives on the same
/// host, so a short bound suffices.
const REGISTRY_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Settle delay after bootstrapping an in-process registry server.
const BOOTSTRAP_SETTLE: Duration = Duration::from_millis(500);

/// Per-process registry access: publish, heartbeat, discover.
///
/// All interactions are best-effort. A consumer that cannot reach the
/// registry degrades to "component not found" rather than failing hard.
///
/// # Bootstrap
///
/// If [`register`](Self::register) cannot reach a registry server within the
/// connect bound, this client starts one in-process, keeps its handle alive
/// for the client's lifetime and retries the registration exactly once —
/// the first process on the host that needs a registry becomes its host.
pub struct RegistryClient {
    registry_endpoint: String,
    bootstrapped: Mutex<Option<RegistryHandle>>,
}

impl RegistryClient {
    /// Creates a client for the host's well-known registry endpoint.
    pub fn new() -> Self {
        Self::with_endpoint(REGISTRY_ENDPOINT)
    }

    /// Creates a client for a caller-supplied registry endpoint (test
    /// isolation).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        RegistryClient {
            registry_endpoint: endpoint.into(),
            bootstrapped: Mutex::new(None),
        }
    }

    /// Whether this client is hosting the registry server it bootstrapped.
    pub fn is_registry_host(&self) -> bool {
        self.bootstrapped
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Publishes a process record, bootstrapping a registry if none answers.
    ///
    /// On connect timeout the client starts an in-process registry server,
    /// waits briefly for it to become ready and retries once. Any other
    /// failure is logged and returned; the caller proceeds without
    /// discovery.
    pub async fn register(&self, record: &ProcessRecord) -> Result<()> {
        match self.try_register(record).await {
            Ok(()) => Ok(()),
            Err(ProcbusError::ConnectTimeout(_, _)) => {
                info!("no registry server found, starting one in this process");
                let server = RegistryServer::bind_at(&self.registry_endpoint).await?;
                let handle = server.spawn();
                {
                    let mut slot = self.bootstrapped.lock().unwrap_or_else(|e| e.into_inner());
                    *slot = Some(handle);
                }
                tokio::time::sleep(BOOTSTRAP_SETTLE).await;
                self.try_register(record).await
            }
            Err(e) => {
                warn!("registration failed: {e}");
                Err(e)
            }
        }
    }

    async fn try_register(&self, record: &ProcessRecord) -> Result<()> {
        let request = Envelope::with_body(EnvelopeKind::Register, record)?;
        let response = IpcTransport::request(
            &self.registry_endpoint,
            &request,
            REGISTRY_CONNECT_TIMEOUT,
        )
        .await?;

        match response.kind {
            EnvelopeKind::RegisterAck => Ok(()),
            other => Err(ProcbusError::Registration(format!(
                "registry answered {:?} instead of an ack: {}",
                other, response.payload
            ))),
        }
    }

    /// Lists the currently active processes.
    ///
    /// Never fails toward the caller: any transport or protocol error is
    /// logged and yields an empty sequence.
    pub async fn list_active(&self) -> Vec<ProcessRecord> {
        let request = Envelope::new(EnvelopeKind::List, "");
        let response = match IpcTransport::request(
            &self.registry_endpoint,
            &request,
            REGISTRY_CONNECT_TIMEOUT,
        )
        .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("listing active processes failed: {e}");
                return Vec::new();
            }
        };

        if response.kind != EnvelopeKind::ListResponse {
            warn!(
                "registry answered {:?} instead of a list: {}",
                response.kind, response.payload
            );
            return Vec::new();
        }

        match response.body::<Vec<ProcessRecord>>() {
            Ok(records) => records,
            Err(e) => {
                warn!("decoding active process list failed: {e}");
                Vec::new()
            }
        }
    }

    /// Sends one heartbeat for an endpoint.
    ///
    /// Idempotent; the registry acks even for endpoints it does not know.
    /// Missing heartbeats beyond the liveness window silently drop the
    /// process from `List` results.
    pub async fn heartbeat(&self, endpoint: &str) -> Result<()> {
        let request = Envelope::new(EnvelopeKind::Heartbeat, endpoint);
        let response = IpcTransport::request(
            &self.registry_endpoint,
            &request,
            REGISTRY_CONNECT_TIMEOUT,
        )
        .await?;

        if response.kind != EnvelopeKind::HeartbeatAck {
            debug!(
                "heartbeat answered with {:?}: {}",
                response.kind, response.payload
            );
        }
        Ok(())
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}
