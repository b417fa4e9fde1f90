use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use procbus_common::endpoint::REGISTRY_ENDPOINT;
use procbus_common::{
    Envelope, EnvelopeKind, IpcServer, ProcessRecord, Result, ShutdownToken,
};

/// Bounded wait for the accept loop to exit after cancellation.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// The registry's record table, keyed by endpoint.
///
/// Pure state: all handlers take an explicit `now` so liveness filtering is
/// testable at the window boundary. Records are overwritten on
/// re-registration (last-write-wins) and never deleted.
#[derive(Debug, Default)]
pub struct RecordTable {
    records: HashMap<String, ProcessRecord>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or overwrites the record under its endpoint.
    pub fn register(&mut self, record: ProcessRecord) {
        info!(
            "process registered: {} (pid {}, endpoint {})",
            record.process_name, record.process_id, record.endpoint
        );
        self.records.insert(record.endpoint.clone(), record);
    }

    /// Refreshes the heartbeat of a known endpoint.
    ///
    /// Heartbeating an unknown endpoint is a no-op; the caller still acks.
    pub fn heartbeat(&mut self, endpoint: &str, now: DateTime<Utc>) {
        if let Some(record) = self.records.get_mut(endpoint) {
            record.last_heartbeat = now;
        }
    }

    /// All records whose last heartbeat is within the liveness window.
    ///
    /// Order is not significant.
    pub fn list_active(&self, now: DateTime<Utc>) -> Vec<ProcessRecord> {
        self.records
            .values()
            .filter(|record| record.is_active(now))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Turns one request envelope into its response envelope against the table.
///
/// Handles Register, Heartbeat and List; any other kind yields a generic
/// `Error` envelope. Heartbeats for unknown endpoints are acked without
/// creating a record (preserved quirk of the protocol).
pub fn handle_message(table: &RwLock<RecordTable>, request: Envelope) -> Envelope {
    match request.kind {
        EnvelopeKind::Register => match request.body::<ProcessRecord>() {
            Ok(record) => {
                let mut table = table.write().unwrap_or_else(|e| e.into_inner());
                table.register(record);
                Envelope::new(EnvelopeKind::RegisterAck, "OK")
            }
            Err(e) => Envelope::new(EnvelopeKind::Error, format!("malformed register: {e}")),
        },
        EnvelopeKind::Heartbeat => {
            let mut table = table.write().unwrap_or_else(|e| e.into_inner());
            table.heartbeat(&request.payload, Utc::now());
            Envelope::new(EnvelopeKind::HeartbeatAck, "OK")
        }
        EnvelopeKind::List => {
            let active = {
                let table = table.read().unwrap_or_else(|e| e.into_inner());
                table.list_active(Utc::now())
            };
            match Envelope::with_body(EnvelopeKind::ListResponse, &active) {
                Ok(envelope) => envelope,
                Err(e) => Envelope::new(EnvelopeKind::Error, format!("encoding list: {e}")),
            }
        }
        _ => Envelope::new(EnvelopeKind::Error, "Unknown message type"),
    }
}

/// The host's single name-service process.
///
/// Listens on one well-known endpoint; every accepted connection performs
/// exactly one request/response cycle, then the connection is released and
/// listening re-opens.
pub struct RegistryServer {
    records: Arc<RwLock<RecordTable>>,
    server: IpcServer,
    endpoint: String,
}

impl RegistryServer {
    /// Binds the well-known registry endpoint.
    pub async fn bind() -> Result<Self> {
        Self::bind_at(REGISTRY_ENDPOINT).await
    }

    /// Binds a caller-supplied endpoint name (test isolation).
    pub async fn bind_at(endpoint: &str) -> Result<Self> {
        let server = IpcServer::bind(endpoint).await?;
        Ok(RegistryServer {
            records: Arc::new(RwLock::new(RecordTable::new())),
            server,
            endpoint: endpoint.to_string(),
        })
    }

    /// Starts the accept loop as a background task.
    ///
    /// The returned handle owns the loop's cancellation signal; dropping it
    /// without [`RegistryHandle::stop`] leaves the loop running for the
    /// process's lifetime.
    pub fn spawn(self) -> RegistryHandle {
        let shutdown = ShutdownToken::new();
        let token = shutdown.clone();
        let records = self.records;
        let endpoint = self.endpoint;
        info!("registry server started on {endpoint}");

        let task = tokio::spawn(async move {
            let result = self
                .server
                .run_with_handler(token, move |request| {
                    let records = records.clone();
                    async move { handle_message(&records, request) }
                })
                .await;
            if let Err(e) = result {
                error!("registry accept loop failed: {e}");
            }
        });

        RegistryHandle { shutdown, task }
    }
}

/// Owner handle for a running registry accept loop.
pub struct RegistryHandle {
    shutdown: ShutdownToken,
    task: JoinHandle<()>,
}

impl RegistryHandle {
    /// Cancels the accept loop and waits (bounded) for it to exit.
    ///
    /// In-flight exchanges past the bound are not waited for further.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if tokio::time::timeout(STOP_GRACE, self.task).await.is_err() {
            warn!("registry accept loop did not exit within the stop grace");
        }
        info!("registry server stopped");
    }
}
