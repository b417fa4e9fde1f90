use std::any::{Any, TypeId};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use procbus_common::endpoint::{process_endpoint, process_name};
use procbus_common::{
    ComponentDescriptor, IpcServer, ProcbusError, ProcessRecord, Result, ShutdownToken,
};
use procbus_registry::RegistryClient;

use crate::component::Component;
use crate::dispatch::Dispatcher;
use crate::lifecycle::{FixedTickable, Releasable, Startable, Tickable};
use crate::methods::MethodTable;

/// Bounded wait for an owned background loop to exit after cancellation.
const LOOP_STOP_GRACE: Duration = Duration::from_secs(2);

/// Period of the heartbeat emitter, comfortably inside the 30s liveness
/// window.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// One registered component as seen by the dispatcher.
pub(crate) struct Entry {
    pub(crate) type_name: String,
    pub(crate) methods: MethodTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HubState {
    /// Constructed, remote listener not started.
    Idle,
    /// Remote listener running, external access served.
    Serving,
    /// Shut down; permanently rejects external access. Distinct from
    /// never-started.
    Deactivated,
}

struct LoopHandle {
    shutdown: ShutdownToken,
    task: JoinHandle<()>,
}

/// Process-local service locator and lifecycle coordinator.
///
/// Explicitly constructed and explicitly owned — there is no process-wide
/// singleton. Clones share the same underlying hub; thread one through the
/// components that need it.
///
/// # Concurrency
///
/// The capability maps support concurrent dispatch lookups and registration
/// writes. Consistency per key is last-writer-wins: registering a component
/// under interface X overwrites any prior mapping for X.
#[derive(Clone)]
pub struct ComponentHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    endpoint: String,
    process_name: String,
    process_id: u32,
    state: Mutex<HubState>,
    /// Every exposed capability name (concrete type and interfaces) →
    /// dispatch entry.
    routes: DashMap<String, Arc<Entry>>,
    /// Typed local lookup handles keyed by the `Arc<I>` handle type.
    lookups: DashMap<TypeId, Box<dyn Any + Send + Sync>>,
    descriptors: Mutex<Vec<ComponentDescriptor>>,
    startables: Mutex<Vec<Arc<dyn Startable>>>,
    tickables: Mutex<Vec<Arc<dyn Tickable>>>,
    fixed_tickables: Mutex<Vec<Arc<dyn FixedTickable>>>,
    /// Release order list; drained in reverse during shutdown.
    releasables: Mutex<Vec<(String, Arc<dyn Releasable>)>>,
    listener: Mutex<Option<LoopHandle>>,
    heartbeat: Mutex<Option<LoopHandle>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ComponentHub {
    /// Creates a hub for this process, with the endpoint derived from the
    /// OS process id.
    pub fn new() -> Self {
        Self::with_endpoint(process_endpoint())
    }

    /// Creates a hub listening on a caller-supplied endpoint name (test
    /// isolation; production hubs use the derived per-process endpoint).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        ComponentHub {
            inner: Arc::new(HubInner {
                endpoint: endpoint.into(),
                process_name: process_name(),
                process_id: std::process::id(),
                state: Mutex::new(HubState::Idle),
                routes: DashMap::new(),
                lookups: DashMap::new(),
                descriptors: Mutex::new(Vec::new()),
                startables: Mutex::new(Vec::new()),
                tickables: Mutex::new(Vec::new()),
                fixed_tickables: Mutex::new(Vec::new()),
                releasables: Mutex::new(Vec::new()),
                listener: Mutex::new(None),
                heartbeat: Mutex::new(None),
            }),
        }
    }

    /// This hub's inbound endpoint name.
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Whether the hub still serves external access.
    pub fn is_active(&self) -> bool {
        *locked(&self.inner.state) != HubState::Deactivated
    }

    /// Registers a component under its concrete type and every declared
    /// interface.
    ///
    /// Last-registered wins per capability key; there is no multi-binding.
    /// Lifecycle attachments go to their ordered lists and never become
    /// lookup keys.
    pub fn register(&self, component: Component) -> Result<()> {
        if !self.is_active() {
            return Err(ProcbusError::Deactivated);
        }

        let Component {
            type_name,
            interfaces,
            methods,
            lookups,
            startable,
            tickable,
            fixed_tickable,
            releasable,
        } = component;

        let entry = Arc::new(Entry {
            type_name: type_name.clone(),
            methods,
        });

        self.inner.routes.insert(type_name.clone(), entry.clone());
        for interface in &interfaces {
            self.inner.routes.insert(interface.clone(), entry.clone());
            info!("registered: {} -> {}", interface, type_name);
        }

        for (type_id, handle) in lookups {
            self.inner.lookups.insert(type_id, handle);
        }

        locked(&self.inner.descriptors).push(ComponentDescriptor {
            type_name: type_name.clone(),
            interfaces,
        });

        if let Some(startable) = startable {
            locked(&self.inner.startables).push(startable);
        }
        if let Some(tickable) = tickable {
            locked(&self.inner.tickables).push(tickable);
        }
        if let Some(fixed_tickable) = fixed_tickable {
            locked(&self.inner.fixed_tickables).push(fixed_tickable);
        }
        if let Some(releasable) = releasable {
            debug!("release tracked: {type_name}");
            locked(&self.inner.releasables).push((type_name, releasable));
        }

        Ok(())
    }

    /// Returns the registered instance for a capability, or `None`.
    ///
    /// Never fails; a miss and a deactivated hub both yield `None`. `I` is
    /// the handle type the component was exposed as — the concrete type or
    /// a `dyn` interface:
    ///
    /// ```ignore
    /// let service = hub.get::<dyn TaskService>();
    /// ```
    pub fn get<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        if !self.is_active() {
            return None;
        }
        self.inner
            .lookups
            .get(&TypeId::of::<Arc<I>>())
            .and_then(|handle| handle.value().downcast_ref::<Arc<I>>().cloned())
    }

    /// Resolves a capability name to its dispatch entry: full qualified
    /// name first, simple-name fallback.
    pub(crate) fn resolve_entry(&self, name: &str) -> Option<Arc<Entry>> {
        if let Some(entry) = self.inner.routes.get(name) {
            return Some(entry.value().clone());
        }
        self.inner
            .routes
            .iter()
            .find(|kv| kv.key().rsplit("::").next() == Some(name))
            .map(|kv| kv.value().clone())
    }

    /// Starts every registered startable concurrently and waits for all.
    ///
    /// A single failing start aborts initialization; there is no
    /// partial-success mode.
    pub async fn initialize(&self, shutdown: ShutdownToken) -> Result<()> {
        let startables: Vec<_> = locked(&self.inner.startables).clone();
        info!("initializing {} startable component(s)", startables.len());

        futures::future::try_join_all(
            startables
                .iter()
                .map(|startable| startable.start(shutdown.clone())),
        )
        .await?;

        info!("initialization complete");
        Ok(())
    }

    /// Invokes every tickable once, in registration order.
    pub fn tick(&self) {
        for tickable in locked(&self.inner.tickables).iter() {
            tickable.tick();
        }
    }

    /// Invokes every fixed-tickable once, in registration order.
    pub fn fixed_tick(&self) {
        for fixed_tickable in locked(&self.inner.fixed_tickables).iter() {
            fixed_tickable.fixed_tick();
        }
    }

    /// Descriptors of the remotely invocable components, for the process
    /// record.
    pub fn descriptors(&self) -> Vec<ComponentDescriptor> {
        locked(&self.inner.descriptors).clone()
    }

    /// Builds this process's registry record from the current registrations.
    pub fn process_record(&self) -> ProcessRecord {
        ProcessRecord {
            process_id: self.inner.process_id,
            process_name: self.inner.process_name.clone(),
            endpoint: self.inner.endpoint.clone(),
            last_heartbeat: Utc::now(),
            components: self.descriptors(),
        }
    }

    /// Starts the remote listener, publishes this process to the registry
    /// and begins heartbeating.
    ///
    /// Idempotent while serving. Registration is best-effort: if the
    /// registry cannot be reached (and cannot be bootstrapped), the hub
    /// keeps serving and the process is simply not discoverable.
    pub async fn serve(&self, registry: Arc<RegistryClient>) -> Result<()> {
        if !self.is_active() {
            return Err(ProcbusError::Deactivated);
        }
        if locked(&self.inner.listener).is_some() {
            return Ok(());
        }

        let server = IpcServer::bind(&self.inner.endpoint).await?;
        let dispatcher = Dispatcher::new(self.clone());
        let shutdown = ShutdownToken::new();
        let token = shutdown.clone();

        let endpoint = self.inner.endpoint.clone();
        let task = tokio::spawn(async move {
            let result = server
                .run_with_handler(token, move |request| {
                    let dispatcher = dispatcher.clone();
                    async move { dispatcher.dispatch(request).await }
                })
                .await;
            if let Err(e) = result {
                error!("remote listener on {endpoint} failed: {e}");
            }
        });
        *locked(&self.inner.listener) = Some(LoopHandle { shutdown, task });
        *locked(&self.inner.state) = HubState::Serving;
        info!("remote listener started on {}", self.inner.endpoint);

        if let Err(e) = registry.register(&self.process_record()).await {
            warn!("registry publication failed, proceeding without discovery: {e}");
        }

        let heartbeat_shutdown = ShutdownToken::new();
        let heartbeat_token = heartbeat_shutdown.clone();
        let endpoint = self.inner.endpoint.clone();
        let heartbeat_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                tokio::select! {
                    _ = heartbeat_token.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = registry.heartbeat(&endpoint).await {
                            debug!("heartbeat failed: {e}");
                        }
                    }
                }
            }
        });
        *locked(&self.inner.heartbeat) = Some(LoopHandle {
            shutdown: heartbeat_shutdown,
            task: heartbeat_task,
        });

        Ok(())
    }

    /// Orderly shutdown.
    ///
    /// Cancels the owned background loops (heartbeat emitter, remote
    /// listener) with bounded waits, releases registered resources in
    /// strict reverse registration order — continuing past individual
    /// failures — then clears all mappings. Afterwards the hub is
    /// permanently deactivated.
    pub async fn shutdown(&self) {
        {
            let mut state = locked(&self.inner.state);
            if *state == HubState::Deactivated {
                return;
            }
            *state = HubState::Deactivated;
        }
        info!("shutting down component hub on {}", self.inner.endpoint);

        let heartbeat = locked(&self.inner.heartbeat).take();
        if let Some(handle) = heartbeat {
            stop_loop(handle, "heartbeat emitter").await;
        }
        let listener = locked(&self.inner.listener).take();
        if let Some(handle) = listener {
            stop_loop(handle, "remote listener").await;
        }

        let releasables = std::mem::take(&mut *locked(&self.inner.releasables));
        for (type_name, releasable) in releasables.iter().rev() {
            debug!("releasing: {type_name}");
            if let Err(e) = releasable.release() {
                warn!("release of {type_name} failed, continuing: {e}");
            }
        }

        self.inner.routes.clear();
        self.inner.lookups.clear();
        locked(&self.inner.descriptors).clear();
        locked(&self.inner.startables).clear();
        locked(&self.inner.tickables).clear();
        locked(&self.inner.fixed_tickables).clear();

        info!("component hub shut down");
    }
}

impl Default for ComponentHub {
    fn default() -> Self {
        Self::new()
    }
}

async fn stop_loop(handle: LoopHandle, what: &str) {
    handle.shutdown.cancel();
    if tokio::time::timeout(LOOP_STOP_GRACE, handle.task)
        .await
        .is_err()
    {
        warn!("{what} did not exit within the stop grace");
    }
}
