//! Component registration descriptor.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::lifecycle::{FixedTickable, Releasable, Startable, Tickable};
use crate::methods::{MethodFuture, MethodTable};

/// Everything the hub needs to know about one component: its capability
/// names, its typed lookup handles, its remote method table and its
/// lifecycle attachments.
///
/// Built explicitly by the registering code — there is no runtime
/// reflection, so each exposure is declared:
///
/// ```ignore
/// let worker = Arc::new(TaskWorker::new());
/// let component = Component::new("demo::TaskWorker", worker.clone())
///     .interface::<dyn TaskService>(
///         "demo::TaskService",
///         worker.clone() as Arc<dyn TaskService>,
///     )
///     .method("submit", {
///         let worker = worker.clone();
///         move |args| {
///             let worker = worker.clone();
///             Box::pin(async move {
///                 let task = required_arg(&args, 0)?;
///                 encode_return(&worker.submit(task).await)
///             })
///         }
///     })
///     .tickable(worker);
/// hub.register(component)?;
/// ```
pub struct Component {
    pub(crate) type_name: String,
    pub(crate) interfaces: Vec<String>,
    pub(crate) methods: MethodTable,
    pub(crate) lookups: Vec<(TypeId, Box<dyn Any + Send + Sync>)>,
    pub(crate) startable: Option<Arc<dyn Startable>>,
    pub(crate) tickable: Option<Arc<dyn Tickable>>,
    pub(crate) fixed_tickable: Option<Arc<dyn FixedTickable>>,
    pub(crate) releasable: Option<Arc<dyn Releasable>>,
}

impl Component {
    /// Starts a descriptor for a concrete instance.
    ///
    /// The instance becomes locally retrievable as `Arc<C>` under its
    /// concrete type; `type_name` is the qualified name advertised to other
    /// processes.
    pub fn new<C: Send + Sync + 'static>(type_name: impl Into<String>, instance: Arc<C>) -> Self {
        Component {
            type_name: type_name.into(),
            interfaces: Vec::new(),
            methods: MethodTable::new(),
            lookups: vec![(TypeId::of::<Arc<C>>(), Box::new(instance))],
            startable: None,
            tickable: None,
            fixed_tickable: None,
            releasable: None,
        }
    }

    /// Exposes the component under an interface it implements.
    ///
    /// `handle` is the instance upcast to the interface object; it becomes
    /// locally retrievable as `Arc<I>` and the name is advertised for remote
    /// discovery. Lifecycle traits must not be exposed this way — they are
    /// attached with the dedicated builder methods and are never lookup
    /// keys.
    pub fn interface<I: ?Sized + Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        handle: Arc<I>,
    ) -> Self {
        self.interfaces.push(name.into());
        self.lookups.push((TypeId::of::<Arc<I>>(), Box::new(handle)));
        self
    }

    /// Adds a remotely invocable method to this component's table.
    pub fn method<F>(mut self, name: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(Vec<String>) -> MethodFuture + Send + Sync + 'static,
    {
        self.methods = std::mem::take(&mut self.methods).handler(name, invoker);
        self
    }

    pub fn startable(mut self, startable: Arc<dyn Startable>) -> Self {
        self.startable = Some(startable);
        self
    }

    pub fn tickable(mut self, tickable: Arc<dyn Tickable>) -> Self {
        self.tickable = Some(tickable);
        self
    }

    pub fn fixed_tickable(mut self, fixed_tickable: Arc<dyn FixedTickable>) -> Self {
        self.fixed_tickable = Some(fixed_tickable);
        self
    }

    pub fn releasable(mut self, releasable: Arc<dyn Releasable>) -> Self {
        self.releasable = Some(releasable);
        self
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("type_name", &self.type_name)
            .field("interfaces", &self.interfaces)
            .field("methods", &self.methods)
            .finish()
    }
}
