pub mod calls;
pub mod envelope;
pub mod error;
pub mod record;

pub use calls::{RemoteMethodCall, RemoteMethodResult};
pub use envelope::{Envelope, EnvelopeKind};
pub use error::{ProcbusError, Result};
pub use record::{ComponentDescriptor, ProcessRecord, HEARTBEAT_TIMEOUT};
