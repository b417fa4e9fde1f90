use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcbusError {
    #[error("Connect timeout: {0} unreachable within {1}ms")]
    ConnectTimeout(String, u64),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol decode error: {0}")]
    Decode(String),

    #[error("Component {0} not found")]
    ComponentNotFound(String),

    #[error("Method {0} not found on {1}")]
    MethodNotFound(String, String),

    #[error("Argument deserialization error: {0}")]
    ArgumentDeserialization(String),

    #[error("Invocation error: {0}")]
    Invocation(String),

    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    #[error("Component hub is deactivated")]
    Deactivated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProcbusError>;
