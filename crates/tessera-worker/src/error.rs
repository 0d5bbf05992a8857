use std::time::Duration;

use tessera_mesh::GeometryError;

use crate::protocol::RequestId;

/// Everything that can go wrong between receiving a request and producing a
/// response. The `Display` text is what an `ERROR` response carries.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Unknown message type: {0}")]
    UnknownRequestType(String),

    #[error("Unsupported CSG operation: {0}")]
    UnknownOperation(String),

    #[error("malformed request: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),

    #[error("worker queue full ({budget} requests in flight)")]
    QueueFull { budget: usize },

    #[error("geometry worker has shut down")]
    Disconnected,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("request {id} timed out after {elapsed:?}")]
    Timeout { id: RequestId, elapsed: Duration },

    #[error("worker panicked: {0}")]
    Panicked(String),
}
