//! Off-thread geometry operations behind a `{type, id, payload}` message
//! protocol: boolean CSG, stride simplification, normal computation,
//! extrusion and lathe.
//!
//! [`handle_request`] and [`handle_message`] are stateless and can be called
//! directly. [`GeometryWorker`] runs them on dedicated threads and correlates
//! responses by request id.

mod error;
mod handler;
mod pool;
pub mod protocol;
pub mod transport;

pub use error::WorkerError;
pub use handler::{handle_message, handle_request};
pub use pool::GeometryWorker;
pub use protocol::{
    BooleanPayload, ExtrudePayload, LathePayload, NormalsPayload, Operation, OperationResult,
    PointEnvelope, RawRequest, RequestId, SimplifyPayload, WorkerRequest, WorkerResponse,
};
pub use transport::{
    AttributeEnvelope, AttributesEnvelope, GeometryEnvelope, IndexEnvelope, MaterialEnvelope,
    MeshEnvelope,
};
