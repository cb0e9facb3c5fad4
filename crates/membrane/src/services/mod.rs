//! gRPC services which forward capability calls to their plugins.
//!
//! Every service is served whether or not its plugin is registered.
//! Calls to a service without a plugin fail with `Unimplemented`.

mod document;
mod event;
mod kv;
mod queue;
mod storage;
mod user;

pub use document::DocumentService;
pub use event::{EventService, TopicService};
pub use kv::KeyValueService;
pub use queue::QueueService;
pub use storage::StorageService;
pub use user::UserService;

use bytes::Bytes;
use tonic::Status;

fn not_registered(name: &str) -> Status {
    Status::unimplemented(format!("{name} plugin not registered"))
}

// Map a plugin error into a Status. A Status returned by the plugin is passed through.
fn map_status(message: &'static str, err: anyhow::Error) -> Status {
    match err.downcast::<Status>() {
        Ok(status) => status,
        Err(err) => Status::internal(format!("{:#}", err.context(message))),
    }
}

fn parse_json(field: &str, content: &[u8]) -> tonic::Result<serde_json::Value> {
    serde_json::from_slice(content)
        .map_err(|err| Status::invalid_argument(format!("{field} must be valid JSON: {err}")))
}

fn to_json(value: &serde_json::Value) -> Bytes {
    Bytes::from(value.to_string())
}
