/// NitricTask is a unit of work placed on a queue.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NitricTask {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    /// Lease held on a received task, required to complete it.
    #[prost(string, tag = "2")]
    pub lease_id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub payload_type: ::prost::alloc::string::String,
    /// JSON encoded payload.
    #[prost(bytes = "bytes", tag = "4")]
    pub payload: ::prost::bytes::Bytes,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendRequest {
    #[prost(string, tag = "1")]
    pub queue: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub task: ::core::option::Option<NitricTask>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendResponse {}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReceiveRequest {
    #[prost(string, tag = "1")]
    pub queue: ::prost::alloc::string::String,
    /// Maximum number of tasks to receive. Zero receives a single task.
    #[prost(uint32, tag = "2")]
    pub depth: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReceiveResponse {
    #[prost(message, repeated, tag = "1")]
    pub tasks: ::prost::alloc::vec::Vec<NitricTask>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CompleteRequest {
    #[prost(string, tag = "1")]
    pub queue: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub lease_id: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CompleteResponse {}
