//! Message types of the `nitric.v1` protobuf package.
//!
//! JSON documents, task payloads and event payloads travel as UTF-8 JSON
//! within `bytes` fields.

pub mod document;
pub mod event;
pub mod faas;
pub mod kv;
pub mod queue;
pub mod storage;
pub mod user;
