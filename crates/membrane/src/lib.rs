//! The membrane is a sidecar which hosts a user function.
//!
//! It receives triggers through a [`Gateway`], normalizes them, and
//! dispatches each to the function, either as an HTTP request to a child
//! process or over the TriggerStream of a connected function runtime.
//! It also serves the capability APIs (documents, storage, queue, events,
//! users, key-value) which the function calls, forwarding each to the
//! plugin registered for it.

pub mod child;
pub mod config;
pub mod faas;
pub mod gateway;
mod membrane;
pub mod plugins;
pub mod pool;
pub mod services;
pub mod trigger;
pub mod worker;

pub use config::Args;
pub use gateway::{Gateway, Handler, HttpForwarder, HttpGateway};
pub use membrane::{
    ConfigError, DispatchMode, Membrane, MembraneOptions, DEFAULT_CHILD_ADDRESS,
    DEFAULT_CHILD_TIMEOUT, DEFAULT_SERVICE_ADDRESS,
};
pub use pool::{PoolError, PoolOptions, WorkerPool};
pub use trigger::{NormalizedRequest, NormalizedResponse, SourceType, TriggerContext};
