//! tonic clients and servers of the `nitric.v1` services.
//!
//! Each module holds a `{service}_client` and `{service}_server` module,
//! generated at build time over the messages of the proto-nitric crate.

pub mod document {
    include!(concat!(env!("OUT_DIR"), "/nitric.v1.Document.rs"));
}
pub mod event {
    include!(concat!(env!("OUT_DIR"), "/nitric.v1.Event.rs"));
    include!(concat!(env!("OUT_DIR"), "/nitric.v1.Topic.rs"));
}
pub mod faas {
    include!(concat!(env!("OUT_DIR"), "/nitric.v1.Faas.rs"));
}
pub mod kv {
    include!(concat!(env!("OUT_DIR"), "/nitric.v1.KeyValue.rs"));
}
pub mod queue {
    include!(concat!(env!("OUT_DIR"), "/nitric.v1.Queue.rs"));
}
pub mod storage {
    include!(concat!(env!("OUT_DIR"), "/nitric.v1.Storage.rs"));
}
pub mod user {
    include!(concat!(env!("OUT_DIR"), "/nitric.v1.User.rs"));
}
