use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

// Services of the `nitric.v1` package. Messages are defined in the
// proto-nitric crate, so stubs are generated without invoking protoc.
fn main() {
    let faas = Service::builder()
        .name("Faas")
        .package("nitric.v1")
        .comment("Faas is served by the membrane and called by function runtimes.")
        .method(
            Method::builder()
                .name("trigger_stream")
                .route_name("TriggerStream")
                .comment("Long-lived stream over which a runtime receives triggers.")
                .input_type("::proto_nitric::faas::ClientMessage")
                .output_type("::proto_nitric::faas::ServerMessage")
                .codec_path(CODEC)
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .build();

    let services = vec![
        faas,
        unary_service(
            "Document",
            "document",
            &[("get", "Get"), ("set", "Set"), ("delete", "Delete")],
        ),
        unary_service(
            "Storage",
            "storage",
            &[("read", "Read"), ("write", "Write"), ("delete", "Delete")],
        ),
        unary_service(
            "Queue",
            "queue",
            &[("send", "Send"), ("receive", "Receive"), ("complete", "Complete")],
        ),
        unary_service("Event", "event", &[("publish", "Publish")]),
        unary_service("Topic", "event", &[("list", "List")]),
        unary_service("User", "user", &[("create", "Create"), ("delete", "Delete")]),
        unary_service(
            "KeyValue",
            "kv",
            &[("get", "Get"), ("put", "Put"), ("delete", "Delete")],
        ),
    ];

    Builder::new().compile(&services);
    println!("cargo:rerun-if-changed=build.rs");
}

// Build a service of unary methods, where method `Foo` takes
// `proto_nitric::{module}::FooRequest` and returns `FooResponse`.
// Topic.List is the exception, and maps to ListTopics{Request,Response}.
fn unary_service(name: &str, module: &str, methods: &[(&str, &str)]) -> Service {
    let mut service = Service::builder().name(name).package("nitric.v1");

    for (method, route) in methods {
        let message = if name == "Topic" {
            "ListTopics".to_string()
        } else {
            route.to_string()
        };

        service = service.method(
            Method::builder()
                .name(method)
                .route_name(route)
                .input_type(format!("::proto_nitric::{module}::{message}Request"))
                .output_type(format!("::proto_nitric::{module}::{message}Response"))
                .codec_path(CODEC)
                .build(),
        );
    }
    service.build()
}
