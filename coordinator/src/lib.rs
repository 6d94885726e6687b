//! Query classification, routing, fan-out and fusion behind a gRPC search
//! service.
//!
//! Split into a library (this crate root) and a thin `main.rs` binary so the
//! gateway can depend on the generated [`proto`] client/message types
//! without relinking the whole server — the same reason
//! `demos/tonic-resilient-greeter` keeps its `greeter` proto module
//! reusable between `client.rs` and `server.rs`, just promoted one level to
//! a real library since two separate binaries (not two `bin`s in one
//! crate) need it here.

pub mod config;
pub mod convert;
pub mod service;

/// Generated message and client/server types for `proto/search.proto`.
pub mod proto {
    tonic::include_proto!("search");

    /// Encoded `FileDescriptorSet`, registered with the reflection service so
    /// `grpcurl`/`evans` can discover `SearchService` without a local `.proto`
    /// copy (§6: "reflection enabled").
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("search_descriptor");
}
