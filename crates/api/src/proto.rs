//! Generated gRPC types and service trait, compiled from `proto/nexum.proto`
//! by `build.rs`.

tonic::include_proto!("nexum");
