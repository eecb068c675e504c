//! `api` crate — gRPC surface.
//!
//! Exposes `NexumService` (see `proto/nexum.proto`):
//!   RegisterWorkflow, StartExecution, GetStatus, PollTask, CompleteTask, FailTask

pub mod error;
pub mod proto;
pub mod service;

use db::{BlobStore, DbPool};
use engine::EngineConfig;
use tower_http::trace::TraceLayer;

pub use service::NexumGrpcService;

/// Bind a `tonic` server exposing `NexumService` and run it until shutdown.
pub async fn serve(
    bind: &str,
    pool: DbPool,
    blobs: BlobStore,
    config: EngineConfig,
) -> Result<(), tonic::transport::Error> {
    let addr = bind.parse().expect("bind address must be a valid socket address");
    let service = NexumGrpcService::new(pool, blobs, config);

    tracing::info!("Server listening on {}", addr);

    tonic::transport::Server::builder()
        .layer(TraceLayer::new_for_grpc())
        .add_service(proto::nexum_service_server::NexumServiceServer::new(service))
        .serve(addr)
        .await
}
