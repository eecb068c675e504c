//! `NexumService` gRPC implementation.
//!
//! Each RPC is a thin wrapper over `engine::*` — parsing the wire request,
//! calling straight into the orchestration layer, and mapping the result
//! back onto the generated response type or a `tonic::Status`.

use db::{BlobStore, DbPool};
use engine::{EngineConfig, Scheduler};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::error::engine_error_to_status;
use crate::proto::nexum_service_server::NexumService;
use crate::proto::{
    CompleteRequest, CompleteResponse, FailRequest, FailResponse, PollRequest, PollResponse,
    RegisterWorkflowResponse, StartRequest, StartResponse, StatusRequest, StatusResponse,
    WorkflowIr,
};

/// Shared state backing every RPC handler.
#[derive(Clone)]
pub struct NexumGrpcService {
    pool: DbPool,
    scheduler: Scheduler,
    blobs: BlobStore,
    config: EngineConfig,
}

impl NexumGrpcService {
    pub fn new(pool: DbPool, blobs: BlobStore, config: EngineConfig) -> Self {
        let scheduler = Scheduler::new(pool.clone(), blobs.clone());
        Self { pool, scheduler, blobs, config }
    }
}

#[tonic::async_trait]
impl NexumService for NexumGrpcService {
    async fn register_workflow(
        &self,
        request: Request<WorkflowIr>,
    ) -> Result<Response<RegisterWorkflowResponse>, Status> {
        let req = request.into_inner();

        let outcome =
            engine::register_workflow(&self.pool, &req.workflow_id, &req.version_hash, &req.ir_json)
                .await
                .map_err(engine_error_to_status)?;

        Ok(Response::new(RegisterWorkflowResponse {
            ok: true,
            compatibility: outcome.compatibility,
            message: outcome.message,
        }))
    }

    async fn start_execution(
        &self,
        request: Request<StartRequest>,
    ) -> Result<Response<StartResponse>, Status> {
        let req = request.into_inner();

        let execution_id = engine::start_execution(
            &self.pool,
            &self.scheduler,
            &req.workflow_id,
            &req.version_hash,
            &req.input_json,
        )
        .await
        .map_err(engine_error_to_status)?;

        Ok(Response::new(StartResponse {
            execution_id: execution_id.to_string(),
        }))
    }

    async fn get_status(
        &self,
        request: Request<StatusRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        let execution_id = parse_uuid(&req.execution_id)?;

        let execution = engine::get_status(&self.pool, execution_id)
            .await
            .map_err(engine_error_to_status)?;

        Ok(Response::new(StatusResponse {
            status: execution.status,
            completed_nodes_json: execution.completed_nodes_json,
        }))
    }

    async fn poll_task(
        &self,
        request: Request<PollRequest>,
    ) -> Result<Response<PollResponse>, Status> {
        let req = request.into_inner();

        let task = engine::poll_task(&self.pool, &req.worker_id, &req.version_hash, self.config.lease_ttl_secs)
            .await
            .map_err(engine_error_to_status)?;

        Ok(Response::new(match task {
            Some(task) => PollResponse {
                has_task: true,
                task_id: task.task_id.to_string(),
                node_id: task.node_id,
                execution_id: task.execution_id.to_string(),
                input_json: task.input_json,
            },
            None => PollResponse {
                has_task: false,
                task_id: String::new(),
                node_id: String::new(),
                execution_id: String::new(),
                input_json: String::new(),
            },
        }))
    }

    async fn complete_task(
        &self,
        request: Request<CompleteRequest>,
    ) -> Result<Response<CompleteResponse>, Status> {
        let req = request.into_inner();
        let task_id = parse_uuid(&req.task_id)?;

        engine::complete_task(
            &self.pool,
            &self.blobs,
            &self.scheduler,
            task_id,
            req.output_json.as_bytes(),
            self.config.inline_threshold_bytes,
        )
        .await
        .map_err(engine_error_to_status)?;

        Ok(Response::new(CompleteResponse {}))
    }

    async fn fail_task(
        &self,
        request: Request<FailRequest>,
    ) -> Result<Response<FailResponse>, Status> {
        let req = request.into_inner();
        let task_id = parse_uuid(&req.task_id)?;

        engine::fail_task(&self.pool, &self.scheduler, task_id, &req.error_message)
            .await
            .map_err(engine_error_to_status)?;

        Ok(Response::new(FailResponse {}))
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(s).map_err(|_| Status::invalid_argument(format!("'{s}' is not a valid uuid")))
}
