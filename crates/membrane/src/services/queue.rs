use super::{map_status, not_registered, parse_json, to_json};
use crate::plugins::{QueuePlugin, Task};
use proto_grpc::queue::queue_server;
use proto_nitric::queue::{
    CompleteRequest, CompleteResponse, NitricTask, ReceiveRequest, ReceiveResponse, SendRequest,
    SendResponse,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};

pub struct QueueService {
    plugin: Option<Arc<dyn QueuePlugin>>,
}

impl QueueService {
    pub fn new(plugin: Option<Arc<dyn QueuePlugin>>) -> Self {
        Self { plugin }
    }

    fn plugin(&self) -> tonic::Result<&dyn QueuePlugin> {
        self.plugin
            .as_deref()
            .ok_or_else(|| not_registered("queue"))
    }
}

#[tonic::async_trait]
impl queue_server::Queue for QueueService {
    async fn send(&self, request: Request<SendRequest>) -> tonic::Result<Response<SendResponse>> {
        let plugin = self.plugin()?;
        let SendRequest { queue, task } = request.into_inner();

        let Some(NitricTask {
            id,
            lease_id,
            payload_type,
            payload,
        }) = task
        else {
            return Err(Status::invalid_argument("a task is required"));
        };
        let id = if id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            id
        };
        let task = Task {
            id,
            lease_id,
            payload_type,
            payload: parse_json("payload", &payload)?,
        };

        plugin
            .send(&queue, task)
            .await
            .map_err(|err| map_status("failed to send task", err))?;

        Ok(Response::new(SendResponse {}))
    }

    async fn receive(
        &self,
        request: Request<ReceiveRequest>,
    ) -> tonic::Result<Response<ReceiveResponse>> {
        let plugin = self.plugin()?;
        let ReceiveRequest { queue, depth } = request.into_inner();

        let tasks = plugin
            .receive(&queue, depth.max(1))
            .await
            .map_err(|err| map_status("failed to receive tasks", err))?;

        let tasks = tasks
            .into_iter()
            .map(|task| NitricTask {
                payload: to_json(&task.payload),
                id: task.id,
                lease_id: task.lease_id,
                payload_type: task.payload_type,
            })
            .collect();

        Ok(Response::new(ReceiveResponse { tasks }))
    }

    async fn complete(
        &self,
        request: Request<CompleteRequest>,
    ) -> tonic::Result<Response<CompleteResponse>> {
        let plugin = self.plugin()?;
        let CompleteRequest { queue, lease_id } = request.into_inner();

        plugin
            .complete(&queue, &lease_id)
            .await
            .map_err(|err| map_status("failed to complete task", err))?;

        Ok(Response::new(CompleteResponse {}))
    }
}
