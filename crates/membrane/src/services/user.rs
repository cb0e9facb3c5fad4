use super::{map_status, not_registered};
use crate::plugins::UserPlugin;
use proto_grpc::user::user_server;
use proto_nitric::user::{CreateRequest, CreateResponse, DeleteRequest, DeleteResponse};
use std::sync::Arc;
use tonic::{Request, Response};

pub struct UserService {
    plugin: Option<Arc<dyn UserPlugin>>,
}

impl UserService {
    pub fn new(plugin: Option<Arc<dyn UserPlugin>>) -> Self {
        Self { plugin }
    }

    fn plugin(&self) -> tonic::Result<&dyn UserPlugin> {
        self.plugin
            .as_deref()
            .ok_or_else(|| not_registered("users"))
    }
}

#[tonic::async_trait]
impl user_server::User for UserService {
    async fn create(
        &self,
        request: Request<CreateRequest>,
    ) -> tonic::Result<Response<CreateResponse>> {
        let plugin = self.plugin()?;
        let CreateRequest {
            tenant,
            id,
            email,
            password,
        } = request.into_inner();

        plugin
            .create(&tenant, &id, &email, &password)
            .await
            .map_err(|err| map_status("failed to create user", err))?;

        Ok(Response::new(CreateResponse {}))
    }

    async fn delete(
        &self,
        request: Request<DeleteRequest>,
    ) -> tonic::Result<Response<DeleteResponse>> {
        let plugin = self.plugin()?;
        let DeleteRequest { tenant, id } = request.into_inner();

        plugin
            .delete(&tenant, &id)
            .await
            .map_err(|err| map_status("failed to delete user", err))?;

        Ok(Response::new(DeleteResponse {}))
    }
}
