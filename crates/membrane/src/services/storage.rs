use super::{map_status, not_registered};
use crate::plugins::StoragePlugin;
use proto_grpc::storage::storage_server;
use proto_nitric::storage::{
    DeleteRequest, DeleteResponse, ReadRequest, ReadResponse, WriteRequest, WriteResponse,
};
use std::sync::Arc;
use tonic::{Request, Response};

pub struct StorageService {
    plugin: Option<Arc<dyn StoragePlugin>>,
}

impl StorageService {
    pub fn new(plugin: Option<Arc<dyn StoragePlugin>>) -> Self {
        Self { plugin }
    }

    fn plugin(&self) -> tonic::Result<&dyn StoragePlugin> {
        self.plugin
            .as_deref()
            .ok_or_else(|| not_registered("storage"))
    }
}

#[tonic::async_trait]
impl storage_server::Storage for StorageService {
    async fn read(&self, request: Request<ReadRequest>) -> tonic::Result<Response<ReadResponse>> {
        let plugin = self.plugin()?;
        let ReadRequest { bucket_name, key } = request.into_inner();

        let body = plugin
            .read(&bucket_name, &key)
            .await
            .map_err(|err| map_status("failed to read object", err))?;

        Ok(Response::new(ReadResponse { body }))
    }

    async fn write(
        &self,
        request: Request<WriteRequest>,
    ) -> tonic::Result<Response<WriteResponse>> {
        let plugin = self.plugin()?;
        let WriteRequest {
            bucket_name,
            key,
            body,
        } = request.into_inner();

        plugin
            .write(&bucket_name, &key, body)
            .await
            .map_err(|err| map_status("failed to write object", err))?;

        Ok(Response::new(WriteResponse {}))
    }

    async fn delete(
        &self,
        request: Request<DeleteRequest>,
    ) -> tonic::Result<Response<DeleteResponse>> {
        let plugin = self.plugin()?;
        let DeleteRequest { bucket_name, key } = request.into_inner();

        plugin
            .delete(&bucket_name, &key)
            .await
            .map_err(|err| map_status("failed to delete object", err))?;

        Ok(Response::new(DeleteResponse {}))
    }
}
