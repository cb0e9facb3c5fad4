use super::{map_status, not_registered, parse_json, to_json};
use crate::plugins::KeyValuePlugin;
use proto_grpc::kv::key_value_server;
use proto_nitric::kv::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, PutRequest, PutResponse,
};
use std::sync::Arc;
use tonic::{Request, Response};

pub struct KeyValueService {
    plugin: Option<Arc<dyn KeyValuePlugin>>,
}

impl KeyValueService {
    pub fn new(plugin: Option<Arc<dyn KeyValuePlugin>>) -> Self {
        Self { plugin }
    }

    fn plugin(&self) -> tonic::Result<&dyn KeyValuePlugin> {
        self.plugin
            .as_deref()
            .ok_or_else(|| not_registered("key-value"))
    }
}

#[tonic::async_trait]
impl key_value_server::KeyValue for KeyValueService {
    async fn get(&self, request: Request<GetRequest>) -> tonic::Result<Response<GetResponse>> {
        let plugin = self.plugin()?;
        let GetRequest { collection, key } = request.into_inner();

        let value = plugin
            .get(&collection, &key)
            .await
            .map_err(|err| map_status("failed to get value", err))?;

        Ok(Response::new(GetResponse {
            value: to_json(&value),
        }))
    }

    async fn put(&self, request: Request<PutRequest>) -> tonic::Result<Response<PutResponse>> {
        let plugin = self.plugin()?;
        let PutRequest {
            collection,
            key,
            value,
        } = request.into_inner();
        let value = parse_json("value", &value)?;

        plugin
            .put(&collection, &key, value)
            .await
            .map_err(|err| map_status("failed to put value", err))?;

        Ok(Response::new(PutResponse {}))
    }

    async fn delete(
        &self,
        request: Request<DeleteRequest>,
    ) -> tonic::Result<Response<DeleteResponse>> {
        let plugin = self.plugin()?;
        let DeleteRequest { collection, key } = request.into_inner();

        plugin
            .delete(&collection, &key)
            .await
            .map_err(|err| map_status("failed to delete value", err))?;

        Ok(Response::new(DeleteResponse {}))
    }
}
