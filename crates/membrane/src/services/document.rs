use super::{map_status, not_registered, parse_json, to_json};
use crate::plugins::{DocumentKey, DocumentPlugin};
use proto_grpc::document::document_server;
use proto_nitric::document::{
    DeleteRequest, DeleteResponse, Document, GetRequest, GetResponse, Key, SetRequest,
    SetResponse,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};

pub struct DocumentService {
    plugin: Option<Arc<dyn DocumentPlugin>>,
}

impl DocumentService {
    pub fn new(plugin: Option<Arc<dyn DocumentPlugin>>) -> Self {
        Self { plugin }
    }

    fn plugin(&self) -> tonic::Result<&dyn DocumentPlugin> {
        self.plugin
            .as_deref()
            .ok_or_else(|| not_registered("documents"))
    }
}

fn required_key(key: Option<Key>) -> tonic::Result<DocumentKey> {
    match key {
        Some(Key { collection, id }) if !collection.is_empty() && !id.is_empty() => {
            Ok(DocumentKey { collection, id })
        }
        _ => Err(Status::invalid_argument(
            "a document key with a collection and id is required",
        )),
    }
}

#[tonic::async_trait]
impl document_server::Document for DocumentService {
    async fn get(&self, request: Request<GetRequest>) -> tonic::Result<Response<GetResponse>> {
        let plugin = self.plugin()?;
        let key = required_key(request.into_inner().key)?;

        let document = plugin
            .get(&key)
            .await
            .map_err(|err| map_status("failed to get document", err))?;

        Ok(Response::new(GetResponse {
            document: Some(Document {
                key: Some(Key {
                    collection: document.key.collection,
                    id: document.key.id,
                }),
                content: to_json(&document.content),
            }),
        }))
    }

    async fn set(&self, request: Request<SetRequest>) -> tonic::Result<Response<SetResponse>> {
        let plugin = self.plugin()?;
        let SetRequest { key, content } = request.into_inner();
        let key = required_key(key)?;
        let content = parse_json("content", &content)?;

        plugin
            .set(&key, content)
            .await
            .map_err(|err| map_status("failed to set document", err))?;

        Ok(Response::new(SetResponse {}))
    }

    async fn delete(
        &self,
        request: Request<DeleteRequest>,
    ) -> tonic::Result<Response<DeleteResponse>> {
        let plugin = self.plugin()?;
        let key = required_key(request.into_inner().key)?;

        plugin
            .delete(&key)
            .await
            .map_err(|err| map_status("failed to delete document", err))?;

        Ok(Response::new(DeleteResponse {}))
    }
}
