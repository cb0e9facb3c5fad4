use super::{map_status, not_registered, parse_json};
use crate::plugins::{Event, EventPlugin};
use proto_grpc::event::{event_server, topic_server};
use proto_nitric::event::{
    ListTopicsRequest, ListTopicsResponse, NitricEvent, NitricTopic, PublishRequest,
    PublishResponse,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};

pub struct EventService {
    plugin: Option<Arc<dyn EventPlugin>>,
}

impl EventService {
    pub fn new(plugin: Option<Arc<dyn EventPlugin>>) -> Self {
        Self { plugin }
    }
}

#[tonic::async_trait]
impl event_server::Event for EventService {
    async fn publish(
        &self,
        request: Request<PublishRequest>,
    ) -> tonic::Result<Response<PublishResponse>> {
        let plugin = self
            .plugin
            .as_deref()
            .ok_or_else(|| not_registered("events"))?;
        let PublishRequest { topic, event } = request.into_inner();

        let Some(NitricEvent {
            id,
            payload_type,
            payload,
        }) = event
        else {
            return Err(Status::invalid_argument("an event is required"));
        };
        let id = if id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            id
        };
        let event = Event {
            id: id.clone(),
            payload_type,
            payload: parse_json("payload", &payload)?,
        };

        plugin
            .publish(&topic, event)
            .await
            .map_err(|err| map_status("failed to publish event", err))?;

        Ok(Response::new(PublishResponse { id }))
    }
}

pub struct TopicService {
    plugin: Option<Arc<dyn EventPlugin>>,
}

impl TopicService {
    pub fn new(plugin: Option<Arc<dyn EventPlugin>>) -> Self {
        Self { plugin }
    }
}

#[tonic::async_trait]
impl topic_server::Topic for TopicService {
    async fn list(
        &self,
        _request: Request<ListTopicsRequest>,
    ) -> tonic::Result<Response<ListTopicsResponse>> {
        let plugin = self
            .plugin
            .as_deref()
            .ok_or_else(|| not_registered("events"))?;

        let topics = plugin
            .list_topics()
            .await
            .map_err(|err| map_status("failed to list topics", err))?;

        Ok(Response::new(ListTopicsResponse {
            topics: topics
                .into_iter()
                .map(|name| NitricTopic { name })
                .collect(),
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::plugins::testing::Memory;
    use event_server::Event as _;
    use topic_server::Topic as _;

    fn publish(id: &str) -> Request<PublishRequest> {
        Request::new(PublishRequest {
            topic: "orders".to_string(),
            event: Some(NitricEvent {
                id: id.to_string(),
                payload_type: "order".to_string(),
                payload: r#"{"n": 1}"#.into(),
            }),
        })
    }

    #[tokio::test]
    async fn test_publish_event_ids() {
        let memory = Arc::new(Memory::default());
        let service = EventService::new(Some(memory.clone()));

        // A supplied id is passed through.
        let response = service.publish(publish("evt-1")).await.unwrap();
        assert_eq!(response.into_inner().id, "evt-1");

        // An empty id is generated, and is the id seen by the plugin.
        let response = service.publish(publish("")).await.unwrap();
        let generated = response.into_inner().id;
        assert!(uuid::Uuid::parse_str(&generated).is_ok());

        let published = memory.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        for (topic, event) in published.iter() {
            assert_eq!(topic, "orders");
            assert_eq!(event.payload, serde_json::json!({"n": 1}));
        }
        assert_eq!(published[0].1.id, "evt-1");
        assert_eq!(published[1].1.id, generated);
    }

    #[tokio::test]
    async fn test_list_topics() {
        let memory = Arc::new(Memory::default());
        let events = EventService::new(Some(memory.clone()));
        let topics = TopicService::new(Some(memory));

        events.publish(publish("a")).await.unwrap();

        let response = topics
            .list(Request::new(ListTopicsRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(
            response.topics,
            vec![NitricTopic {
                name: "orders".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_publish_requires_event() {
        let service = EventService::new(Some(Arc::new(Memory::default())));
        let status = service
            .publish(Request::new(PublishRequest {
                topic: "orders".to_string(),
                event: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
