use crate::trigger::{NormalizedRequest, NormalizedResponse};
use futures::channel::{mpsc, oneshot};
use futures::{SinkExt, Stream, StreamExt};
use proto_nitric::faas::{self, client_message, server_message, ClientMessage, ServerMessage};
use std::sync::Mutex;
use tonic::Status;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker {0} is already handling a trigger")]
    Busy(u64),
    #[error("worker {0} stream is closed")]
    Closed(u64),
    #[error("worker {id} returned an invalid response")]
    InvalidResponse {
        id: u64,
        #[source]
        source: crate::trigger::InvalidStatus,
    },
}

/// FaasWorker dispatches triggers to a single connected function runtime.
///
/// Each worker owns the outbound half of its runtime's TriggerStream,
/// and carries at most one trigger at a time.
pub struct FaasWorker {
    id: u64,
    tx: Mutex<Option<mpsc::Sender<ServerMessage>>>,
    pending: Mutex<Option<Pending>>,
    // Signalled when the worker is evicted, to end its listen() loop.
    evicted: tokio::sync::Notify,
}

struct Pending {
    message_id: String,
    tx: oneshot::Sender<faas::TriggerResponse>,
}

impl FaasWorker {
    pub fn new(id: u64, tx: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            tx: Mutex::new(Some(tx)),
            pending: Mutex::new(None),
            evicted: tokio::sync::Notify::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Is the worker without an outstanding trigger?
    /// A trigger remains outstanding until its runtime responds,
    /// even if its `send` future was dropped.
    /// A closed worker is never idle.
    pub fn is_idle(&self) -> bool {
        let open = self.tx.lock().unwrap().is_some();
        open && self.pending.lock().unwrap().is_none()
    }

    /// Send a trigger to the runtime and await its response.
    pub async fn send(
        &self,
        request: NormalizedRequest,
    ) -> Result<NormalizedResponse, WorkerError> {
        let message_id = uuid::Uuid::new_v4().to_string();
        let (response_tx, response_rx) = oneshot::channel();

        let Some(mut tx) = self.tx.lock().unwrap().clone() else {
            return Err(WorkerError::Closed(self.id));
        };
        {
            let mut pending = self.pending.lock().unwrap();
            if pending.is_some() {
                return Err(WorkerError::Busy(self.id));
            }
            *pending = Some(Pending {
                message_id: message_id.clone(),
                tx: response_tx,
            });
        }

        tracing::trace!(worker = self.id, %message_id, request_id = %request.context.request_id, "sending trigger");

        let message = ServerMessage {
            id: message_id,
            content: Some(server_message::Content::TriggerRequest(request.into())),
        };
        if tx.send(message).await.is_err() {
            self.pending.lock().unwrap().take();
            return Err(WorkerError::Closed(self.id));
        }
        std::mem::drop(tx);

        let response = response_rx.await.map_err(|_| WorkerError::Closed(self.id))?;

        NormalizedResponse::try_from(response).map_err(|source| WorkerError::InvalidResponse {
            id: self.id,
            source,
        })
    }

    /// Read messages from the runtime until its stream ends,
    /// answering the init handshake and completing pending triggers.
    ///
    /// Returns Ok on a clean end of the stream, and Aborted if the worker
    /// was evicted. On return the worker is closed, and an in-flight
    /// `send` fails with WorkerError::Closed.
    pub async fn listen<S>(&self, incoming: S) -> tonic::Result<()>
    where
        S: Stream<Item = tonic::Result<ClientMessage>>,
    {
        futures::pin_mut!(incoming);

        let result = loop {
            let next = tokio::select! {
                next = incoming.next() => next,
                () = self.evicted.notified() => {
                    break Err(Status::aborted(format!(
                        "worker {} was evicted after a failed trigger",
                        self.id
                    )))
                }
            };
            let message = match next {
                None => break Ok(()),
                Some(Err(status)) => break Err(status),
                Some(Ok(message)) => message,
            };

            match message.content {
                Some(client_message::Content::InitRequest(_)) => {
                    tracing::debug!(worker = self.id, "received init request from worker");

                    let reply = ServerMessage {
                        id: message.id,
                        content: Some(server_message::Content::InitResponse(
                            faas::InitResponse {},
                        )),
                    };
                    let tx = self.tx.lock().unwrap().clone();
                    let sent = match tx {
                        Some(mut tx) => tx.send(reply).await.is_ok(),
                        None => false,
                    };
                    if !sent {
                        break Ok(()); // Response stream was dropped.
                    }
                }
                Some(client_message::Content::TriggerResponse(response)) => {
                    if let Err(status) = self.complete(message.id, response) {
                        break Err(status);
                    }
                }
                None => {
                    break Err(Status::invalid_argument(
                        "expected an init request or trigger response",
                    ))
                }
            }
        };

        match &result {
            Ok(()) => tracing::debug!(worker = self.id, "worker stream closed"),
            Err(status) => tracing::warn!(worker = self.id, %status, "worker stream failed"),
        }
        self.close();

        result
    }

    /// Close the worker, dropping its outbound sender and any pending trigger.
    pub fn close(&self) {
        self.tx.lock().unwrap().take();
        self.pending.lock().unwrap().take();
    }

    /// Evict the worker: close it, and end its listen() loop with an Aborted status.
    pub fn evict(&self) {
        self.close();
        // A stored permit wakes listen() even if it isn't currently waiting.
        self.evicted.notify_one();
    }

    fn complete(&self, message_id: String, response: faas::TriggerResponse) -> tonic::Result<()> {
        let mut pending = self.pending.lock().unwrap();

        match pending.take() {
            Some(Pending { message_id: id, tx }) if id == message_id => {
                // The sender may have been cancelled, in which case the response is dropped.
                let _ = tx.send(response);
                Ok(())
            }
            other => {
                *pending = other;
                Err(Status::failed_precondition(format!(
                    "worker {} received a response for unknown trigger {message_id:?}",
                    self.id
                )))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::Arc;

    /// Reply builds the runtime's response to a TriggerRequest,
    /// or None to close the stream instead of replying.
    pub type Reply = Arc<
        dyn Fn(faas::TriggerRequest) -> BoxFuture<'static, Option<faas::TriggerResponse>>
            + Send
            + Sync,
    >;

    pub fn reply<F, Fut>(f: F) -> Reply
    where
        F: Fn(faas::TriggerRequest) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Option<faas::TriggerResponse>> + Send + 'static,
    {
        Arc::new(move |request| f(request).boxed())
    }

    /// Reply with status 200 and the request's own payload.
    pub fn echo() -> Reply {
        reply(|request| async move {
            Some(faas::TriggerResponse {
                data: request.data,
                status: 200,
                headers: Default::default(),
            })
        })
    }

    /// Connect a FaasWorker to a runtime task which answers triggers using `reply`.
    /// Returns the worker and the handle of its listen() task.
    pub fn connect(
        id: u64,
        reply: Reply,
    ) -> (Arc<FaasWorker>, tokio::task::JoinHandle<tonic::Result<()>>) {
        let (server_tx, mut server_rx) = mpsc::channel::<ServerMessage>(16);
        let (mut client_tx, client_rx) = mpsc::channel::<tonic::Result<ClientMessage>>(16);

        let worker = Arc::new(FaasWorker::new(id, server_tx));

        tokio::spawn(async move {
            while let Some(ServerMessage { id, content }) = server_rx.next().await {
                let Some(server_message::Content::TriggerRequest(request)) = content else {
                    continue;
                };
                let Some(response) = reply(request).await else {
                    return; // Drops `client_tx`, closing the stream.
                };
                let message = ClientMessage {
                    id,
                    content: Some(client_message::Content::TriggerResponse(response)),
                };
                if client_tx.send(Ok(message)).await.is_err() {
                    return;
                }
            }
        });

        let listener = worker.clone();
        let listen = tokio::spawn(async move { listener.listen(client_rx).await });

        (worker, listen)
    }

    pub fn request(payload: &'static str) -> NormalizedRequest {
        NormalizedRequest::new(
            crate::trigger::TriggerContext::new(
                None,
                "test-payload",
                "test-source",
                crate::trigger::SourceType::Request,
            ),
            None,
            payload,
        )
    }
}

#[cfg(test)]
mod test {
    use super::testing::{connect, echo, request};
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_round_trip() {
        let reply = testing::reply(|request| async move {
            Some(faas::TriggerResponse {
                data: format!(
                    "{} from {}",
                    String::from_utf8_lossy(&request.data),
                    request.source
                )
                .into(),
                status: 202,
                headers: [("x-reply".to_string(), request.payload_type)].into(),
            })
        });
        let (worker, _listen) = connect(7, reply);

        let response = worker.send(request("hello")).await.unwrap();
        insta::assert_debug_snapshot!(response, @r###"
        NormalizedResponse {
            headers: {
                "x-reply": "test-payload",
            },
            status: 202,
            body: b"hello from test-source",
        }
        "###);

        // The worker is reusable after a completed trigger.
        let response = worker.send(request("again")).await.unwrap();
        assert_eq!(response.body, "again from test-source");
    }

    #[tokio::test]
    async fn test_init_handshake() {
        let (server_tx, mut server_rx) = mpsc::channel(4);
        let (mut client_tx, client_rx) = mpsc::channel(4);
        let worker = FaasWorker::new(1, server_tx);

        client_tx
            .send(Ok(ClientMessage {
                id: "init-1".to_string(),
                content: Some(client_message::Content::InitRequest(faas::InitRequest {})),
            }))
            .await
            .unwrap();
        std::mem::drop(client_tx);

        assert!(worker.listen(client_rx).await.is_ok());

        insta::assert_debug_snapshot!(server_rx.next().await.unwrap(), @r###"
        ServerMessage {
            id: "init-1",
            content: Some(
                InitResponse(
                    InitResponse,
                ),
            ),
        }
        "###);
        // The worker closed its outbound channel upon the end of its stream.
        assert!(server_rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_stream_fails_pending_send() {
        let never = testing::reply(|_request| async { None });
        let (worker, listen) = connect(3, never);

        let err = worker.send(request("hello")).await.unwrap_err();
        insta::assert_snapshot!(err, @"worker 3 stream is closed");
        assert!(listen.await.unwrap().is_ok());

        // Further sends fail immediately.
        let err = worker.send(request("hello")).await.unwrap_err();
        assert!(matches!(err, WorkerError::Closed(3)));
    }

    #[tokio::test]
    async fn test_concurrent_send_is_busy() {
        let slow = testing::reply(|request| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Some(faas::TriggerResponse {
                data: request.data,
                status: 200,
                headers: Default::default(),
            })
        });
        let (worker, _listen) = connect(5, slow);

        let (first, second) = futures::join!(worker.send(request("one")), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            worker.send(request("two")).await
        });
        assert_eq!(first.unwrap().body, "one");
        assert!(matches!(second, Err(WorkerError::Busy(5))));
    }

    #[tokio::test]
    async fn test_unknown_response_id_is_fatal() {
        let (server_tx, _server_rx) = mpsc::channel(4);
        let (mut client_tx, client_rx) = mpsc::channel(4);
        let worker = FaasWorker::new(9, server_tx);

        client_tx
            .send(Ok(ClientMessage {
                id: "who-knows".to_string(),
                content: Some(client_message::Content::TriggerResponse(
                    faas::TriggerResponse::default(),
                )),
            }))
            .await
            .unwrap();

        let status = worker.listen(client_rx).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
        insta::assert_snapshot!(status.message(), @r###"worker 9 received a response for unknown trigger "who-knows""###);
    }

    #[tokio::test]
    async fn test_invalid_status_is_an_error() {
        let reply = testing::reply(|_request| async {
            Some(faas::TriggerResponse {
                status: 0,
                ..Default::default()
            })
        });
        let (worker, _listen) = connect(2, reply);

        let err = worker.send(request("hi")).await.unwrap_err();
        insta::assert_snapshot!(format!("{:#}", anyhow::Error::from(err)), @"worker 2 returned an invalid response: trigger response has invalid status 0");
    }

    #[tokio::test]
    async fn test_closed_worker_is_not_idle() {
        let (worker, _listen) = connect(6, echo());
        assert!(worker.is_idle());

        worker.close();
        assert!(!worker.is_idle());
    }

    #[tokio::test]
    async fn test_evict_ends_listen() {
        let (server_tx, mut server_rx) = mpsc::channel(4);
        let (_client_tx, client_rx) = mpsc::channel::<tonic::Result<ClientMessage>>(4);
        let worker = FaasWorker::new(8, server_tx);

        // Eviction before listen() begins is not lost.
        worker.evict();

        let status = worker.listen(client_rx).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::Aborted);
        insta::assert_snapshot!(status.message(), @"worker 8 was evicted after a failed trigger");
        assert!(server_rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_echo() {
        let (worker, _listen) = connect(4, echo());
        assert_eq!(worker.send(request("ping")).await.unwrap().status, 200);
    }
}
