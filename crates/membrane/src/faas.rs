use crate::pool::{PoolError, WorkerPool};
use crate::worker::FaasWorker;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use proto_grpc::faas::faas_server;
use proto_nitric::faas::{ClientMessage, ServerMessage};
use std::sync::Arc;
use tonic::Status;

/// FaasEndpoint serves the TriggerStreams of function runtimes,
/// registering each stream as a FaasWorker of its WorkerPool.
pub struct FaasEndpoint {
    pool: WorkerPool,
}

impl FaasEndpoint {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    /// Register a worker over the `incoming` stream of a runtime, returning
    /// the stream of messages to be sent back to it. The returned stream ends
    /// with the terminal status of the worker, which is then removed from the pool.
    pub fn serve<S>(
        &self,
        incoming: S,
    ) -> tonic::Result<impl Stream<Item = tonic::Result<ServerMessage>>>
    where
        S: Stream<Item = tonic::Result<ClientMessage>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let worker = Arc::new(FaasWorker::new(self.pool.next_worker_id(), tx));

        match self.pool.add_worker(worker.clone()) {
            Ok(()) => (),
            Err(err @ PoolError::Capacity(_)) => {
                return Err(Status::resource_exhausted(err.to_string()))
            }
            Err(err) => return Err(Status::internal(err.to_string())),
        }
        tracing::info!(worker = worker.id(), "function runtime connected");

        let registration = Registration {
            pool: self.pool.clone(),
            worker: worker.clone(),
        };
        let listen = tokio::spawn(async move {
            let _registration = registration;
            worker.listen(incoming).await
        });
        // Ensure `listen` is aborted (and the worker removed) if our response stream is dropped.
        let listen = AutoAbortHandle(listen);
        // Map to a Stream that awaits `listen` and returns EOF, or returns its error.
        let listen = futures::stream::try_unfold(listen, |listen| async move {
            let () = listen.await.map_err(|err| {
                Status::internal(format!("worker listen task failed: {err}"))
            })??;
            Ok::<_, Status>(None)
        });

        Ok(rx.map(Ok).chain(listen))
    }
}

#[tonic::async_trait]
impl faas_server::Faas for FaasEndpoint {
    type TriggerStreamStream = BoxStream<'static, tonic::Result<ServerMessage>>;

    async fn trigger_stream(
        &self,
        request: tonic::Request<tonic::Streaming<ClientMessage>>,
    ) -> tonic::Result<tonic::Response<Self::TriggerStreamStream>> {
        let responses = self.serve(request.into_inner())?;
        Ok(tonic::Response::new(responses.boxed()))
    }
}

const OUTBOUND_BUFFER: usize = 16;

// Registration removes its worker from the pool when dropped,
// which happens when listen() completes or is aborted.
struct Registration {
    pool: WorkerPool,
    worker: Arc<FaasWorker>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.worker.close();
        self.pool.remove_worker(self.worker.id());
        tracing::info!(worker = self.worker.id(), "function runtime disconnected");
    }
}

/// AutoAbortHandle aborts its task when dropped.
pub(crate) struct AutoAbortHandle<T>(pub(crate) tokio::task::JoinHandle<T>);

impl<T> std::future::Future for AutoAbortHandle<T> {
    type Output = Result<T, tokio::task::JoinError>;

    fn poll(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        std::pin::Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AutoAbortHandle<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
