use crate::child::Child;
use crate::faas::{AutoAbortHandle, FaasEndpoint};
use crate::gateway::{Gateway, Handler, HttpForwarder};
use crate::plugins::{
    DocumentPlugin, EventPlugin, KeyValuePlugin, QueuePlugin, StoragePlugin, UserPlugin,
};
use crate::pool::{PoolOptions, WorkerPool};
use crate::services::{
    DocumentService, EventService, KeyValueService, QueueService, StorageService, TopicService,
    UserService,
};
use anyhow::Context;
use futures::StreamExt;
use proto_grpc::{document, event, faas, kv, queue, storage, user};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SERVICE_ADDRESS: &str = "127.0.0.1:50051";
pub const DEFAULT_CHILD_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_CHILD_TIMEOUT: Duration = Duration::from_secs(5);

/// DispatchMode selects how triggers reach the function.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DispatchMode {
    /// POST each trigger to the child's HTTP server.
    #[default]
    Http,
    /// Dispatch each trigger over the TriggerStream of a connected runtime.
    Worker,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing gateway plugin, a gateway must be provided")]
    MissingGateway,
    #[error("missing membrane plugins {0:?}, set TOLERATE_MISSING_SERVICES to run without them")]
    MissingServices(Vec<&'static str>),
}

pub struct MembraneOptions {
    /// Address on which capability services (and Faas) are served.
    pub service_address: String,
    /// Address at which the child serves HTTP.
    pub child_address: String,
    /// Command of the child process. Empty if there's no child to start.
    pub child_command: Vec<String>,
    /// Time allowed for the child to listen, and for workers to connect.
    /// Values under a second use the default.
    pub child_timeout: Duration,

    pub documents: Option<Arc<dyn DocumentPlugin>>,
    pub storage: Option<Arc<dyn StoragePlugin>>,
    pub events: Option<Arc<dyn EventPlugin>>,
    pub queue: Option<Arc<dyn QueuePlugin>>,
    pub users: Option<Arc<dyn UserPlugin>>,
    pub key_value: Option<Arc<dyn KeyValuePlugin>>,
    pub gateway: Option<Box<dyn Gateway>>,

    pub tolerate_missing_services: bool,
    pub suppress_logs: bool,
    pub mode: DispatchMode,
    pub pool_options: PoolOptions,
    /// Pool into which workers are registered. If absent,
    /// one is created from `pool_options`.
    pub pool: Option<WorkerPool>,
}

impl Default for MembraneOptions {
    fn default() -> Self {
        Self {
            service_address: DEFAULT_SERVICE_ADDRESS.to_string(),
            child_address: DEFAULT_CHILD_ADDRESS.to_string(),
            child_command: Vec::new(),
            child_timeout: DEFAULT_CHILD_TIMEOUT,
            documents: None,
            storage: None,
            events: None,
            queue: None,
            users: None,
            key_value: None,
            gateway: None,
            tolerate_missing_services: false,
            suppress_logs: false,
            mode: DispatchMode::default(),
            pool_options: PoolOptions::default(),
            pool: None,
        }
    }
}

/// Membrane hosts capability services for a function,
/// and dispatches triggers from its Gateway to it.
pub struct Membrane {
    options: MembraneOptions,
    gateway: Box<dyn Gateway>,
    pool: WorkerPool,
}

impl Membrane {
    pub fn new(mut options: MembraneOptions) -> Result<Self, ConfigError> {
        let gateway = options.gateway.take().ok_or(ConfigError::MissingGateway)?;

        if !options.tolerate_missing_services {
            let missing: Vec<_> = [
                ("documents", options.documents.is_none()),
                ("storage", options.storage.is_none()),
                ("events", options.events.is_none()),
                ("queue", options.queue.is_none()),
                ("users", options.users.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, missing)| missing.then_some(name))
            .collect();

            if !missing.is_empty() {
                return Err(ConfigError::MissingServices(missing));
            }
        }

        if options.child_timeout < Duration::from_secs(1) {
            options.child_timeout = DEFAULT_CHILD_TIMEOUT;
        }
        let pool = options
            .pool
            .take()
            .unwrap_or_else(|| WorkerPool::new(options.pool_options));

        Ok(Self {
            options,
            gateway,
            pool,
        })
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Run the membrane until its gateway exits, returning the gateway's result.
    pub async fn start(self) -> anyhow::Result<()> {
        let Self {
            options,
            gateway,
            pool,
        } = self;
        let suppress = options.suppress_logs;

        let listener = tokio::net::TcpListener::bind(&options.service_address)
            .await
            .context("could not listen on configured service address")?;
        let service_address = listener.local_addr()?;

        let incoming = futures::stream::try_unfold(listener, |listener| async move {
            let (stream, _peer) = listener.accept().await?;
            Ok::<_, std::io::Error>(Some((stream, listener)))
        })
        .boxed();

        let faas = match options.mode {
            DispatchMode::Worker => Some(faas::faas_server::FaasServer::new(FaasEndpoint::new(
                pool.clone(),
            ))),
            DispatchMode::Http => None,
        };

        let server = tonic::transport::Server::builder()
            .add_service(document::document_server::DocumentServer::new(
                DocumentService::new(options.documents.clone()),
            ))
            .add_service(storage::storage_server::StorageServer::new(
                StorageService::new(options.storage.clone()),
            ))
            .add_service(queue::queue_server::QueueServer::new(QueueService::new(
                options.queue.clone(),
            )))
            .add_service(event::event_server::EventServer::new(EventService::new(
                options.events.clone(),
            )))
            .add_service(event::topic_server::TopicServer::new(TopicService::new(
                options.events.clone(),
            )))
            .add_service(user::user_server::UserServer::new(UserService::new(
                options.users.clone(),
            )))
            .add_service(kv::key_value_server::KeyValueServer::new(
                KeyValueService::new(options.key_value.clone()),
            ))
            .add_optional_service(faas)
            .serve_with_incoming(incoming);

        // The server is stopped when `server` is dropped.
        let mut server = AutoAbortHandle(tokio::spawn(server));
        notice(suppress, &format!("serving membrane services at {service_address}"));

        let _child = if options.child_command.is_empty() {
            notice(suppress, "no child command specified, skipping");
            None
        } else {
            notice(
                suppress,
                &format!("starting function {:?}", options.child_command),
            );
            let child = Child::start(
                &options.child_command,
                &options.child_address,
                options.child_timeout,
            )
            .await
            .context("failed to start function")?;

            notice(suppress, &format!("function started with pid {}", child.id()));
            Some(child)
        };

        let handler = match options.mode {
            DispatchMode::Http => Handler::Http(HttpForwarder::new(&options.child_address)),
            DispatchMode::Worker => {
                notice(
                    suppress,
                    &format!(
                        "waiting for {} function workers to connect",
                        pool.options().min_workers
                    ),
                );
                pool.wait_for_minimum_workers(options.child_timeout)
                    .await
                    .context("function workers failed to connect")?;

                Handler::Pool(pool.clone())
            }
        };

        notice(suppress, "starting gateway");

        tokio::select! {
            result = gateway.start(handler) => {
                notice(suppress, "gateway exited");
                result
            }
            result = &mut server => {
                match result {
                    Ok(Ok(())) => anyhow::bail!("membrane services exited unexpectedly"),
                    Ok(Err(error)) => Err(anyhow::Error::new(error).context("membrane services failed")),
                    Err(error) => Err(anyhow::Error::new(error).context("membrane services task failed")),
                }
            }
        }
    }
}

// Log an informational message, unless logs are suppressed.
fn notice(suppress: bool, message: &str) {
    if suppress {
        tracing::debug!("{message}");
    } else {
        tracing::info!("{message}");
    }
}
