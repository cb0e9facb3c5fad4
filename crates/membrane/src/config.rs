use crate::child::parse_command;
use crate::gateway::HttpGateway;
use crate::membrane::{
    DispatchMode, MembraneOptions, DEFAULT_CHILD_ADDRESS, DEFAULT_SERVICE_ADDRESS,
};
use crate::pool::PoolOptions;
use std::time::Duration;

#[derive(clap::Parser, Debug)]
#[clap(
    about = "Membrane hosts a function process, serving its capability APIs and dispatching triggers to it."
)]
pub struct Args {
    /// Address on which membrane services are served to the function.
    #[clap(long, env = "SERVICE_ADDRESS", default_value = DEFAULT_SERVICE_ADDRESS)]
    pub service_address: String,

    /// Address at which the function serves HTTP.
    #[clap(long, env = "CHILD_ADDRESS", default_value = DEFAULT_CHILD_ADDRESS)]
    pub child_address: String,

    /// Shell-style command line of the function process.
    #[clap(long, env = "INVOKE", default_value = "")]
    pub invoke: String,

    /// Seconds to wait for the function to start listening,
    /// or for function workers to connect.
    #[clap(long, env = "CHILD_TIMEOUT_SECONDS", default_value_t = 5)]
    pub child_timeout_seconds: u64,

    /// Run even if membrane plugins are missing.
    #[clap(long, env = "TOLERATE_MISSING_SERVICES")]
    pub tolerate_missing_services: bool,

    /// Log membrane notices at debug rather than info.
    #[clap(long, env = "SUPPRESS_LOGS")]
    pub suppress_logs: bool,

    /// How triggers are dispatched to the function.
    #[clap(long, env = "MEMBRANE_MODE", value_enum, default_value_t = DispatchMode::Http)]
    pub mode: DispatchMode,

    /// Workers which must connect before triggers are served.
    #[clap(long, env = "MIN_WORKERS", default_value_t = 1)]
    pub min_workers: usize,

    /// Maximum number of connected workers.
    #[clap(long, env = "MAX_WORKERS", default_value_t = 100)]
    pub max_workers: usize,

    /// Address on which the HTTP gateway receives triggers.
    #[clap(long, env = "GATEWAY_ADDRESS", default_value = "0.0.0.0:9001")]
    pub gateway_address: String,

    /// Level of membrane logs.
    #[clap(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command of the function process. Takes precedence over --invoke.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Args {
    /// Map Args into MembraneOptions served through an HttpGateway.
    /// Plugins are left unset, to be provided by the embedder.
    pub fn into_options(self) -> anyhow::Result<MembraneOptions> {
        let child_command = if !self.command.is_empty() {
            self.command
        } else {
            parse_command(&self.invoke)?
        };

        Ok(MembraneOptions {
            service_address: self.service_address,
            child_address: self.child_address,
            child_command,
            child_timeout: Duration::from_secs(self.child_timeout_seconds),
            gateway: Some(Box::new(HttpGateway::new(self.gateway_address))),
            tolerate_missing_services: self.tolerate_missing_services,
            suppress_logs: self.suppress_logs,
            mode: self.mode,
            pool_options: PoolOptions {
                min_workers: self.min_workers,
                max_workers: self.max_workers,
            },
            ..Default::default()
        })
    }
}
