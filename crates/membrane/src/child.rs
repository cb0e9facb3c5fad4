use shared_child::SharedChild;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Interval between readiness probes of a starting child.
pub const POLL_INTERVAL: Duration = Duration::from_millis(15);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("child command is empty")]
    EmptyCommand,
    #[error("failed to parse child command {0:?}: unbalanced quoting")]
    Parse(String),
    #[error("there was an error starting the child process {argv:?}")]
    Spawn {
        argv: Vec<String>,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to dial child server, does it expose a http server at: {address}?")]
    Timeout { address: String },
}

/// Split a shell-style command line into its argv.
pub fn parse_command(line: &str) -> Result<Vec<String>, Error> {
    shlex::split(line).ok_or_else(|| Error::Parse(line.to_string()))
}

/// Child is a running function process.
/// Dropping a Child sends it SIGTERM if it hasn't already exited.
pub struct Child {
    inner: Arc<SharedChild>,
}

impl Child {
    /// Start `argv` and wait for it to accept TCP connections at `address`.
    /// If it doesn't within `timeout`, the process is stopped and
    /// Error::Timeout is returned.
    pub async fn start(argv: &[String], address: &str, timeout: Duration) -> Result<Self, Error> {
        let (program, args) = argv.split_first().ok_or(Error::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let inner = SharedChild::spawn(&mut cmd).map_err(|source| Error::Spawn {
            argv: argv.to_vec(),
            source,
        })?;
        let child = Self {
            inner: Arc::new(inner),
        };
        tracing::debug!(pid = child.id(), ?argv, "spawned child process");

        wait_for_listener(address, timeout).await?;

        Ok(child)
    }

    pub fn id(&self) -> u32 {
        self.inner.id()
    }

    pub fn wait(
        &self,
    ) -> impl std::future::Future<Output = std::io::Result<std::process::ExitStatus>> {
        let cloned_inner = self.inner.clone();
        let handle = tokio::task::spawn_blocking(move || cloned_inner.wait());
        async move {
            match handle.await {
                Ok(status) => status,
                Err(join_err) => Err(std::io::Error::new(std::io::ErrorKind::Other, join_err)),
            }
        }
    }
}

impl Drop for Child {
    fn drop(&mut self) {
        if let Ok(Some(_status)) = self.inner.try_wait() {
            return; // Already exited.
        }
        let pid = self.inner.id();

        #[cfg(unix)]
        {
            use shared_child::unix::SharedChildExt;

            // Note that send_signal() returns Ok() if the child has been waited on.
            if let Err(error) = self.inner.send_signal(libc::SIGTERM) {
                tracing::error!(%pid, ?error, "failed to deliver SIGTERM to child process");
            }
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let wait = self.wait();

        _ = runtime.spawn(async move {
            match tokio::time::timeout(Duration::from_secs(15), wait).await {
                Ok(Ok(status)) if !status.success() => {
                    tracing::debug!(%pid, %status, "dropped child process exited");
                }
                Ok(Ok(_)) => {
                    tracing::debug!(%pid, "dropped child process exited cleanly");
                }
                Ok(Err(error)) => {
                    tracing::error!(%pid, ?error, "failed to wait for dropped child process");
                }
                Err(_elapsed) => {
                    tracing::error!(%pid, "dropped child process is not exiting");
                }
            }
        });
    }
}

/// Poll `address` until it accepts a TCP connection,
/// or until `timeout` has elapsed.
pub async fn wait_for_listener(address: &str, timeout: Duration) -> Result<(), Error> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let attempt = tokio::time::timeout(
            remaining.max(POLL_INTERVAL),
            tokio::net::TcpStream::connect(address),
        );

        match attempt.await {
            // The probe connection is closed on drop.
            Ok(Ok(_probe)) => return Ok(()),
            Ok(Err(error)) => tracing::trace!(%address, %error, "child is not yet listening"),
            Err(_elapsed) => tracing::trace!(%address, "timed out dialing child"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::Timeout {
                address: address.to_string(),
            });
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
