use clap::Parser;
use tokio::signal::unix;

fn main() {
    let args = membrane::Args::parse();

    // Map the log level to an equivalent tracing EnvFilter.
    // Restrict logged modules to the membrane, as debug logging
    // for tonic and hyper can be quite verbose.
    let log_level = args.log_level.clone();
    let env_filter = tracing_subscriber::EnvFilter::new(format!("membrane={log_level}"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .json()
        .flatten_event(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(false)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build();

    let runtime = match runtime {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(%error, "couldn't build Tokio runtime");
            std::process::exit(1);
        }
    };

    tracing::info!(%log_level, mode = ?args.mode, "membrane started");
    let result = runtime.block_on(run(args));

    // Don't wait on blocking tasks (such as waits of a child process) to complete.
    runtime.shutdown_background();

    if let Err(error) = result {
        tracing::error!(
            error = format!("{error:#}"),
            "membrane crashed with error"
        );
        std::process::exit(1);
    }
    tracing::info!("membrane exiting");
}

async fn run(args: membrane::Args) -> anyhow::Result<()> {
    // This binary embeds no cloud plugins: it requires TOLERATE_MISSING_SERVICES,
    // under which their services answer Unimplemented.
    let membrane = membrane::Membrane::new(args.into_options()?)?;

    // Gracefully exit on either SIGINT (ctrl-c) or SIGTERM.
    let mut sigint = unix::signal(unix::SignalKind::interrupt())?;
    let mut sigterm = unix::signal(unix::SignalKind::terminate())?;

    tokio::select! {
        result = membrane.start() => result,
        _ = sigint.recv() => {
            tracing::info!("caught signal to exit");
            Ok(())
        }
        _ = sigterm.recv() => {
            tracing::info!("caught signal to exit");
            Ok(())
        }
    }
}
