pub mod utils;

use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const LOG_FILE_NAME: &str = "bookwire.log";

use crate::http_server;
use crate::{ServiceConfig, ServiceState};

/// Handle for gracefully shutting down the daemon service.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until the service shuts down (via signal or explicit shutdown).
    pub async fn wait(self) {
        shutdown_and_join(self.graceful_waiter, self.handles).await;
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Initialize logging, panic handler, and build info reporting.
/// Returns guards that must be kept alive for the duration of the program.
fn init_logging(
    service_config: &ServiceConfig,
) -> Vec<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let mut guards = Vec::new();

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdout_guard);

    let stdout_env_filter = EnvFilter::builder()
        .with_default_directive(service_config.log_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(stdout_env_filter);

    match &service_config.log_dir {
        Some(log_dir) => {
            if let Err(e) = std::fs::create_dir_all(log_dir) {
                eprintln!(
                    "Warning: Failed to create log directory {:?}: {}",
                    log_dir, e
                );
            }

            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            guards.push(file_guard);

            let file_env_filter = EnvFilter::builder()
                .with_default_directive(service_config.log_level.into())
                .from_env_lossy();

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(file_env_filter);

            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(file_layer)
                .init();
        }
        None => tracing_subscriber::registry().with(stdout_layer).init(),
    }

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

/// Create service state from config, exiting on error.
async fn create_state(service_config: &ServiceConfig) -> ServiceState {
    match ServiceState::from_config(service_config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("error creating server state: {}", e);
            std::process::exit(3);
        }
    }
}

/// Wait for shutdown and join all handles with timeout.
async fn shutdown_and_join(
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
) {
    let _ = graceful_waiter.await;

    if timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(handles))
        .await
        .is_err()
    {
        tracing::error!(
            "Failed to shut down within {} seconds",
            FINAL_SHUTDOWN_TIMEOUT.as_secs()
        );
        std::process::exit(4);
    }
}

/// Create state and spawn the API server, returning the state handle.
///
/// Use this when you need access to `ServiceState`, e.g. to rotate keys
/// in-process. Dropping the returned `ShutdownHandle` does not stop the
/// service.
pub async fn start_service(service_config: &ServiceConfig) -> (ServiceState, ShutdownHandle) {
    let (graceful_waiter, shutdown_tx, shutdown_rx) = utils::graceful_shutdown_blocker();
    let state = create_state(service_config).await;

    let api_state = state.clone();
    let api_config = http_server::Config {
        log_level: service_config.log_level,
        ..http_server::Config::new(service_config.listen_addr)
    };
    let api_handle = tokio::spawn(async move {
        if let Err(e) = http_server::run_api(api_config, api_state, shutdown_rx).await {
            tracing::error!("API server error: {}", e);
        }
    });

    tracing::info!(addr = %service_config.listen_addr, "running API server");

    let handle = ShutdownHandle {
        graceful_waiter,
        handles: vec![api_handle],
        shutdown_tx,
    };

    (state, handle)
}

/// Spawns the daemon service and blocks until a shutdown signal is received.
/// Use for CLI binary usage.
pub async fn spawn_service(service_config: &ServiceConfig) {
    let _guards = init_logging(service_config);
    let (_, handle) = start_service(service_config).await;
    handle.wait().await;
}
