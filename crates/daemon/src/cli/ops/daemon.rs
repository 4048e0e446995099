use std::net::SocketAddr;

use clap::Args;

use bookwire_daemon::state::{AppState, StateError};
use bookwire_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override API server port (default from config)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Directory for log files (default from config, stdout only if unset)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,

    /// Log level for stdout and file output
    #[arg(long, default_value_t = tracing::Level::INFO)]
    pub log_level: tracing::Level,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;

        let api_port = self.api_port.unwrap_or(state.config.api_port);

        let config = ServiceConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], api_port)),
            keys_path: Some(state.keys_path.clone()),
            key_strategy: state.config.key_strategy,
            signature_policy: state.config.signature_policy,
            log_level: self.log_level,
            log_dir: self.log_dir.clone().or(state.config.log_dir),
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
