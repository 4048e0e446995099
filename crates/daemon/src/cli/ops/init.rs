use clap::Args;

use common::crypto::{KeyStrategy, SignaturePolicy};

use bookwire_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// API server port
    #[arg(long, default_value_t = 3000)]
    pub api_port: u16,

    /// How server keys are generated: rsa or derived-hash
    #[arg(long, default_value_t = KeyStrategy::Rsa)]
    pub key_strategy: KeyStrategy,

    /// What to do with a bad envelope signature: advisory or enforce
    #[arg(long, default_value_t = SignaturePolicy::Advisory)]
    pub signature_policy: SignaturePolicy,

    /// Directory for daemon log files
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            api_port: self.api_port,
            key_strategy: self.key_strategy,
            signature_policy: self.signature_policy,
            log_dir: self.log_dir.clone(),
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        Ok(format!(
            "Initialized bookwire directory at: {}\n\
             - Config: {}\n\
             - Server keys: {}\n\
             - Client storage: {}\n\
             - API port: {}\n\
             - Key strategy: {}\n\
             - Signature policy: {}",
            state.bookwire_dir.display(),
            state.config_path.display(),
            state.keys_path.display(),
            state.local_storage_path.display(),
            state.config.api_port,
            state.config.key_strategy,
            state.config.signature_policy,
        ))
    }
}
