use clap::{Args, Subcommand};

use common::crypto::{prefix, KeyPair};
use common::key_store::KeyStoreError;

use bookwire_daemon::state::{AppState, StateError};

use crate::cli::op::{Op, OpContext};

/// Characters of a new public key echoed after regeneration
const PUBLIC_KEY_PREVIEW_LEN: usize = 50;

crate::command_enum! {
    (Show, Show),
    (Regenerate, Regenerate),
    (ServerPublic, ServerPublic),
}

pub type KeysCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Keys {
    #[command(subcommand)]
    pub command: KeysCommand,
}

#[async_trait::async_trait]
impl Op for Keys {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeysError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key store error: {0}")]
    Store(#[from] KeyStoreError),
}

fn describe(label: &str, pair: &KeyPair) -> String {
    format!(
        "{} key pair ({})\n{}",
        label,
        pair.kind(),
        pair.public_key().trim_end()
    )
}

/// Print the public half of the local key pairs
#[derive(Args, Debug, Clone)]
pub struct Show {
    /// Show the server pair instead of the client pair
    #[arg(long)]
    pub server: bool,
}

#[async_trait::async_trait]
impl Op for Show {
    type Error = KeysError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let output = if self.server {
            describe("server", &state.server_key_store().get_or_create())
        } else {
            describe("client", &state.client_key_store().get_or_create())
        };
        Ok(output)
    }
}

/// Replace a key pair with a freshly generated one
#[derive(Args, Debug, Clone)]
pub struct Regenerate {
    /// Regenerate the server pair instead of the client pair
    #[arg(long)]
    pub server: bool,
}

#[async_trait::async_trait]
impl Op for Regenerate {
    type Error = KeysError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;

        if !self.server {
            let pair = state.client_key_store().try_regenerate()?;
            return Ok(describe("new client", &pair));
        }

        let pair = state.server_key_store().try_regenerate()?;
        Ok(format!(
            "New server keys generated at {}\n\
             Public key (first {} chars): {}...\n\
             Restart the daemon to serve the new keys.",
            state.keys_path.display(),
            PUBLIC_KEY_PREVIEW_LEN,
            prefix(pair.public_key(), PUBLIC_KEY_PREVIEW_LEN)
        ))
    }
}

/// Fetch and print the public key a running server hands out
#[derive(Args, Debug, Clone)]
pub struct ServerPublic;

#[async_trait::async_trait]
impl Op for ServerPublic {
    type Error = KeysError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let output = match session.server_key() {
            Some(key) => format!("server public key ({})\n{}", key.kind(), key.as_str().trim_end()),
            None => "server public key unavailable".to_string(),
        };
        Ok(output)
    }
}
