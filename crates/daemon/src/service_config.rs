use std::net::SocketAddr;
use std::path::PathBuf;

use common::crypto::{KeyStrategy, SignaturePolicy};

#[derive(Debug, Clone)]
pub struct Config {
    /// address for the API server to listen on
    pub listen_addr: SocketAddr,

    // key configuration
    /// on system file path to the server key pair,
    ///  if not set the pair only lives in memory
    pub keys_path: Option<PathBuf>,
    /// strategy for generating a new pair
    pub key_strategy: KeyStrategy,
    pub signature_policy: SignaturePolicy,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Listen on all interfaces at `port`
    pub fn on_port(port: u16) -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            keys_path: None,
            key_strategy: KeyStrategy::default(),
            signature_policy: SignaturePolicy::default(),
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}
