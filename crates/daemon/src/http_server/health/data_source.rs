use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use common::crypto::{Decoded, Integrity};

use crate::ServiceState;

/// Plaintext pushed through the codec by the readiness probe
const PROBE: &str = "{\"probe\":\"readyz\"}";

#[async_trait]
pub trait DataSource {
    /// Perform various checks on the system to ensure its healthy and ready to accept requests.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("server keys cannot round-trip an envelope")]
    KeysUnusable,
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Seals a probe for the current server pair and opens it again
struct KeySource {
    state: ServiceState,
}

#[async_trait]
impl DataSource for KeySource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        let keys = self.state.keys();
        let codec = self.state.transport().codec();

        let envelope = codec.try_encode(PROBE, &keys.public()).map_err(|e| {
            tracing::error!(error = %e, "readiness probe could not seal with server keys");
            DataSourceError::KeysUnusable
        })?;
        match codec.decode(&envelope, &keys.private()) {
            Decoded::Plaintext { text, integrity }
                if text == PROBE
                    && matches!(integrity, Integrity::Verified | Integrity::Unsigned) =>
            {
                Ok(())
            }
            _ => Err(DataSourceError::KeysUnusable),
        }
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = ();

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(KeySource {
            state: state.clone(),
        })))
    }
}
