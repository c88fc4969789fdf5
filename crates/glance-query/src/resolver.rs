//! Connector resolution: decide whether a data source is usable right now.
//!
//! Resolution runs on every UI interaction that needs a connector. A live
//! connector is held in a process-wide singleton slot per source so all
//! sessions share one backend session, but the secrets presence check always
//! runs first: removing a section drops the held connector, so credential
//! edits are picked up without a process restart.

use crate::registry::SourceDescriptor;
use crate::secrets::SecretStore;
use crate::traits::Connector;
use crate::types::SourceId;
use crate::DataError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// The one result of a resolution attempt, consumed by the orchestrator to
/// decide whether to render data, the onboarding flow, or an error.
pub enum ConnectionOutcome {
    /// A live connector, shared across sessions
    Connected(Arc<dyn Connector>),
    /// No secret section for this source; normal and expected, surfaced as
    /// the onboarding flow rather than an error
    MissingCredentials { secret_key: &'static str },
    /// Credentials are present but the factory failed (auth error, network
    /// error, malformed fields). Not retried; the operator must fix the
    /// configuration.
    ConnectionFailed {
        secret_key: &'static str,
        error: DataError,
    },
}

impl std::fmt::Debug for ConnectionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionOutcome::Connected(c) => {
                f.debug_tuple("Connected").field(&c.source_id()).finish()
            }
            ConnectionOutcome::MissingCredentials { secret_key } => f
                .debug_struct("MissingCredentials")
                .field("secret_key", secret_key)
                .finish(),
            ConnectionOutcome::ConnectionFailed { secret_key, error } => f
                .debug_struct("ConnectionFailed")
                .field("secret_key", secret_key)
                .field("error", error)
                .finish(),
        }
    }
}

/// Resolves descriptors into connection outcomes and owns the singleton
/// connector slots.
///
/// Injectable: tests build a fresh resolver per case instead of sharing a
/// language-level global.
#[derive(Default)]
pub struct ConnectorResolver {
    slots: RwLock<HashMap<SourceId, Arc<dyn Connector>>>,
}

impl ConnectorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce exactly one [`ConnectionOutcome`] for the given source.
    ///
    /// Construction is allowed to race across sessions; whichever connector
    /// lands in the slot last wins, which is fine because factories are
    /// idempotent and side-effect-free on the backend.
    pub async fn resolve(
        &self,
        descriptor: &SourceDescriptor,
        secrets: &SecretStore,
    ) -> ConnectionOutcome {
        let secret_key = descriptor.secret_key;

        let Some(section) = secrets.section(secret_key) else {
            // Absence also invalidates any connector built from old secrets.
            if self.slots.write().await.remove(&descriptor.id).is_some() {
                debug!(
                    source = %descriptor.id,
                    "Secret section removed, dropping held connector"
                );
            }
            return ConnectionOutcome::MissingCredentials { secret_key };
        };

        if let Some(connector) = self.slots.read().await.get(&descriptor.id) {
            return ConnectionOutcome::Connected(connector.clone());
        }

        debug!(source = %descriptor.id, "Constructing connector");
        match descriptor.connect(section).await {
            Ok(connector) => {
                self.slots
                    .write()
                    .await
                    .insert(descriptor.id, connector.clone());
                ConnectionOutcome::Connected(connector)
            }
            Err(error) => {
                warn!(source = %descriptor.id, %error, "Connector construction failed");
                ConnectionOutcome::ConnectionFailed { secret_key, error }
            }
        }
    }

    /// Drop the held connector for a source, closing it best-effort
    pub async fn evict(&self, id: SourceId) {
        if let Some(connector) = self.slots.write().await.remove(&id) {
            debug!(source = %id, "Evicting connector");
            if let Err(error) = connector.close().await {
                warn!(source = %id, %error, "Error closing connector");
            }
        }
    }

    /// Sources that currently hold a live connector
    pub async fn connected_sources(&self) -> Vec<SourceId> {
        self.slots.read().await.keys().copied().collect()
    }
}
