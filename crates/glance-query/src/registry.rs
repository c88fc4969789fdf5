use crate::error::{DataError, Result};
use crate::secrets::SecretSection;
use crate::traits::{Connector, ConnectorFactory};
use crate::types::{SourceId, TutorialFlow};
use std::sync::Arc;
use tracing::{debug, warn};

/// Static metadata and wiring for one supported data source.
///
/// Built once by the composition root and never mutated afterwards.
pub struct SourceDescriptor {
    pub id: SourceId,
    /// Human-facing name shown in selection controls
    pub label: &'static str,
    /// Top-level secrets section this source reads its credentials from
    pub secret_key: &'static str,
    /// Documentation page explaining how to connect
    pub docs_url: &'static str,
    /// TOML skeleton the operator should paste into the secrets store
    pub credential_template: &'static str,
    /// Setup walkthrough shown while the source is not connectable
    pub tutorial: TutorialFlow,
    factory: Arc<dyn ConnectorFactory>,
}

impl SourceDescriptor {
    pub fn new(
        id: SourceId,
        docs_url: &'static str,
        credential_template: &'static str,
        tutorial: TutorialFlow,
        factory: Arc<dyn ConnectorFactory>,
    ) -> Self {
        Self {
            id,
            label: id.label(),
            secret_key: id.secret_key(),
            docs_url,
            credential_template,
            tutorial,
            factory,
        }
    }

    /// Invoke the connector factory once with the given secret section
    pub async fn connect(&self, secrets: &SecretSection) -> Result<Arc<dyn Connector>> {
        self.factory.connect(secrets).await
    }
}

impl std::fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("id", &self.id)
            .field("secret_key", &self.secret_key)
            .finish()
    }
}

/// Single source of truth mapping data source names to their metadata.
///
/// Registration is static and closed: the composition root registers every
/// supported source at startup and nothing is added at runtime. Lookups are
/// pure.
#[derive(Default)]
pub struct SourceRegistry {
    entries: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Re-registering an id replaces the previous
    /// descriptor in place, keeping the original position.
    pub fn register(&mut self, descriptor: SourceDescriptor) {
        if let Some(existing) = self.entries.iter_mut().find(|d| d.id == descriptor.id) {
            warn!("Overwriting existing descriptor for source: {}", descriptor.id);
            *existing = descriptor;
            return;
        }
        debug!("Registered data source: {}", descriptor.id);
        self.entries.push(descriptor);
    }

    /// Look up a descriptor by its human-facing label
    pub fn lookup(&self, name: &str) -> Result<&SourceDescriptor> {
        self.entries
            .iter()
            .find(|d| d.label == name)
            .ok_or_else(|| DataError::UnknownSource(name.to_string()))
    }

    /// Look up a descriptor by source id
    pub fn get(&self, id: SourceId) -> Option<&SourceDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    /// Labels of all registered sources, in registration order.
    /// Used to populate the selection control.
    pub fn list_ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|d| d.label).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
