mod resolver;
mod snapshot;

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::record::{NormalizedRecord, UNKNOWN_NAME};

pub use resolver::{CommandIdentityResolver, ResolveError};
pub use snapshot::{FetchError, HttpSnapshotFetcher};

/// A still image taken from the device. Lives for a single enrichment attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotImage(Vec<u8>);

impl SnapshotImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Source of device snapshots.
#[async_trait::async_trait]
pub trait SnapshotSource {
    /// Takes one snapshot. `device_ip` falls back to the configured default device.
    async fn fetch(&self, device_ip: Option<&str>) -> Result<SnapshotImage, FetchError>;
}

/// Identifies the person in a snapshot.
#[async_trait::async_trait]
pub trait IdentityResolver {
    /// Returns the recognized name or the unknown sentinel.
    async fn resolve(&self, image: SnapshotImage) -> Result<String, ResolveError>;
}

/// Failure of an enrichment attempt. Never reaches the caller of the webhook.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// What a successful enrichment attempt did to the record.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Recognized(String),
    Unrecognized,
}

/// True for the labels the recognizer prints when nobody matched.
pub fn is_unknown_label(label: &str) -> bool {
    let label = label.trim();
    label.is_empty()
        || label.eq_ignore_ascii_case(UNKNOWN_NAME)
        || label.eq_ignore_ascii_case("unknown")
}

/// Improves a record's name using face recognition on a fresh device snapshot.
pub struct EnrichmentCoordinator {
    snapshots: Arc<dyn SnapshotSource + Send + Sync + 'static>,
    resolver: Arc<dyn IdentityResolver + Send + Sync + 'static>,
}

impl EnrichmentCoordinator {
    pub fn new(
        snapshots: Arc<dyn SnapshotSource + Send + Sync + 'static>,
        resolver: Arc<dyn IdentityResolver + Send + Sync + 'static>,
    ) -> Self {
        Self { snapshots, resolver }
    }

    /// Fetches a snapshot and resolves it, then sets `record.name` if someone was
    /// recognized.
    ///
    /// Errors are logged here and the record is left untouched. Callers look at
    /// the outcome but must not fail the request because of it.
    #[instrument(skip(self, record))]
    pub async fn enrich(
        &self,
        record: &mut NormalizedRecord,
        device_ip: Option<&str>,
    ) -> Result<Enrichment, EnrichmentError> {
        let label = match self.identify(device_ip).await {
            Ok(label) => label,
            Err(error) => {
                warn!(%error, "Face recognition failed, keeping default name");
                return Err(error);
            }
        };

        if is_unknown_label(&label) {
            debug!("Nobody recognized in snapshot");
            return Ok(Enrichment::Unrecognized);
        }

        info!(name = %label, "Person recognized");
        record.name = label.clone();
        Ok(Enrichment::Recognized(label))
    }

    async fn identify(&self, device_ip: Option<&str>) -> Result<String, EnrichmentError> {
        let image = self.snapshots.fetch(device_ip).await?;
        debug!(bytes = image.as_bytes().len(), "Snapshot fetched");
        Ok(self.resolver.resolve(image).await?)
    }
}
