// ── Backend data collaborator ──
//
// The store and the mutation gate only talk to the backend through
// `EntityBackend<K>`. `HttpBackend` is the production implementation over
// `pigmea-api`; tests substitute in-memory fakes.

use async_trait::async_trait;
use pigmea_api::BackendClient;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Entity, EntityId};

/// CRUD + uniqueness probe for one record kind.
#[async_trait]
pub trait EntityBackend<K: Entity>: Send + Sync {
    /// Fetch the full collection.
    async fn list(&self) -> Result<Vec<K>, CoreError>;

    /// Create a record, returning the stored version (with its id).
    async fn create(&self, input: &K::Create) -> Result<K, CoreError>;

    /// Apply a partial update, returning the stored version.
    async fn update(&self, id: &EntityId, patch: &K::Patch) -> Result<K, CoreError>;

    /// Hard delete.
    async fn remove(&self, id: &EntityId) -> Result<(), CoreError>;

    /// Soft delete, returning the archived record.
    async fn archive(&self, id: &EntityId) -> Result<K, CoreError>;

    /// Whether some record already has `value` in `field`.
    async fn exists_by_unique_field(&self, field: &str, value: &str) -> Result<bool, CoreError>;
}

/// REST implementation backed by [`BackendClient`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: BackendClient,
}

impl HttpBackend {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }
}

#[async_trait]
impl<K: Entity> EntityBackend<K> for HttpBackend {
    async fn list(&self) -> Result<Vec<K>, CoreError> {
        debug!(kind = %K::KIND, "listing");
        Ok(self.client.list(K::KIND.resource()).await?)
    }

    async fn create(&self, input: &K::Create) -> Result<K, CoreError> {
        Ok(self.client.create(K::KIND.resource(), input).await?)
    }

    async fn update(&self, id: &EntityId, patch: &K::Patch) -> Result<K, CoreError> {
        self.client
            .update(K::KIND.resource(), id.as_str(), patch)
            .await
            .map_err(|e| CoreError::from(e).for_kind(K::KIND))
    }

    async fn remove(&self, id: &EntityId) -> Result<(), CoreError> {
        self.client
            .remove(K::KIND.resource(), id.as_str())
            .await
            .map_err(|e| CoreError::from(e).for_kind(K::KIND))
    }

    async fn archive(&self, id: &EntityId) -> Result<K, CoreError> {
        self.client
            .archive(K::KIND.resource(), id.as_str())
            .await
            .map_err(|e| CoreError::from(e).for_kind(K::KIND))
    }

    async fn exists_by_unique_field(&self, field: &str, value: &str) -> Result<bool, CoreError> {
        Ok(self.client.exists(K::KIND.resource(), field, value).await?)
    }
}
