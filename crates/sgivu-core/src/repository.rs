// ── Generic CRUD repository ──
//
// Binds one `ResourceClient` to one `PagedCollectionStore`. Every operation
// goes to the backend first; the cache is only touched after a successful
// response, so a failed call never leaves partial state behind.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use sgivu_api::{Page, ResourceClient};

use crate::error::CoreError;
use crate::model::Entity;
use crate::store::PagedCollectionStore;

/// Reshapes a raw `/count` payload (e.g. `totalCars` -> `total`).
pub type CountMapper = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// The canonical operation set for one REST resource.
///
/// Cheaply cloneable: clones share the HTTP client and the cache.
pub struct Repository<T: Clone + Send + Sync + 'static> {
    client: ResourceClient,
    store: Arc<PagedCollectionStore<T>>,
    count_mapper: Option<CountMapper>,
}

impl<T: Clone + Send + Sync + 'static> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: Arc::clone(&self.store),
            count_mapper: self.count_mapper.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("base_url", &self.client.base_url().as_str())
            .field("cached", &self.store.len())
            .field("count_mapper", &self.count_mapper.is_some())
            .finish()
    }
}

impl<T> Repository<T>
where
    T: Entity + Clone + Send + Sync + 'static,
{
    /// Build a repository keyed by [`Entity::id`].
    pub fn new(client: ResourceClient) -> Self {
        Self::with_id_selector(client, T::id)
    }
}

impl<T> Repository<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build a repository with an explicit identifier selector.
    pub fn with_id_selector(client: ResourceClient, id_of: fn(&T) -> i64) -> Self {
        Self {
            client,
            store: Arc::new(PagedCollectionStore::new(id_of)),
            count_mapper: None,
        }
    }

    /// Reshape `/count` responses before handing them out.
    pub fn with_count_mapper(
        mut self,
        mapper: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.count_mapper = Some(Arc::new(mapper));
        self
    }

    /// Read-only access to the cache.
    pub fn store(&self) -> &Arc<PagedCollectionStore<T>> {
        &self.store
    }

    pub fn client(&self) -> &ResourceClient {
        &self.client
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a record and append the backend's copy to the cache.
    pub async fn create(&self, payload: &T) -> Result<T, CoreError> {
        let created: T = self.client.create(payload).await?;
        self.store.push(created.clone());
        Ok(created)
    }

    /// Fetch every record and replace the cache with them.
    pub async fn list_all(&self) -> Result<Vec<T>, CoreError> {
        let items: Vec<T> = self.client.list_all().await?;
        self.store.replace_all(items.clone());
        Ok(items)
    }

    /// Fetch one page and cache the envelope. The flat list is untouched.
    pub async fn list_page(&self, page: u64) -> Result<Page<T>, CoreError> {
        let pager: Page<T> = self.client.list_page(page).await?;
        self.store.set_pager(pager.clone());
        Ok(pager)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<T, CoreError> {
        Ok(self.client.get_by_id(id).await?)
    }

    /// Update a record. The cached record matching the *returned* record's
    /// identifier is replaced; if none matches, nothing is inserted.
    pub async fn update(&self, id: i64, payload: &T) -> Result<T, CoreError> {
        let updated: T = self.client.update(id, payload).await?;
        if !self.store.replace(updated.clone()) {
            debug!(id, "updated record not cached, cache left unchanged");
        }
        Ok(updated)
    }

    /// Delete a record; absent identifiers are a cache no-op.
    pub async fn delete(&self, id: i64) -> Result<(), CoreError> {
        self.client.delete(id).await?;
        if !self.store.remove(id) {
            debug!(id, "deleted record was not cached");
        }
        Ok(())
    }

    pub async fn search<F: Serialize + Sync>(&self, filters: &F) -> Result<Vec<T>, CoreError> {
        Ok(self.client.search(filters).await?)
    }

    pub async fn search_page<F: Serialize + Sync>(
        &self,
        page: u64,
        filters: &F,
    ) -> Result<Page<T>, CoreError> {
        Ok(self.client.search_page(page, filters).await?)
    }

    /// Aggregate counts, reshaped by the count mapper when one is set.
    pub async fn get_counts(&self) -> Result<Value, CoreError> {
        let raw = self.client.count().await?;
        Ok(match &self.count_mapper {
            Some(mapper) => mapper(raw),
            None => raw,
        })
    }

    /// Change a record's status and patch the cached copy with the status
    /// the backend settled on.
    pub async fn change_status(
        &self,
        id: i64,
        status: &str,
        apply: impl FnOnce(&mut T, &str),
    ) -> Result<String, CoreError> {
        let settled = self.client.change_status(id, status).await?;
        self.store.modify(id, |item| apply(item, &settled));
        Ok(settled)
    }
}
