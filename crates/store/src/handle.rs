//! Shared, swappable reference to the active store.

use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use daysheet_core::schema::CellRange;

use crate::error::StoreError;
use crate::model::{FormatRequest, NewResource, Query, Resource};
use crate::store::DocumentStore;

/// Cloneable handle whose inner store can be replaced at runtime.
///
/// Every component holds a `StoreHandle` instead of a concrete client. After
/// re-authentication the caller builds a fresh client and calls
/// [`replace`](Self::replace); in-flight calls finish on the old client and
/// new calls pick up the new one.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<RwLock<Arc<dyn DocumentStore>>>,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// The store new calls are routed to.
    pub fn current(&self) -> Arc<dyn DocumentStore> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a new store.
    pub fn replace(&self, store: Arc<dyn DocumentStore>) {
        match self.inner.write() {
            Ok(mut guard) => *guard = store,
            Err(poisoned) => *poisoned.into_inner() = store,
        }
        tracing::info!("Document store client replaced");
    }
}

#[async_trait]
impl DocumentStore for StoreHandle {
    async fn list(&self, query: &Query) -> Result<Vec<Resource>, StoreError> {
        self.current().list(query).await
    }

    async fn create(&self, resource: NewResource) -> Result<Resource, StoreError> {
        self.current().create(resource).await
    }

    async fn trash(&self, id: &str) -> Result<(), StoreError> {
        self.current().trash(id).await
    }

    async fn get_cell_range(
        &self,
        id: &str,
        range: CellRange,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        self.current().get_cell_range(id, range).await
    }

    async fn set_cell_range(
        &self,
        id: &str,
        range: CellRange,
        values: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        self.current().set_cell_range(id, range, values).await
    }

    async fn is_protected(&self, id: &str) -> Result<bool, StoreError> {
        self.current().is_protected(id).await
    }

    async fn batch_format(&self, id: &str, requests: Vec<FormatRequest>) -> Result<(), StoreError> {
        self.current().batch_format(id, requests).await
    }

    async fn upload(&self, path: &Path, resource: NewResource) -> Result<Resource, StoreError> {
        self.current().upload(path, resource).await
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.current().download(id).await
    }
}
