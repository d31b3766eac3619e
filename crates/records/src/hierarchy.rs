//! Root → Employee → Month container hierarchy.
//!
//! Containers are resolved by name among the live direct children of a
//! parent. When the store holds several matches the oldest one wins, so
//! every caller converges on the same container even after a duplicate slips
//! in. All creation goes through one critical section so two tasks in this
//! process never both create the same child.

use daysheet_core::error::CoreError;
use daysheet_core::naming::month_container_name;
use daysheet_core::types::ResourceId;
use daysheet_store::{DocumentStore, NewResource, Query, Resource, ResourceKind, StoreHandle};
use tokio::sync::Mutex;

use crate::directory::EmployeeRecord;

/// Container property carrying the employee's stable id.
pub const EMPLOYEE_ID_PROPERTY: &str = "employee_id";

/// Default name of the root container.
pub const DEFAULT_ROOT_NAME: &str = "EMS_Root";

/// Resolves and creates containers and day documents.
pub struct Hierarchy {
    store: StoreHandle,
    root_name: String,
    creation: Mutex<()>,
}

impl Hierarchy {
    pub fn new(store: StoreHandle, root_name: impl Into<String>) -> Self {
        Self {
            store,
            root_name: root_name.into(),
            creation: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// The oldest live resource matching `query`.
    async fn oldest(&self, query: &Query) -> Result<Option<Resource>, CoreError> {
        Ok(self.store.list(query).await?.into_iter().next())
    }

    /// Return the oldest match of `existing`, or create `new` if there is
    /// none. The boolean is true when the resource was created.
    pub async fn create_once(
        &self,
        existing: &Query,
        new: NewResource,
    ) -> Result<(Resource, bool), CoreError> {
        let _guard = self.creation.lock().await;
        if let Some(found) = self.oldest(existing).await? {
            return Ok((found, false));
        }
        let created = self.store.create(new).await?;
        tracing::info!(
            resource_id = %created.id,
            name = %created.name,
            kind = ?created.kind,
            "Created resource"
        );
        Ok((created, true))
    }

    fn container_query(name: &str, parent: Option<&str>) -> Query {
        let query = match parent {
            Some(parent) => Query::children_of(parent).with_name(name),
            None => Query::named(name),
        };
        query.of_kind(ResourceKind::Container)
    }

    /// Look up a container without creating it.
    pub async fn find(&self, name: &str, parent: Option<&str>) -> Result<Option<ResourceId>, CoreError> {
        Ok(self
            .oldest(&Self::container_query(name, parent))
            .await?
            .map(|r| r.id))
    }

    /// Idempotently resolve the container `name` under `parent`.
    pub async fn resolve_or_create(&self, name: &str, parent: Option<&str>) -> Result<ResourceId, CoreError> {
        let mut new = NewResource::container(name);
        if let Some(parent) = parent {
            new = new.under(parent);
        }
        let (container, _) = self
            .create_once(&Self::container_query(name, parent), new)
            .await?;
        Ok(container.id)
    }

    pub async fn root(&self) -> Result<ResourceId, CoreError> {
        self.resolve_or_create(&self.root_name, None).await
    }

    /// Look up an employee's container: by stable id first, then by display
    /// name for containers created before ids were recorded.
    pub async fn find_employee(&self, employee: &EmployeeRecord) -> Result<Option<ResourceId>, CoreError> {
        let root = self.root().await?;
        let by_id = Query::children_of(root.clone())
            .of_kind(ResourceKind::Container)
            .with_property(EMPLOYEE_ID_PROPERTY, employee.id.clone());
        if let Some(found) = self.oldest(&by_id).await? {
            return Ok(Some(found.id));
        }
        self.find_untagged(&root, &employee.name).await
    }

    async fn find_untagged(&self, root: &str, name: &str) -> Result<Option<ResourceId>, CoreError> {
        let by_name = Self::container_query(name, Some(root));
        Ok(self
            .store
            .list(&by_name)
            .await?
            .into_iter()
            .find(|r| r.property(EMPLOYEE_ID_PROPERTY).is_none())
            .map(|r| r.id))
    }

    /// Resolve an employee's container, creating it when absent.
    pub async fn resolve_employee(&self, employee: &EmployeeRecord) -> Result<ResourceId, CoreError> {
        match self.find_employee(employee).await? {
            Some(found) => Ok(found),
            None => self.create_employee(employee).await,
        }
    }

    /// Create the container tagged with the employee's id, unless a tagged
    /// one already exists. Untagged containers are not considered.
    pub async fn create_employee(&self, employee: &EmployeeRecord) -> Result<ResourceId, CoreError> {
        let root = self.root().await?;
        let by_id = Query::children_of(root.clone())
            .of_kind(ResourceKind::Container)
            .with_property(EMPLOYEE_ID_PROPERTY, employee.id.clone());
        let new = NewResource::container(employee.name.clone())
            .under(root)
            .with_property(EMPLOYEE_ID_PROPERTY, employee.id.clone());
        let (container, created) = self.create_once(&by_id, new).await?;
        if created {
            tracing::info!(employee_id = %employee.id, container_id = %container.id, "Created employee container");
        }
        Ok(container.id)
    }

    /// The `"{MonthName}_{Year}"` container under `employee_container`.
    ///
    /// Returns `None` only when `create` is false and the container is absent.
    pub async fn month_container(
        &self,
        employee_container: &str,
        year: i32,
        month: u32,
        create: bool,
    ) -> Result<Option<ResourceId>, CoreError> {
        let name = month_container_name(year, month)?;
        if create {
            self.resolve_or_create(&name, Some(employee_container))
                .await
                .map(Some)
        } else {
            self.find(&name, Some(employee_container)).await
        }
    }

    /// Live documents in a container, oldest first.
    pub async fn documents(&self, container: &str) -> Result<Vec<Resource>, CoreError> {
        Ok(self
            .store
            .list(&Query::children_of(container).of_kind(ResourceKind::Document))
            .await?)
    }

    /// Look up a document by name without creating it.
    pub async fn find_document(&self, container: &str, name: &str) -> Result<Option<ResourceId>, CoreError> {
        Ok(self
            .oldest(&Self::document_query(container, name))
            .await?
            .map(|r| r.id))
    }

    pub(crate) fn document_query(container: &str, name: &str) -> Query {
        Query::children_of(container)
            .with_name(name)
            .of_kind(ResourceKind::Document)
    }
}
