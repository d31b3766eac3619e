//! Employee directory: who exists, their capabilities, and where their
//! container lives.
//!
//! The directory is an external collaborator. [`JsonDirectory`] keeps it in a
//! `users.json`-style map keyed by employee id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use daysheet_core::error::CoreError;
use daysheet_core::types::{EmployeeId, ResourceId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use validator::Validate;

/// Folder references that were never wired to a real container.
const DUMMY_FOLDER_ID: &str = "dummy_folder_id";

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Employee not found: {0}")]
    NotFound(EmployeeId),

    #[error("Employee already exists: {0}")]
    AlreadyExists(EmployeeId),

    #[error("Invalid employee record: {0}")]
    Invalid(String),

    #[error("Directory I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<DirectoryError> for CoreError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => CoreError::NotFound {
                entity: "employee",
                name: id,
            },
            DirectoryError::AlreadyExists(id) => {
                CoreError::Validation(format!("Employee '{id}' already exists"))
            }
            DirectoryError::Invalid(msg) => CoreError::Validation(msg),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

/// A message left for an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub date: NaiveDate,
}

/// One directory entry.
///
/// `password` is carried through opaquely; nothing here interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmployeeRecord {
    /// Stable id. In the JSON file this is the map key.
    #[serde(default, skip_serializing)]
    pub id: EmployeeId,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_mentor: bool,
    #[serde(default)]
    pub folder_id: Option<ResourceId>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl EmployeeRecord {
    pub fn new(id: impl Into<EmployeeId>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            password: String::new(),
            designation: String::new(),
            roles: Vec::new(),
            is_mentor: false,
            folder_id: None,
            notifications: Vec::new(),
        }
    }

    pub fn mentor(mut self) -> Self {
        self.is_mentor = true;
        self
    }

    pub fn with_folder(mut self, folder_id: impl Into<ResourceId>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    /// The container reference, unless it is missing or a placeholder.
    pub fn folder_ref(&self) -> Option<&str> {
        let folder = self.folder_id.as_deref()?.trim();
        let placeholder = folder.is_empty()
            || folder == DUMMY_FOLDER_ID
            || folder.to_ascii_lowercase().contains("placeholder");
        (!placeholder).then_some(folder)
    }
}

/// Read/write access to the employee directory.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Every employee, ordered by id.
    async fn list(&self) -> Result<Vec<EmployeeRecord>, DirectoryError>;

    async fn get(&self, id: &str) -> Result<EmployeeRecord, DirectoryError>;

    /// Point an employee at a container, or clear the reference.
    async fn set_folder(&self, id: &str, folder_id: Option<ResourceId>) -> Result<(), DirectoryError>;

    /// Append to the employee's notification log.
    async fn notify(&self, id: &str, message: &str) -> Result<(), DirectoryError>;
}

// ---------------------------------------------------------------------------
// JsonDirectory
// ---------------------------------------------------------------------------

/// Directory persisted as a JSON object of `{ id: record }`.
///
/// Every mutation rewrites the whole file. An in-memory instance never
/// touches disk.
pub struct JsonDirectory {
    path: Option<PathBuf>,
    records: RwLock<BTreeMap<EmployeeId, EmployeeRecord>>,
}

impl JsonDirectory {
    /// Load from `path`. A missing file is an empty directory.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DirectoryError> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Directory file not found, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        let records = with_ids(records);
        tracing::info!(path = %path.display(), count = records.len(), "Loaded employee directory");
        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    pub fn in_memory(records: impl IntoIterator<Item = EmployeeRecord>) -> Self {
        Self {
            path: None,
            records: RwLock::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Add a new employee.
    pub async fn insert(&self, record: EmployeeRecord) -> Result<(), DirectoryError> {
        if record.id.trim().is_empty() {
            return Err(DirectoryError::Invalid("id must not be empty".into()));
        }
        record
            .validate()
            .map_err(|e| DirectoryError::Invalid(e.to_string()))?;

        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(DirectoryError::AlreadyExists(record.id));
        }
        records.insert(record.id.clone(), record);
        self.persist(&records).await
    }

    /// Remove an employee, returning the removed record.
    pub async fn remove(&self, id: &str) -> Result<EmployeeRecord, DirectoryError> {
        let mut records = self.records.write().await;
        let removed = records
            .remove(id)
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;
        self.persist(&records).await?;
        Ok(removed)
    }

    async fn persist(&self, records: &BTreeMap<EmployeeId, EmployeeRecord>) -> Result<(), DirectoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn update<F>(&self, id: &str, apply: F) -> Result<(), DirectoryError>
    where
        F: FnOnce(&mut EmployeeRecord) + Send,
    {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;
        apply(record);
        self.persist(&records).await
    }
}

fn with_ids(records: BTreeMap<EmployeeId, EmployeeRecord>) -> BTreeMap<EmployeeId, EmployeeRecord> {
    records
        .into_iter()
        .map(|(id, mut record)| {
            record.id = id.clone();
            (id, record)
        })
        .collect()
}

#[async_trait]
impl EmployeeDirectory for JsonDirectory {
    async fn list(&self) -> Result<Vec<EmployeeRecord>, DirectoryError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<EmployeeRecord, DirectoryError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }

    async fn set_folder(&self, id: &str, folder_id: Option<ResourceId>) -> Result<(), DirectoryError> {
        self.update(id, |record| record.folder_id = folder_id).await
    }

    async fn notify(&self, id: &str, message: &str) -> Result<(), DirectoryError> {
        let notification = Notification {
            message: message.to_string(),
            date: Utc::now().date_naive(),
        };
        self.update(id, |record| record.notifications.push(notification))
            .await
    }
}
