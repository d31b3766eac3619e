/// Identifier of a container or document in the remote store.
pub type ResourceId = String;

/// Stable employee identifier issued by the employee directory.
pub type EmployeeId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
