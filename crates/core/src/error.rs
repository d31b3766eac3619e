#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} '{name}'")]
    NotFound { entity: &'static str, name: String },

    #[error("Invalid slot {index} for zone {zone}")]
    InvalidSlot { zone: &'static str, index: usize },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Duplicate id: {count} containers share the name '{name}'")]
    DuplicateId { name: String, count: usize },

    #[error("Document is locked: {0}")]
    Locked(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
