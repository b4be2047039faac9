use thiserror::Error;

/// Errors from durable repository operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors decoding an ephemeral JSON document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid document: {0}")]
    Json(String),

    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u32),
}

/// Errors from the ephemeral session store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ephemeral store error: {0}")]
    Backend(String),

    #[error("malformed document at '{key}': {reason}")]
    Malformed { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn malformed(key: &str, err: DocumentError) -> Self {
        StoreError::Malformed {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Errors from the reference catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to fetch catalog: {0}")]
    Fetch(#[from] RepositoryError),

    #[error("duplicate catalog code '{0}'")]
    DuplicateCode(String),
}

/// Errors from remote collaborators (assistant service, messaging provider).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Errors that abort processing of a single inbound message.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("assistant call failed: {0}")]
    Collaborator(CollaboratorError),

    #[error("delivery failed: {0}")]
    Delivery(CollaboratorError),

    #[error("session for '{0}' disappeared mid-request")]
    SessionMissing(String),

    #[error("request cancelled")]
    Cancelled,
}

/// Errors migrating one correspondent's session to durable storage.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Fatal configuration errors detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config value: {0}")]
    Invalid(String),

    #[error("missing required setting {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_store_malformed_display() {
        let err = StoreError::malformed("session:1", DocumentError::UnsupportedVersion(3));
        assert_eq!(
            err.to_string(),
            "malformed document at 'session:1': unsupported schema version 3"
        );
    }

    #[test]
    fn test_pipeline_error_from_store() {
        let err: PipelineError = StoreError::Backend("down".to_string()).into();
        assert_eq!(err.to_string(), "ephemeral store error: down");
    }

    #[test]
    fn test_config_missing_display() {
        let err = ConfigError::Missing("PARLEY_ASSISTANT_URL");
        assert!(err.to_string().contains("PARLEY_ASSISTANT_URL"));
    }
}
