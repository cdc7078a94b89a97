//! Repository error types.

use thiserror::Error;

/// Errors surfaced by any repository adapter.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The remote service answered with something other than 200.
    #[error("Remote returned status {status}: {body}")]
    TransportFailure { status: u16, body: String },

    /// The HTTP request could not be performed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The operation targeted an identifier absent from the store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The record was created but its identifier could not be determined.
    #[error("Created '{title}' but could not resolve its identifier")]
    IdentityUnresolved { title: String },

    /// A response did not have the expected shape.
    #[error("Unexpected response shape: {0}")]
    SchemaMismatch(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
