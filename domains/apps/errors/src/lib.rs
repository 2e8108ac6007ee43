use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Database error: {0}")]
    Database(#[from] sql_connection::PgError),
    #[error("Connection error: {0}")]
    Connection(#[from] sql_connection::PoolError),
    #[error("Application not found: {app_id}")]
    NotFound { app_id: Uuid },
    #[error("Key hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}
