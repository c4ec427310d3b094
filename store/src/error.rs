use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend: {0}")]
    Backend(String),

    /// Stored bytes that cannot belong to a well-formed database.
    #[error("stored data is corrupt: {0}")]
    Corruption(String),
}
