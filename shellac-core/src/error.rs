use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("album not found")]
    NotFound,

    #[error("malformed album record: {0}")]
    MalformedRecord(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("ranking read abandoned after {attempts} contended attempts")]
    Contention { attempts: u32 },
}

impl From<redis::RedisError> for CatalogError {
    fn from(err: redis::RedisError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
