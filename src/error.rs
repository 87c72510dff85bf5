use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for BillingError {
    fn from(e: rocksdb::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
