use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParkingError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Vehicle registration number is not set")]
    MissingRegistration,
    #[error("SMS permission denied")]
    PermissionDenied,
    #[error("Sending SMS failed: {0}")]
    SendFailed(String),
    #[error("Invalid parking configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid app link: {0}")]
    InvalidAppLink(String),
    #[error("Repository is shutting down")]
    ShuttingDown,
}

pub type Result<T> = std::result::Result<T, ParkingError>;

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for ParkingError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(err.into_string())
    }
}
