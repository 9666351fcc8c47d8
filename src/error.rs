//! Error taxonomy shared by the adapter, the metrics store and the dashboard.

/// Errors surfaced by the monitoring core.
///
/// `Connection` is the only variant the collector treats as transient: the
/// queue's sample is skipped for the tick and retried on the next one.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("queue store unreachable: {0}")]
    Connection(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    #[error("invalid job state: {0}")]
    InvalidState(String),

    #[error("metrics storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MonitorError {
    /// Stable name used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::Connection(_) => "ConnectionError",
            MonitorError::InvalidRange(_) => "InvalidRangeError",
            MonitorError::UnknownQueue(_) => "UnknownQueueError",
            MonitorError::InvalidState(_) => "InvalidStateError",
            MonitorError::Storage(_) => "StorageError",
            MonitorError::Serialization(_) => "SerializationError",
        }
    }
}

impl From<redis::RedisError> for MonitorError {
    fn from(err: redis::RedisError) -> Self {
        if crate::adapters::redis_store::is_connectivity_error(&err) {
            MonitorError::Connection(err.to_string())
        } else {
            MonitorError::Storage(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for MonitorError {
    fn from(err: rusqlite::Error) -> Self {
        MonitorError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
