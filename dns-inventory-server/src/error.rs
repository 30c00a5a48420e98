//! Unified server error definitions.

use thiserror::Error;

pub use dns_inventory_collector::{CollectorError, FetchError};

/// Error type for the server layer (store, reconciler, scheduler, exporter).
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid or missing configuration; fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Store-layer error (connection, constraint, transaction).
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A collector sweep failed; transparent so classified fetch errors (and
    /// the exact `cancelled` message) reach the sync run record unchanged.
    #[error(transparent)]
    Collector(#[from] CollectorError),

    /// Lookup of an unregistered collector name.
    #[error("collector not found: {0}")]
    CollectorNotFound(String),

    /// A trigger-all with nothing registered.
    #[error("no collectors registered")]
    NoCollectors,

    /// Cron engine error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Snapshot file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode failure in the exporter.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored label did not parse back into its enum.
    #[error("corrupt stored value: {0}")]
    CorruptRow(String),

    /// The process-wide cancellation token fired mid-operation.
    #[error("cancelled")]
    Cancelled,
}

impl From<tokio_cron_scheduler::JobSchedulerError> for ServerError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        Self::Scheduler(err.to_string())
    }
}

/// `Result` alias used by the server layer.
pub type ServerResult<T> = std::result::Result<T, ServerError>;
