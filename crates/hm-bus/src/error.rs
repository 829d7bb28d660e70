//! Errors surfaced by a bus client

use thiserror::Error;

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Errors a bus client can report
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("not connected to HiveMind node")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed")]
    Closed,
}
