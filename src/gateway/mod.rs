//! Persistence gateways: where normalized rows are written.
//!
//! The importer talks to a [`PersistenceGateway`] handle it is given at construction. Each call
//! inserts exactly one record into one collection; calls are independent and never grouped into
//! a transaction.
//!
//! - [`MemoryGateway`] keeps records in memory (dry runs, tests)
//! - `postgrest::PostgrestGateway` inserts through a hosted PostgREST endpoint (feature `postgrest`)

mod memory;
#[cfg(feature = "postgrest")]
pub mod postgrest;

use async_trait::async_trait;
use thiserror::Error;

use crate::normalize::NormalizedRecord;
use crate::types::Collection;

pub use memory::MemoryGateway;
#[cfg(feature = "postgrest")]
pub use postgrest::{GatewayConfig, PostgrestGateway};

/// Error returned by a gateway insert.
///
/// The display text is recorded verbatim against the failing row.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The store refused the record (constraint violation, permission denied, ...).
    #[error("{message}")]
    Rejected {
        /// HTTP status, when the store speaks HTTP.
        status: Option<u16>,
        /// Message reported by the store.
        message: String,
    },

    #[cfg(feature = "postgrest")]
    /// The request never got a response (connection refused, timeout, TLS).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway is missing connection settings.
    #[error("gateway not configured: {0}")]
    Config(String),
}

impl GatewayError {
    /// A rejection with no transport status.
    pub fn rejected(message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            status: None,
            message: message.into(),
        }
    }
}

/// A remote store that accepts one record per call.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Insert `record` into `collection`.
    async fn insert(&self, collection: Collection, record: &NormalizedRecord) -> Result<(), GatewayError>;
}
