//! Errors surfaced by the snapshot engine.

/// Failures a snapshot run can end with.
///
/// Nothing here is retried by the library; the caller decides.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The upstream provider answered with nothing usable.
    #[error("Provider unavailable: {reason}")]
    ProviderUnavailable {
        /// What was wrong with the response.
        reason: String,
    },

    /// Bounding box or grid step cannot be tiled.
    #[error("Invalid region: {reason}")]
    InvalidRegion {
        /// Which precondition failed.
        reason: String,
    },

    /// The key-value store rejected a read or write.
    #[error("Store failure on table {table}: {source}")]
    Store {
        /// Table the operation targeted.
        table: String,
        /// Underlying store error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SnapshotError {
    pub fn provider(reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            reason: reason.into(),
        }
    }

    pub fn region(reason: impl Into<String>) -> Self {
        Self::InvalidRegion {
            reason: reason.into(),
        }
    }

    pub fn store(table: &str, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Store {
            table: table.to_string(),
            source: source.into(),
        }
    }
}
