//! Append-only audit log.
//!
//! The gateway writes one [`AuditEntry`] per successful mutation, after the
//! record store has committed. A failed append makes the gateway revert that
//! commit.

pub mod in_memory;
pub mod json_lines;

use std::sync::Arc;

use thiserror::Error;

use clinicledger_events::AuditEntry;

pub use in_memory::InMemoryAuditLog;
pub use json_lines::JsonLinesAuditLog;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit entry serialization failed: {0}")]
    Serialization(String),

    #[error("audit log lock poisoned")]
    Poisoned,
}

pub trait AuditLog: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;

    /// Every entry, oldest first.
    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError>;
}

impl<L> AuditLog for Arc<L>
where
    L: AuditLog + ?Sized,
{
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        (**self).append(entry)
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        (**self).entries()
    }
}
