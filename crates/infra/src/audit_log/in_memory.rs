use std::sync::RwLock;

use clinicledger_events::AuditEntry;

use super::{AuditError, AuditLog};

/// In-memory audit log (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries
            .write()
            .map_err(|_| AuditError::Poisoned)?
            .push(entry);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self.entries.read().map_err(|_| AuditError::Poisoned)?.clone())
    }
}
