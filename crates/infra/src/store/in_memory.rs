use std::sync::RwLock;

use clinicledger_billing::{BillingRecord, ProgressNote};
use clinicledger_core::{NoteId, PatientId, RecordId};

use super::r#trait::{ChangeSet, LedgerSnapshot, RecordStore, StoreError};

/// In-memory record store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: RwLock<LedgerSnapshot>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing data (validated like a file load).
    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Result<Self, StoreError> {
        snapshot.validate()?;
        Ok(Self {
            state: RwLock::new(snapshot),
        })
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, StoreError> {
        Ok(self.state.read().map_err(|_| StoreError::Poisoned)?.clone())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, id: &RecordId) -> Result<Option<BillingRecord>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.record(id).cloned())
    }

    fn get_note(&self, id: &NoteId) -> Result<Option<ProgressNote>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.note(id).cloned())
    }

    fn list_by_patient(&self, patient_id: &PatientId) -> Result<Vec<BillingRecord>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.records_by_patient(patient_id))
    }

    fn list_all(&self) -> Result<Vec<BillingRecord>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.records.clone())
    }

    fn list_notes_by_patient(&self, patient_id: &PatientId) -> Result<Vec<ProgressNote>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.notes_by_patient(patient_id))
    }

    fn list_all_notes(&self) -> Result<Vec<ProgressNote>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.notes.clone())
    }

    fn apply(&self, changes: ChangeSet) -> Result<ChangeSet, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = state.clone();
        let undo = next.apply(changes)?;
        *state = next;
        Ok(undo)
    }
}
