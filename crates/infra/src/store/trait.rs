use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use clinicledger_billing::{BillingRecord, ProgressNote};
use clinicledger_core::{Entity, NoteId, PatientId, RecordId};

/// Record store operation error.
///
/// These are **infrastructure errors** (storage, persisted data) as opposed to
/// domain errors (validation, invariants) which the gateway reports before a
/// change set ever reaches the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Persisted data failed load-time validation.
    #[error("corrupted ledger state: {0}")]
    CorruptedState(String),

    #[error("ledger io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger serialization failed: {0}")]
    Serialization(String),

    #[error("ledger lock poisoned")]
    Poisoned,

    /// A change set does not fit the current snapshot (duplicate insert,
    /// replace/remove of a missing id, malformed record).
    #[error("store invariant violated: {0}")]
    Invariant(String),
}

/// One change to the billing record collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordMutation {
    /// Append a new record; the id must be unused.
    Insert(BillingRecord),
    /// Replace an existing record in place (keeps its position).
    Replace(BillingRecord),
    Remove(RecordId),
    /// Put a removed record back at `index` (undo of `Remove`).
    Reinsert { index: usize, record: BillingRecord },
}

/// One change to the progress note collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteMutation {
    /// Insert or replace in place.
    Upsert(ProgressNote),
    Remove(NoteId),
    /// Put a removed note back at `index` (undo of `Remove`).
    Reinsert { index: usize, note: ProgressNote },
}

/// Mutations applied together by [`RecordStore::apply`]: all of them or none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub records: Vec<RecordMutation>,
    pub notes: Vec<NoteMutation>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_record(mut self, record: BillingRecord) -> Self {
        self.records.push(RecordMutation::Insert(record));
        self
    }

    pub fn replace_record(mut self, record: BillingRecord) -> Self {
        self.records.push(RecordMutation::Replace(record));
        self
    }

    pub fn remove_record(mut self, id: RecordId) -> Self {
        self.records.push(RecordMutation::Remove(id));
        self
    }

    pub fn upsert_note(mut self, note: ProgressNote) -> Self {
        self.notes.push(NoteMutation::Upsert(note));
        self
    }

    pub fn remove_note(mut self, id: NoteId) -> Self {
        self.notes.push(NoteMutation::Remove(id));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.notes.is_empty()
    }
}

/// Full contents of the ledger: every record and every note, in insertion order.
///
/// Store implementations keep one snapshot and replace it wholesale on every
/// successful [`ChangeSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub records: Vec<BillingRecord>,
    #[serde(default)]
    pub notes: Vec<ProgressNote>,
}

impl LedgerSnapshot {
    pub fn record(&self, id: &RecordId) -> Option<&BillingRecord> {
        position(&self.records, id).map(|idx| &self.records[idx])
    }

    pub fn note(&self, id: &NoteId) -> Option<&ProgressNote> {
        position(&self.notes, id).map(|idx| &self.notes[idx])
    }

    pub fn records_by_patient(&self, patient_id: &PatientId) -> Vec<BillingRecord> {
        of_patient(&self.records, patient_id)
    }

    pub fn notes_by_patient(&self, patient_id: &PatientId) -> Vec<ProgressNote> {
        of_patient(&self.notes, patient_id)
    }

    /// Apply `changes` in order and return the change set that reverts them.
    ///
    /// On error `self` may be partially modified, so callers apply to a clone
    /// and swap it in on success.
    pub fn apply(&mut self, changes: ChangeSet) -> Result<ChangeSet, StoreError> {
        let mut undo = ChangeSet::new();

        for mutation in changes.records {
            match mutation {
                RecordMutation::Insert(record) => {
                    check_record(&record)?;
                    if self.record(&record.id).is_some() {
                        return Err(StoreError::Invariant(format!(
                            "record {} already exists",
                            record.id
                        )));
                    }
                    undo.records.push(RecordMutation::Remove(record.id.clone()));
                    self.records.push(record);
                }
                RecordMutation::Replace(record) => {
                    check_record(&record)?;
                    let idx = position(&self.records, &record.id).ok_or_else(|| {
                        StoreError::Invariant(format!("record {} does not exist", record.id))
                    })?;
                    let previous = std::mem::replace(&mut self.records[idx], record);
                    undo.records.push(RecordMutation::Replace(previous));
                }
                RecordMutation::Remove(id) => {
                    let idx = position(&self.records, &id)
                        .ok_or_else(|| StoreError::Invariant(format!("record {id} does not exist")))?;
                    let record = self.records.remove(idx);
                    undo.records.push(RecordMutation::Reinsert { index: idx, record });
                }
                RecordMutation::Reinsert { index, record } => {
                    check_record(&record)?;
                    if self.record(&record.id).is_some() {
                        return Err(StoreError::Invariant(format!(
                            "record {} already exists",
                            record.id
                        )));
                    }
                    if index > self.records.len() {
                        return Err(StoreError::Invariant(format!(
                            "record {} cannot be reinserted at {index}",
                            record.id
                        )));
                    }
                    undo.records.push(RecordMutation::Remove(record.id.clone()));
                    self.records.insert(index, record);
                }
            }
        }

        for mutation in changes.notes {
            match mutation {
                NoteMutation::Upsert(note) => {
                    note.check_well_formed()
                        .map_err(|e| StoreError::Invariant(e.to_string()))?;
                    match position(&self.notes, &note.id) {
                        Some(idx) => {
                            let previous = std::mem::replace(&mut self.notes[idx], note);
                            undo.notes.push(NoteMutation::Upsert(previous));
                        }
                        None => {
                            undo.notes.push(NoteMutation::Remove(note.id.clone()));
                            self.notes.push(note);
                        }
                    }
                }
                NoteMutation::Remove(id) => {
                    let idx = position(&self.notes, &id)
                        .ok_or_else(|| StoreError::Invariant(format!("note {id} does not exist")))?;
                    let note = self.notes.remove(idx);
                    undo.notes.push(NoteMutation::Reinsert { index: idx, note });
                }
                NoteMutation::Reinsert { index, note } => {
                    note.check_well_formed()
                        .map_err(|e| StoreError::Invariant(e.to_string()))?;
                    if self.note(&note.id).is_some() {
                        return Err(StoreError::Invariant(format!("note {} already exists", note.id)));
                    }
                    if index > self.notes.len() {
                        return Err(StoreError::Invariant(format!(
                            "note {} cannot be reinserted at {index}",
                            note.id
                        )));
                    }
                    undo.notes.push(NoteMutation::Remove(note.id.clone()));
                    self.notes.insert(index, note);
                }
            }
        }

        undo.records.reverse();
        undo.notes.reverse();
        Ok(undo)
    }

    /// Load-time validation of persisted data.
    ///
    /// Dangling receipt references are tolerated; the integrity report lists them.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut record_ids = std::collections::HashSet::new();
        for record in &self.records {
            record
                .check_well_formed()
                .map_err(|e| StoreError::CorruptedState(e.to_string()))?;
            if !record_ids.insert(&record.id) {
                return Err(StoreError::CorruptedState(format!(
                    "duplicate record id {}",
                    record.id
                )));
            }
        }

        let mut note_ids = std::collections::HashSet::new();
        for note in &self.notes {
            note.check_well_formed()
                .map_err(|e| StoreError::CorruptedState(e.to_string()))?;
            if !note_ids.insert(&note.id) {
                return Err(StoreError::CorruptedState(format!(
                    "duplicate note id {}",
                    note.id
                )));
            }
        }

        Ok(())
    }
}

fn position<E: Entity>(items: &[E], id: &E::Id) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

fn of_patient<E: Entity + Clone>(items: &[E], patient_id: &PatientId) -> Vec<E> {
    items
        .iter()
        .filter(|item| item.patient_id() == patient_id)
        .cloned()
        .collect()
}

fn check_record(record: &BillingRecord) -> Result<(), StoreError> {
    record
        .check_well_formed()
        .map_err(|e| StoreError::Invariant(e.to_string()))
}

/// Persistence boundary for billing records and progress notes.
///
/// Pure persistence: keyed by id, grouped by patient, no derived logic.
/// Listing methods return data in insertion order (a replaced record keeps
/// its position), which the treatment-log matcher depends on.
///
/// ## Mutation semantics
///
/// `apply()` takes a whole [`ChangeSet`] and either commits all of it (memory
/// and durable copy together) or fails leaving the previous state visible.
/// On success it returns the change set that reverts the commit.
pub trait RecordStore: Send + Sync {
    fn get(&self, id: &RecordId) -> Result<Option<BillingRecord>, StoreError>;

    fn get_note(&self, id: &NoteId) -> Result<Option<ProgressNote>, StoreError>;

    fn list_by_patient(&self, patient_id: &PatientId) -> Result<Vec<BillingRecord>, StoreError>;

    fn list_all(&self) -> Result<Vec<BillingRecord>, StoreError>;

    fn list_notes_by_patient(&self, patient_id: &PatientId) -> Result<Vec<ProgressNote>, StoreError>;

    fn list_all_notes(&self) -> Result<Vec<ProgressNote>, StoreError>;

    fn apply(&self, changes: ChangeSet) -> Result<ChangeSet, StoreError>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn get(&self, id: &RecordId) -> Result<Option<BillingRecord>, StoreError> {
        (**self).get(id)
    }

    fn get_note(&self, id: &NoteId) -> Result<Option<ProgressNote>, StoreError> {
        (**self).get_note(id)
    }

    fn list_by_patient(&self, patient_id: &PatientId) -> Result<Vec<BillingRecord>, StoreError> {
        (**self).list_by_patient(patient_id)
    }

    fn list_all(&self) -> Result<Vec<BillingRecord>, StoreError> {
        (**self).list_all()
    }

    fn list_notes_by_patient(&self, patient_id: &PatientId) -> Result<Vec<ProgressNote>, StoreError> {
        (**self).list_notes_by_patient(patient_id)
    }

    fn list_all_notes(&self) -> Result<Vec<ProgressNote>, StoreError> {
        (**self).list_all_notes()
    }

    fn apply(&self, changes: ChangeSet) -> Result<ChangeSet, StoreError> {
        (**self).apply(changes)
    }
}
