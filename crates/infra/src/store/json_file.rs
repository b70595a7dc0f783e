use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use clinicledger_billing::{BillingRecord, ProgressNote};
use clinicledger_core::{NoteId, PatientId, RecordId};

use super::r#trait::{ChangeSet, LedgerSnapshot, RecordStore, StoreError};

/// File name of the ledger document inside the data directory.
pub const LEDGER_FILE_NAME: &str = "ledger.json";

/// Current on-disk layout version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerDocument {
    schema_version: u32,
    #[serde(default)]
    records: Vec<BillingRecord>,
    #[serde(default)]
    notes: Vec<ProgressNote>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LedgerDocumentRef<'a> {
    schema_version: u32,
    records: &'a [BillingRecord],
    notes: &'a [ProgressNote],
}

/// File-backed record store: one JSON document holding every record and note.
///
/// The document is loaded and validated once at open; every successful
/// change set rewrites it through a temp file in the same directory followed
/// by a rename, so readers never observe a partial write.
#[derive(Debug)]
pub struct JsonFileRecordStore {
    path: PathBuf,
    state: RwLock<LedgerSnapshot>,
}

impl JsonFileRecordStore {
    /// Open (or lazily create) the ledger document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = load(&path)?;
        tracing::debug!(
            path = %path.display(),
            records = snapshot.records.len(),
            notes = snapshot.notes.len(),
            "ledger loaded"
        );
        Ok(Self {
            path,
            state: RwLock::new(snapshot),
        })
    }

    /// Open `<data_dir>/ledger.json`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(data_dir.as_ref().join(LEDGER_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let doc = LedgerDocumentRef {
            schema_version: SCHEMA_VERSION,
            records: &snapshot.records,
            notes: &snapshot.notes,
        };
        let bytes = serde_json::to_vec_pretty(&doc)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

fn load(path: &Path) -> Result<LedgerSnapshot, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LedgerSnapshot::default()),
        Err(e) => return Err(StoreError::Io(e)),
    };

    let doc: LedgerDocument = serde_json::from_slice(&bytes).map_err(|e| {
        StoreError::CorruptedState(format!("{} is not a valid ledger document: {e}", path.display()))
    })?;
    if doc.schema_version != SCHEMA_VERSION {
        return Err(StoreError::CorruptedState(format!(
            "unsupported ledger schema version {} (expected {SCHEMA_VERSION})",
            doc.schema_version
        )));
    }

    let snapshot = LedgerSnapshot {
        records: doc.records,
        notes: doc.notes,
    };
    snapshot.validate()?;
    Ok(snapshot)
}

impl RecordStore for JsonFileRecordStore {
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
        // Durable write first; memory only moves forward once it succeeded.
        self.persist(&next)?;
        *state = next;
        Ok(undo)
    }
}
