//! Record store boundary.
//!
//! Holds billing records and progress notes keyed by id and grouped by
//! patient. Every mutation goes through one [`ChangeSet`] that replaces the
//! whole snapshot atomically from the caller's point of view.

pub mod in_memory;
pub mod json_file;
pub mod r#trait;

pub use in_memory::InMemoryRecordStore;
pub use json_file::JsonFileRecordStore;
pub use r#trait::{ChangeSet, LedgerSnapshot, NoteMutation, RecordMutation, RecordStore, StoreError};
