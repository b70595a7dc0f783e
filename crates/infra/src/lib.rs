//! Infrastructure layer: record store, audit log, mutation gateway, read
//! views and runtime configuration.

pub mod audit_log;
pub mod config;
pub mod gateway;
pub mod store;
pub mod views;


pub use audit_log::{AuditError, AuditLog, InMemoryAuditLog, JsonLinesAuditLog};
pub use config::{ConfigError, LedgerConfig};
pub use gateway::{GatewayError, LedgerGateway, NoteOutcome, ReceiptOutcome, VoidOutcome};
pub use store::{
    ChangeSet, InMemoryRecordStore, JsonFileRecordStore, LedgerSnapshot, NoteMutation,
    RecordMutation, RecordStore, StoreError,
};
pub use views::LedgerViews;
