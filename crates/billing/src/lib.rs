//! Billing domain module.
//!
//! This crate contains the ledger's data model (billing records and progress
//! notes) and the business rules for applying payments to invoices,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod event;
pub mod note;
pub mod payment;
pub mod record;

pub use event::{
    InvoiceCreated, InvoiceGeneratedFromNote, InvoiceMarkedOverdue, LedgerEvent,
    PaymentCorrected, ProgressNoteDeleted, ProgressNoteSaved, ReceiptRecorded, RecordVoided,
};
pub use note::ProgressNote;
pub use payment::{Allocation, allocate_receipt, derive_status};
pub use record::{
    BillingRecord, InvoiceDetails, InvoiceStatus, LineItem, PatientRef, ReceiptDetails,
    RecordKind, RecordType,
};
