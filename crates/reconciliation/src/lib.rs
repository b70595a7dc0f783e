//! Reconciliation of progress notes with billing line items.
//!
//! Notes and invoices are never linked by a foreign key. Instead each note is
//! matched to the invoice line that shares its date, treatment description and
//! price, first come first served. The match is recomputed on every read.

pub mod matcher;

pub use matcher::{
    MatchKey, Reconciliation, TreatmentLogEntry, UnmatchedLine, normalize_description, reconcile,
    treatment_log,
};
