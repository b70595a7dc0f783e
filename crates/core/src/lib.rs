//! `clinicledger-core`: ids, money and error types shared by every ledger crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model and money formatting shared by the
//! billing, accounting and reconciliation crates.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BranchId, NoteId, PatientId, ProviderId, RecordId, UserId};
pub use money::{Money, ensure_non_negative, format_money};
