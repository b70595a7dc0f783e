//! Ledger events and the audit trail model.
//!
//! Domain crates define their own event enums and implement [`Event`] (and
//! [`Auditable`] when the event must leave a trace in the audit log).

pub mod audit;
pub mod event;

pub use audit::{Actor, AuditCategory, AuditEntry, Auditable};
pub use event::Event;
