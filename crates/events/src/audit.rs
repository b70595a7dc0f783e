//! Audit trail entries.
//!
//! One entry is written per ledger mutation. Entries are append-only and
//! serialized with the field names the clinic's audit screen reads
//! (`action`, `category`, `userId`, `userName`, `timestamp`, `details`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicledger_core::UserId;

use crate::event::Event;

/// Audit category of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditCategory {
    /// Billing mutations (invoices, receipts, voids, corrections).
    Financial,
    /// Chart mutations and invoices originated from a progress note.
    Clinical,
}

impl core::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AuditCategory::Financial => f.write_str("Financial"),
            AuditCategory::Clinical => f.write_str("Clinical"),
        }
    }
}

/// The staff member on whose behalf the session mutates the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: UserId,
    pub user_name: String,
}

impl Actor {
    pub fn new(user_id: UserId, user_name: impl Into<String>) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
        }
    }
}

/// Events that leave a trace in the audit log.
pub trait Auditable: Event {
    /// Human-readable action name (e.g. "Receipt Recorded").
    fn audit_action(&self) -> &'static str;

    fn audit_category(&self) -> AuditCategory;

    /// Free-text details naming the affected record(s).
    fn audit_details(&self) -> String;
}

/// Append-only audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub action: String,
    pub category: AuditCategory,
    pub user_id: UserId,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}

impl AuditEntry {
    /// Build the entry for an event performed by `actor`.
    pub fn from_event<E: Auditable>(actor: &Actor, event: &E) -> Self {
        Self {
            action: event.audit_action().to_string(),
            category: event.audit_category(),
            user_id: actor.user_id.clone(),
            user_name: actor.user_name.clone(),
            timestamp: event.occurred_at(),
            details: event.audit_details(),
        }
    }
}
