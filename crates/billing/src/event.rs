use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicledger_core::{Money, NoteId, PatientId, RecordId, format_money};
use clinicledger_events::{AuditCategory, Auditable, Event};

use crate::payment::Allocation;
use crate::record::RecordType;

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub record_id: RecordId,
    pub patient_id: PatientId,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecorded {
    pub record_id: RecordId,
    pub patient_id: PatientId,
    pub amount: Money,
    pub allocations: Vec<Allocation>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RecordVoided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordVoided {
    pub record_id: RecordId,
    pub record_type: RecordType,
    pub patient_id: PatientId,
    pub amount: Money,
    /// Receipts still pointing at the voided invoice.
    pub orphaned_receipts: Vec<RecordId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceMarkedOverdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMarkedOverdue {
    pub record_id: RecordId,
    pub patient_id: PatientId,
    pub outstanding: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentCorrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCorrected {
    pub record_id: RecordId,
    pub patient_id: PatientId,
    pub previous_paid_amount: Money,
    pub paid_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProgressNoteSaved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressNoteSaved {
    pub note_id: NoteId,
    pub patient_id: PatientId,
    pub created: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProgressNoteDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressNoteDeleted {
    pub note_id: NoteId,
    pub patient_id: PatientId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceGeneratedFromNote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceGeneratedFromNote {
    pub record_id: RecordId,
    pub note_id: NoteId,
    pub patient_id: PatientId,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    InvoiceCreated(InvoiceCreated),
    ReceiptRecorded(ReceiptRecorded),
    RecordVoided(RecordVoided),
    InvoiceMarkedOverdue(InvoiceMarkedOverdue),
    PaymentCorrected(PaymentCorrected),
    ProgressNoteSaved(ProgressNoteSaved),
    ProgressNoteDeleted(ProgressNoteDeleted),
    InvoiceGeneratedFromNote(InvoiceGeneratedFromNote),
}

impl LedgerEvent {
    pub fn patient_id(&self) -> &PatientId {
        match self {
            LedgerEvent::InvoiceCreated(e) => &e.patient_id,
            LedgerEvent::ReceiptRecorded(e) => &e.patient_id,
            LedgerEvent::RecordVoided(e) => &e.patient_id,
            LedgerEvent::InvoiceMarkedOverdue(e) => &e.patient_id,
            LedgerEvent::PaymentCorrected(e) => &e.patient_id,
            LedgerEvent::ProgressNoteSaved(e) => &e.patient_id,
            LedgerEvent::ProgressNoteDeleted(e) => &e.patient_id,
            LedgerEvent::InvoiceGeneratedFromNote(e) => &e.patient_id,
        }
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::InvoiceCreated(_) => "billing.invoice.created",
            LedgerEvent::ReceiptRecorded(_) => "billing.receipt.recorded",
            LedgerEvent::RecordVoided(_) => "billing.record.voided",
            LedgerEvent::InvoiceMarkedOverdue(_) => "billing.invoice.marked_overdue",
            LedgerEvent::PaymentCorrected(_) => "billing.invoice.payment_corrected",
            LedgerEvent::ProgressNoteSaved(_) => "clinical.note.saved",
            LedgerEvent::ProgressNoteDeleted(_) => "clinical.note.deleted",
            LedgerEvent::InvoiceGeneratedFromNote(_) => "clinical.note.invoice_generated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::InvoiceCreated(e) => e.occurred_at,
            LedgerEvent::ReceiptRecorded(e) => e.occurred_at,
            LedgerEvent::RecordVoided(e) => e.occurred_at,
            LedgerEvent::InvoiceMarkedOverdue(e) => e.occurred_at,
            LedgerEvent::PaymentCorrected(e) => e.occurred_at,
            LedgerEvent::ProgressNoteSaved(e) => e.occurred_at,
            LedgerEvent::ProgressNoteDeleted(e) => e.occurred_at,
            LedgerEvent::InvoiceGeneratedFromNote(e) => e.occurred_at,
        }
    }
}

impl Auditable for LedgerEvent {
    fn audit_action(&self) -> &'static str {
        match self {
            LedgerEvent::InvoiceCreated(_) => "Invoice Created",
            LedgerEvent::ReceiptRecorded(_) => "Receipt Recorded",
            LedgerEvent::RecordVoided(_) => "Record Voided",
            LedgerEvent::InvoiceMarkedOverdue(_) => "Invoice Marked Overdue",
            LedgerEvent::PaymentCorrected(_) => "Payment Corrected",
            LedgerEvent::ProgressNoteSaved(_) => "Progress Note Saved",
            LedgerEvent::ProgressNoteDeleted(_) => "Progress Note Deleted",
            LedgerEvent::InvoiceGeneratedFromNote(_) => "Invoice Generated From Note",
        }
    }

    fn audit_category(&self) -> AuditCategory {
        match self {
            LedgerEvent::ProgressNoteSaved(_)
            | LedgerEvent::ProgressNoteDeleted(_)
            | LedgerEvent::InvoiceGeneratedFromNote(_) => AuditCategory::Clinical,
            _ => AuditCategory::Financial,
        }
    }

    fn audit_details(&self) -> String {
        match self {
            LedgerEvent::InvoiceCreated(e) => format!(
                "Invoice {} for patient {} ({})",
                e.record_id,
                e.patient_id,
                format_money(e.amount)
            ),
            LedgerEvent::ReceiptRecorded(e) => {
                let applied: Vec<String> = e
                    .allocations
                    .iter()
                    .map(|a| format!("{} {} -> {}", a.invoice_id, format_money(a.share), a.status_after))
                    .collect();
                if applied.is_empty() {
                    format!(
                        "Receipt {} for patient {} ({}) recorded as credit",
                        e.record_id,
                        e.patient_id,
                        format_money(e.amount)
                    )
                } else {
                    format!(
                        "Receipt {} for patient {} ({}) applied to {}",
                        e.record_id,
                        e.patient_id,
                        format_money(e.amount),
                        applied.join(", ")
                    )
                }
            }
            LedgerEvent::RecordVoided(e) => {
                let mut details = format!(
                    "{} {} for patient {} ({}) voided",
                    e.record_type,
                    e.record_id,
                    e.patient_id,
                    format_money(e.amount)
                );
                if !e.orphaned_receipts.is_empty() {
                    let ids: Vec<&str> = e.orphaned_receipts.iter().map(RecordId::as_str).collect();
                    details.push_str(&format!("; receipts left referencing it: {}", ids.join(", ")));
                }
                details
            }
            LedgerEvent::InvoiceMarkedOverdue(e) => format!(
                "Invoice {} for patient {} marked overdue ({} outstanding)",
                e.record_id,
                e.patient_id,
                format_money(e.outstanding)
            ),
            LedgerEvent::PaymentCorrected(e) => format!(
                "Invoice {} paid amount corrected from {} to {}",
                e.record_id,
                format_money(e.previous_paid_amount),
                format_money(e.paid_amount)
            ),
            LedgerEvent::ProgressNoteSaved(e) => format!(
                "Progress note {} for patient {} {}",
                e.note_id,
                e.patient_id,
                if e.created { "created" } else { "updated" }
            ),
            LedgerEvent::ProgressNoteDeleted(e) => {
                format!("Progress note {} for patient {} deleted", e.note_id, e.patient_id)
            }
            LedgerEvent::InvoiceGeneratedFromNote(e) => format!(
                "Invoice {} generated from progress note {} ({})",
                e.record_id,
                e.note_id,
                format_money(e.amount)
            ),
        }
    }
}
