//! Ledger mutation gateway.
//!
//! The only way records enter or leave the store. Every operation follows the
//! same pipeline:
//!
//! ```text
//! call
//!   ↓
//! 1. Load the records it touches from the store
//!   ↓
//! 2. Validate + decide (pure billing rules, no mutation)
//!   ↓
//! 3. Apply one ChangeSet to the store (all or nothing)
//!   ↓
//! 4. Append one audit entry for the emitted LedgerEvent
//! ```
//!
//! A failure in any step leaves the ledger untouched: when step 4 fails the
//! committed change set is reverted and the call returns
//! [`GatewayError::Audit`].

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use clinicledger_billing::{
    Allocation, BillingRecord, InvoiceCreated, InvoiceGeneratedFromNote, InvoiceMarkedOverdue,
    LedgerEvent, PaymentCorrected, ProgressNote, ProgressNoteDeleted, ProgressNoteSaved,
    ReceiptDetails, ReceiptRecorded, RecordKind, RecordVoided, allocate_receipt,
};
use clinicledger_core::{DomainError, Money, NoteId, RecordId, format_money};
use clinicledger_events::{Actor, AuditEntry, Event};

use crate::audit_log::{AuditError, AuditLog};
use crate::store::{ChangeSet, RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Rejected input (negative amount, empty line items, unknown related invoice).
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The record id is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Store(StoreError),

    /// The audit entry could not be written; the change was reverted.
    #[error("audit append failed, change reverted: {0}")]
    Audit(AuditError),

    /// The audit entry could not be written and reverting the change failed
    /// too, so the change stands without an audit entry.
    #[error("audit append failed ({audit}) and revert failed ({rollback})")]
    Unaudited {
        audit: AuditError,
        rollback: StoreError,
    },
}

impl From<DomainError> for GatewayError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => GatewayError::Validation(msg),
            DomainError::InvalidId(msg) => GatewayError::Validation(msg),
            DomainError::InvariantViolation(msg) => GatewayError::InvariantViolation(msg),
            DomainError::NotFound(msg) => GatewayError::NotFound(msg),
            DomainError::Conflict(msg) => GatewayError::Conflict(msg),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(value: StoreError) -> Self {
        GatewayError::Store(value)
    }
}

impl From<AuditError> for GatewayError {
    fn from(value: AuditError) -> Self {
        GatewayError::Audit(value)
    }
}

/// Result of [`LedgerGateway::record_receipt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptOutcome {
    pub receipt: BillingRecord,
    /// One entry per related invoice, in the order given.
    pub allocations: Vec<Allocation>,
    /// Part of the tendered amount left on the patient's account.
    pub credit: Money,
}

/// Result of [`LedgerGateway::void_record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoidOutcome {
    pub record: BillingRecord,
    /// Receipts still referencing the voided invoice (not cascade-deleted).
    pub orphaned_receipts: Vec<RecordId>,
}

/// Result of [`LedgerGateway::save_progress_note`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOutcome {
    pub note: ProgressNote,
    pub created: bool,
    /// Invoice generated for a newly charted billable note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<BillingRecord>,
}

/// Sole entry point for ledger mutations.
///
/// Built from an explicit store, audit log and session actor; holds no other
/// state, so every read after a successful call sees the change.
#[derive(Debug)]
pub struct LedgerGateway<S, A> {
    store: S,
    audit: A,
    actor: Actor,
}

impl<S, A> LedgerGateway<S, A> {
    pub fn new(store: S, audit: A, actor: Actor) -> Self {
        Self { store, audit, actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    pub fn into_parts(self) -> (S, A, Actor) {
        (self.store, self.audit, self.actor)
    }
}

impl<S, A> LedgerGateway<S, A>
where
    S: RecordStore,
    A: AuditLog,
{
    /// Create an invoice.
    ///
    /// `amount == Σ items` is not enforced; a mismatch is logged and left to
    /// the integrity report.
    #[instrument(skip(self, record), fields(record_id = %record.id, patient_id = %record.patient_id))]
    pub fn create_invoice(&self, record: BillingRecord) -> Result<BillingRecord, GatewayError> {
        record.validate_new_invoice()?;
        self.ensure_unused(&record.id)?;

        let items_total = record.items_total();
        if items_total != record.amount {
            tracing::warn!(
                amount = %format_money(record.amount),
                items_total = %format_money(items_total),
                "invoice amount differs from the sum of its line items"
            );
        }

        let event = LedgerEvent::InvoiceCreated(InvoiceCreated {
            record_id: record.id.clone(),
            patient_id: record.patient_id.clone(),
            amount: record.amount,
            occurred_at: Utc::now(),
        });
        self.commit(ChangeSet::new().insert_record(record.clone()), event)?;
        Ok(record)
    }

    /// Record a payment and apply it to the related invoices.
    ///
    /// `related_invoice_ids`, when given, replaces whatever links the record
    /// carries. Duplicated ids are collapsed. The tendered amount is spread
    /// over the invoices in order; the remainder stays as patient credit.
    #[instrument(skip(self, record, related_invoice_ids), fields(record_id = %record.id, patient_id = %record.patient_id))]
    pub fn record_receipt(
        &self,
        mut record: BillingRecord,
        related_invoice_ids: Option<Vec<RecordId>>,
    ) -> Result<ReceiptOutcome, GatewayError> {
        record.validate_new_receipt()?;
        self.ensure_unused(&record.id)?;

        let related = match related_invoice_ids {
            Some(ids) => ReceiptDetails::linked_to(ids).related_invoices(),
            None => record
                .receipt_details()
                .map(ReceiptDetails::related_invoices)
                .unwrap_or_default(),
        };
        record.kind = RecordKind::Receipt(ReceiptDetails::linked_to(related.clone()));
        record.check_well_formed()?;

        let mut invoices = Vec::with_capacity(related.len());
        for id in &related {
            let invoice = self.store.get(id)?.ok_or_else(|| {
                DomainError::validation(format!("related invoice {id} does not exist"))
            })?;
            if !invoice.is_invoice() {
                return Err(DomainError::validation(format!("related record {id} is not an Invoice")).into());
            }
            if invoice.patient_id != record.patient_id {
                return Err(DomainError::validation(format!(
                    "related invoice {id} belongs to another patient"
                ))
                .into());
            }
            invoices.push(invoice);
        }

        let (updated, allocations) = allocate_receipt(record.amount, &invoices)?;
        let applied: Money = allocations.iter().map(|a| a.share).sum();
        let credit = record.amount - applied;

        let mut changes = ChangeSet::new().insert_record(record.clone());
        for invoice in updated {
            changes = changes.replace_record(invoice);
        }

        let event = LedgerEvent::ReceiptRecorded(ReceiptRecorded {
            record_id: record.id.clone(),
            patient_id: record.patient_id.clone(),
            amount: record.amount,
            allocations: allocations.clone(),
            occurred_at: Utc::now(),
        });
        self.commit(changes, event)?;

        Ok(ReceiptOutcome {
            receipt: record,
            allocations,
            credit,
        })
    }

    /// Remove a record.
    ///
    /// Invoices a voided receipt paid into keep their paid amount; receipts
    /// pointing at a voided invoice are left in place and reported.
    #[instrument(skip(self))]
    pub fn void_record(&self, id: &RecordId) -> Result<VoidOutcome, GatewayError> {
        let record = self.require_record(id)?;

        let orphaned_receipts: Vec<RecordId> = if record.is_invoice() {
            self.store
                .list_all()?
                .into_iter()
                .filter(|r| {
                    r.receipt_details()
                        .is_some_and(|d| d.related_invoices().contains(id))
                })
                .map(|r| r.id)
                .collect()
        } else {
            Vec::new()
        };
        if !orphaned_receipts.is_empty() {
            tracing::warn!(
                receipts = orphaned_receipts.len(),
                "voided invoice is still referenced by receipts"
            );
        }

        let event = LedgerEvent::RecordVoided(RecordVoided {
            record_id: record.id.clone(),
            record_type: record.record_type(),
            patient_id: record.patient_id.clone(),
            amount: record.amount,
            orphaned_receipts: orphaned_receipts.clone(),
            occurred_at: Utc::now(),
        });
        self.commit(ChangeSet::new().remove_record(id.clone()), event)?;

        Ok(VoidOutcome {
            record,
            orphaned_receipts,
        })
    }

    /// Flag an invoice as overdue (the only way `Overdue` is ever set).
    #[instrument(skip(self))]
    pub fn mark_overdue(&self, id: &RecordId) -> Result<BillingRecord, GatewayError> {
        let mut invoice = self.require_record(id)?;
        let amount = invoice.amount;
        invoice
            .invoice_details_mut()
            .ok_or_else(|| DomainError::validation(format!("record {id} is not an Invoice")))?
            .mark_overdue(amount)?;

        let event = LedgerEvent::InvoiceMarkedOverdue(InvoiceMarkedOverdue {
            record_id: invoice.id.clone(),
            patient_id: invoice.patient_id.clone(),
            outstanding: invoice.outstanding().unwrap_or(Money::ZERO),
            occurred_at: Utc::now(),
        });
        self.commit(ChangeSet::new().replace_record(invoice.clone()), event)?;
        Ok(invoice)
    }

    /// Explicitly set an invoice's paid amount (the only path that may lower it).
    #[instrument(skip(self, paid_amount), fields(paid_amount = %format_money(paid_amount)))]
    pub fn correct_paid_amount(
        &self,
        id: &RecordId,
        paid_amount: Money,
    ) -> Result<BillingRecord, GatewayError> {
        let mut invoice = self.require_record(id)?;
        let amount = invoice.amount;
        let details = invoice
            .invoice_details_mut()
            .ok_or_else(|| DomainError::validation(format!("record {id} is not an Invoice")))?;
        let previous_paid_amount = details.paid_amount;
        details.correct_paid_amount(amount, paid_amount)?;

        let event = LedgerEvent::PaymentCorrected(PaymentCorrected {
            record_id: invoice.id.clone(),
            patient_id: invoice.patient_id.clone(),
            previous_paid_amount,
            paid_amount,
            occurred_at: Utc::now(),
        });
        self.commit(ChangeSet::new().replace_record(invoice.clone()), event)?;
        Ok(invoice)
    }

    /// Insert or update a progress note.
    ///
    /// A note saved with a positive fee also gets a single-line Pending
    /// invoice, committed in the same change set, unless the stored version
    /// already carried a fee (it was billed then).
    #[instrument(skip(self, note, patient_name), fields(note_id = %note.id, patient_id = %note.patient_id))]
    pub fn save_progress_note(
        &self,
        note: ProgressNote,
        patient_name: &str,
    ) -> Result<NoteOutcome, GatewayError> {
        note.check_well_formed()?;

        let (created, billed) = match self.store.get_note(&note.id)? {
            None => (true, false),
            Some(existing) if existing.patient_id != note.patient_id => {
                return Err(DomainError::validation(format!(
                    "note {} belongs to another patient",
                    note.id
                ))
                .into());
            }
            Some(existing) => (false, existing.billable_amount().is_some()),
        };

        let invoice = if !billed {
            note.to_invoice(RecordId::generate(), patient_name, None)
        } else {
            None
        };

        let mut changes = ChangeSet::new().upsert_note(note.clone());
        let event = match &invoice {
            Some(invoice) => {
                changes = changes.insert_record(invoice.clone());
                LedgerEvent::InvoiceGeneratedFromNote(InvoiceGeneratedFromNote {
                    record_id: invoice.id.clone(),
                    note_id: note.id.clone(),
                    patient_id: note.patient_id.clone(),
                    amount: invoice.amount,
                    occurred_at: Utc::now(),
                })
            }
            None => LedgerEvent::ProgressNoteSaved(ProgressNoteSaved {
                note_id: note.id.clone(),
                patient_id: note.patient_id.clone(),
                created,
                occurred_at: Utc::now(),
            }),
        };
        self.commit(changes, event)?;

        Ok(NoteOutcome {
            note,
            created,
            invoice,
        })
    }

    /// Remove a progress note. Billing records are never touched.
    #[instrument(skip(self))]
    pub fn delete_progress_note(&self, id: &NoteId) -> Result<ProgressNote, GatewayError> {
        let note = self
            .store
            .get_note(id)?
            .ok_or_else(|| DomainError::not_found(format!("progress note {id}")))?;

        let event = LedgerEvent::ProgressNoteDeleted(ProgressNoteDeleted {
            note_id: note.id.clone(),
            patient_id: note.patient_id.clone(),
            occurred_at: Utc::now(),
        });
        self.commit(ChangeSet::new().remove_note(id.clone()), event)?;
        Ok(note)
    }

    fn ensure_unused(&self, id: &RecordId) -> Result<(), GatewayError> {
        if self.store.get(id)?.is_some() {
            return Err(DomainError::conflict(format!("record id {id} is already in use")).into());
        }
        Ok(())
    }

    fn require_record(&self, id: &RecordId) -> Result<BillingRecord, GatewayError> {
        self.store
            .get(id)?
            .ok_or_else(|| DomainError::not_found(format!("record {id}")).into())
    }

    /// Store first, then audit. A failed audit append reverts the store change.
    fn commit(&self, changes: ChangeSet, event: LedgerEvent) -> Result<(), GatewayError> {
        let undo = self.store.apply(changes)?;

        if let Err(audit) = self.audit.append(AuditEntry::from_event(&self.actor, &event)) {
            tracing::error!(error = %audit, event_type = event.event_type(), "audit append failed, reverting");
            return match self.store.apply(undo) {
                Ok(_) => Err(GatewayError::Audit(audit)),
                Err(rollback) => {
                    tracing::error!(error = %rollback, "revert failed, change stands unaudited");
                    Err(GatewayError::Unaudited { audit, rollback })
                }
            };
        }

        tracing::info!(
            event_type = event.event_type(),
            patient_id = %event.patient_id(),
            user_id = %self.actor.user_id,
            "ledger change committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use clinicledger_billing::{InvoiceStatus, LineItem, PatientRef};
    use clinicledger_core::{BranchId, PatientId, UserId};
    use clinicledger_events::AuditCategory;
    use rust_decimal_macros::dec;

    use crate::audit_log::InMemoryAuditLog;
    use crate::store::InMemoryRecordStore;

    type TestGateway = LedgerGateway<Arc<InMemoryRecordStore>, Arc<InMemoryAuditLog>>;

    fn setup() -> (TestGateway, Arc<InMemoryRecordStore>, Arc<InMemoryAuditLog>) {
        let store = Arc::new(InMemoryRecordStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let gateway = LedgerGateway::new(
            store.clone(),
            audit.clone(),
            Actor::new(UserId::new("u-1"), "Front Desk"),
        );
        (gateway, store, audit)
    }

    fn patient(id: &str) -> PatientRef {
        PatientRef::new(PatientId::new(id), "Ana Lima", BranchId::new("main"))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn invoice(id: &str, amount: Money) -> BillingRecord {
        BillingRecord::invoice(
            RecordId::new(id),
            &patient("p-1"),
            date(),
            vec![LineItem::new("Treatment", amount)],
        )
    }

    fn receipt(id: &str, amount: Money) -> BillingRecord {
        BillingRecord::receipt(RecordId::new(id), &patient("p-1"), date(), amount, vec![])
    }

    fn billable_note(id: &str, amount: Option<Money>) -> ProgressNote {
        ProgressNote {
            id: NoteId::new(id),
            patient_id: PatientId::new("p-1"),
            branch_id: BranchId::new("main"),
            date: date(),
            dentist_name: "Dr. Okafor".to_string(),
            treatment_performed: "Composite Filling".to_string(),
            tooth_number: None,
            clinical_notes: String::new(),
            plan: String::new(),
            amount,
        }
    }

    struct BrokenAuditLog;

    impl AuditLog for BrokenAuditLog {
        fn append(&self, _entry: AuditEntry) -> Result<(), AuditError> {
            Err(AuditError::Io(std::io::Error::other("disk full")))
        }

        fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
            Ok(vec![])
        }
    }

    #[test]
    fn create_invoice_rejects_bad_input_without_state_change() {
        let (gateway, store, audit) = setup();

        let empty = BillingRecord::invoice(RecordId::new("I1"), &patient("p-1"), date(), vec![]);
        assert!(matches!(gateway.create_invoice(empty), Err(GatewayError::Validation(_))));

        let negative = invoice("I1", dec!(10)).with_amount(dec!(-10));
        assert!(matches!(gateway.create_invoice(negative), Err(GatewayError::Validation(_))));

        assert!(matches!(
            gateway.create_invoice(receipt("R1", dec!(10))),
            Err(GatewayError::Validation(_))
        ));

        assert!(store.list_all().unwrap().is_empty());
        assert!(audit.entries().unwrap().is_empty());
    }

    #[test]
    fn duplicate_id_is_a_conflict_across_kinds() {
        let (gateway, _, _) = setup();
        gateway.create_invoice(invoice("X1", dec!(100))).unwrap();

        assert!(matches!(
            gateway.create_invoice(invoice("X1", dec!(50))),
            Err(GatewayError::Conflict(_))
        ));
        assert!(matches!(
            gateway.record_receipt(receipt("X1", dec!(50)), None),
            Err(GatewayError::Conflict(_))
        ));
    }

    #[test]
    fn amount_mismatch_is_accepted() {
        let (gateway, store, _) = setup();
        gateway
            .create_invoice(invoice("I1", dec!(100)).with_amount(dec!(90)))
            .unwrap();
        assert_eq!(store.get(&RecordId::new("I1")).unwrap().unwrap().amount, dec!(90));
    }

    #[test]
    fn receipt_is_spread_over_invoices_in_order() {
        let (gateway, store, audit) = setup();
        gateway.create_invoice(invoice("A", dec!(100))).unwrap();
        gateway.create_invoice(invoice("B", dec!(100))).unwrap();

        let outcome = gateway
            .record_receipt(
                receipt("R1", dec!(150)),
                Some(vec![RecordId::new("A"), RecordId::new("B"), RecordId::new("A")]),
            )
            .unwrap();

        assert_eq!(outcome.allocations.len(), 2);
        assert_eq!(outcome.credit, dec!(0));
        let a = store.get(&RecordId::new("A")).unwrap().unwrap();
        let b = store.get(&RecordId::new("B")).unwrap().unwrap();
        assert_eq!(a.status(), Some(InvoiceStatus::Paid));
        assert_eq!(b.paid_amount(), Some(dec!(50)));
        assert_eq!(b.status(), Some(InvoiceStatus::PartiallyPaid));

        let stored = store.get(&RecordId::new("R1")).unwrap().unwrap();
        assert_eq!(
            stored.receipt_details().unwrap().related_invoices(),
            vec![RecordId::new("A"), RecordId::new("B")]
        );
        assert_eq!(audit.entries().unwrap().last().unwrap().action, "Receipt Recorded");
    }

    #[test]
    fn overpayment_leaves_credit() {
        let (gateway, store, _) = setup();
        gateway.create_invoice(invoice("A", dec!(100))).unwrap();

        let outcome = gateway
            .record_receipt(receipt("R1", dec!(130)), Some(vec![RecordId::new("A")]))
            .unwrap();

        assert_eq!(outcome.credit, dec!(30));
        let a = store.get(&RecordId::new("A")).unwrap().unwrap();
        assert_eq!(a.paid_amount(), Some(dec!(100)));
    }

    #[test]
    fn receipt_with_bad_links_is_rejected_atomically() {
        let (gateway, store, _) = setup();
        gateway.create_invoice(invoice("A", dec!(100))).unwrap();
        gateway.record_receipt(receipt("R0", dec!(5)), None).unwrap();

        let other_patient = BillingRecord::invoice(
            RecordId::new("Z"),
            &patient("p-2"),
            date(),
            vec![LineItem::new("Exam", dec!(40))],
        );
        gateway.create_invoice(other_patient).unwrap();

        for related in [vec!["A", "missing"], vec!["R0"], vec!["Z"]] {
            let ids = related.into_iter().map(RecordId::new).collect();
            assert!(matches!(
                gateway.record_receipt(receipt("R1", dec!(50)), Some(ids)),
                Err(GatewayError::Validation(_))
            ));
        }

        assert!(store.get(&RecordId::new("R1")).unwrap().is_none());
        assert_eq!(store.get(&RecordId::new("A")).unwrap().unwrap().paid_amount(), Some(dec!(0)));
    }

    #[test]
    fn negative_receipt_is_rejected() {
        let (gateway, _, _) = setup();
        assert!(matches!(
            gateway.record_receipt(receipt("R1", dec!(-1)), None),
            Err(GatewayError::Validation(_))
        ));
    }

    #[test]
    fn overdue_survives_zero_share_and_yields_to_payment() {
        let (gateway, store, _) = setup();
        gateway.create_invoice(invoice("A", dec!(100))).unwrap();
        gateway.mark_overdue(&RecordId::new("A")).unwrap();

        gateway
            .record_receipt(receipt("R0", dec!(0)), Some(vec![RecordId::new("A")]))
            .unwrap();
        assert_eq!(
            store.get(&RecordId::new("A")).unwrap().unwrap().status(),
            Some(InvoiceStatus::Overdue)
        );

        gateway
            .record_receipt(receipt("R1", dec!(40)), Some(vec![RecordId::new("A")]))
            .unwrap();
        assert_eq!(
            store.get(&RecordId::new("A")).unwrap().unwrap().status(),
            Some(InvoiceStatus::PartiallyPaid)
        );
    }

    #[test]
    fn mark_overdue_checks_kind_and_payment() {
        let (gateway, _, _) = setup();
        gateway.create_invoice(invoice("A", dec!(100))).unwrap();
        gateway.record_receipt(receipt("R1", dec!(100)), Some(vec![RecordId::new("A")])).unwrap();

        assert!(matches!(
            gateway.mark_overdue(&RecordId::new("A")),
            Err(GatewayError::InvariantViolation(_))
        ));
        assert!(matches!(
            gateway.mark_overdue(&RecordId::new("R1")),
            Err(GatewayError::Validation(_))
        ));
        assert!(matches!(
            gateway.mark_overdue(&RecordId::new("nope")),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[test]
    fn correction_may_lower_paid_amount_within_bounds() {
        let (gateway, _, audit) = setup();
        gateway.create_invoice(invoice("A", dec!(100))).unwrap();
        gateway.record_receipt(receipt("R1", dec!(100)), Some(vec![RecordId::new("A")])).unwrap();

        let corrected = gateway.correct_paid_amount(&RecordId::new("A"), dec!(30)).unwrap();
        assert_eq!(corrected.paid_amount(), Some(dec!(30)));
        assert_eq!(corrected.status(), Some(InvoiceStatus::PartiallyPaid));

        assert!(matches!(
            gateway.correct_paid_amount(&RecordId::new("A"), dec!(101)),
            Err(GatewayError::Validation(_))
        ));
        assert_eq!(audit.entries().unwrap().last().unwrap().action, "Payment Corrected");
    }

    #[test]
    fn void_of_missing_record_is_not_found() {
        let (gateway, _, audit) = setup();
        assert!(matches!(
            gateway.void_record(&RecordId::new("nope")),
            Err(GatewayError::NotFound(_))
        ));
        assert!(audit.entries().unwrap().is_empty());
    }

    #[test]
    fn voiding_an_invoice_reports_orphaned_receipts() {
        let (gateway, store, audit) = setup();
        gateway.create_invoice(invoice("A", dec!(100))).unwrap();
        gateway.record_receipt(receipt("R1", dec!(60)), Some(vec![RecordId::new("A")])).unwrap();

        let outcome = gateway.void_record(&RecordId::new("A")).unwrap();
        assert_eq!(outcome.orphaned_receipts, vec![RecordId::new("R1")]);
        assert!(store.get(&RecordId::new("R1")).unwrap().is_some());

        let last = audit.entries().unwrap().pop().unwrap();
        assert_eq!(last.action, "Record Voided");
        assert!(last.details.contains("A"));
    }

    #[test]
    fn new_billable_note_generates_one_invoice_in_the_same_commit() {
        let (gateway, store, audit) = setup();
        let note = ProgressNote {
            id: NoteId::new("n-1"),
            patient_id: PatientId::new("p-1"),
            branch_id: BranchId::new("main"),
            date: date(),
            dentist_name: "Dr. Okafor".to_string(),
            treatment_performed: "Composite Filling".to_string(),
            tooth_number: Some("36".to_string()),
            clinical_notes: String::new(),
            plan: String::new(),
            amount: Some(dec!(150)),
        };

        let first = gateway.save_progress_note(note.clone(), "Ana Lima").unwrap();
        assert!(first.created);
        let generated = first.invoice.unwrap();
        assert_eq!(generated.amount, dec!(150));
        assert_eq!(generated.patient_name, "Ana Lima");

        let entries = audit.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, AuditCategory::Clinical);
        assert_eq!(entries[0].action, "Invoice Generated From Note");

        let mut edited = note;
        edited.clinical_notes = "Shade A2".to_string();
        let second = gateway.save_progress_note(edited, "Ana Lima").unwrap();
        assert!(!second.created);
        assert!(second.invoice.is_none());
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert_eq!(audit.entries().unwrap()[1].action, "Progress Note Saved");
    }

    #[test]
    fn deleting_a_note_keeps_its_invoice() {
        let (gateway, store, _) = setup();
        let note = ProgressNote {
            id: NoteId::new("n-1"),
            patient_id: PatientId::new("p-1"),
            branch_id: BranchId::new("main"),
            date: date(),
            dentist_name: "Dr. Okafor".to_string(),
            treatment_performed: "Extraction".to_string(),
            tooth_number: None,
            clinical_notes: String::new(),
            plan: String::new(),
            amount: Some(dec!(90)),
        };
        gateway.save_progress_note(note, "Ana Lima").unwrap();

        gateway.delete_progress_note(&NoteId::new("n-1")).unwrap();
        assert!(store.list_all_notes().unwrap().is_empty());
        assert_eq!(store.list_all().unwrap().len(), 1);

        assert!(matches!(
            gateway.delete_progress_note(&NoteId::new("n-1")),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[test]
    fn audit_failure_reverts_the_change() {
        let store = Arc::new(InMemoryRecordStore::new());
        LedgerGateway::new(
            store.clone(),
            InMemoryAuditLog::new(),
            Actor::new(UserId::new("u-1"), "Front Desk"),
        )
        .create_invoice(invoice("A", dec!(100)))
        .unwrap();
        let before = store.snapshot().unwrap();

        let gateway = LedgerGateway::new(
            store.clone(),
            BrokenAuditLog,
            Actor::new(UserId::new("u-1"), "Front Desk"),
        );

        assert!(matches!(
            gateway.create_invoice(invoice("B", dec!(50))),
            Err(GatewayError::Audit(_))
        ));
        assert!(matches!(
            gateway.record_receipt(receipt("R1", dec!(40)), Some(vec![RecordId::new("A")])),
            Err(GatewayError::Audit(_))
        ));
        assert!(matches!(
            gateway.void_record(&RecordId::new("A")),
            Err(GatewayError::Audit(_))
        ));
        assert_eq!(store.snapshot().unwrap(), before);
    }

    #[test]
    fn note_save_retried_after_audit_failure_still_bills() {
        let store = Arc::new(InMemoryRecordStore::new());
        let note = billable_note("n-1", Some(dec!(150)));

        let broken = LedgerGateway::new(
            store.clone(),
            BrokenAuditLog,
            Actor::new(UserId::new("u-1"), "Front Desk"),
        );
        assert!(matches!(
            broken.save_progress_note(note.clone(), "Ana Lima"),
            Err(GatewayError::Audit(_))
        ));
        assert!(store.list_all_notes().unwrap().is_empty());
        assert!(store.list_all().unwrap().is_empty());

        let (store, _, actor) = broken.into_parts();
        let gateway = LedgerGateway::new(store.clone(), InMemoryAuditLog::new(), actor);
        let outcome = gateway.save_progress_note(note, "Ana Lima").unwrap();
        assert!(outcome.created);
        assert!(outcome.invoice.is_some());
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn fee_added_on_edit_is_billed_once() {
        let (gateway, store, audit) = setup();

        let charted = gateway
            .save_progress_note(billable_note("n-1", None), "Ana Lima")
            .unwrap();
        assert!(charted.created);
        assert!(charted.invoice.is_none());
        assert!(store.list_all().unwrap().is_empty());

        let priced = gateway
            .save_progress_note(billable_note("n-1", Some(dec!(150))), "Ana Lima")
            .unwrap();
        assert!(!priced.created);
        let invoice = priced.invoice.unwrap();
        assert_eq!(invoice.amount, dec!(150));
        assert_eq!(invoice.status(), Some(InvoiceStatus::Pending));
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert_eq!(audit.entries().unwrap()[1].action, "Invoice Generated From Note");

        let mut reworded = billable_note("n-1", Some(dec!(150)));
        reworded.plan = "Review in 6 months".to_string();
        let again = gateway.save_progress_note(reworded, "Ana Lima").unwrap();
        assert!(again.invoice.is_none());
        assert_eq!(store.list_all().unwrap().len(), 1);
    }
}
