//! Ledger integrity report.
//!
//! The ledger tolerates a few soft invariant violations instead of rejecting
//! them (receipts left pointing at a voided invoice, invoices whose amount
//! disagrees with their lines). This report makes them visible.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use clinicledger_billing::{BillingRecord, RecordType};
use clinicledger_core::{Money, RecordId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntegrityIssue {
    /// A receipt references an id that is missing from the ledger.
    OrphanedReceipt {
        receipt_id: RecordId,
        missing_invoice_id: RecordId,
    },
    /// A receipt references a record that is not an invoice.
    ReceiptLinkedToNonInvoice {
        receipt_id: RecordId,
        linked_id: RecordId,
        linked_type: RecordType,
    },
    /// `amount != Σ items.price`.
    InvoiceAmountMismatch {
        invoice_id: RecordId,
        amount: Money,
        items_total: Money,
    },
    /// `paidAmount > amount`.
    InvoiceOverpaid {
        invoice_id: RecordId,
        amount: Money,
        paid_amount: Money,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IntegrityReport {
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Receipts whose invoice link is dangling.
    pub fn orphaned_receipts(&self) -> Vec<&RecordId> {
        self.issues
            .iter()
            .filter_map(|i| match i {
                IntegrityIssue::OrphanedReceipt { receipt_id, .. } => Some(receipt_id),
                _ => None,
            })
            .collect()
    }
}

pub fn check_integrity(records: &[BillingRecord]) -> IntegrityReport {
    let by_id: HashMap<&RecordId, &BillingRecord> = records.iter().map(|r| (&r.id, r)).collect();
    let mut issues = Vec::new();

    for record in records {
        if let Some(details) = record.invoice_details() {
            let items_total = record.items_total();
            if items_total != record.amount {
                issues.push(IntegrityIssue::InvoiceAmountMismatch {
                    invoice_id: record.id.clone(),
                    amount: record.amount,
                    items_total,
                });
            }
            if details.paid_amount > record.amount {
                issues.push(IntegrityIssue::InvoiceOverpaid {
                    invoice_id: record.id.clone(),
                    amount: record.amount,
                    paid_amount: details.paid_amount,
                });
            }
        }

        if let Some(details) = record.receipt_details() {
            for linked in details.related_invoices() {
                match by_id.get(&linked) {
                    None => issues.push(IntegrityIssue::OrphanedReceipt {
                        receipt_id: record.id.clone(),
                        missing_invoice_id: linked,
                    }),
                    Some(target) if !target.is_invoice() => {
                        issues.push(IntegrityIssue::ReceiptLinkedToNonInvoice {
                            receipt_id: record.id.clone(),
                            linked_type: target.record_type(),
                            linked_id: linked,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
    }

    IntegrityReport { issues }
}
