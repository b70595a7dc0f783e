use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use clinicledger_billing::{BillingRecord, InvoiceStatus, LineItem, ProgressNote};
use clinicledger_core::{Money, PatientId, RecordId, format_money};

/// Case-folded, trimmed treatment description.
pub fn normalize_description(description: &str) -> String {
    description.trim().to_lowercase()
}

/// Structural key shared by a note and the invoice line billed for it:
/// `(date, normalized description, price with two decimals)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    date: NaiveDate,
    description: String,
    price: String,
}

impl MatchKey {
    pub fn new(date: NaiveDate, description: &str, price: Money) -> Self {
        Self {
            date,
            description: normalize_description(description),
            price: format_money(price),
        }
    }

    /// A note without a fee keys as `0.00`.
    pub fn for_note(note: &ProgressNote) -> Self {
        Self::new(
            note.date,
            &note.treatment_performed,
            note.amount.unwrap_or(Money::ZERO),
        )
    }

    pub fn for_line(record: &BillingRecord, item: &LineItem) -> Self {
        Self::new(record.date, &item.description, item.price)
    }
}

/// One row of the treatment history: a note plus the invoice it was billed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentLogEntry {
    #[serde(flatten)]
    pub note: ProgressNote,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<InvoiceStatus>,
}

impl TreatmentLogEntry {
    fn unmatched(note: &ProgressNote) -> Self {
        Self {
            note: note.clone(),
            invoice_id: None,
            payment_status: None,
        }
    }

    pub fn is_billed(&self) -> bool {
        self.invoice_id.is_some()
    }
}

/// Invoice line with no note to attach to; shown only in the invoice list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedLine {
    pub invoice_id: RecordId,
    pub line_index: usize,
    pub date: NaiveDate,
    pub description: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// One entry per note, newest date first; same-date entries keep note order.
    pub entries: Vec<TreatmentLogEntry>,
    pub unmatched_lines: Vec<UnmatchedLine>,
}

/// Match `patient_id`'s notes against the lines of their invoices.
///
/// Notes are consumed in the order given (creation order) and invoice lines in
/// record order then line order, so identical notes and identical lines pair up
/// first-in-first-out. Receipts and other patients' data are ignored.
pub fn reconcile<'a>(
    patient_id: &PatientId,
    notes: impl IntoIterator<Item = &'a ProgressNote>,
    records: impl IntoIterator<Item = &'a BillingRecord>,
) -> Reconciliation {
    let mut entries: Vec<TreatmentLogEntry> = Vec::new();
    let mut queues: HashMap<MatchKey, VecDeque<usize>> = HashMap::new();

    for note in notes.into_iter().filter(|n| &n.patient_id == patient_id) {
        queues
            .entry(MatchKey::for_note(note))
            .or_default()
            .push_back(entries.len());
        entries.push(TreatmentLogEntry::unmatched(note));
    }

    let mut unmatched_lines = Vec::new();
    let invoices = records
        .into_iter()
        .filter(|r| &r.patient_id == patient_id && !r.is_receipt());

    for record in invoices {
        for (line_index, item) in record.items.iter().enumerate() {
            let next = queues
                .get_mut(&MatchKey::for_line(record, item))
                .and_then(VecDeque::pop_front);

            match next {
                Some(idx) => {
                    let entry = &mut entries[idx];
                    entry.invoice_id = Some(record.id.clone());
                    entry.payment_status = record.status();
                }
                None => unmatched_lines.push(UnmatchedLine {
                    invoice_id: record.id.clone(),
                    line_index,
                    date: record.date,
                    description: item.description.clone(),
                    price: item.price,
                }),
            }
        }
    }

    // Stable: ties keep note insertion order.
    entries.sort_by(|a, b| b.note.date.cmp(&a.note.date));

    Reconciliation {
        entries,
        unmatched_lines,
    }
}

/// Treatment history for display (entries only).
pub fn treatment_log<'a>(
    patient_id: &PatientId,
    notes: impl IntoIterator<Item = &'a ProgressNote>,
    records: impl IntoIterator<Item = &'a BillingRecord>,
) -> Vec<TreatmentLogEntry> {
    reconcile(patient_id, notes, records).entries
}
