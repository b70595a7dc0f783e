//! Balance Calculator.
//!
//! Per-patient balance is `Σ invoice.amount − Σ receipt.amount` over every
//! record still in the ledger, regardless of invoice status. A negative result
//! is a credit held by the patient.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use clinicledger_billing::{BillingRecord, InvoiceStatus, RecordKind};
use clinicledger_core::{BranchId, Money, PatientId, ProviderId};

/// How a balance is presented on the patient screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceLabel {
    #[serde(rename = "Balance Due")]
    BalanceDue,
    Credit,
    Settled,
}

impl core::fmt::Display for BalanceLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BalanceLabel::BalanceDue => f.write_str("Balance Due"),
            BalanceLabel::Credit => f.write_str("Credit"),
            BalanceLabel::Settled => f.write_str("Settled"),
        }
    }
}

/// Outstanding balance for one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientBalance {
    pub patient_id: PatientId,
    pub total_invoiced: Money,
    pub total_received: Money,
    /// Signed: negative means the patient holds a credit.
    pub outstanding: Money,
}

impl PatientBalance {
    pub fn is_credit(&self) -> bool {
        self.outstanding < Money::ZERO
    }

    pub fn label(&self) -> BalanceLabel {
        if self.outstanding > Money::ZERO {
            BalanceLabel::BalanceDue
        } else if self.outstanding < Money::ZERO {
            BalanceLabel::Credit
        } else {
            BalanceLabel::Settled
        }
    }

    /// Amount shown next to the label (always non-negative).
    pub fn display_amount(&self) -> Money {
        self.outstanding.abs()
    }
}

/// Clinic-wide aggregates for the billing dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClinicSummary {
    pub total_collected: Money,
    pub total_invoiced: Money,
    /// `total_invoiced - total_collected`; negative means net patient credit.
    pub net_outstanding: Money,
    /// Unpaid remainder of invoices flagged `Overdue`.
    pub total_overdue: Money,
}

impl ClinicSummary {
    pub fn net_outstanding_label(&self) -> &'static str {
        if self.net_outstanding < Money::ZERO {
            "Patient Credits (Net)"
        } else {
            "Net Outstanding"
        }
    }
}

/// Billing totals attributed to one clinician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTotals {
    pub provider_id: Option<ProviderId>,
    pub provider_name: Option<String>,
    pub invoiced: Money,
    pub collected: Money,
    pub invoice_count: u32,
}

/// `max(0, amount − paidAmount)` for an invoice; zero for receipts.
pub fn invoice_outstanding(record: &BillingRecord) -> Money {
    record.outstanding().unwrap_or(Money::ZERO)
}

/// Balance for `patient_id` over `records` (records of other patients are ignored).
pub fn patient_balance<'a>(
    patient_id: &PatientId,
    records: impl IntoIterator<Item = &'a BillingRecord>,
) -> PatientBalance {
    let mut total_invoiced = Money::ZERO;
    let mut total_received = Money::ZERO;

    for record in records.into_iter().filter(|r| &r.patient_id == patient_id) {
        match record.kind {
            RecordKind::Invoice(_) => total_invoiced += record.amount,
            RecordKind::Receipt(_) => total_received += record.amount,
        }
    }

    PatientBalance {
        patient_id: patient_id.clone(),
        total_invoiced,
        total_received,
        outstanding: total_invoiced - total_received,
    }
}

/// Clinic-wide aggregates over every record.
pub fn clinic_summary<'a>(records: impl IntoIterator<Item = &'a BillingRecord>) -> ClinicSummary {
    let mut summary = ClinicSummary::default();

    for record in records {
        match &record.kind {
            RecordKind::Invoice(details) => {
                summary.total_invoiced += record.amount;
                if details.status == InvoiceStatus::Overdue {
                    summary.total_overdue += invoice_outstanding(record);
                }
            }
            RecordKind::Receipt(_) => summary.total_collected += record.amount,
        }
    }

    summary.net_outstanding = summary.total_invoiced - summary.total_collected;
    summary
}

/// Clinic-wide aggregates restricted to one branch.
pub fn clinic_summary_for_branch<'a>(
    records: impl IntoIterator<Item = &'a BillingRecord>,
    branch_id: &BranchId,
) -> ClinicSummary {
    clinic_summary(records.into_iter().filter(|r| &r.branch_id == branch_id))
}

/// Invoiced/collected totals per provider, ordered by provider name
/// (unattributed records last).
pub fn provider_breakdown<'a>(
    records: impl IntoIterator<Item = &'a BillingRecord>,
) -> Vec<ProviderTotals> {
    let mut by_provider: BTreeMap<(bool, Option<String>, Option<ProviderId>), ProviderTotals> =
        BTreeMap::new();

    for record in records {
        let key = (
            record.provider_id.is_none() && record.provider_name.is_none(),
            record.provider_name.clone(),
            record.provider_id.clone(),
        );
        let totals = by_provider.entry(key).or_insert_with(|| ProviderTotals {
            provider_id: record.provider_id.clone(),
            provider_name: record.provider_name.clone(),
            invoiced: Money::ZERO,
            collected: Money::ZERO,
            invoice_count: 0,
        });
        match record.kind {
            RecordKind::Invoice(_) => {
                totals.invoiced += record.amount;
                totals.invoice_count += 1;
            }
            RecordKind::Receipt(_) => totals.collected += record.amount,
        }
    }

    by_provider.into_values().collect()
}
