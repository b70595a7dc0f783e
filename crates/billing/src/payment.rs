//! Payment application rules for invoices.
//!
//! A receipt's amount is spread over the invoices it references in the order
//! given: each invoice takes at most its outstanding amount, and whatever is
//! left stays on the patient's account as credit.

use serde::{Deserialize, Serialize};

use clinicledger_core::{DomainError, DomainResult, Money, RecordId, format_money};

use crate::record::{BillingRecord, InvoiceDetails, InvoiceStatus};

/// Status implied by a paid amount.
///
/// `0 → Pending`, `0 < paid < amount → Partially Paid`, `paid ≥ amount → Paid`.
pub fn derive_status(paid_amount: Money, amount: Money) -> InvoiceStatus {
    if paid_amount.is_zero() {
        InvoiceStatus::Pending
    } else if paid_amount < amount {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Paid
    }
}

/// Share of a receipt applied to one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub invoice_id: RecordId,
    pub share: Money,
    pub paid_amount_after: Money,
    pub status_before: InvoiceStatus,
    pub status_after: InvoiceStatus,
}

impl InvoiceDetails {
    /// Add `share` to the paid amount and recompute status.
    ///
    /// A zero share changes nothing, so an `Overdue` flag survives it.
    pub fn apply_share(&mut self, invoice_amount: Money, share: Money) {
        if share <= Money::ZERO {
            return;
        }
        self.paid_amount += share;
        self.status = derive_status(self.paid_amount, invoice_amount);
    }

    /// Explicit correction of the paid amount (the only path that may lower it).
    ///
    /// `Overdue` is kept while the corrected invoice is still not fully paid.
    pub fn correct_paid_amount(&mut self, invoice_amount: Money, paid_amount: Money) -> DomainResult<()> {
        if paid_amount < Money::ZERO || paid_amount > invoice_amount {
            return Err(DomainError::validation(format!(
                "corrected paidAmount {} must be between 0.00 and {}",
                format_money(paid_amount),
                format_money(invoice_amount)
            )));
        }
        self.paid_amount = paid_amount;
        let derived = derive_status(paid_amount, invoice_amount);
        if !(self.status == InvoiceStatus::Overdue && derived != InvoiceStatus::Paid) {
            self.status = derived;
        }
        Ok(())
    }

    /// Externally asserted overdue flag.
    pub fn mark_overdue(&mut self, invoice_amount: Money) -> DomainResult<()> {
        if self.paid_amount >= invoice_amount && !invoice_amount.is_zero() {
            return Err(DomainError::invariant("cannot mark a fully paid invoice overdue"));
        }
        self.status = InvoiceStatus::Overdue;
        Ok(())
    }
}

/// Spread `amount` over `invoices` (in order) and return the updated invoices
/// together with one allocation per invoice.
///
/// Every entry of `invoices` must be an Invoice; receipts are rejected.
pub fn allocate_receipt(
    amount: Money,
    invoices: &[BillingRecord],
) -> DomainResult<(Vec<BillingRecord>, Vec<Allocation>)> {
    let mut remaining = amount.max(Money::ZERO);
    let mut updated = Vec::with_capacity(invoices.len());
    let mut allocations = Vec::with_capacity(invoices.len());

    for invoice in invoices {
        let mut invoice = invoice.clone();
        let invoice_id = invoice.id.clone();
        let invoice_amount = invoice.amount;
        let outstanding = invoice.outstanding().ok_or_else(|| {
            DomainError::validation(format!("related record {invoice_id} is not an Invoice"))
        })?;
        let share = remaining.min(outstanding);
        remaining -= share;

        let details = invoice.invoice_details_mut().ok_or_else(|| {
            DomainError::validation(format!("related record {invoice_id} is not an Invoice"))
        })?;
        let status_before = details.status;
        details.apply_share(invoice_amount, share);

        allocations.push(Allocation {
            invoice_id,
            share,
            paid_amount_after: details.paid_amount,
            status_before,
            status_after: details.status,
        });
        updated.push(invoice);
    }

    Ok((updated, allocations))
}
